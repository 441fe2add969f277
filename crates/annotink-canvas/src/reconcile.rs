//! Diff-and-apply synchronization of the scene against the upstream model.

use crate::scene::SceneIndex;
use annotink_core::{
    label_text, ActiveElement, DrawnState, Geometry, LabelPrimitive, ObjectId, ObjectState,
    ScenePrimitive, ShapeType,
};
use kurbo::{Point, Vec2};
use std::collections::{HashMap, HashSet};

/// What a reconciliation pass changed. Identifier lists only contain objects
/// that actually reached the scene (malformed ones are skipped).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileOutcome {
    pub created: Vec<ObjectId>,
    pub updated: Vec<ObjectId>,
    pub deleted: Vec<ObjectId>,
    /// The active element restored after the pass, if the previously active
    /// object survived.
    pub reactivated: Option<ActiveElement>,
}

impl ReconcileOutcome {
    /// True when the pass issued no scene mutation at all.
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// Computes the created/updated/deleted partition between the authoritative
/// object list and the drawn-state store, and issues the minimal set of
/// scene mutations.
///
/// Reconciliation is infallible: malformed objects are dropped per-object
/// with a warning, never raised, since the upstream list may be transiently
/// inconsistent within a single frame render.
pub struct Reconciler {
    drawn: HashMap<ObjectId, DrawnState>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Self {
            drawn: HashMap::new(),
        }
    }

    /// The last-synchronized snapshot for an identifier, if it is rendered.
    pub fn drawn_state(&self, id: ObjectId) -> Option<&DrawnState> {
        self.drawn.get(&id)
    }

    pub fn drawn_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.drawn.keys().copied()
    }

    /// Synchronize the scene with the incoming object list.
    ///
    /// The sync key is the `updated` version (or owning `frame`), never raw
    /// point equality; reconciling an identical list twice is a no-op.
    pub fn reconcile(
        &mut self,
        states: &[ObjectState],
        scene: &mut SceneIndex,
        geometry: &Geometry,
    ) -> ReconcileOutcome {
        let incoming: HashSet<ObjectId> = states.iter().map(|state| state.client_id).collect();

        let mut created_states = Vec::new();
        let mut updated_states = Vec::new();
        for state in states {
            match self.drawn.get(&state.client_id) {
                None => created_states.push(state),
                Some(drawn) if drawn.updated != state.updated || drawn.frame != state.frame => {
                    updated_states.push(state);
                }
                Some(_) => {}
            }
        }
        let mut deleted: Vec<ObjectId> = self
            .drawn
            .keys()
            .copied()
            .filter(|id| !incoming.contains(id))
            .collect();
        deleted.sort_unstable();

        if created_states.is_empty() && updated_states.is_empty() && deleted.is_empty() {
            return ReconcileOutcome::default();
        }

        // Affordances must not be live while primitives are deleted or
        // patched underneath them.
        let previous_active = scene.active();
        scene.deactivate();

        for id in &deleted {
            self.drawn.remove(id);
            scene.remove(*id);
        }

        let mut outcome = ReconcileOutcome {
            deleted,
            ..ReconcileOutcome::default()
        };

        for state in created_states {
            if self.create(state, scene, geometry) {
                outcome.created.push(state.client_id);
            }
        }

        for state in updated_states {
            let id = state.client_id;
            if state.shape_type == ShapeType::Skeleton {
                // Skeleton internals are rebuilt wholesale rather than
                // patched in place.
                scene.remove(id);
                self.drawn.remove(&id);
                if self.create(state, scene, geometry) {
                    outcome.updated.push(id);
                }
                continue;
            }
            if let Err(err) = state.validate() {
                log::warn!("dropping object {id}: {err}");
                scene.remove(id);
                self.drawn.remove(&id);
                continue;
            }
            let previous = self.drawn.get(&id).cloned().expect("updated implies drawn");
            if let Some(primitive) = scene.get_mut(id) {
                patch_primitive(primitive, &previous, state, geometry);
            }
            self.drawn.insert(id, DrawnState::capture(state));
            outcome.updated.push(id);
        }

        scene.resort();

        if let Some(id) = previous_active.client_id {
            if scene.contains(id) {
                outcome.reactivated = scene.activate(id, previous_active.attribute_id);
            }
        }
        outcome
    }

    fn create(&mut self, state: &ObjectState, scene: &mut SceneIndex, geometry: &Geometry) -> bool {
        match ScenePrimitive::build(state, geometry) {
            Ok(primitive) => {
                scene.insert(primitive);
                self.drawn
                    .insert(state.client_id, DrawnState::capture(state));
                true
            }
            Err(err) => {
                log::warn!("skipping object {}: {err}", state.client_id);
                false
            }
        }
    }
}

/// Apply the field-level diff between the stored drawn state and the
/// incoming object state to a live primitive. Only fields that actually
/// differ are touched.
fn patch_primitive(
    primitive: &mut ScenePrimitive,
    previous: &DrawnState,
    next: &ObjectState,
    geometry: &Geometry,
) {
    if (previous.hidden || previous.outside) != (next.hidden || next.outside) {
        primitive.hidden = next.hidden || next.outside;
    }
    if previous.z_order != next.z_order {
        primitive.z_order = next.z_order;
    }
    if previous.occluded != next.occluded {
        primitive.occluded = next.occluded;
    }
    if previous.lock != next.lock {
        primitive.locked = next.lock;
    }
    // Pinned flips the drag affordance; the deactivate/reactivate cycle
    // around the pass re-installs affordances with the new flag.
    if previous.pinned != next.pinned {
        primitive.pinned = next.pinned;
    }
    if previous.points != next.points {
        primitive.points = geometry.to_canvas(&next.points);
        // A full geometry rewrite resets the accumulated gesture transform.
        primitive.transform.scale = 1.0;
        primitive.transform.translate = Vec2::ZERO;
    }
    // Rotation applies after points so the transforms do not compound.
    if previous.rotation != next.rotation {
        primitive.transform.rotation = next.rotation;
    }

    let schema_changed = previous.label.id != next.label.id
        || previous.label.attributes != next.label.attributes;
    if schema_changed {
        let visible = primitive.label.as_ref().is_some_and(|label| label.visible);
        let bounds = primitive.bounds();
        primitive.label = Some(LabelPrimitive {
            text: label_text(next),
            position: Point::new(bounds.x0, bounds.y0),
            visible,
        });
    } else if previous.attributes != next.attributes {
        if let Some(label) = &mut primitive.label {
            label.text = label_text(next);
        }
    }

    let color_changed = previous.color != next.color
        || previous.label.color != next.label.color
        || previous.group.map(|group| group.color) != next.group.map(|group| group.color);
    if color_changed {
        primitive.color = next.color;
    }
}
