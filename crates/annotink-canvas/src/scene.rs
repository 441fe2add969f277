//! Scene index: object identifier to live primitives, activation, paint order.

use annotink_core::{ActiveElement, ObjectId, ScenePrimitive, ShapeType};
use kurbo::Vec2;
use std::collections::HashMap;

/// Direct-manipulation affordances installed on the active primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeAffordances {
    pub draggable: bool,
    pub resizable: bool,
}

/// The transient gesture families owned by the scene index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Drag,
    Resize,
}

/// Snapshot taken when a gesture starts, restored on cancellation.
#[derive(Debug, Clone)]
struct GestureState {
    kind: GestureKind,
    client_id: ObjectId,
    original: ScenePrimitive,
}

/// Final geometry of a finished gesture, in canvas space.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureResult {
    pub client_id: ObjectId,
    pub points: Vec<f64>,
    /// Skeleton element id -> its points, empty for plain shapes.
    pub elements: Vec<(ObjectId, Vec<f64>)>,
}

/// Maps object identifiers to their live visual primitives and owns the
/// single active element.
pub struct SceneIndex {
    primitives: HashMap<ObjectId, ScenePrimitive>,
    /// Back-to-front paint order.
    paint_order: Vec<ObjectId>,
    active: ActiveElement,
    affordances: Option<ShapeAffordances>,
    /// Topmost z-layer to paint; primitives above it are filtered out.
    z_layer: Option<i32>,
    labels_always_visible: bool,
    gesture: Option<GestureState>,
    revision: u64,
}

impl Default for SceneIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneIndex {
    pub fn new() -> Self {
        Self {
            primitives: HashMap::new(),
            paint_order: Vec::new(),
            active: ActiveElement::default(),
            affordances: None,
            z_layer: None,
            labels_always_visible: false,
            gesture: None,
            revision: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.primitives.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.primitives.keys().copied()
    }

    pub fn get(&self, id: ObjectId) -> Option<&ScenePrimitive> {
        self.primitives.get(&id)
    }

    /// Mutable access for the reconciler's patch pass. Counts as a scene
    /// mutation.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut ScenePrimitive> {
        let primitive = self.primitives.get_mut(&id);
        if primitive.is_some() {
            self.revision += 1;
        }
        primitive
    }

    /// Monotonic counter bumped on every scene mutation. Lets callers assert
    /// that an operation touched nothing.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn active(&self) -> ActiveElement {
        self.active
    }

    pub fn affordances(&self) -> Option<ShapeAffordances> {
        self.affordances
    }

    pub fn insert(&mut self, primitive: ScenePrimitive) {
        let id = primitive.client_id;
        if self.primitives.insert(id, primitive).is_none() {
            self.paint_order.push(id);
        }
        self.revision += 1;
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<ScenePrimitive> {
        if self.gesture.as_ref().is_some_and(|g| g.client_id == id) {
            self.gesture = None;
        }
        if self.active.client_id == Some(id) {
            self.deactivate();
        }
        let removed = self.primitives.remove(&id)?;
        self.paint_order.retain(|&other| other != id);
        self.revision += 1;
        Some(removed)
    }

    /// Re-sort paint order by `(z_order, client_id)`.
    pub fn resort(&mut self) {
        let primitives = &self.primitives;
        self.paint_order
            .sort_by_key(|id| (primitives.get(id).map_or(0, |p| p.z_order), *id));
    }

    /// Back-to-front paint order, with primitives above the current z-layer
    /// filtered out.
    pub fn paint_order(&self) -> Vec<ObjectId> {
        self.paint_order
            .iter()
            .copied()
            .filter(|id| match (self.z_layer, self.primitives.get(id)) {
                (Some(layer), Some(primitive)) => primitive.z_order <= layer,
                _ => true,
            })
            .collect()
    }

    pub fn set_z_layer(&mut self, z_layer: Option<i32>) {
        self.z_layer = z_layer;
        self.revision += 1;
    }

    /// Toggle always-on label text (the display-all-text configuration).
    pub fn set_labels_always_visible(&mut self, visible: bool) {
        self.labels_always_visible = visible;
        for (id, primitive) in &mut self.primitives {
            if let Some(label) = &mut primitive.label {
                label.visible = visible || self.active.client_id == Some(*id);
            }
        }
        self.revision += 1;
    }

    /// Activate an object, making it eligible for direct manipulation.
    ///
    /// Reveals the label primitive and installs drag/resize affordances
    /// unless the object is locked (pinned objects keep resize but lose
    /// drag). Activating an unknown identifier or re-activating the current
    /// element is a no-op.
    pub fn activate(&mut self, id: ObjectId, attribute_id: Option<u64>) -> Option<ActiveElement> {
        if !self.primitives.contains_key(&id) {
            log::debug!("activation of unknown object {id} ignored");
            return None;
        }
        if self.active.client_id == Some(id) && self.active.attribute_id == attribute_id {
            return None;
        }
        self.deactivate();

        let primitive = self.primitives.get_mut(&id).expect("checked above");
        if let Some(label) = &mut primitive.label {
            label.visible = true;
        }
        self.affordances = if primitive.locked {
            None
        } else {
            Some(ShapeAffordances {
                draggable: !primitive.pinned,
                resizable: true,
            })
        };

        // The active primitive paints above everything on its layer.
        self.paint_order.retain(|&other| other != id);
        self.paint_order.push(id);

        self.active = ActiveElement {
            client_id: Some(id),
            attribute_id,
        };
        self.revision += 1;
        Some(self.active)
    }

    /// Strip affordances and restore paint order. Idempotent.
    pub fn deactivate(&mut self) -> Option<ObjectId> {
        let id = self.active.client_id?;
        if let Some(gesture) = self.gesture.take() {
            log::warn!("deactivating object {id} with a live gesture, restoring it");
            self.primitives.insert(gesture.client_id, gesture.original);
        }
        if let Some(primitive) = self.primitives.get_mut(&id) {
            if let Some(label) = &mut primitive.label {
                label.visible = self.labels_always_visible;
            }
        }
        self.affordances = None;
        self.active.clear();
        self.resort();
        self.revision += 1;
        Some(id)
    }

    /// Start dragging the active primitive. Requires drag affordances.
    pub fn begin_drag(&mut self, id: ObjectId) -> bool {
        self.begin_gesture(id, GestureKind::Drag, |affordances| affordances.draggable)
    }

    /// Start resizing the active primitive. Requires resize affordances.
    pub fn begin_resize(&mut self, id: ObjectId) -> bool {
        self.begin_gesture(id, GestureKind::Resize, |affordances| affordances.resizable)
    }

    fn begin_gesture(
        &mut self,
        id: ObjectId,
        kind: GestureKind,
        permitted: impl Fn(&ShapeAffordances) -> bool,
    ) -> bool {
        if self.gesture.is_some() {
            log::warn!("gesture already in progress, {kind:?} on {id} rejected");
            return false;
        }
        if self.active.client_id != Some(id) {
            log::debug!("{kind:?} on inactive object {id} ignored");
            return false;
        }
        if !self.affordances.as_ref().is_some_and(&permitted) {
            log::debug!("{kind:?} not permitted on object {id}");
            return false;
        }
        let original = self.primitives.get(&id).cloned();
        match original {
            Some(original) => {
                self.gesture = Some(GestureState {
                    kind,
                    client_id: id,
                    original,
                });
                true
            }
            None => false,
        }
    }

    /// Shift the dragged primitive by a canvas-space delta. Skeleton
    /// elements all shift with it and the wrapping box is re-synchronized on
    /// every intermediate frame.
    pub fn drag_by(&mut self, delta: Vec2) -> bool {
        let Some(gesture) = &self.gesture else {
            return false;
        };
        if gesture.kind != GestureKind::Drag {
            return false;
        }
        let id = gesture.client_id;
        let Some(primitive) = self.primitives.get_mut(&id) else {
            return false;
        };
        primitive.translate(delta);
        self.revision += 1;
        true
    }

    /// Rewrite the resized primitive's geometry. For a skeleton, `points` is
    /// the new wrapping box `[x0, y0, x1, y1]` and the elements scale into
    /// it; for every other shape it is the full new point array.
    pub fn resize_to(&mut self, points: &[f64]) -> bool {
        let Some(gesture) = &self.gesture else {
            return false;
        };
        if gesture.kind != GestureKind::Resize {
            return false;
        }
        let id = gesture.client_id;
        let Some(primitive) = self.primitives.get_mut(&id) else {
            return false;
        };
        if primitive.shape_type == ShapeType::Skeleton {
            if points.len() != 4 {
                log::warn!("skeleton resize expects a wrapping box, got {} coords", points.len());
                return false;
            }
            let old = primitive.bounds();
            let (new_x0, new_y0, new_x1, new_y1) = (points[0], points[1], points[2], points[3]);
            let scale_x = (new_x1 - new_x0) / old.width().max(f64::EPSILON);
            let scale_y = (new_y1 - new_y0) / old.height().max(f64::EPSILON);
            for element in &mut primitive.elements {
                for pair in element.points.chunks_exact_mut(2) {
                    pair[0] = new_x0 + (pair[0] - old.x0) * scale_x;
                    pair[1] = new_y0 + (pair[1] - old.y0) * scale_y;
                }
            }
            primitive.sync_skeleton_wrapper();
        } else {
            primitive.points = points.to_vec();
        }
        self.revision += 1;
        true
    }

    /// Complete the drag gesture, returning the final geometry.
    pub fn finish_drag(&mut self) -> Option<GestureResult> {
        self.finish_gesture(GestureKind::Drag)
    }

    /// Complete the resize gesture, returning the final geometry.
    pub fn finish_resize(&mut self) -> Option<GestureResult> {
        self.finish_gesture(GestureKind::Resize)
    }

    fn finish_gesture(&mut self, kind: GestureKind) -> Option<GestureResult> {
        match &self.gesture {
            Some(gesture) if gesture.kind == kind => {}
            _ => return None,
        }
        let gesture = self.gesture.take().expect("matched above");
        let primitive = self.primitives.get(&gesture.client_id)?;
        Some(GestureResult {
            client_id: gesture.client_id,
            points: primitive.points.clone(),
            elements: primitive
                .elements
                .iter()
                .map(|element| (element.client_id, element.points.clone()))
                .collect(),
        })
    }

    /// Abort the gesture, restoring the primitive to its pre-gesture state.
    pub fn cancel_gesture(&mut self) -> Option<ObjectId> {
        let gesture = self.gesture.take()?;
        let id = gesture.client_id;
        self.primitives.insert(id, gesture.original);
        self.revision += 1;
        Some(id)
    }

    pub fn gesture_in_progress(&self) -> Option<GestureKind> {
        self.gesture.as_ref().map(|g| g.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annotink_core::{Geometry, ObjectState};
    use kurbo::Size;

    fn geometry() -> Geometry {
        Geometry::for_image(Size::new(640.0, 480.0))
    }

    fn insert_rectangle(scene: &mut SceneIndex, id: ObjectId, z_order: i32) {
        let mut state = ObjectState::new(id, ShapeType::Rectangle, vec![0.0, 0.0, 10.0, 10.0]);
        state.z_order = z_order;
        scene.insert(ScenePrimitive::build(&state, &geometry()).unwrap());
    }

    fn insert_skeleton(scene: &mut SceneIndex, id: ObjectId) {
        let mut state = ObjectState::new(id, ShapeType::Skeleton, vec![]);
        state
            .elements
            .push(ObjectState::new(id + 1, ShapeType::Points, vec![10.0, 10.0]));
        state
            .elements
            .push(ObjectState::new(id + 2, ShapeType::Points, vec![50.0, 30.0]));
        scene.insert(ScenePrimitive::build(&state, &geometry()).unwrap());
    }

    #[test]
    fn test_activate_unknown_is_noop() {
        let mut scene = SceneIndex::new();
        assert!(scene.activate(99, None).is_none());
        assert!(scene.active().is_empty());
    }

    #[test]
    fn test_activate_and_deactivate() {
        let mut scene = SceneIndex::new();
        insert_rectangle(&mut scene, 1, 0);

        let active = scene.activate(1, Some(5)).unwrap();
        assert_eq!(active.client_id, Some(1));
        assert_eq!(active.attribute_id, Some(5));
        assert!(scene.get(1).unwrap().label.as_ref().unwrap().visible);
        assert!(scene.affordances().unwrap().draggable);

        // Double activation is a no-op.
        assert!(scene.activate(1, Some(5)).is_none());

        assert_eq!(scene.deactivate(), Some(1));
        assert!(scene.active().is_empty());
        assert!(scene.affordances().is_none());
        // Deactivating again is a no-op.
        assert!(scene.deactivate().is_none());
    }

    #[test]
    fn test_locked_object_gets_no_affordances() {
        let mut scene = SceneIndex::new();
        let mut state = ObjectState::new(1, ShapeType::Rectangle, vec![0.0, 0.0, 10.0, 10.0]);
        state.lock = true;
        scene.insert(ScenePrimitive::build(&state, &geometry()).unwrap());

        assert!(scene.activate(1, None).is_some());
        assert!(scene.affordances().is_none());
        assert!(!scene.begin_drag(1));
    }

    #[test]
    fn test_pinned_object_cannot_drag_but_can_resize() {
        let mut scene = SceneIndex::new();
        let mut state = ObjectState::new(1, ShapeType::Rectangle, vec![0.0, 0.0, 10.0, 10.0]);
        state.pinned = true;
        scene.insert(ScenePrimitive::build(&state, &geometry()).unwrap());

        scene.activate(1, None);
        let affordances = scene.affordances().unwrap();
        assert!(!affordances.draggable);
        assert!(affordances.resizable);
        assert!(!scene.begin_drag(1));
        assert!(scene.begin_resize(1));
    }

    #[test]
    fn test_paint_order_sorts_by_z_then_id() {
        let mut scene = SceneIndex::new();
        insert_rectangle(&mut scene, 3, 1);
        insert_rectangle(&mut scene, 1, 0);
        insert_rectangle(&mut scene, 2, 1);
        scene.resort();
        assert_eq!(scene.paint_order(), vec![1, 2, 3]);
    }

    #[test]
    fn test_activation_raises_then_deactivation_restores() {
        let mut scene = SceneIndex::new();
        insert_rectangle(&mut scene, 1, 0);
        insert_rectangle(&mut scene, 2, 1);
        scene.resort();

        scene.activate(1, None);
        assert_eq!(scene.paint_order(), vec![2, 1]);

        scene.deactivate();
        assert_eq!(scene.paint_order(), vec![1, 2]);
    }

    #[test]
    fn test_z_layer_filters_paint_order() {
        let mut scene = SceneIndex::new();
        insert_rectangle(&mut scene, 1, 0);
        insert_rectangle(&mut scene, 2, 5);
        scene.resort();

        scene.set_z_layer(Some(3));
        assert_eq!(scene.paint_order(), vec![1]);

        scene.set_z_layer(None);
        assert_eq!(scene.paint_order(), vec![1, 2]);
    }

    #[test]
    fn test_skeleton_drag_moves_elements_and_wrapper() {
        let mut scene = SceneIndex::new();
        insert_skeleton(&mut scene, 10);
        scene.activate(10, None);

        assert!(scene.begin_drag(10));
        assert!(scene.drag_by(Vec2::new(7.0, -2.0)));
        let result = scene.finish_drag().unwrap();

        assert_eq!(result.client_id, 10);
        // Elements started at canvas (110, 110) and (150, 130).
        assert_eq!(result.elements[0].1, vec![117.0, 108.0]);
        assert_eq!(result.elements[1].1, vec![157.0, 128.0]);
        // Wrapper tracks the union of element positions.
        assert_eq!(result.points, vec![117.0, 108.0, 157.0, 128.0]);
    }

    #[test]
    fn test_cancel_gesture_restores_original() {
        let mut scene = SceneIndex::new();
        insert_rectangle(&mut scene, 1, 0);
        scene.activate(1, None);

        let before = scene.get(1).unwrap().points.clone();
        scene.begin_drag(1);
        scene.drag_by(Vec2::new(25.0, 25.0));
        assert_ne!(scene.get(1).unwrap().points, before);

        assert_eq!(scene.cancel_gesture(), Some(1));
        assert_eq!(scene.get(1).unwrap().points, before);
        assert!(scene.gesture_in_progress().is_none());
    }

    #[test]
    fn test_resize_scales_skeleton_elements() {
        let mut scene = SceneIndex::new();
        insert_skeleton(&mut scene, 10);
        scene.activate(10, None);

        assert!(scene.begin_resize(10));
        // Double the wrapper (was 110,110 .. 150,130).
        assert!(scene.resize_to(&[110.0, 110.0, 190.0, 150.0]));
        let result = scene.finish_resize().unwrap();

        assert_eq!(result.elements[0].1, vec![110.0, 110.0]);
        assert_eq!(result.elements[1].1, vec![190.0, 150.0]);
        assert_eq!(result.points, vec![110.0, 110.0, 190.0, 150.0]);
    }

    #[test]
    fn test_remove_clears_activation() {
        let mut scene = SceneIndex::new();
        insert_rectangle(&mut scene, 1, 0);
        scene.activate(1, None);

        assert!(scene.remove(1).is_some());
        assert!(scene.active().is_empty());
        assert!(scene.is_empty());
        assert!(scene.paint_order().is_empty());
    }
}
