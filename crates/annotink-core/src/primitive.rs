//! Scene-resident visual primitives and rotation-aware point recovery.

use crate::geometry::Geometry;
use crate::objects::{ObjectId, ObjectState, SerializableColor, ShapeError, ShapeType};
use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a primitive node on the rendering surface.
pub type NodeId = Uuid;

/// Gesture transform accumulated on a primitive (scale/rotate/drag), applied
/// on top of its canvas-space points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveTransform {
    /// Rotation in degrees about the primitive center.
    pub rotation: f64,
    /// Uniform scale about the primitive center.
    pub scale: f64,
    /// Translation in canvas units.
    pub translate: Vec2,
}

impl Default for PrimitiveTransform {
    fn default() -> Self {
        Self {
            rotation: 0.0,
            scale: 1.0,
            translate: Vec2::ZERO,
        }
    }
}

impl PrimitiveTransform {
    /// The affine this transform applies around the given center, in the
    /// order the gestures accumulate: scale, then rotate, then translate.
    pub fn affine(&self, center: Point) -> Affine {
        let c = center.to_vec2();
        let scale_about = Affine::translate(c) * Affine::scale(self.scale) * Affine::translate(-c);
        Affine::translate(self.translate)
            * Affine::rotate_about(self.rotation.to_radians(), center)
            * scale_about
    }
}

/// The text primitive attached to a shape primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelPrimitive {
    pub text: String,
    /// Anchor position in canvas space.
    pub position: Point,
    pub visible: bool,
}

/// Compose the label text shown next to a primitive: the label name followed
/// by one `name: value` line per schema attribute that has a value.
pub fn label_text(state: &ObjectState) -> String {
    let mut text = state.label.name.clone();
    for spec in &state.label.attributes {
        if let Some(value) = state.attributes.get(&spec.id) {
            text.push('\n');
            text.push_str(&spec.name);
            text.push_str(": ");
            text.push_str(value);
        }
    }
    text
}

/// One live visual primitive in the scene.
///
/// `points` are canvas-space coordinates; the accumulated gesture
/// `transform` sits on top of them. Skeleton primitives carry one child
/// primitive per element plus wrapping-box points kept in sync with the
/// union of element positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenePrimitive {
    pub node: NodeId,
    pub client_id: ObjectId,
    pub shape_type: ShapeType,
    pub points: Vec<f64>,
    pub transform: PrimitiveTransform,
    pub z_order: i32,
    /// Visibility class: the object is hidden or outside its track.
    pub hidden: bool,
    pub occluded: bool,
    pub pinned: bool,
    pub locked: bool,
    pub color: SerializableColor,
    pub label: Option<LabelPrimitive>,
    pub elements: Vec<ScenePrimitive>,
}

impl ScenePrimitive {
    /// Build a primitive (and, for skeletons, its element primitives) from
    /// an object state, translating points into canvas space.
    pub fn build(state: &ObjectState, geometry: &Geometry) -> Result<Self, ShapeError> {
        state.validate()?;

        let elements = state
            .elements
            .iter()
            .map(|element| Self::build(element, geometry))
            .collect::<Result<Vec<_>, _>>()?;

        let mut primitive = Self {
            node: Uuid::new_v4(),
            client_id: state.client_id,
            shape_type: state.shape_type,
            points: geometry.to_canvas(&state.points),
            transform: PrimitiveTransform {
                rotation: state.rotation,
                ..PrimitiveTransform::default()
            },
            z_order: state.z_order,
            hidden: state.hidden || state.outside,
            occluded: state.occluded,
            pinned: state.pinned,
            locked: state.lock,
            color: state.color,
            label: Some(LabelPrimitive {
                text: label_text(state),
                position: Point::ZERO,
                visible: false,
            }),
            elements,
        };

        if primitive.shape_type == ShapeType::Skeleton {
            primitive.sync_skeleton_wrapper();
        }
        if let Some(label) = &mut primitive.label {
            label.position = top_left(&primitive.points);
        }
        Ok(primitive)
    }

    /// Bounding box in canvas space. Skeletons report the union of their
    /// element bounds.
    pub fn bounds(&self) -> Rect {
        if self.shape_type == ShapeType::Skeleton {
            return self
                .elements
                .iter()
                .map(ScenePrimitive::bounds)
                .reduce(|acc, b| acc.union(b))
                .unwrap_or(Rect::ZERO);
        }
        point_bounds(&self.points)
    }

    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    /// Shift the primitive by a canvas-space delta. Skeleton elements all
    /// move by the same delta and the wrapping box tracks their union.
    pub fn translate(&mut self, delta: Vec2) {
        for element in &mut self.elements {
            element.translate(delta);
        }
        if self.shape_type == ShapeType::Skeleton {
            self.sync_skeleton_wrapper();
        } else {
            for pair in self.points.chunks_exact_mut(2) {
                pair[0] += delta.x;
                pair[1] += delta.y;
            }
        }
        if let Some(label) = &mut self.label {
            label.position += delta;
        }
    }

    /// Recompute the wrapping-box points from the union of element bounds.
    /// Must be called after any mutation of skeleton element positions.
    pub fn sync_skeleton_wrapper(&mut self) {
        debug_assert_eq!(self.shape_type, ShapeType::Skeleton);
        let bounds = self.bounds();
        self.points = vec![bounds.x0, bounds.y0, bounds.x1, bounds.y1];
    }
}

/// Axis-aligned bounds of a flat point array.
fn point_bounds(points: &[f64]) -> Rect {
    let mut iter = points.chunks_exact(2);
    let Some(first) = iter.next() else {
        return Rect::ZERO;
    };
    let mut rect = Rect::new(first[0], first[1], first[0], first[1]);
    for pair in iter {
        rect.x0 = rect.x0.min(pair[0]);
        rect.y0 = rect.y0.min(pair[1]);
        rect.x1 = rect.x1.max(pair[0]);
        rect.y1 = rect.y1.max(pair[1]);
    }
    rect
}

fn top_left(points: &[f64]) -> Point {
    let bounds = point_bounds(points);
    Point::new(bounds.x0, bounds.y0)
}

/// Scoped cancellation of a primitive's rotation.
///
/// On creation the rotation is zeroed; dropping the guard writes the saved
/// value back, so the primitive's transform is bit-identical before and
/// after the scope on every exit path, including panics.
pub struct RotationReset<'a> {
    primitive: &'a mut ScenePrimitive,
    saved: f64,
}

impl<'a> RotationReset<'a> {
    pub fn new(primitive: &'a mut ScenePrimitive) -> Self {
        let saved = primitive.transform.rotation;
        primitive.transform.rotation = 0.0;
        Self { primitive, saved }
    }

    pub fn primitive(&self) -> &ScenePrimitive {
        self.primitive
    }
}

impl Drop for RotationReset<'_> {
    fn drop(&mut self) {
        self.primitive.transform.rotation = self.saved;
    }
}

/// Map window-space points into the primitive's unrotated local space.
///
/// The primitive's rotation is cancelled for the duration of the call, the
/// device-to-local matrix is re-read, each point is mapped through it, and
/// the rotation is restored. `center` overrides the rotation/scale pivot;
/// it defaults to the primitive's own center.
pub fn recover_unrotated_points(
    primitive: &mut ScenePrimitive,
    geometry: &Geometry,
    window_points: &[f64],
    center: Option<Point>,
) -> Vec<f64> {
    debug_assert!(window_points.len() % 2 == 0, "point array must hold x/y pairs");
    let guard = RotationReset::new(primitive);
    let pivot = center.unwrap_or_else(|| guard.primitive().center());
    let device_to_local = (geometry.window_transform()
        * guard.primitive().transform.affine(pivot))
    .inverse();

    let mut recovered = Vec::with_capacity(window_points.len());
    for pair in window_points.chunks_exact(2) {
        let p = device_to_local * Point::new(pair[0], pair[1]);
        recovered.push(p.x);
        recovered.push(p.y);
    }
    recovered
}
