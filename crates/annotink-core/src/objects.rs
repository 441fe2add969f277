//! Authoritative object states and their drawn-state snapshots.
//!
//! [`ObjectState`] is owned by the external object model; this crate only
//! reads it. [`DrawnState`] is the immutable copy of the render-relevant
//! fields taken when an object was last fully synchronized with the scene.

use peniko::Color;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Stable, unique, upstream-assigned object identifier.
pub type ObjectId = u64;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Errors raised while validating an object's shape data.
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("{shape:?} requires at least {expected} coordinates, got {got}")]
    InsufficientPoints {
        shape: ShapeType,
        expected: usize,
        got: usize,
    },
    #[error("point array holds an odd number of coordinates: {0}")]
    OddCoordinateCount(usize),
    #[error("coordinate at index {0} is not finite")]
    NonFiniteCoordinate(usize),
    #[error("skeleton has no elements")]
    EmptySkeleton,
}

/// The shape family of an annotated object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    Rectangle,
    Polygon,
    Polyline,
    Points,
    Ellipse,
    Cuboid,
    Skeleton,
}

impl ShapeType {
    /// Minimum number of coordinates a valid point array must hold.
    /// Skeleton geometry lives in its elements, not its own points.
    pub fn min_coordinates(&self) -> usize {
        match self {
            ShapeType::Rectangle => 4,
            ShapeType::Polygon => 6,
            ShapeType::Polyline => 4,
            ShapeType::Points => 2,
            ShapeType::Ellipse => 4,
            ShapeType::Cuboid => 16,
            ShapeType::Skeleton => 0,
        }
    }

    /// Validate a flat point array against this shape family.
    pub fn validate(&self, points: &[f64]) -> Result<(), ShapeError> {
        if points.len() % 2 != 0 {
            return Err(ShapeError::OddCoordinateCount(points.len()));
        }
        if let Some(idx) = points.iter().position(|coord| !coord.is_finite()) {
            return Err(ShapeError::NonFiniteCoordinate(idx));
        }
        let expected = self.min_coordinates();
        if points.len() < expected {
            return Err(ShapeError::InsufficientPoints {
                shape: *self,
                expected,
                got: points.len(),
            });
        }
        Ok(())
    }
}

/// One attribute slot in a label's schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub id: u64,
    pub name: String,
}

/// Reference to the label an object carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRef {
    pub id: u64,
    pub name: String,
    pub color: SerializableColor,
    /// Attribute schema of the label, in display order.
    pub attributes: Vec<AttributeSpec>,
}

impl Default for LabelRef {
    fn default() -> Self {
        Self {
            id: 0,
            name: "object".to_string(),
            color: SerializableColor::black(),
            attributes: Vec::new(),
        }
    }
}

/// Reference to the group an object belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupRef {
    pub id: u64,
    pub color: SerializableColor,
}

/// Read-only view of one annotated object as owned by the upstream model.
///
/// `points` are flat `[x0, y0, x1, y1, ...]` image-space coordinates; their
/// meaning depends on `shape_type`. `updated` is the monotonic version the
/// reconciler keys on. `elements` is populated for skeletons only, each
/// element being a full object state scoped to one skeleton node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectState {
    pub client_id: ObjectId,
    pub shape_type: ShapeType,
    pub points: Vec<f64>,
    /// Rotation in degrees, `[0, 360)`.
    pub rotation: f64,
    pub label: LabelRef,
    pub group: Option<GroupRef>,
    /// Instance color as resolved by the upstream color scheme.
    pub color: SerializableColor,
    /// Attribute id -> current value.
    pub attributes: HashMap<u64, String>,
    pub descriptions: Vec<String>,
    pub occluded: bool,
    pub hidden: bool,
    pub outside: bool,
    pub lock: bool,
    pub pinned: bool,
    /// Paint order, lower values painted first.
    pub z_order: i32,
    /// Monotonic version; bumped by the upstream model on every edit.
    pub updated: u64,
    /// Owning frame index.
    pub frame: u32,
    /// Skeleton elements, empty for every other shape family.
    pub elements: Vec<ObjectState>,
}

impl ObjectState {
    /// Create an object state with default flags and metadata.
    pub fn new(client_id: ObjectId, shape_type: ShapeType, points: Vec<f64>) -> Self {
        Self {
            client_id,
            shape_type,
            points,
            rotation: 0.0,
            label: LabelRef::default(),
            group: None,
            color: SerializableColor::black(),
            attributes: HashMap::new(),
            descriptions: Vec::new(),
            occluded: false,
            hidden: false,
            outside: false,
            lock: false,
            pinned: false,
            z_order: 0,
            updated: 0,
            frame: 0,
            elements: Vec::new(),
        }
    }

    /// Validate the shape data, recursing into skeleton elements.
    pub fn validate(&self) -> Result<(), ShapeError> {
        self.shape_type.validate(&self.points)?;
        if self.shape_type == ShapeType::Skeleton {
            if self.elements.is_empty() {
                return Err(ShapeError::EmptySkeleton);
            }
            for element in &self.elements {
                element.validate()?;
            }
        }
        Ok(())
    }
}

/// Immutable snapshot of the render-relevant fields of an [`ObjectState`],
/// taken at the moment the object was last fully synchronized.
///
/// For every identifier present in the scene exactly one drawn state exists;
/// absence means the object is not currently rendered. A skeleton's drawn
/// state recursively snapshots each element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawnState {
    pub client_id: ObjectId,
    pub shape_type: ShapeType,
    pub points: Vec<f64>,
    pub rotation: f64,
    pub label: LabelRef,
    pub group: Option<GroupRef>,
    pub color: SerializableColor,
    pub attributes: HashMap<u64, String>,
    pub descriptions: Vec<String>,
    pub occluded: bool,
    pub hidden: bool,
    pub outside: bool,
    pub lock: bool,
    pub pinned: bool,
    pub z_order: i32,
    pub updated: u64,
    pub frame: u32,
    pub elements: Vec<DrawnState>,
}

impl DrawnState {
    /// Snapshot the render-relevant fields of an object state.
    pub fn capture(state: &ObjectState) -> Self {
        Self {
            client_id: state.client_id,
            shape_type: state.shape_type,
            points: state.points.clone(),
            rotation: state.rotation,
            label: state.label.clone(),
            group: state.group,
            color: state.color,
            attributes: state.attributes.clone(),
            descriptions: state.descriptions.clone(),
            occluded: state.occluded,
            hidden: state.hidden,
            outside: state.outside,
            lock: state.lock,
            pinned: state.pinned,
            z_order: state.z_order,
            updated: state.updated,
            frame: state.frame,
            elements: state.elements.iter().map(DrawnState::capture).collect(),
        }
    }
}

/// The single object (and optional attribute) currently eligible for direct
/// manipulation. At most one of each at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActiveElement {
    pub client_id: Option<ObjectId>,
    pub attribute_id: Option<u64>,
}

impl ActiveElement {
    pub fn new(client_id: ObjectId) -> Self {
        Self {
            client_id: Some(client_id),
            attribute_id: None,
        }
    }

    /// Clear both the object and attribute activation.
    pub fn clear(&mut self) {
        self.client_id = None;
        self.attribute_id = None;
    }

    pub fn is_empty(&self) -> bool {
        self.client_id.is_none()
    }
}
