//! Annotink Core Library
//!
//! Platform-agnostic data model and geometry for the Annotink annotation
//! canvas: authoritative object states, drawn-state snapshots, the
//! image/canvas/window transform pipeline, and scene-resident primitives.

pub mod geometry;
pub mod objects;
pub mod primitive;

pub use geometry::{direction_angle, normalize_angle, Geometry, DEFAULT_OFFSET};
pub use objects::{
    ActiveElement, AttributeSpec, DrawnState, GroupRef, LabelRef, ObjectId, ObjectState,
    SerializableColor, ShapeError, ShapeType,
};
pub use primitive::{
    label_text, recover_unrotated_points, LabelPrimitive, NodeId, PrimitiveTransform,
    RotationReset, ScenePrimitive,
};
