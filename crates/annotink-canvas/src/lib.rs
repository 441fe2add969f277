//! Annotink Canvas Library
//!
//! Scene reconciliation, the interaction mode state machine, and the view
//! facade that keeps rendered primitives synchronized with the upstream
//! annotation model.

pub mod error;
pub mod events;
pub mod handlers;
pub mod mode;
pub mod reconcile;
pub mod scene;
pub mod view;

pub use error::CanvasError;
pub use events::{CanvasEvent, DrawnDetail, InteractionShape, ModelSnapshot, UpdateReason};
pub use handlers::{
    Configuration, DragCanvasData, DrawData, EditData, GestureHandler, GroupData, HandlerPayload,
    InteractionData, MergeData, NoopHandler, SelectRegionData, SplitData, ZoomCanvasData,
};
pub use mode::{Cursor, Mode, ModeChange, ModeController};
pub use reconcile::{ReconcileOutcome, Reconciler};
pub use scene::{GestureKind, GestureResult, SceneIndex, ShapeAffordances};
pub use view::{CanvasView, EditResult};
