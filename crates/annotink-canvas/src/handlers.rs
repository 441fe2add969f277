//! Contracts for the external gesture handlers.
//!
//! The concrete draw/edit/merge/split/group/zoom/region-select/interact
//! implementations live outside this crate; the mode machine only ever talks
//! to them through this narrow interface.

use annotink_core::{Geometry, ObjectId, ObjectState, ShapeType};
use serde::{Deserialize, Serialize};

/// View configuration shared with every handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Show label text for every object, not only the active one.
    pub display_all_text: bool,
    /// Show cuboid projection lines.
    pub show_projections: bool,
    /// Label text size in canvas units.
    pub text_font_size: f64,
    /// Placeholder rendered for attributes without a value.
    pub undefined_attr_value: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            display_all_text: false,
            show_projections: false,
            text_font_size: 12.0,
            undefined_attr_value: "__undefined__".to_string(),
        }
    }
}

/// Payload of a draw-mode notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawData {
    pub enabled: bool,
    pub shape_type: Option<ShapeType>,
    /// Fixed number of points for polyshapes, if requested.
    pub number_of_points: Option<usize>,
    /// Existing state to redraw instead of drawing from scratch.
    pub initial_state: Option<ObjectState>,
    pub crosshair: bool,
    /// Keep the handler active after a completed shape for a multi-shape
    /// drawing session.
    pub continue_session: bool,
}

impl DrawData {
    /// The disable payload sent after a finished drawing session.
    pub fn disabled() -> Self {
        Self::default()
    }
}

/// Payload of an edit-mode notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditData {
    pub enabled: bool,
    pub client_id: Option<ObjectId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeData {
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitData {
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupData {
    pub enabled: bool,
    /// Clear group membership instead of creating a new group.
    pub reset_group: bool,
}

/// Payload of an interactor (semi-automatic annotation) notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionData {
    pub enabled: bool,
    pub shape_type: Option<ShapeType>,
    /// Minimum number of positive points before intermediate results fire.
    pub min_positive_points: usize,
    pub crosshair: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectRegionData {
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoomCanvasData {
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DragCanvasData {
    pub enabled: bool,
}

/// The per-family payload forwarded through a handler's mode-entry call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HandlerPayload {
    Draw(DrawData),
    Edit(EditData),
    Merge(MergeData),
    Split(SplitData),
    Group(GroupData),
    Interact(InteractionData),
    SelectRegion(SelectRegionData),
    ZoomCanvas(ZoomCanvasData),
    DragCanvas(DragCanvasData),
    /// Follow-up forwarded to the active handler when the user selects an
    /// object while the mode is busy (merge/split/group pick targets this
    /// way).
    Select(ObjectState),
}

impl HandlerPayload {
    /// Whether this payload enables (or continues) its interaction family.
    pub fn enabled(&self) -> bool {
        match self {
            HandlerPayload::Draw(data) => data.enabled,
            HandlerPayload::Edit(data) => data.enabled,
            HandlerPayload::Merge(data) => data.enabled,
            HandlerPayload::Split(data) => data.enabled,
            HandlerPayload::Group(data) => data.enabled,
            HandlerPayload::Interact(data) => data.enabled,
            HandlerPayload::SelectRegion(data) => data.enabled,
            HandlerPayload::ZoomCanvas(data) => data.enabled,
            HandlerPayload::DragCanvas(data) => data.enabled,
            HandlerPayload::Select(_) => true,
        }
    }
}

/// The contract every external gesture handler honors.
///
/// All calls are synchronous; `cancel` must release any affordances the
/// handler installed (listeners, temporary primitives) before it returns.
pub trait GestureHandler {
    /// Push a configuration change to the handler.
    fn configure(&mut self, configuration: &Configuration);

    /// Push a view-transform change to the handler.
    fn transform(&mut self, geometry: &Geometry);

    /// Mode entry and same-family follow-up notifications.
    fn enable(&mut self, payload: &HandlerPayload);

    /// Cooperative cancellation; must clean up synchronously.
    fn cancel(&mut self);
}

/// A handler that ignores everything. Useful as a placeholder for modes a
/// host does not wire up.
#[derive(Debug, Default)]
pub struct NoopHandler;

impl GestureHandler for NoopHandler {
    fn configure(&mut self, _configuration: &Configuration) {}
    fn transform(&mut self, _geometry: &Geometry) {}
    fn enable(&mut self, _payload: &HandlerPayload) {}
    fn cancel(&mut self) {}
}
