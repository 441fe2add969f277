//! Update notifications in, structural canvas events out.

use crate::handlers::{
    Configuration, DragCanvasData, DrawData, EditData, GroupData, InteractionData, MergeData,
    SelectRegionData, SplitData, ZoomCanvasData,
};
use annotink_core::{ActiveElement, Geometry, ObjectId, ObjectState, ShapeType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Why the upstream model notified the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateReason {
    ImageChanged,
    ImageZoomed,
    ImageFitted,
    ImageMoved,
    FittedCanvas,
    GridUpdated,
    SetZLayer,
    ObjectsUpdated,
    ShapeActivated,
    IssueRegionsUpdated,
    BitmapChanged,
    ConfigUpdated,
    Draw,
    Edit,
    Merge,
    Split,
    Group,
    Interact,
    SelectRegion,
    Select,
    DragCanvas,
    ZoomCanvas,
    Cancel,
    DataFailed,
    Destroy,
}

/// The model state accompanying an update notification.
///
/// Only the parts relevant to the notification's reason are read; the rest
/// may carry stale values. The list of objects is always fully formed
/// (partial delivery is not modeled).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub configuration: Configuration,
    pub geometry: Geometry,
    pub objects: Vec<ObjectState>,
    pub active_element: ActiveElement,
    /// Topmost z-layer to paint, when layer filtering is on.
    pub z_layer: Option<i32>,
    pub draw_data: Option<DrawData>,
    pub edit_data: Option<EditData>,
    pub merge_data: Option<MergeData>,
    pub split_data: Option<SplitData>,
    pub group_data: Option<GroupData>,
    pub interaction_data: Option<InteractionData>,
    pub select_region_data: Option<SelectRegionData>,
    pub zoom_canvas_data: Option<ZoomCanvasData>,
    pub drag_canvas_data: Option<DragCanvasData>,
    /// Object resolved by a `Select` notification.
    pub selected: Option<ObjectId>,
    /// Whether the bitmap mask overlay is on. The rasterization itself is
    /// owned by the excluded bitmap layer.
    pub bitmap: bool,
    /// Issue region id -> flat polygon points in image space.
    pub issue_regions: HashMap<u64, Vec<f64>>,
    /// Failure detail accompanying `DataFailed`.
    pub exception: Option<String>,
}

/// Detail of a completed drawing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawnDetail {
    pub shape_type: ShapeType,
    /// Resulting points in image space.
    pub points: Vec<f64>,
    pub rotation: f64,
    pub label_id: Option<u64>,
    pub duration_ms: u64,
}

/// One shape produced by an interactor session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionShape {
    pub shape_type: ShapeType,
    /// Points in image space.
    pub points: Vec<f64>,
}

/// Structural events raised on the rendering surface's host.
///
/// `name` returns the wire name the host dispatches the event under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanvasEvent {
    Setup,
    Fit,
    Reshape,
    Moved,
    ZoomStart,
    ZoomStop,
    DragStart,
    DragStop,
    Drawn {
        detail: DrawnDetail,
    },
    Edited {
        client_id: ObjectId,
        points: Vec<f64>,
        rotation: f64,
        duration_ms: u64,
    },
    Merged {
        client_ids: Vec<ObjectId>,
        duration_ms: u64,
    },
    Splitted {
        client_id: ObjectId,
        frame: u32,
        duration_ms: u64,
    },
    Groupped {
        client_ids: Vec<ObjectId>,
        duration_ms: u64,
    },
    RegionSelected {
        points: Vec<f64>,
    },
    Interacted {
        shapes: Vec<InteractionShape>,
        is_done: bool,
    },
    Canceled,
    Activated {
        client_id: ObjectId,
        attribute_id: Option<u64>,
    },
    Clicked {
        client_id: ObjectId,
    },
    Find {
        client_id: ObjectId,
    },
    ShapeDragged {
        client_id: ObjectId,
        points: Vec<f64>,
        duration_ms: u64,
    },
    ShapeResized {
        client_id: ObjectId,
        points: Vec<f64>,
        duration_ms: u64,
    },
    Error {
        message: String,
    },
    Destroy,
}

impl CanvasEvent {
    /// Serialize the event detail for host dispatch.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// The dotted wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            CanvasEvent::Setup => "canvas.setup",
            CanvasEvent::Fit => "canvas.fit",
            CanvasEvent::Reshape => "canvas.reshape",
            CanvasEvent::Moved => "canvas.moved",
            CanvasEvent::ZoomStart => "canvas.zoomstart",
            CanvasEvent::ZoomStop => "canvas.zoomstop",
            CanvasEvent::DragStart => "canvas.dragstart",
            CanvasEvent::DragStop => "canvas.dragstop",
            CanvasEvent::Drawn { .. } => "canvas.drawn",
            CanvasEvent::Edited { .. } => "canvas.edited",
            CanvasEvent::Merged { .. } => "canvas.merged",
            CanvasEvent::Splitted { .. } => "canvas.splitted",
            CanvasEvent::Groupped { .. } => "canvas.groupped",
            CanvasEvent::RegionSelected { .. } => "canvas.regionselected",
            CanvasEvent::Interacted { .. } => "canvas.interacted",
            CanvasEvent::Canceled => "canvas.canceled",
            CanvasEvent::Activated { .. } => "canvas.activated",
            CanvasEvent::Clicked { .. } => "canvas.clicked",
            CanvasEvent::Find { .. } => "canvas.find",
            CanvasEvent::ShapeDragged { .. } => "canvas.dragshape",
            CanvasEvent::ShapeResized { .. } => "canvas.resizeshape",
            CanvasEvent::Error { .. } => "canvas.error",
            CanvasEvent::Destroy => "canvas.destroy",
        }
    }
}
