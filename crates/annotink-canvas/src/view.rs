//! The view facade.
//!
//! Owns the rendered scene, the drawn-state store, the geometry snapshot,
//! and the mode machine; receives update notifications from the upstream
//! model and turns them into scene mutations and structural events. Events
//! are queued and drained by the host with [`CanvasView::poll_events`], in
//! emission order.

use crate::error::CanvasError;
use crate::events::{CanvasEvent, DrawnDetail, InteractionShape, ModelSnapshot, UpdateReason};
use crate::handlers::{Configuration, DrawData, GestureHandler, HandlerPayload};
use crate::mode::{Cursor, Mode, ModeChange, ModeController};
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::scene::SceneIndex;
use annotink_core::{ActiveElement, DrawnState, Geometry, ObjectId};
use kurbo::Vec2;
use std::collections::{HashMap, VecDeque};

/// Result payload of a finished edit gesture, in canvas space.
#[derive(Debug, Clone, PartialEq)]
pub struct EditResult {
    pub client_id: ObjectId,
    pub points: Vec<f64>,
    pub rotation: f64,
}

/// The rendered surface and its synchronization machinery.
pub struct CanvasView {
    geometry: Geometry,
    configuration: Configuration,
    scene: SceneIndex,
    reconciler: Reconciler,
    modes: ModeController,
    /// Issue region id -> flat polygon points in image space.
    issue_regions: HashMap<u64, Vec<f64>>,
    events: VecDeque<CanvasEvent>,
    destroyed: bool,
}

impl Default for CanvasView {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasView {
    pub fn new() -> Self {
        Self {
            geometry: Geometry::default(),
            configuration: Configuration::default(),
            scene: SceneIndex::new(),
            reconciler: Reconciler::new(),
            modes: ModeController::new(),
            issue_regions: HashMap::new(),
            events: VecDeque::new(),
            destroyed: false,
        }
    }

    /// Register the external handler backing a busy mode.
    pub fn set_handler(&mut self, mode: Mode, handler: Box<dyn GestureHandler>) {
        self.modes.set_handler(mode, handler);
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn scene(&self) -> &SceneIndex {
        &self.scene
    }

    pub fn mode(&self) -> Mode {
        self.modes.mode()
    }

    pub fn cursor(&self) -> Cursor {
        self.modes.cursor()
    }

    pub fn active_element(&self) -> ActiveElement {
        self.scene.active()
    }

    pub fn drawn_state(&self, id: ObjectId) -> Option<&DrawnState> {
        self.reconciler.drawn_state(id)
    }

    pub fn issue_regions(&self) -> &HashMap<u64, Vec<f64>> {
        &self.issue_regions
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Drain the queued structural events in emission order.
    pub fn poll_events(&mut self) -> Vec<CanvasEvent> {
        self.events.drain(..).collect()
    }

    fn emit(&mut self, event: CanvasEvent) {
        log::debug!("emit {}", event.name());
        self.events.push_back(event);
    }

    /// Dispatch an update notification from the upstream model.
    ///
    /// Notifications are processed synchronously and strictly in arrival
    /// order. After destruction every notification is rejected.
    pub fn notify(
        &mut self,
        reason: UpdateReason,
        snapshot: &ModelSnapshot,
    ) -> Result<(), CanvasError> {
        if self.destroyed {
            return Err(CanvasError::Destroyed);
        }
        match reason {
            UpdateReason::ImageChanged => {
                self.set_geometry(snapshot.geometry.clone());
                let outcome =
                    self.reconciler
                        .reconcile(&snapshot.objects, &mut self.scene, &self.geometry);
                self.emit_reactivation(&outcome);
                self.emit(CanvasEvent::Setup);
            }
            UpdateReason::ImageZoomed => {
                self.set_geometry(snapshot.geometry.clone());
            }
            UpdateReason::ImageMoved => {
                self.set_geometry(snapshot.geometry.clone());
                self.emit(CanvasEvent::Moved);
            }
            UpdateReason::ImageFitted => {
                self.set_geometry(snapshot.geometry.clone());
                self.emit(CanvasEvent::Fit);
            }
            UpdateReason::FittedCanvas => {
                self.set_geometry(snapshot.geometry.clone());
                self.emit(CanvasEvent::Reshape);
            }
            UpdateReason::GridUpdated => {
                self.set_geometry(snapshot.geometry.clone());
            }
            UpdateReason::SetZLayer => {
                self.scene.set_z_layer(snapshot.z_layer);
            }
            UpdateReason::ObjectsUpdated => {
                let outcome =
                    self.reconciler
                        .reconcile(&snapshot.objects, &mut self.scene, &self.geometry);
                self.emit_reactivation(&outcome);
            }
            UpdateReason::ShapeActivated => {
                self.apply_activation(snapshot.active_element);
            }
            UpdateReason::IssueRegionsUpdated => {
                self.issue_regions = snapshot.issue_regions.clone();
            }
            UpdateReason::BitmapChanged => {
                log::debug!(
                    "bitmap overlay {} handled by the rasterization layer",
                    if snapshot.bitmap { "on," } else { "off," }
                );
            }
            UpdateReason::ConfigUpdated => {
                self.configuration = snapshot.configuration.clone();
                self.modes.configure_all(&self.configuration);
                self.scene
                    .set_labels_always_visible(self.configuration.display_all_text);
            }
            UpdateReason::Draw => match &snapshot.draw_data {
                Some(data) => self.mode_update(Mode::Draw, HandlerPayload::Draw(data.clone())),
                None => log::warn!("draw notification without draw data"),
            },
            UpdateReason::Edit => match &snapshot.edit_data {
                Some(data) => self.mode_update(Mode::Edit, HandlerPayload::Edit(data.clone())),
                None => log::warn!("edit notification without edit data"),
            },
            UpdateReason::Merge => match &snapshot.merge_data {
                Some(data) => self.mode_update(Mode::Merge, HandlerPayload::Merge(data.clone())),
                None => log::warn!("merge notification without merge data"),
            },
            UpdateReason::Split => match &snapshot.split_data {
                Some(data) => self.mode_update(Mode::Split, HandlerPayload::Split(data.clone())),
                None => log::warn!("split notification without split data"),
            },
            UpdateReason::Group => match &snapshot.group_data {
                Some(data) => self.mode_update(Mode::Group, HandlerPayload::Group(data.clone())),
                None => log::warn!("group notification without group data"),
            },
            UpdateReason::Interact => match &snapshot.interaction_data {
                Some(data) => {
                    self.mode_update(Mode::Interact, HandlerPayload::Interact(data.clone()));
                }
                None => log::warn!("interact notification without interaction data"),
            },
            UpdateReason::SelectRegion => match &snapshot.select_region_data {
                Some(data) => {
                    self.mode_update(
                        Mode::SelectRegion,
                        HandlerPayload::SelectRegion(data.clone()),
                    );
                }
                None => log::warn!("region selection notification without data"),
            },
            UpdateReason::DragCanvas => match &snapshot.drag_canvas_data {
                Some(data) => {
                    self.mode_update(Mode::DragCanvas, HandlerPayload::DragCanvas(data.clone()));
                }
                None => log::warn!("canvas drag notification without data"),
            },
            UpdateReason::ZoomCanvas => match &snapshot.zoom_canvas_data {
                Some(data) => {
                    self.mode_update(Mode::ZoomCanvas, HandlerPayload::ZoomCanvas(data.clone()));
                }
                None => log::warn!("canvas zoom notification without data"),
            },
            UpdateReason::Select => {
                self.apply_selection(snapshot);
            }
            UpdateReason::Cancel => {
                self.cancel_active();
            }
            UpdateReason::DataFailed => {
                // Surfaced verbatim; retry policy belongs upstream.
                let message = snapshot
                    .exception
                    .clone()
                    .unwrap_or_else(|| "unknown data failure".to_string());
                self.emit(CanvasEvent::Error { message });
            }
            UpdateReason::Destroy => {
                self.modes.cancel();
                self.destroyed = true;
                self.emit(CanvasEvent::Destroy);
            }
        }
        Ok(())
    }

    fn set_geometry(&mut self, geometry: Geometry) {
        // Replaced wholesale so readers never observe a torn geometry.
        self.geometry = geometry;
        self.modes.transform_all(&self.geometry);
    }

    fn emit_reactivation(&mut self, outcome: &ReconcileOutcome) {
        if let Some(active) = outcome.reactivated {
            if let Some(client_id) = active.client_id {
                self.emit(CanvasEvent::Activated {
                    client_id,
                    attribute_id: active.attribute_id,
                });
            }
        }
    }

    fn mode_update(&mut self, target: Mode, payload: HandlerPayload) {
        let change = self.modes.update(target, &payload);
        match (target, change) {
            (Mode::DragCanvas, ModeChange::Entered) => self.emit(CanvasEvent::DragStart),
            (Mode::DragCanvas, ModeChange::Exited) => self.emit(CanvasEvent::DragStop),
            (Mode::ZoomCanvas, ModeChange::Entered) => self.emit(CanvasEvent::ZoomStart),
            (Mode::ZoomCanvas, ModeChange::Exited) => self.emit(CanvasEvent::ZoomStop),
            _ => {}
        }
    }

    fn apply_activation(&mut self, requested: ActiveElement) {
        match requested.client_id {
            None => {
                self.scene.deactivate();
            }
            Some(id) => {
                if self.modes.mode().is_busy() {
                    log::debug!("activation of {id} ignored while {:?} is active", self.mode());
                    return;
                }
                if let Some(active) = self.scene.activate(id, requested.attribute_id) {
                    self.emit(CanvasEvent::Activated {
                        client_id: id,
                        attribute_id: active.attribute_id,
                    });
                }
            }
        }
    }

    fn apply_selection(&mut self, snapshot: &ModelSnapshot) {
        let Some(id) = snapshot.selected else {
            return;
        };
        if self.modes.mode().has_handler() {
            // A busy handler picks its targets through select follow-ups.
            match snapshot.objects.iter().find(|state| state.client_id == id) {
                Some(state) => {
                    self.modes.forward(&HandlerPayload::Select(state.clone()));
                }
                None => log::warn!("selected object {id} missing from snapshot"),
            }
        } else {
            self.emit(CanvasEvent::Find { client_id: id });
        }
    }

    fn cancel_active(&mut self) {
        match self.modes.mode() {
            Mode::Idle => {}
            Mode::Drag | Mode::Resize => {
                self.scene.cancel_gesture();
                self.modes.end_gesture();
                self.emit(CanvasEvent::Canceled);
            }
            _ => {
                self.modes.cancel();
                self.emit(CanvasEvent::Canceled);
            }
        }
    }

    fn ensure_mode(&self, expected: Mode) -> Result<(), CanvasError> {
        if self.destroyed {
            return Err(CanvasError::Destroyed);
        }
        if self.modes.mode() != expected {
            log::warn!(
                "completion for {expected:?} arrived while {:?} is active",
                self.modes.mode()
            );
            return Err(CanvasError::UnexpectedCompletion(expected));
        }
        Ok(())
    }

    /// Completion callback of the draw handler.
    ///
    /// `detail.points` arrive in canvas space and are translated to image
    /// space before the event is emitted. A `None` result is a user
    /// cancellation. Unless the handler holds the continuation flag for a
    /// multi-shape session, the mode returns to `Idle` and the handler
    /// receives its disable notification.
    pub fn on_draw_done(
        &mut self,
        result: Option<DrawnDetail>,
        continue_session: bool,
    ) -> Result<(), CanvasError> {
        self.ensure_mode(Mode::Draw)?;
        match result {
            Some(mut detail) => {
                detail.points = self.geometry.from_canvas(&detail.points);
                self.emit(CanvasEvent::Drawn { detail });
                if !continue_session {
                    self.finish_draw_session();
                }
            }
            None => {
                self.emit(CanvasEvent::Canceled);
                self.finish_draw_session();
            }
        }
        Ok(())
    }

    fn finish_draw_session(&mut self) {
        self.modes.finish();
        self.modes
            .notify_handler(Mode::Draw, &HandlerPayload::Draw(DrawData::disabled()));
    }

    /// Completion callback of the edit handler. Points arrive in canvas
    /// space.
    pub fn on_edit_done(
        &mut self,
        result: Option<EditResult>,
        duration_ms: u64,
    ) -> Result<(), CanvasError> {
        self.ensure_mode(Mode::Edit)?;
        match result {
            Some(edit) => {
                let points = self.geometry.from_canvas(&edit.points);
                self.emit(CanvasEvent::Edited {
                    client_id: edit.client_id,
                    points,
                    rotation: edit.rotation,
                    duration_ms,
                });
            }
            None => self.emit(CanvasEvent::Canceled),
        }
        self.modes.finish();
        Ok(())
    }

    /// Completion callback of the merge handler.
    pub fn on_merge_done(
        &mut self,
        result: Option<Vec<ObjectId>>,
        duration_ms: u64,
    ) -> Result<(), CanvasError> {
        self.ensure_mode(Mode::Merge)?;
        match result {
            Some(client_ids) => self.emit(CanvasEvent::Merged {
                client_ids,
                duration_ms,
            }),
            None => self.emit(CanvasEvent::Canceled),
        }
        self.modes.finish();
        Ok(())
    }

    /// Completion callback of the split handler.
    pub fn on_split_done(
        &mut self,
        result: Option<(ObjectId, u32)>,
        duration_ms: u64,
    ) -> Result<(), CanvasError> {
        self.ensure_mode(Mode::Split)?;
        match result {
            Some((client_id, frame)) => self.emit(CanvasEvent::Splitted {
                client_id,
                frame,
                duration_ms,
            }),
            None => self.emit(CanvasEvent::Canceled),
        }
        self.modes.finish();
        Ok(())
    }

    /// Completion callback of the group handler.
    pub fn on_group_done(
        &mut self,
        result: Option<Vec<ObjectId>>,
        duration_ms: u64,
    ) -> Result<(), CanvasError> {
        self.ensure_mode(Mode::Group)?;
        match result {
            Some(client_ids) => self.emit(CanvasEvent::Groupped {
                client_ids,
                duration_ms,
            }),
            None => self.emit(CanvasEvent::Canceled),
        }
        self.modes.finish();
        Ok(())
    }

    /// Completion callback of the region-select handler. Points arrive in
    /// canvas space.
    pub fn on_region_selected(&mut self, result: Option<Vec<f64>>) -> Result<(), CanvasError> {
        self.ensure_mode(Mode::SelectRegion)?;
        match result {
            Some(points) => {
                let points = self.geometry.from_canvas(&points);
                self.emit(CanvasEvent::RegionSelected { points });
            }
            None => self.emit(CanvasEvent::Canceled),
        }
        self.modes.finish();
        Ok(())
    }

    /// Completion callback of the interactor. Intermediate results keep the
    /// mode busy; `is_done` (or a `None` cancellation) returns it to `Idle`.
    pub fn on_interaction(
        &mut self,
        result: Option<Vec<InteractionShape>>,
        is_done: bool,
    ) -> Result<(), CanvasError> {
        self.ensure_mode(Mode::Interact)?;
        match result {
            Some(shapes) => {
                let shapes = shapes
                    .into_iter()
                    .map(|shape| InteractionShape {
                        shape_type: shape.shape_type,
                        points: self.geometry.from_canvas(&shape.points),
                    })
                    .collect();
                self.emit(CanvasEvent::Interacted { shapes, is_done });
                if is_done {
                    self.modes.finish();
                }
            }
            None => {
                self.emit(CanvasEvent::Canceled);
                self.modes.finish();
            }
        }
        Ok(())
    }

    /// Start dragging the active shape. Enters the transient `Drag` mode.
    pub fn begin_shape_drag(&mut self, client_id: ObjectId) -> bool {
        if self.destroyed || self.modes.mode() != Mode::Idle {
            return false;
        }
        if !self.scene.begin_drag(client_id) {
            return false;
        }
        self.modes.begin_gesture(Mode::Drag)
    }

    /// Shift the dragged shape by a canvas-space delta.
    pub fn drag_shape_by(&mut self, delta: Vec2) -> bool {
        self.modes.mode() == Mode::Drag && self.scene.drag_by(delta)
    }

    /// Complete the drag gesture, emitting `canvas.dragshape` with the final
    /// image-space points and returning to `Idle`.
    pub fn finish_shape_drag(&mut self, duration_ms: u64) -> bool {
        let Some(result) = self.scene.finish_drag() else {
            return false;
        };
        self.modes.end_gesture();
        let points = self.geometry.from_canvas(&result.points);
        self.emit(CanvasEvent::ShapeDragged {
            client_id: result.client_id,
            points,
            duration_ms,
        });
        true
    }

    /// Start resizing the active shape. Enters the transient `Resize` mode.
    pub fn begin_shape_resize(&mut self, client_id: ObjectId) -> bool {
        if self.destroyed || self.modes.mode() != Mode::Idle {
            return false;
        }
        if !self.scene.begin_resize(client_id) {
            return false;
        }
        self.modes.begin_gesture(Mode::Resize)
    }

    /// Rewrite the resized shape's canvas-space geometry.
    pub fn resize_shape_to(&mut self, points: &[f64]) -> bool {
        self.modes.mode() == Mode::Resize && self.scene.resize_to(points)
    }

    /// Complete the resize gesture, emitting `canvas.resizeshape` with the
    /// final image-space points and returning to `Idle`.
    pub fn finish_shape_resize(&mut self, duration_ms: u64) -> bool {
        let Some(result) = self.scene.finish_resize() else {
            return false;
        };
        self.modes.end_gesture();
        let points = self.geometry.from_canvas(&result.points);
        self.emit(CanvasEvent::ShapeResized {
            client_id: result.client_id,
            points,
            duration_ms,
        });
        true
    }

    /// Abort a running drag/resize gesture: the shape snaps back to its
    /// pre-gesture geometry and the mode returns to `Idle`.
    pub fn cancel_shape_gesture(&mut self) -> bool {
        if self.scene.cancel_gesture().is_none() {
            return false;
        }
        self.modes.end_gesture();
        self.emit(CanvasEvent::Canceled);
        true
    }

    /// Report a pointer click on a rendered shape.
    pub fn click_shape(&mut self, client_id: ObjectId) -> bool {
        if !self.scene.contains(client_id) {
            return false;
        }
        self.emit(CanvasEvent::Clicked { client_id });
        true
    }
}
