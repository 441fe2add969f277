//! Interaction mode state machine.
//!
//! Exactly one [`Mode`] holds at any instant. The controller is the single
//! writer; everything else reads it through the view facade. Busy modes are
//! entered only from `Idle` and left only through cancellation or a
//! completion callback, so modes never stack.

use crate::handlers::{Configuration, GestureHandler, HandlerPayload};
use annotink_core::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The interaction family currently governing user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Idle,
    Drag,
    Resize,
    Draw,
    Edit,
    Merge,
    Split,
    Group,
    DragCanvas,
    ZoomCanvas,
    Interact,
    SelectRegion,
}

impl Mode {
    /// Anything but `Idle` is busy.
    pub fn is_busy(self) -> bool {
        self != Mode::Idle
    }

    /// Whether this mode is backed by an external gesture handler.
    /// `Drag`/`Resize` are transient sub-modes owned by the scene index.
    pub fn has_handler(self) -> bool {
        !matches!(self, Mode::Idle | Mode::Drag | Mode::Resize)
    }

    /// The cursor the host should show while this mode is active.
    pub fn cursor(self) -> Cursor {
        match self {
            Mode::Idle => Cursor::Default,
            Mode::Drag | Mode::DragCanvas => Cursor::Grabbing,
            Mode::Resize => Cursor::Resize,
            Mode::Draw | Mode::Edit | Mode::Interact | Mode::SelectRegion => Cursor::Crosshair,
            Mode::Merge | Mode::Split | Mode::Group => Cursor::Pointer,
            Mode::ZoomCanvas => Cursor::ZoomIn,
        }
    }
}

/// Cursor affordance for the current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Cursor {
    #[default]
    Default,
    Crosshair,
    Pointer,
    Grabbing,
    ZoomIn,
    Resize,
}

/// What a routed notification did to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChange {
    /// A busy mode was entered from `Idle`.
    Entered,
    /// A same-family follow-up was forwarded to the active handler.
    Forwarded,
    /// The active mode was disabled and the machine returned to `Idle`.
    Exited,
    /// The notification violated the single-mode invariant and was dropped.
    Ignored,
}

/// Owns the current mode and the registry of external gesture handlers.
pub struct ModeController {
    mode: Mode,
    handlers: HashMap<Mode, Box<dyn GestureHandler>>,
}

impl Default for ModeController {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeController {
    pub fn new() -> Self {
        Self {
            mode: Mode::Idle,
            handlers: HashMap::new(),
        }
    }

    /// Register the external handler for a busy mode.
    pub fn set_handler(&mut self, mode: Mode, handler: Box<dyn GestureHandler>) {
        if !mode.has_handler() {
            log::warn!("mode {mode:?} takes no handler, registration dropped");
            return;
        }
        self.handlers.insert(mode, handler);
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn cursor(&self) -> Cursor {
        self.mode.cursor()
    }

    /// Push a configuration change to every registered handler.
    pub fn configure_all(&mut self, configuration: &Configuration) {
        for handler in self.handlers.values_mut() {
            handler.configure(configuration);
        }
    }

    /// Push a view-transform change to every registered handler.
    pub fn transform_all(&mut self, geometry: &Geometry) {
        for handler in self.handlers.values_mut() {
            handler.transform(geometry);
        }
    }

    /// Route an `(enabled, data)` notification for the given family.
    pub fn update(&mut self, target: Mode, payload: &HandlerPayload) -> ModeChange {
        debug_assert!(target.has_handler());
        if payload.enabled() {
            if self.mode == Mode::Idle {
                match self.handlers.get_mut(&target) {
                    Some(handler) => {
                        handler.enable(payload);
                        self.mode = target;
                        ModeChange::Entered
                    }
                    None => {
                        log::warn!("no handler registered for {target:?}");
                        ModeChange::Ignored
                    }
                }
            } else if self.mode == target {
                if let Some(handler) = self.handlers.get_mut(&target) {
                    handler.enable(payload);
                }
                ModeChange::Forwarded
            } else {
                log::warn!(
                    "ignoring {target:?} notification while {:?} is active",
                    self.mode
                );
                ModeChange::Ignored
            }
        } else if self.mode == target {
            if let Some(handler) = self.handlers.get_mut(&target) {
                handler.enable(payload);
            }
            self.mode = Mode::Idle;
            ModeChange::Exited
        } else {
            log::debug!("dropping disable for inactive {target:?}");
            ModeChange::Ignored
        }
    }

    /// Forward a follow-up (e.g. an object selection) to the active handler.
    /// Returns false when no busy handler mode is active.
    pub fn forward(&mut self, payload: &HandlerPayload) -> bool {
        if !self.mode.has_handler() {
            return false;
        }
        match self.handlers.get_mut(&self.mode) {
            Some(handler) => {
                handler.enable(payload);
                true
            }
            None => false,
        }
    }

    /// Cancel the active busy mode. The handler releases its affordances
    /// synchronously before the transition back to `Idle`. Returns the mode
    /// that was cancelled, if any.
    pub fn cancel(&mut self) -> Option<Mode> {
        if self.mode == Mode::Idle {
            return None;
        }
        let previous = self.mode;
        if let Some(handler) = self.handlers.get_mut(&previous) {
            handler.cancel();
        }
        self.mode = Mode::Idle;
        Some(previous)
    }

    /// Return to `Idle` after a completion callback. Returns the mode that
    /// finished.
    pub fn finish(&mut self) -> Mode {
        let previous = self.mode;
        self.mode = Mode::Idle;
        previous
    }

    /// Enter a transient gesture sub-mode (`Drag`/`Resize`). Only permitted
    /// from `Idle`; gestures never nest inside a busy mode.
    pub fn begin_gesture(&mut self, gesture: Mode) -> bool {
        debug_assert!(matches!(gesture, Mode::Drag | Mode::Resize));
        if self.mode != Mode::Idle {
            log::warn!("gesture {gesture:?} rejected while {:?} is active", self.mode);
            return false;
        }
        self.mode = gesture;
        true
    }

    /// Leave a transient gesture sub-mode.
    pub fn end_gesture(&mut self) {
        if matches!(self.mode, Mode::Drag | Mode::Resize) {
            self.mode = Mode::Idle;
        }
    }

    /// Send a payload straight to a handler without touching the mode. Used
    /// to issue the disable notification after a finished drawing session.
    pub fn notify_handler(&mut self, mode: Mode, payload: &HandlerPayload) {
        if let Some(handler) = self.handlers.get_mut(&mode) {
            handler.enable(payload);
        }
    }
}
