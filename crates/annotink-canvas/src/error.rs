//! Canvas-level error types.

use crate::mode::Mode;
use thiserror::Error;

/// Failures surfaced by the view facade. Everything else in the core
/// resolves to a logged no-op or a cancellation event.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CanvasError {
    #[error("canvas was destroyed")]
    Destroyed,
    #[error("no {0:?} operation is in progress")]
    UnexpectedCompletion(Mode),
}
