//! Error types for the transition lifecycle.

use std::rc::Rc;

use thiserror::Error;

use super::types::NodeId;

/// Result type for capture passes and pseudo-element style updates.
pub type CaptureResult<T> = std::result::Result<T, CaptureError>;

/// Reason a transition was skipped; carried by every rejected signal.
#[derive(Error, Debug, Clone)]
pub enum TransitionError {
    /// The scene or transition is in a state the lifecycle cannot proceed from.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Superseded by a newer transition or cancelled by the caller.
    #[error("transition aborted")]
    Aborted,

    /// The transition did not reach `done` within the configured deadline.
    #[error("transition timed out")]
    Timeout,

    /// The update callback rejected; the reason is caller-defined.
    #[error("update callback failed: {0}")]
    Callback(Rc<anyhow::Error>),
}

impl TransitionError {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Wrap a caller-defined rejection reason.
    pub fn callback(err: impl Into<anyhow::Error>) -> Self {
        Self::Callback(Rc::new(err.into()))
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

impl From<CaptureError> for TransitionError {
    fn from(err: CaptureError) -> Self {
        Self::InvalidState(err.to_string())
    }
}

/// Errors raised while capturing snapshots or synthesizing pseudo-element styles.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    /// Two rendered nodes share a transition name.
    #[error("duplicate view-transition-name `{0}`")]
    DuplicateName(String),

    /// The snapshot containing block exceeds the configured maximum.
    #[error("snapshot containing block {width}x{height} exceeds the maximum")]
    SnapshotTooLarge { width: f64, height: f64 },

    /// The capture service could not rasterize a node.
    #[error("failed to capture {node}: {message}")]
    CaptureFailed { node: NodeId, message: String },

    /// A captured new element is no longer rendered.
    #[error("captured element {0} is not rendered")]
    NotRendered(NodeId),

    /// A named element has neither an old image nor a new element.
    #[error("captured element `{0}` has neither an old image nor a new element")]
    EmptyRecord(String),
}
