//! Error Types
//!
//! Graph-structural failures (cycles) are fatal for the read that hit them.
//! Reaction failures during a scheduled flush are isolated per reaction and
//! only reported. Resource producer failures never show up here at all: they
//! are captured into the resource's own error cell.

use thiserror::Error;

use crate::graph::NodeId;

/// Errors raised by the reactive runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A derivation was read while it was still evaluating, directly or
    /// through a chain of other derivations. `path` starts at the first
    /// evaluation of the re-entered node and ends with the re-entry.
    #[error("cyclic derivation evaluation: {}", render_path(.path))]
    CyclicEvaluation { path: Vec<NodeId> },

    /// A reaction body panicked during a scheduled run.
    #[error("reaction {id} panicked: {message}")]
    ReactionPanicked { id: NodeId, message: String },

    /// A strict scoped context was read with no provider on its stack.
    #[error("no provider found for strict context `{name}`")]
    MissingProvider { name: &'static str },
}

/// Result alias used throughout the crate.
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;

fn render_path(path: &[NodeId]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Best-effort extraction of a human readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(err) = payload.downcast_ref::<ReactiveError>() {
        err.to_string()
    } else if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
