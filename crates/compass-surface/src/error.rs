//! Surface error types.

use crate::node::NodeId;

/// Unified error type for UI surface operations.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    /// The referenced node no longer exists on the page.
    #[error("node not found: {id}")]
    NodeNotFound { id: NodeId },

    /// The node exists but cannot receive the requested interaction.
    #[error("node {id} is not interactable: {reason}")]
    NotInteractable { id: NodeId, reason: String },

    /// There is no further history entry in the requested direction.
    #[error("no history entry to navigate {direction}")]
    NoHistoryEntry { direction: &'static str },

    /// Catch-all for backend-specific failures.
    #[error("surface backend error: {0}")]
    Backend(String),
}

/// Convenience alias used throughout the surface crate.
pub type Result<T> = std::result::Result<T, SurfaceError>;
