#![forbid(unsafe_code)]

//! Errors surfaced by trap construction and registry operations.

use ftrap_core::{DomError, NodeId};

/// Failure of a trap, dialog, or helper operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TrapError {
    /// The container is not an element of the document.
    #[error("Focus trap requires a valid container element")]
    InvalidContainer,

    /// No trap is registered for this container.
    #[error("no focus trap registered for container {0}")]
    UnknownTrap(NodeId),

    /// The handle does not name a dialog, guard, lock, or ring on this page.
    #[error("unknown handle {0}")]
    UnknownHandle(usize),

    /// The container is the overlay of a dialog, which manages its own trap.
    #[error("container {0} belongs to a dialog")]
    DialogContainer(NodeId),

    /// A document operation failed.
    #[error(transparent)]
    Dom(#[from] DomError),
}
