#![forbid(unsafe_code)]

//! Errors raised by document operations.

use crate::dom::NodeId;

/// Failure of a [`Document`](crate::dom::Document) operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// The handle does not belong to this document.
    #[error("node {0} does not belong to this document")]
    UnknownNode(NodeId),

    /// The operation needs an element but got a text node.
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    /// Inserting the child would make a node its own ancestor.
    #[error("cannot insert node {child} under {parent}")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    /// The node is detached, hidden, disabled, or has no tab index.
    #[error("node {0} cannot receive focus")]
    NotFocusable(NodeId),
}
