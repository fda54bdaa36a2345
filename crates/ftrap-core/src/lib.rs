#![forbid(unsafe_code)]

//! Core: headless document, input events, and focusable-element queries.
//!
//! # Role in ftrap
//! `ftrap-core` is the document layer. It owns the element arena, computed
//! visibility, the focused element, listener registration, and the queue of
//! focus events that focus changes produce.
//!
//! # Primary responsibilities
//! - **Document**: tree mutation, attributes, class list, style, bounds.
//! - **Event**: key events and routed DOM events with `preventDefault`.
//! - **Focusable query**: which elements take part in Tab navigation.
//!
//! # How it fits in the system
//! `ftrap-focus` builds traps, dialogs and focus helpers on top of the
//! [`dom::Document`], and its `Page` runtime drives event dispatch. Nothing
//! here knows about traps.

pub mod dom;
pub mod error;
pub mod event;
pub mod focusable;
pub mod geometry;

pub use dom::{
    Display, Document, Listener, ListenerId, ListenerTarget, NodeId, NodeKind, OwnerId, Visibility,
};
pub use error::DomError;
pub use event::{DomEvent, EventKind, EventType, KeyCode, KeyEvent, Modifiers};
pub use geometry::Rect;
