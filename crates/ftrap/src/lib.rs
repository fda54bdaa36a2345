#![forbid(unsafe_code)]

//! ftrap public facade crate.
//!
//! This crate provides the stable surface area for users. It re-exports the
//! document model from `ftrap-core` and the focus traps, helpers and dialogs
//! from `ftrap-focus`, and offers a prelude for day-to-day usage.
//!
//! ```
//! use ftrap::prelude::*;
//!
//! let mut page = Page::new();
//! let doc = page.doc_mut();
//! let body = doc.body();
//! let dialog = doc.create_element("div");
//! doc.append_child(body, dialog).unwrap();
//! let ok = doc.create_element("button");
//! doc.append_child(dialog, ok).unwrap();
//!
//! page.create_trap(dialog, TrapOptions::default()).unwrap();
//! page.activate_trap(dialog).unwrap();
//! assert_eq!(page.active_element(), ok);
//!
//! page.press_key(KeyEvent::escape());
//! assert!(!page.traps().is_trapped());
//! ```

// --- Core re-exports -------------------------------------------------------

pub use ftrap_core::focusable::{
    document_focus_order, focusable_elements, is_focusable, is_programmatically_focusable,
    tab_index,
};
pub use ftrap_core::{
    Display, Document, DomError, DomEvent, EventKind, EventType, KeyCode, KeyEvent, ListenerId,
    ListenerTarget, Modifiers, NodeId, OwnerId, Rect, Visibility,
};

// --- Focus re-exports ------------------------------------------------------

pub use ftrap_focus::page::MAX_EVENTS_PER_FLUSH;
pub use ftrap_focus::{
    DialogId, DialogOptions, DialogPhase, DrawerOptions, DrawerTrap, FocusGuard, FocusLock,
    FocusRing, FocusRingOptions, FocusTrap, GuardId, LockId, ModalDialog, ModalOptions, ModalTrap,
    Page, RingId, Trap, TrapCallback, TrapError, TrapHooks, TrapOptions, TrapRegistry, TrapSignal,
    TrapState,
};

/// Standard result type for ftrap APIs.
pub type Result<T> = std::result::Result<T, TrapError>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        DialogOptions, Document, DrawerOptions, KeyCode, KeyEvent, Modifiers, ModalOptions,
        NodeId, Page, Result, Trap, TrapError, TrapOptions, TrapState,
    };

    pub use crate::{core, focus};
}

pub use ftrap_core as core;
pub use ftrap_focus as focus;
