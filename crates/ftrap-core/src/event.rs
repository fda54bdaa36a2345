#![forbid(unsafe_code)]

//! Canonical input and DOM event types.
//!
//! Key events mirror what a `keydown` listener sees. DOM events carry a
//! target node plus the `preventDefault` flag listeners may set.
//!
//! # Design Notes
//!
//! - Shift+Tab is `KeyCode::Tab` with [`Modifiers::SHIFT`], as in browsers.
//! - `focusin`/`focusout` bubble; `related` is the node on the other side of
//!   the focus change (`None` when focus drops to `body`).

use bitflags::bitflags;

use crate::dom::NodeId;

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// The key code that was pressed.
    pub code: KeyCode,

    /// Modifier keys held during the event.
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// Create a new key event with no modifiers.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
        }
    }

    /// Create a key event with modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Plain Tab.
    #[must_use]
    pub const fn tab() -> Self {
        Self::new(KeyCode::Tab)
    }

    /// Shift+Tab.
    #[must_use]
    pub const fn shift_tab() -> Self {
        Self::new(KeyCode::Tab).with_modifiers(Modifiers::SHIFT)
    }

    /// Escape.
    #[must_use]
    pub const fn escape() -> Self {
        Self::new(KeyCode::Escape)
    }

    /// Check if Shift modifier is held.
    #[must_use]
    pub const fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }
}

/// Key codes for keyboard events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// Enter/Return key.
    Enter,

    /// Escape key.
    Escape,

    /// Tab key.
    Tab,
}

bitflags! {
    /// Modifier keys that can be held during a key event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE  = 0b0000;
        /// Shift key.
        const SHIFT = 0b0001;
        /// Alt/Option key.
        const ALT   = 0b0010;
        /// Control key.
        const CTRL  = 0b0100;
        /// Super/Meta/Command key.
        const SUPER = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

/// Event types a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    FocusIn,
    FocusOut,
    KeyDown,
    MouseDown,
    Click,
}

/// Payload of a dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Focus arrived at the target. `related` lost it.
    FocusIn { related: Option<NodeId> },
    /// Focus is leaving the target. `related` gains it.
    FocusOut { related: Option<NodeId> },
    /// A key was pressed while the target had focus.
    KeyDown(KeyEvent),
    /// A pointer was pressed on the target. Its default action focuses it.
    MouseDown,
    /// The target was clicked.
    Click,
}

impl EventKind {
    /// The listener type this payload is delivered to.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::FocusIn { .. } => EventType::FocusIn,
            Self::FocusOut { .. } => EventType::FocusOut,
            Self::KeyDown(_) => EventType::KeyDown,
            Self::MouseDown => EventType::MouseDown,
            Self::Click => EventType::Click,
        }
    }
}

/// An event travelling through listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub kind: EventKind,
    pub target: NodeId,
    default_prevented: bool,
}

impl DomEvent {
    /// Create an event aimed at `target`.
    #[must_use]
    pub const fn new(kind: EventKind, target: NodeId) -> Self {
        Self {
            kind,
            target,
            default_prevented: false,
        }
    }

    #[must_use]
    pub const fn event_type(&self) -> EventType {
        self.kind.event_type()
    }

    /// The related target of a focus event.
    #[must_use]
    pub const fn related(&self) -> Option<NodeId> {
        match self.kind {
            EventKind::FocusIn { related } | EventKind::FocusOut { related } => related,
            _ => None,
        }
    }

    /// Cancel the browser default action (Tab navigation, pointer focus).
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    #[must_use]
    pub const fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}
