#![forbid(unsafe_code)]

//! Trap configuration and lifecycle callbacks.
//!
//! [`TrapOptions`] is plain data: it can be built in code, read from
//! `data-trap-*` attributes on the container, or (with the `serde` feature)
//! deserialized from camelCase JSON such as
//! `{"autoFocus": false, "escapeDeactivates": true}`.
//!
//! [`TrapHooks`] holds the `onActivate`/`onDeactivate`/`onPause`/`onResume`
//! callbacks. They are kept apart from the options so the options stay
//! `Clone + Eq`.

use std::fmt;

use ftrap_core::{Document, NodeId};

/// Static configuration for a focus trap.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct TrapOptions {
    /// Move focus into the container on activation.
    pub auto_focus: bool,
    /// Restore the previously focused element on deactivation.
    pub return_focus: bool,
    /// Escape deactivates the trap.
    pub escape_deactivates: bool,
    /// A pointer press outside the container deactivates the trap. When
    /// off, such presses are prevented so focus stays put.
    pub click_outside_deactivates: bool,
    /// Pause instead of correcting when focus leaves the page entirely.
    pub pause_on_focus_lost: bool,
    /// Element to focus on activation instead of the first focusable one.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub initial_focus: Option<NodeId>,
}

impl Default for TrapOptions {
    fn default() -> Self {
        Self {
            auto_focus: true,
            return_focus: true,
            escape_deactivates: true,
            click_outside_deactivates: false,
            pause_on_focus_lost: false,
            initial_focus: None,
        }
    }
}

impl TrapOptions {
    /// Create the default options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_focus(mut self, value: bool) -> Self {
        self.auto_focus = value;
        self
    }

    pub fn return_focus(mut self, value: bool) -> Self {
        self.return_focus = value;
        self
    }

    pub fn escape_deactivates(mut self, value: bool) -> Self {
        self.escape_deactivates = value;
        self
    }

    pub fn click_outside_deactivates(mut self, value: bool) -> Self {
        self.click_outside_deactivates = value;
        self
    }

    pub fn pause_on_focus_lost(mut self, value: bool) -> Self {
        self.pause_on_focus_lost = value;
        self
    }

    pub fn initial_focus(mut self, node: NodeId) -> Self {
        self.initial_focus = Some(node);
        self
    }

    /// Read overrides from the container's `data-trap-*` attributes.
    ///
    /// Boolean attributes accept `true`/`false`; a present but empty
    /// attribute counts as `true`. Unrecognized values keep the default.
    /// `data-trap-initial-focus` names the `id` of the element to focus.
    pub fn from_dataset(doc: &Document, container: NodeId) -> Self {
        let mut options = Self::default();
        let flag = |key: &str, current: bool| match doc.dataset(container, key) {
            Some(v) if v.is_empty() || v.eq_ignore_ascii_case("true") => true,
            Some(v) if v.eq_ignore_ascii_case("false") => false,
            _ => current,
        };
        options.auto_focus = flag("trapAutoFocus", options.auto_focus);
        options.return_focus = flag("trapReturnFocus", options.return_focus);
        options.escape_deactivates = flag("trapEscapeDeactivates", options.escape_deactivates);
        options.click_outside_deactivates = flag(
            "trapClickOutsideDeactivates",
            options.click_outside_deactivates,
        );
        options.pause_on_focus_lost = flag("trapPauseOnFocusLost", options.pause_on_focus_lost);
        options.initial_focus = doc
            .dataset(container, "trapInitialFocus")
            .and_then(|dom_id| doc.element_by_id(dom_id));
        options
    }
}

/// Callback invoked with the trap's container.
pub type TrapCallback = Box<dyn FnMut(NodeId)>;

/// Which lifecycle callback to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HookKind {
    Activate,
    Deactivate,
    Pause,
    Resume,
}

/// Lifecycle callbacks for a trap.
#[derive(Default)]
pub struct TrapHooks {
    on_activate: Option<TrapCallback>,
    on_deactivate: Option<TrapCallback>,
    on_pause: Option<TrapCallback>,
    on_resume: Option<TrapCallback>,
}

impl fmt::Debug for TrapHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrapHooks")
            .field("on_activate", &self.on_activate.is_some())
            .field("on_deactivate", &self.on_deactivate.is_some())
            .field("on_pause", &self.on_pause.is_some())
            .field("on_resume", &self.on_resume.is_some())
            .finish()
    }
}

impl TrapHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_activate(mut self, f: impl FnMut(NodeId) + 'static) -> Self {
        self.on_activate = Some(Box::new(f));
        self
    }

    pub fn on_deactivate(mut self, f: impl FnMut(NodeId) + 'static) -> Self {
        self.on_deactivate = Some(Box::new(f));
        self
    }

    pub fn on_pause(mut self, f: impl FnMut(NodeId) + 'static) -> Self {
        self.on_pause = Some(Box::new(f));
        self
    }

    pub fn on_resume(mut self, f: impl FnMut(NodeId) + 'static) -> Self {
        self.on_resume = Some(Box::new(f));
        self
    }

    pub(crate) fn fire(&mut self, kind: HookKind, container: NodeId) {
        let slot = match kind {
            HookKind::Activate => &mut self.on_activate,
            HookKind::Deactivate => &mut self.on_deactivate,
            HookKind::Pause => &mut self.on_pause,
            HookKind::Resume => &mut self.on_resume,
        };
        if let Some(callback) = slot {
            callback(container);
        }
    }
}
