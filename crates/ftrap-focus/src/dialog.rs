#![forbid(unsafe_code)]

//! Ready-made accessible modal dialog.
//!
//! A [`ModalDialog`] builds its own markup:
//!
//! ```text
//! div.modal-overlay
//!   div.modal [role=dialog, aria-modal=true, aria-labelledby=<title id>]
//!     h2.modal-title#<title id>
//!     div.modal-body
//!     button.modal-close [aria-label=<close label>]
//! ```
//!
//! Focus handling is a [`ModalTrap`] on the overlay, registered in the same
//! registry as every other trap. The dialog only drives visibility: the
//! overlay is shown on open and hidden once the close transition has run
//! its course (advanced by [`Page::tick`](crate::Page::tick)).
//!
//! # Phases
//!
//! `Closed → Open → Closing → Closed`. Reopening while closing cancels the
//! pending hide.

use std::sync::atomic::{AtomicU32, Ordering};

use ftrap_core::{Display, Document, DomEvent, EventKind, EventType, ListenerTarget, NodeId, OwnerId};
use web_time::Duration;

use crate::error::TrapError;
use crate::modal::{ModalOptions, ModalTrap};
use crate::options::TrapOptions;

/// Global counter for unique dialog title ids.
static DIALOG_TITLE_COUNTER: AtomicU32 = AtomicU32::new(1);

fn next_title_id() -> String {
    format!(
        "ftrap-dialog-title-{}",
        DIALOG_TITLE_COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

/// Content and behaviour of a [`ModalDialog`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct DialogOptions {
    pub title: String,
    pub content: String,
    /// Accessible label and text of the close button.
    pub close_label: String,
    pub close_on_escape: bool,
    pub close_on_overlay_click: bool,
    /// How long the overlay stays visible after closing.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub transition: Duration,
}

impl Default for DialogOptions {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            close_label: "Close".to_owned(),
            close_on_escape: true,
            close_on_overlay_click: true,
            transition: Duration::from_millis(300),
        }
    }
}

impl DialogOptions {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn close_label(mut self, label: impl Into<String>) -> Self {
        self.close_label = label.into();
        self
    }

    pub fn close_on_escape(mut self, value: bool) -> Self {
        self.close_on_escape = value;
        self
    }

    pub fn close_on_overlay_click(mut self, value: bool) -> Self {
        self.close_on_overlay_click = value;
        self
    }

    pub fn transition(mut self, transition: Duration) -> Self {
        self.transition = transition;
        self
    }
}

/// Visibility phase of a [`ModalDialog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogPhase {
    /// Overlay hidden.
    #[default]
    Closed,
    /// Overlay visible, trap active.
    Open,
    /// Trap released; overlay still visible until the transition ends.
    Closing,
}

impl DialogPhase {
    /// Check if the overlay should be displayed.
    #[inline]
    pub fn is_visible(self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// What the page should do after a dialog listener fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DialogAction {
    None,
    Open,
    Close,
}

/// An accessible modal dialog.
#[derive(Debug)]
pub struct ModalDialog {
    owner: OwnerId,
    overlay: NodeId,
    modal: NodeId,
    title: NodeId,
    body: NodeId,
    close_button: NodeId,
    trigger: Option<NodeId>,
    phase: DialogPhase,
    closing_elapsed: Duration,
    options: DialogOptions,
}

impl ModalDialog {
    /// Build the dialog markup under `body` and the trap guarding it.
    ///
    /// The trap is returned separately so the caller can register it. A
    /// `trigger` element opens the dialog when clicked.
    pub fn build(
        doc: &mut Document,
        options: DialogOptions,
        trigger: Option<NodeId>,
    ) -> Result<(Self, ModalTrap), TrapError> {
        let owner = doc.allocate_owner();
        let root = doc.body();
        let overlay = element(doc, root, "div", "modal-overlay")?;
        doc.set_display(overlay, Display::None)?;

        let modal = element(doc, overlay, "div", "modal")?;
        let title_id = next_title_id();
        doc.set_attribute(modal, "role", "dialog")?;
        doc.set_attribute(modal, "aria-modal", "true")?;
        doc.set_attribute(modal, "aria-labelledby", title_id.as_str())?;

        let title = element(doc, modal, "h2", "modal-title")?;
        doc.set_attribute(title, "id", title_id)?;
        let text = doc.create_text(options.title.as_str());
        doc.append_child(title, text)?;

        let body = element(doc, modal, "div", "modal-body")?;
        let text = doc.create_text(options.content.as_str());
        doc.append_child(body, text)?;

        let close_button = element(doc, modal, "button", "modal-close")?;
        doc.set_attribute(close_button, "type", "button")?;
        doc.set_attribute(close_button, "aria-label", options.close_label.as_str())?;
        let text = doc.create_text(options.close_label.as_str());
        doc.append_child(close_button, text)?;

        let trap_options = TrapOptions::default().escape_deactivates(options.close_on_escape);
        let modal_options = ModalOptions::default()
            .manage_display(false)
            .close_on_backdrop_click(options.close_on_overlay_click);
        let trap = ModalTrap::new(doc, overlay, trap_options, modal_options)?;

        doc.add_listener(
            ListenerTarget::Node(close_button),
            EventType::Click,
            false,
            owner,
        );
        if let Some(trigger) = trigger {
            doc.set_attribute(trigger, "aria-haspopup", "dialog")?;
            doc.add_listener(ListenerTarget::Node(trigger), EventType::Click, false, owner);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(overlay = %overlay, title = %options.title, "dialog built");
        let dialog = Self {
            owner,
            overlay,
            modal,
            title,
            body,
            close_button,
            trigger,
            phase: DialogPhase::Closed,
            closing_elapsed: Duration::ZERO,
            options,
        };
        Ok((dialog, trap))
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// The overlay element; also the container of the dialog's trap.
    pub fn overlay(&self) -> NodeId {
        self.overlay
    }

    /// The `role="dialog"` element.
    pub fn modal(&self) -> NodeId {
        self.modal
    }

    pub fn title(&self) -> NodeId {
        self.title
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn close_button(&self) -> NodeId {
        self.close_button
    }

    pub fn trigger(&self) -> Option<NodeId> {
        self.trigger
    }

    pub fn options(&self) -> &DialogOptions {
        &self.options
    }

    pub fn phase(&self) -> DialogPhase {
        self.phase
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.phase == DialogPhase::Open
    }

    /// Show the overlay. Cancels a pending hide.
    pub(crate) fn show(&mut self, doc: &mut Document) -> Result<(), TrapError> {
        doc.set_display(self.overlay, Display::Flex)?;
        self.phase = DialogPhase::Open;
        self.closing_elapsed = Duration::ZERO;
        Ok(())
    }

    /// Undo [`show`](Self::show) when the trap could not be activated.
    pub(crate) fn cancel_show(&mut self, doc: &mut Document) {
        if self.phase == DialogPhase::Open {
            self.finish_close(doc);
        }
    }

    /// Enter the closing phase after the trap was released.
    pub(crate) fn begin_close(&mut self, doc: &mut Document) {
        if self.phase != DialogPhase::Open {
            return;
        }
        self.phase = DialogPhase::Closing;
        self.closing_elapsed = Duration::ZERO;
        if self.options.transition.is_zero() {
            self.finish_close(doc);
        }
    }

    fn finish_close(&mut self, doc: &mut Document) {
        if let Err(_err) = doc.set_display(self.overlay, Display::None) {
            #[cfg(feature = "tracing")]
            tracing::warn!(overlay = %self.overlay, error = %_err, "failed to hide dialog");
        }
        self.phase = DialogPhase::Closed;
        self.closing_elapsed = Duration::ZERO;
        #[cfg(feature = "tracing")]
        tracing::debug!(overlay = %self.overlay, "dialog hidden");
    }

    /// Advance the close transition. Returns `true` if the overlay was hidden.
    pub(crate) fn tick(&mut self, doc: &mut Document, delta: Duration) -> bool {
        if self.phase != DialogPhase::Closing {
            return false;
        }
        self.closing_elapsed = self.closing_elapsed.saturating_add(delta);
        if self.closing_elapsed >= self.options.transition {
            self.finish_close(doc);
            return true;
        }
        false
    }

    pub(crate) fn handle_event(&self, doc: &Document, event: &DomEvent) -> DialogAction {
        if event.kind != EventKind::Click {
            return DialogAction::None;
        }
        if doc.contains(self.close_button, event.target) {
            DialogAction::Close
        } else if self
            .trigger
            .is_some_and(|trigger| doc.contains(trigger, event.target))
        {
            DialogAction::Open
        } else {
            DialogAction::None
        }
    }

    /// Remove the markup and the dialog's own listeners.
    pub(crate) fn teardown(&mut self, doc: &mut Document) {
        doc.remove_listeners_of(self.owner);
        if let Some(trigger) = self.trigger {
            doc.remove_attribute(trigger, "aria-haspopup");
        }
        let _ = doc.remove(self.overlay);
        self.phase = DialogPhase::Closed;
    }
}

fn element(doc: &mut Document, parent: NodeId, tag: &str, class: &str) -> Result<NodeId, TrapError> {
    let node = doc.create_element(tag);
    doc.add_class(node, class)?;
    doc.append_child(parent, node)?;
    Ok(node)
}
