#![forbid(unsafe_code)]

//! Modal variant: a focus trap that also shows and hides its container.
//!
//! Activation shows the container, sets `aria-hidden="false"` and adds the
//! open marker class; deactivation reverses all three after focus has been
//! returned. A click whose target *is* the container root (the backdrop part
//! of a full-screen modal, not its content) asks for deactivation.
//!
//! All focus behaviour is delegated to the inner [`FocusTrap`].

use ftrap_core::{Display, Document, DomEvent, EventKind, EventType, NodeId, OwnerId};

use crate::error::TrapError;
use crate::options::{TrapHooks, TrapOptions};
use crate::trap::{FocusTrap, ListenerSpec};
use crate::{Trap, TrapSignal, TrapState};

/// Presentation options for [`ModalTrap`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct ModalOptions {
    /// Class added while open.
    pub open_class: String,
    /// Close when the click target is the container root itself.
    pub close_on_backdrop_click: bool,
    /// Toggle `display` on the container. Off when something else animates it.
    pub manage_display: bool,
    /// `display` value used while open.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub display: Display,
}

impl Default for ModalOptions {
    fn default() -> Self {
        Self {
            open_class: "is-open".to_owned(),
            close_on_backdrop_click: true,
            manage_display: true,
            display: Display::Block,
        }
    }
}

impl ModalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_class(mut self, class: impl Into<String>) -> Self {
        self.open_class = class.into();
        self
    }

    pub fn close_on_backdrop_click(mut self, value: bool) -> Self {
        self.close_on_backdrop_click = value;
        self
    }

    pub fn manage_display(mut self, value: bool) -> Self {
        self.manage_display = value;
        self
    }

    pub fn display(mut self, display: Display) -> Self {
        self.display = display;
        self
    }
}

/// Focus trap for modal overlays.
#[derive(Debug)]
pub struct ModalTrap {
    inner: FocusTrap,
    options: ModalOptions,
}

impl ModalTrap {
    /// Create an inactive modal trap. The container is hidden immediately if
    /// the trap manages its display.
    pub fn new(
        doc: &mut Document,
        container: NodeId,
        trap_options: TrapOptions,
        options: ModalOptions,
    ) -> Result<Self, TrapError> {
        let mut inner = FocusTrap::new(doc, container, trap_options)?;
        if options.close_on_backdrop_click {
            inner.listen(doc, ListenerSpec::document_bubble(EventType::Click));
        }
        let modal = Self { inner, options };
        modal.hide(doc)?;
        Ok(modal)
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: TrapHooks) -> Self {
        self.inner.set_hooks(hooks);
        self
    }

    pub fn options(&self) -> &ModalOptions {
        &self.options
    }

    pub fn inner(&self) -> &FocusTrap {
        &self.inner
    }

    fn show(&self, doc: &mut Document) -> Result<(), TrapError> {
        let container = self.inner.container();
        if self.options.manage_display {
            doc.set_display(container, self.options.display)?;
        }
        doc.add_class(container, &self.options.open_class)?;
        doc.set_attribute(container, "aria-hidden", "false")?;
        Ok(())
    }

    fn hide(&self, doc: &mut Document) -> Result<(), TrapError> {
        let container = self.inner.container();
        if self.options.manage_display {
            doc.set_display(container, Display::None)?;
        }
        doc.remove_class(container, &self.options.open_class);
        doc.set_attribute(container, "aria-hidden", "true")?;
        Ok(())
    }
}

impl Trap for ModalTrap {
    fn container(&self) -> NodeId {
        self.inner.container()
    }

    fn owner(&self) -> OwnerId {
        self.inner.owner()
    }

    fn state(&self) -> TrapState {
        self.inner.state()
    }

    fn activate(&mut self, doc: &mut Document) {
        if self.inner.state() != TrapState::Inactive {
            self.inner.activate(doc);
            return;
        }
        if let Err(_err) = self.show(doc) {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_err, "failed to show modal");
        }
        self.inner.activate(doc);
    }

    fn deactivate(&mut self, doc: &mut Document) {
        if self.inner.state() == TrapState::Inactive {
            return;
        }
        self.inner.deactivate(doc);
        if let Err(_err) = self.hide(doc) {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_err, "failed to hide modal");
        }
    }

    fn pause(&mut self, doc: &mut Document) {
        self.inner.pause(doc);
    }

    fn resume(&mut self, doc: &mut Document) {
        self.inner.resume(doc);
    }

    fn focus_first(&mut self, doc: &mut Document) -> bool {
        self.inner.focus_first(doc)
    }

    fn focus_last(&mut self, doc: &mut Document) -> bool {
        self.inner.focus_last(doc)
    }

    fn focusable_elements(&self) -> &[NodeId] {
        self.inner.focusable_elements()
    }

    fn handle_event(&mut self, doc: &mut Document, event: &mut DomEvent) -> TrapSignal {
        if self.inner.state() == TrapState::Active
            && self.options.close_on_backdrop_click
            && event.kind == EventKind::Click
            && event.target == self.inner.container()
        {
            return TrapSignal::Deactivate;
        }
        self.inner.handle_event(doc, event)
    }

    fn set_hooks(&mut self, hooks: TrapHooks) {
        self.inner.set_hooks(hooks);
    }
}
