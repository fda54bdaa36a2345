#![forbid(unsafe_code)]

//! Drawer variant: a focus trap with an optional backdrop element.
//!
//! The backdrop (`div.drawer-backdrop`) is created under `body` on
//! activation and removed on deactivation; clicking it asks for
//! deactivation. Focus behaviour is delegated to the inner [`FocusTrap`].

use ftrap_core::{
    Display, Document, DomEvent, EventKind, EventType, ListenerTarget, NodeId, OwnerId,
};

use crate::error::TrapError;
use crate::options::{TrapHooks, TrapOptions};
use crate::trap::{FocusTrap, ListenerSpec};
use crate::{Trap, TrapSignal, TrapState};

/// Presentation options for [`DrawerTrap`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct DrawerOptions {
    /// Create a backdrop element while open.
    pub backdrop: bool,
    /// Clicking the backdrop closes the drawer.
    pub close_on_backdrop_click: bool,
    /// Class added to the drawer while open.
    pub open_class: String,
    /// Class of the backdrop element.
    pub backdrop_class: String,
    /// Toggle `display` on the drawer.
    pub manage_display: bool,
}

impl Default for DrawerOptions {
    fn default() -> Self {
        Self {
            backdrop: true,
            close_on_backdrop_click: true,
            open_class: "drawer-open".to_owned(),
            backdrop_class: "drawer-backdrop".to_owned(),
            manage_display: true,
        }
    }
}

impl DrawerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backdrop(mut self, value: bool) -> Self {
        self.backdrop = value;
        self
    }

    pub fn close_on_backdrop_click(mut self, value: bool) -> Self {
        self.close_on_backdrop_click = value;
        self
    }

    pub fn open_class(mut self, class: impl Into<String>) -> Self {
        self.open_class = class.into();
        self
    }

    pub fn backdrop_class(mut self, class: impl Into<String>) -> Self {
        self.backdrop_class = class.into();
        self
    }

    pub fn manage_display(mut self, value: bool) -> Self {
        self.manage_display = value;
        self
    }
}

/// Focus trap for side drawers.
#[derive(Debug)]
pub struct DrawerTrap {
    inner: FocusTrap,
    options: DrawerOptions,
    backdrop: Option<NodeId>,
}

impl DrawerTrap {
    pub fn new(
        doc: &mut Document,
        container: NodeId,
        trap_options: TrapOptions,
        options: DrawerOptions,
    ) -> Result<Self, TrapError> {
        let inner = FocusTrap::new(doc, container, trap_options)?;
        let drawer = Self {
            inner,
            options,
            backdrop: None,
        };
        drawer.hide(doc)?;
        Ok(drawer)
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: TrapHooks) -> Self {
        self.inner.set_hooks(hooks);
        self
    }

    pub fn options(&self) -> &DrawerOptions {
        &self.options
    }

    /// The backdrop element while open.
    pub fn backdrop(&self) -> Option<NodeId> {
        self.backdrop
    }

    fn show(&mut self, doc: &mut Document) -> Result<(), TrapError> {
        let container = self.inner.container();
        if self.options.manage_display {
            doc.set_display(container, Display::Block)?;
        }
        doc.add_class(container, &self.options.open_class)?;
        doc.set_attribute(container, "aria-hidden", "false")?;

        if self.options.backdrop && self.backdrop.is_none() {
            let backdrop = doc.create_element("div");
            doc.add_class(backdrop, &self.options.backdrop_class)?;
            doc.set_attribute(backdrop, "aria-hidden", "true")?;
            doc.append_child(doc.body(), backdrop)?;
            if self.options.close_on_backdrop_click {
                self.inner
                    .listen(doc, ListenerSpec::node(backdrop, EventType::Click));
            }
            self.backdrop = Some(backdrop);
        }
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

    fn remove_backdrop(&mut self, doc: &mut Document) {
        if let Some(backdrop) = self.backdrop.take() {
            self.inner
                .unlisten(doc, ListenerTarget::Node(backdrop), EventType::Click);
            let _ = doc.remove(backdrop);
        }
    }
}

impl Trap for DrawerTrap {
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
            tracing::warn!(error = %_err, "failed to show drawer");
        }
        self.inner.activate(doc);
    }

    fn deactivate(&mut self, doc: &mut Document) {
        if self.inner.state() == TrapState::Inactive {
            return;
        }
        self.inner.deactivate(doc);
        self.remove_backdrop(doc);
        if let Err(_err) = self.hide(doc) {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_err, "failed to hide drawer");
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
            && event.kind == EventKind::Click
            && self.backdrop.is_some_and(|b| b == event.target)
        {
            return TrapSignal::Deactivate;
        }
        self.inner.handle_event(doc, event)
    }

    fn set_hooks(&mut self, hooks: TrapHooks) {
        self.inner.set_hooks(hooks);
    }
}
