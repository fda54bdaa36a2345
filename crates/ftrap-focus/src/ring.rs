#![forbid(unsafe_code)]

//! Focus ring: a decorative overlay that follows the focused element.
//!
//! The ring is a single `div.focus-ring` (`aria-hidden="true"`) appended to
//! `body`. Every `focusin` moves it over the focused element's bounds, grown
//! by [`FocusRingOptions::offset`]. When focus drops to `body` the ring hides.

use ftrap_core::{
    Display, Document, DomEvent, EventKind, EventType, ListenerId, ListenerTarget, NodeId, OwnerId,
};

use crate::error::TrapError;

/// Appearance of a [`FocusRing`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct FocusRingOptions {
    /// Gap between the focused element and the ring, on every side.
    pub offset: i32,
    /// Class of the ring element.
    pub class: String,
}

impl Default for FocusRingOptions {
    fn default() -> Self {
        Self {
            offset: 2,
            class: "focus-ring".to_owned(),
        }
    }
}

impl FocusRingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(mut self, offset: i32) -> Self {
        self.offset = offset;
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }
}

/// Overlay tracking the focused element.
#[derive(Debug)]
pub struct FocusRing {
    owner: OwnerId,
    options: FocusRingOptions,
    element: Option<NodeId>,
    target: Option<NodeId>,
    listeners: Vec<ListenerId>,
}

impl FocusRing {
    pub fn new(doc: &mut Document, options: FocusRingOptions) -> Self {
        Self {
            owner: doc.allocate_owner(),
            options,
            element: None,
            target: None,
            listeners: Vec::new(),
        }
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn options(&self) -> &FocusRingOptions {
        &self.options
    }

    /// The ring element while installed.
    pub fn element(&self) -> Option<NodeId> {
        self.element
    }

    /// The element the ring currently surrounds.
    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    #[inline]
    pub fn is_installed(&self) -> bool {
        self.element.is_some()
    }

    /// Create the ring element and start following focus.
    ///
    /// Idempotent. If something other than `body` already has focus the ring
    /// is placed over it right away.
    pub fn install(&mut self, doc: &mut Document) -> Result<(), TrapError> {
        if self.element.is_some() {
            return Ok(());
        }
        let ring = doc.create_element("div");
        doc.add_class(ring, &self.options.class)?;
        doc.set_attribute(ring, "aria-hidden", "true")?;
        doc.set_display(ring, Display::None)?;
        doc.append_child(doc.body(), ring)?;
        self.element = Some(ring);

        for event in [EventType::FocusIn, EventType::FocusOut] {
            self.listeners
                .push(doc.add_listener(ListenerTarget::Document, event, false, self.owner));
        }
        let active = doc.active_element();
        if active != doc.body() {
            self.surround(doc, active);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(ring = %ring, "focus ring installed");
        Ok(())
    }

    /// Remove the ring element and its listeners.
    pub fn uninstall(&mut self, doc: &mut Document) {
        for id in self.listeners.drain(..) {
            doc.remove_listener(id);
        }
        if let Some(ring) = self.element.take() {
            let _ = doc.remove(ring);
        }
        self.target = None;
    }

    fn surround(&mut self, doc: &mut Document, target: NodeId) {
        let Some(ring) = self.element else {
            return;
        };
        let bounds = doc.bounds(target).outset(self.options.offset);
        if doc.set_bounds(ring, bounds).is_ok() && doc.set_display(ring, Display::Block).is_ok() {
            self.target = Some(target);
        }
    }

    fn hide(&mut self, doc: &mut Document) {
        if let Some(ring) = self.element {
            let _ = doc.set_display(ring, Display::None);
        }
        self.target = None;
    }

    /// Handle an event delivered to one of the ring's listeners.
    pub fn handle_event(&mut self, doc: &mut Document, event: &DomEvent) {
        match event.kind {
            EventKind::FocusIn { .. } if event.target != doc.body() => {
                self.surround(doc, event.target);
            }
            EventKind::FocusOut { related: None } => self.hide(doc),
            _ => {}
        }
    }
}
