#![forbid(unsafe_code)]

//! Focus guard: pulls focus back when it leaves a container.
//!
//! Lighter than a [`FocusTrap`](crate::FocusTrap): no Tab cycling, no
//! Escape. A `focusout` from inside the container whose related target lies
//! outside it sends focus to the start element. Focus leaving the page
//! (no related target) is left alone.

use ftrap_core::focusable::focusable_elements;
use ftrap_core::{Document, DomEvent, EventKind, EventType, ListenerId, ListenerTarget, NodeId, OwnerId};

use crate::error::TrapError;
use crate::trap::validate_container;

#[derive(Debug)]
pub struct FocusGuard {
    owner: OwnerId,
    container: NodeId,
    explicit_start: Option<NodeId>,
    start: Option<NodeId>,
    listener: Option<ListenerId>,
}

impl FocusGuard {
    /// Guard `container`. Without an explicit `start` the first focusable
    /// element at install time is used.
    pub fn new(doc: &mut Document, container: NodeId, start: Option<NodeId>) -> Result<Self, TrapError> {
        validate_container(doc, container)?;
        Ok(Self {
            owner: doc.allocate_owner(),
            container,
            explicit_start: start,
            start: None,
            listener: None,
        })
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Element focus is sent back to.
    pub fn start(&self) -> Option<NodeId> {
        self.start
    }

    #[inline]
    pub fn is_installed(&self) -> bool {
        self.listener.is_some()
    }

    pub fn install(&mut self, doc: &mut Document) {
        if self.listener.is_some() {
            return;
        }
        self.start = self
            .explicit_start
            .or_else(|| focusable_elements(doc, self.container).first().copied());
        self.listener = Some(doc.add_listener(
            ListenerTarget::Node(self.container),
            EventType::FocusOut,
            false,
            self.owner,
        ));
    }

    pub fn uninstall(&mut self, doc: &mut Document) {
        if let Some(id) = self.listener.take() {
            doc.remove_listener(id);
        }
    }

    pub fn handle_event(&mut self, doc: &mut Document, event: &DomEvent) {
        let EventKind::FocusOut {
            related: Some(related),
        } = event.kind
        else {
            return;
        };
        if doc.contains(self.container, related) {
            return;
        }
        let Some(start) = self.start else {
            return;
        };
        #[cfg(feature = "tracing")]
        tracing::trace!(container = %self.container, escaped_to = %related, "guard returning focus");
        if let Err(_err) = doc.focus(start) {
            #[cfg(feature = "tracing")]
            tracing::debug!(start = %start, error = %_err, "guard start element refused focus");
        }
    }
}
