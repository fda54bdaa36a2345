#![forbid(unsafe_code)]

//! Focus lock: restricts focus to an explicit list of elements.
//!
//! Unlike a trap, the lock does not care about subtrees. A `focusin` on any
//! element outside the list is undone by focusing the last element of the
//! list that legitimately held focus, or the first listed element.

use ftrap_core::{Document, DomEvent, EventKind, EventType, ListenerId, ListenerTarget, NodeId, OwnerId};

#[derive(Debug)]
pub struct FocusLock {
    owner: OwnerId,
    elements: Vec<NodeId>,
    last_valid: Option<NodeId>,
    listener: Option<ListenerId>,
}

impl FocusLock {
    pub fn new(doc: &mut Document, elements: Vec<NodeId>) -> Self {
        Self {
            owner: doc.allocate_owner(),
            elements,
            last_valid: None,
            listener: None,
        }
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn elements(&self) -> &[NodeId] {
        &self.elements
    }

    pub fn last_valid(&self) -> Option<NodeId> {
        self.last_valid
    }

    #[inline]
    pub fn is_installed(&self) -> bool {
        self.listener.is_some()
    }

    pub fn install(&mut self, doc: &mut Document) {
        if self.listener.is_some() {
            return;
        }
        let active = doc.active_element();
        if self.elements.contains(&active) {
            self.last_valid = Some(active);
        }
        self.listener = Some(doc.add_listener(
            ListenerTarget::Document,
            EventType::FocusIn,
            true,
            self.owner,
        ));
    }

    pub fn uninstall(&mut self, doc: &mut Document) {
        if let Some(id) = self.listener.take() {
            doc.remove_listener(id);
        }
        self.last_valid = None;
    }

    pub fn handle_event(&mut self, doc: &mut Document, event: &DomEvent) {
        if !matches!(event.kind, EventKind::FocusIn { .. }) {
            return;
        }
        if self.elements.contains(&event.target) {
            self.last_valid = Some(event.target);
            return;
        }
        let fallback = self.last_valid.or_else(|| self.elements.first().copied());
        if let Some(node) = fallback
            && let Err(_err) = doc.focus(node)
        {
            #[cfg(feature = "tracing")]
            tracing::debug!(node = %node, error = %_err, "lock fallback refused focus");
        }
    }
}
