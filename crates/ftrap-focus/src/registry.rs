#![forbid(unsafe_code)]

//! Trap registry with a LIFO activation stack.
//!
//! The registry maps each container to its trap (recreating a trap for the
//! same container replaces the old one) and keeps an explicit stack of the
//! traps that have been activated and not yet released.
//!
//! # Invariants
//!
//! 1. At most one trap is [`TrapState::Active`]: the top of the stack.
//! 2. Activating a trap suspends the previous top; deactivating the top
//!    resumes the trap below it, unless that trap was paused by the caller.
//! 3. A trap is on the stack iff it is active or paused.
//!
//! # Failure Modes
//!
//! - Releasing a trap from the middle of the stack removes it without
//!   disturbing the top.
//! - Operations on unregistered containers report [`TrapError::UnknownTrap`].

use ahash::{AHashMap, AHashSet};
use ftrap_core::{Document, DomEvent, NodeId, OwnerId};

use crate::error::TrapError;
use crate::{Trap, TrapSignal, TrapState};

/// One trap per container plus the activation stack.
#[derive(Debug, Default)]
pub struct TrapRegistry {
    traps: AHashMap<NodeId, Box<dyn Trap>>,
    owners: AHashMap<OwnerId, NodeId>,
    stack: Vec<NodeId>,
    /// Traps paused because another trap was pushed on top of them.
    suspended: AHashSet<NodeId>,
}

impl TrapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a trap, replacing (and deactivating) any trap already bound
    /// to the same container. Returns the container.
    pub fn insert(&mut self, doc: &mut Document, trap: Box<dyn Trap>) -> NodeId {
        let container = trap.container();
        if self.traps.contains_key(&container) {
            #[cfg(feature = "tracing")]
            tracing::debug!(container = %container, "replacing existing focus trap");
            self.remove(doc, container);
        }
        self.owners.insert(trap.owner(), container);
        self.traps.insert(container, trap);
        container
    }

    /// Deactivate and unregister the trap for `container`.
    pub fn remove(&mut self, doc: &mut Document, container: NodeId) -> Option<Box<dyn Trap>> {
        let _ = self.deactivate(doc, container);
        let trap = self.traps.remove(&container)?;
        self.owners.remove(&trap.owner());
        Some(trap)
    }

    pub fn get(&self, container: NodeId) -> Option<&dyn Trap> {
        self.traps.get(&container).map(|t| t.as_ref())
    }

    pub fn contains(&self, container: NodeId) -> bool {
        self.traps.contains_key(&container)
    }

    /// Container of the trap registered under `owner`.
    pub fn container_of(&self, owner: OwnerId) -> Option<NodeId> {
        self.owners.get(&owner).copied()
    }

    fn trap_mut(&mut self, container: NodeId) -> Result<&mut Box<dyn Trap>, TrapError> {
        self.traps
            .get_mut(&container)
            .ok_or(TrapError::UnknownTrap(container))
    }

    fn top(&self) -> Option<NodeId> {
        self.stack.last().copied()
    }

    /// Suspend the current top so another trap can take over.
    fn suspend_top(&mut self, doc: &mut Document) {
        let Some(top) = self.top() else {
            return;
        };
        if let Some(trap) = self.traps.get_mut(&top)
            && trap.state() == TrapState::Active
        {
            trap.pause(doc);
            self.suspended.insert(top);
        }
    }

    /// Activate the trap for `container`, pushing it on top of the stack.
    ///
    /// Idempotent for the current top. A trap buried under others is moved
    /// back to the top.
    pub fn activate(&mut self, doc: &mut Document, container: NodeId) -> Result<(), TrapError> {
        let state = self.trap_mut(container)?.state();
        let is_top = self.top() == Some(container);
        match state {
            TrapState::Active if is_top => return Ok(()),
            TrapState::Paused if is_top => {
                self.suspended.remove(&container);
                self.trap_mut(container)?.resume(doc);
                return Ok(());
            }
            _ => {}
        }

        self.stack.retain(|&c| c != container);
        self.suspend_top(doc);
        self.stack.push(container);
        self.suspended.remove(&container);
        let trap = self.trap_mut(container)?;
        match state {
            TrapState::Inactive => trap.activate(doc),
            TrapState::Paused | TrapState::Active => trap.resume(doc),
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(container = %container, depth = self.stack.len(), "trap pushed");
        Ok(())
    }

    /// Deactivate the trap for `container` and drop it from the stack.
    ///
    /// No-op for inactive traps. Releasing the top resumes the trap below
    /// it if the stack suspended it.
    pub fn deactivate(&mut self, doc: &mut Document, container: NodeId) -> Result<(), TrapError> {
        let trap = self.trap_mut(container)?;
        if trap.state() == TrapState::Inactive {
            return Ok(());
        }
        trap.deactivate(doc);

        let was_top = self.top() == Some(container);
        self.stack.retain(|&c| c != container);
        self.suspended.remove(&container);
        if was_top
            && let Some(next) = self.top()
            && self.suspended.remove(&next)
            && let Some(below) = self.traps.get_mut(&next)
        {
            below.resume(doc);
        }
        // A buried trap returns focus to where it started, which may be
        // outside the trap still on top.
        if !was_top
            && let Some(top) = self.top()
            && let Some(trap) = self.traps.get_mut(&top)
            && trap.is_active()
            && !doc.contains(top, doc.active_element())
        {
            let _ = trap.focus_first(doc);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(container = %container, depth = self.stack.len(), "trap popped");
        Ok(())
    }

    /// Pause the trap for `container` on the caller's behalf.
    ///
    /// A trap paused this way is not resumed automatically when the traps
    /// above it are released.
    pub fn pause(&mut self, doc: &mut Document, container: NodeId) -> Result<(), TrapError> {
        self.trap_mut(container)?.pause(doc);
        self.suspended.remove(&container);
        Ok(())
    }

    /// Resume a paused trap.
    ///
    /// Only the top of the stack may be active; resuming a buried trap marks
    /// it to resume once the traps above it are released.
    pub fn resume(&mut self, doc: &mut Document, container: NodeId) -> Result<(), TrapError> {
        let state = self.trap_mut(container)?.state();
        if state != TrapState::Paused {
            return Ok(());
        }
        if self.top() == Some(container) {
            self.trap_mut(container)?.resume(doc);
        } else {
            self.suspended.insert(container);
        }
        Ok(())
    }

    pub fn focus_first(&mut self, doc: &mut Document, container: NodeId) -> Result<bool, TrapError> {
        Ok(self.trap_mut(container)?.focus_first(doc))
    }

    pub fn focus_last(&mut self, doc: &mut Document, container: NodeId) -> Result<bool, TrapError> {
        Ok(self.trap_mut(container)?.focus_last(doc))
    }

    /// Route an event delivered to `owner`'s listener.
    ///
    /// Returns the container of a trap that released itself in response.
    pub fn handle_event(
        &mut self,
        doc: &mut Document,
        owner: OwnerId,
        event: &mut DomEvent,
    ) -> Option<NodeId> {
        let container = self.container_of(owner)?;
        let trap = self.traps.get_mut(&container)?;
        let was_active = trap.state() == TrapState::Active;
        match trap.handle_event(doc, event) {
            TrapSignal::Deactivate => {
                self.deactivate(doc, container).ok()?;
                Some(container)
            }
            TrapSignal::None => {
                if was_active && trap.state() == TrapState::Paused {
                    self.suspended.remove(&container);
                }
                None
            }
        }
    }

    /// Container of the trap currently confining focus.
    pub fn active_trap(&self) -> Option<NodeId> {
        self.top()
            .filter(|c| self.get(*c).is_some_and(|t| t.state() == TrapState::Active))
    }

    /// Container of the top trap if the caller paused it.
    pub fn paused_trap(&self) -> Option<NodeId> {
        self.top()
            .filter(|c| self.get(*c).is_some_and(|t| t.state() == TrapState::Paused))
    }

    /// Check if any trap currently confines focus.
    #[inline]
    pub fn is_trapped(&self) -> bool {
        self.active_trap().is_some()
    }

    /// Number of traps on the stack (active or paused).
    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Stack contents, bottom first.
    pub fn stack(&self) -> &[NodeId] {
        &self.stack
    }

    /// Registered containers.
    pub fn containers(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.traps.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.traps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::TrapOptions;
    use crate::trap::FocusTrap;
    use pretty_assertions::assert_eq;

    fn region(doc: &mut Document, buttons: usize) -> (NodeId, Vec<NodeId>) {
        let container = doc.create_element("div");
        doc.append_child(doc.body(), container).unwrap();
        let ids = (0..buttons)
            .map(|_| {
                let b = doc.create_element("button");
                doc.append_child(container, b).unwrap();
                b
            })
            .collect();
        (container, ids)
    }

    fn register(reg: &mut TrapRegistry, doc: &mut Document, container: NodeId) {
        let trap = FocusTrap::new(doc, container, TrapOptions::default()).unwrap();
        reg.insert(doc, Box::new(trap));
    }

    #[test]
    fn nested_traps_restore_in_lifo_order() {
        let mut doc = Document::new();
        let (_, page_buttons) = region(&mut doc, 1);
        let (a, a_buttons) = region(&mut doc, 2);
        let (b, b_buttons) = region(&mut doc, 2);
        doc.focus(page_buttons[0]).unwrap();

        let mut reg = TrapRegistry::new();
        register(&mut reg, &mut doc, a);
        register(&mut reg, &mut doc, b);

        reg.activate(&mut doc, a).unwrap();
        assert_eq!(doc.active_element(), a_buttons[0]);
        reg.activate(&mut doc, b).unwrap();
        assert_eq!(doc.active_element(), b_buttons[0]);
        assert_eq!(reg.active_trap(), Some(b));
        assert_eq!(reg.get(a).unwrap().state(), TrapState::Paused);
        assert_eq!(reg.depth(), 2);

        reg.deactivate(&mut doc, b).unwrap();
        assert_eq!(doc.active_element(), a_buttons[0]);
        assert_eq!(reg.active_trap(), Some(a));

        reg.deactivate(&mut doc, a).unwrap();
        assert_eq!(doc.active_element(), page_buttons[0]);
        assert!(!reg.is_trapped());
        assert_eq!(doc.listener_count(), 0);
    }

    #[test]
    fn user_pause_survives_pop_of_upper_trap() {
        let mut doc = Document::new();
        let (a, _) = region(&mut doc, 1);
        let (b, _) = region(&mut doc, 1);
        let mut reg = TrapRegistry::new();
        register(&mut reg, &mut doc, a);
        register(&mut reg, &mut doc, b);

        reg.activate(&mut doc, a).unwrap();
        reg.pause(&mut doc, a).unwrap();
        assert_eq!(reg.paused_trap(), Some(a));
        reg.activate(&mut doc, b).unwrap();
        reg.deactivate(&mut doc, b).unwrap();
        assert_eq!(reg.get(a).unwrap().state(), TrapState::Paused);
        assert_eq!(reg.active_trap(), None);

        reg.resume(&mut doc, a).unwrap();
        assert_eq!(reg.active_trap(), Some(a));
    }

    #[test]
    fn releasing_a_buried_trap_leaves_top_alone() {
        let mut doc = Document::new();
        let (a, _) = region(&mut doc, 1);
        let (b, b_buttons) = region(&mut doc, 1);
        let mut reg = TrapRegistry::new();
        register(&mut reg, &mut doc, a);
        register(&mut reg, &mut doc, b);
        reg.activate(&mut doc, a).unwrap();
        reg.activate(&mut doc, b).unwrap();

        reg.deactivate(&mut doc, a).unwrap();
        assert_eq!(doc.active_element(), b_buttons[0]);
        assert_eq!(reg.stack(), &[b]);
        assert_eq!(reg.active_trap(), Some(b));
        assert_eq!(reg.get(a).unwrap().state(), TrapState::Inactive);
    }

    #[test]
    fn reactivating_buried_trap_moves_it_to_top() {
        let mut doc = Document::new();
        let (a, _) = region(&mut doc, 1);
        let (b, _) = region(&mut doc, 1);
        let mut reg = TrapRegistry::new();
        register(&mut reg, &mut doc, a);
        register(&mut reg, &mut doc, b);
        reg.activate(&mut doc, a).unwrap();
        reg.activate(&mut doc, b).unwrap();
        reg.activate(&mut doc, a).unwrap();
        assert_eq!(reg.stack(), &[b, a]);
        assert_eq!(reg.active_trap(), Some(a));
        assert_eq!(reg.get(b).unwrap().state(), TrapState::Paused);
    }

    #[test]
    fn recreating_a_trap_replaces_the_old_one() {
        let mut doc = Document::new();
        let (a, _) = region(&mut doc, 1);
        let mut reg = TrapRegistry::new();
        register(&mut reg, &mut doc, a);
        reg.activate(&mut doc, a).unwrap();
        let old_owner = reg.get(a).unwrap().owner();

        register(&mut reg, &mut doc, a);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.depth(), 0);
        assert_ne!(reg.get(a).unwrap().owner(), old_owner);
        assert!(doc.listeners_of(old_owner).is_empty());
    }

    #[test]
    fn unknown_container_is_an_error() {
        let mut doc = Document::new();
        let (a, _) = region(&mut doc, 1);
        let mut reg = TrapRegistry::new();
        assert_eq!(reg.activate(&mut doc, a), Err(TrapError::UnknownTrap(a)));
    }
}
