#![forbid(unsafe_code)]

//! Page runtime: owns a [`Document`] and routes its events.
//!
//! The document only records listeners and queues focus events. A [`Page`]
//! plays the part of the browser event loop: it simulates input
//! (`press_key`, `click`, `focus`, `blur_window`), dispatches every event
//! along its route to the trap registry and the focus helpers, runs the
//! default actions that were not prevented, and drains the focus events
//! those handlers cause.
//!
//! # Invariants
//!
//! 1. Every public operation returns with the event queue empty.
//! 2. A listener removed while an event is in flight is not called for the
//!    rest of that dispatch.
//! 3. A single flush delivers at most [`MAX_EVENTS_PER_FLUSH`] events;
//!    anything beyond is dropped with a warning, so components that keep
//!    moving focus back and forth cannot hang the page.

use ahash::AHashMap;
use ftrap_core::focusable::is_programmatically_focusable;
use ftrap_core::{Document, DomError, DomEvent, EventKind, KeyCode, KeyEvent, NodeId, OwnerId};
use web_time::{Duration, Instant};

use crate::dialog::{DialogAction, DialogOptions, ModalDialog};
use crate::drawer::{DrawerOptions, DrawerTrap};
use crate::error::TrapError;
use crate::guard::FocusGuard;
use crate::lock::FocusLock;
use crate::modal::{ModalOptions, ModalTrap};
use crate::options::{TrapHooks, TrapOptions};
use crate::registry::TrapRegistry;
use crate::ring::{FocusRing, FocusRingOptions};
use crate::trap::FocusTrap;
use crate::Trap;

/// Maximum number of queued events delivered by one flush.
pub const MAX_EVENTS_PER_FLUSH: usize = 256;

/// Handle to a [`ModalDialog`] on a [`Page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DialogId(usize);

/// Handle to a [`FocusRing`] on a [`Page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RingId(usize);

/// Handle to a [`FocusGuard`] on a [`Page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GuardId(usize);

/// Handle to a [`FocusLock`] on a [`Page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockId(usize);

/// Listener owners that are not traps.
#[derive(Debug, Clone, Copy)]
enum Component {
    Ring(usize),
    Guard(usize),
    Lock(usize),
    Dialog(usize),
}

/// A document plus everything listening to it.
#[derive(Debug, Default)]
pub struct Page {
    doc: Document,
    traps: TrapRegistry,
    rings: Vec<Option<FocusRing>>,
    guards: Vec<Option<FocusGuard>>,
    locks: Vec<Option<FocusLock>>,
    dialogs: Vec<Option<ModalDialog>>,
    components: AHashMap<OwnerId, Component>,
    dropped_events: usize,
    last_poll: Option<Instant>,
}

impl Page {
    /// A page with an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// A page around an existing document.
    pub fn with_document(doc: Document) -> Self {
        let mut page = Self {
            doc,
            ..Self::default()
        };
        page.flush();
        page
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    /// Mutable access for building markup.
    ///
    /// Focus changes made through this handle are delivered on the next page
    /// operation.
    pub fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn traps(&self) -> &TrapRegistry {
        &self.traps
    }

    /// `document.activeElement`.
    pub fn active_element(&self) -> NodeId {
        self.doc.active_element()
    }

    /// Events dropped by the flush cap since the page was created.
    pub fn dropped_events(&self) -> usize {
        self.dropped_events
    }

    // --- Traps ----------------------------------------------------------

    /// Register a generic trap for `container`, replacing any existing one.
    pub fn create_trap(&mut self, container: NodeId, options: TrapOptions) -> Result<NodeId, TrapError> {
        self.create_trap_with_hooks(container, options, TrapHooks::default())
    }

    pub fn create_trap_with_hooks(
        &mut self,
        container: NodeId,
        options: TrapOptions,
        hooks: TrapHooks,
    ) -> Result<NodeId, TrapError> {
        let trap = FocusTrap::new(&mut self.doc, container, options)?.with_hooks(hooks);
        self.insert_trap(Box::new(trap))
    }

    /// Register a trap for the element whose `id` attribute is `dom_id`.
    pub fn create_trap_by_id(&mut self, dom_id: &str, options: TrapOptions) -> Result<NodeId, TrapError> {
        let container = self
            .doc
            .element_by_id(dom_id)
            .ok_or(TrapError::InvalidContainer)?;
        self.create_trap(container, options)
    }

    /// Register a trap configured by the container's `data-trap-*` attributes.
    pub fn create_trap_from_dataset(&mut self, container: NodeId) -> Result<NodeId, TrapError> {
        let options = TrapOptions::from_dataset(&self.doc, container);
        self.create_trap(container, options)
    }

    pub fn create_modal_trap(
        &mut self,
        container: NodeId,
        options: TrapOptions,
        modal: ModalOptions,
    ) -> Result<NodeId, TrapError> {
        let trap = ModalTrap::new(&mut self.doc, container, options, modal)?;
        self.insert_trap(Box::new(trap))
    }

    pub fn create_drawer_trap(
        &mut self,
        container: NodeId,
        options: TrapOptions,
        drawer: DrawerOptions,
    ) -> Result<NodeId, TrapError> {
        let trap = DrawerTrap::new(&mut self.doc, container, options, drawer)?;
        self.insert_trap(Box::new(trap))
    }

    /// Register any [`Trap`] implementation. Returns its container.
    ///
    /// Dialog overlays are rejected; their trap belongs to the dialog.
    pub fn insert_trap(&mut self, trap: Box<dyn Trap>) -> Result<NodeId, TrapError> {
        self.ensure_not_dialog(trap.container())?;
        let container = self.traps.insert(&mut self.doc, trap);
        self.flush();
        Ok(container)
    }

    /// Deactivate and unregister the trap for `container`.
    ///
    /// Use [`destroy_dialog`](Self::destroy_dialog) for a dialog's trap.
    pub fn remove_trap(&mut self, container: NodeId) -> Result<(), TrapError> {
        self.ensure_not_dialog(container)?;
        self.traps
            .remove(&mut self.doc, container)
            .ok_or(TrapError::UnknownTrap(container))?;
        self.trap_released(container);
        self.flush();
        Ok(())
    }

    pub fn activate_trap(&mut self, container: NodeId) -> Result<(), TrapError> {
        let result = self.traps.activate(&mut self.doc, container);
        self.flush();
        result
    }

    pub fn deactivate_trap(&mut self, container: NodeId) -> Result<(), TrapError> {
        let result = self.traps.deactivate(&mut self.doc, container);
        if result.is_ok() {
            self.trap_released(container);
        }
        self.flush();
        result
    }

    pub fn pause_trap(&mut self, container: NodeId) -> Result<(), TrapError> {
        let result = self.traps.pause(&mut self.doc, container);
        self.flush();
        result
    }

    pub fn resume_trap(&mut self, container: NodeId) -> Result<(), TrapError> {
        let result = self.traps.resume(&mut self.doc, container);
        self.flush();
        result
    }

    pub fn focus_first(&mut self, container: NodeId) -> Result<bool, TrapError> {
        let result = self.traps.focus_first(&mut self.doc, container);
        self.flush();
        result
    }

    pub fn focus_last(&mut self, container: NodeId) -> Result<bool, TrapError> {
        let result = self.traps.focus_last(&mut self.doc, container);
        self.flush();
        result
    }

    fn ensure_not_dialog(&self, container: NodeId) -> Result<(), TrapError> {
        if self.dialogs.iter().flatten().any(|d| d.overlay() == container) {
            return Err(TrapError::DialogContainer(container));
        }
        Ok(())
    }

    /// A trap stopped on its own or was stopped by the caller.
    fn trap_released(&mut self, container: NodeId) {
        for dialog in self.dialogs.iter_mut().flatten() {
            if dialog.overlay() == container {
                dialog.begin_close(&mut self.doc);
            }
        }
    }

    // --- Input ----------------------------------------------------------

    /// Press a key on the focused element.
    ///
    /// Tab and Shift+Tab move focus through the document unless a listener
    /// prevented the default action. Returns the dispatched `keydown`.
    pub fn press_key(&mut self, key: KeyEvent) -> DomEvent {
        let target = self.doc.active_element();
        let event = self.dispatch(DomEvent::new(EventKind::KeyDown(key), target));
        self.flush();
        if key.code == KeyCode::Tab && !event.default_prevented() {
            let from = self.doc.active_element();
            match self.doc.next_in_sequence(from, key.shift()) {
                Some(next) => {
                    if let Err(_err) = self.doc.focus(next) {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(next = %next, error = %_err, "sequential focus failed");
                    }
                }
                None => self.doc.blur_to_body(),
            }
            self.flush();
        }
        event
    }

    /// Click `target`: `mousedown`, pointer focus, then `click`.
    ///
    /// Pointer focus goes to the nearest focusable inclusive ancestor of the
    /// target, or to `body` when there is none, unless the `mousedown` was
    /// prevented. Returns the dispatched `click`.
    pub fn click(&mut self, target: NodeId) -> Result<DomEvent, TrapError> {
        if !self.doc.exists(target) {
            return Err(DomError::UnknownNode(target).into());
        }
        let press = self.dispatch(DomEvent::new(EventKind::MouseDown, target));
        self.flush();
        if !press.default_prevented() {
            self.pointer_focus(target);
            self.flush();
        }
        let click = self.dispatch(DomEvent::new(EventKind::Click, target));
        self.flush();
        Ok(click)
    }

    fn pointer_focus(&mut self, target: NodeId) {
        let body = self.doc.body();
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            if node == body {
                break;
            }
            if is_programmatically_focusable(&self.doc, node) {
                if self.doc.focus(node).is_ok() {
                    return;
                }
                break;
            }
            cursor = self.doc.parent(node);
        }
        self.doc.blur_to_body();
    }

    /// `element.focus()` followed by delivery of the resulting events.
    pub fn focus(&mut self, id: NodeId) -> Result<(), TrapError> {
        let result = self.doc.focus(id);
        self.flush();
        result.map_err(TrapError::from)
    }

    /// The window lost focus: `focusout` with no related target, focus to
    /// `body`.
    pub fn blur_window(&mut self) {
        self.doc.blur_window();
        self.flush();
    }

    /// Advance time-based state (dialog close transitions) by `delta`.
    pub fn tick(&mut self, delta: Duration) {
        for dialog in self.dialogs.iter_mut().flatten() {
            dialog.tick(&mut self.doc, delta);
        }
        self.flush();
    }

    /// [`tick`](Self::tick) by the wall-clock time since the previous poll.
    pub fn poll(&mut self) {
        let now = Instant::now();
        let delta = self
            .last_poll
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.last_poll = Some(now);
        self.tick(delta);
    }

    // --- Dialogs --------------------------------------------------------

    pub fn create_dialog(&mut self, options: DialogOptions) -> Result<DialogId, TrapError> {
        self.build_dialog(options, None)
    }

    /// A dialog opened by clicking `trigger`.
    pub fn create_dialog_for(
        &mut self,
        trigger: NodeId,
        options: DialogOptions,
    ) -> Result<DialogId, TrapError> {
        if !self.doc.is_element(trigger) {
            return Err(DomError::NotAnElement(trigger).into());
        }
        self.build_dialog(options, Some(trigger))
    }

    fn build_dialog(
        &mut self,
        options: DialogOptions,
        trigger: Option<NodeId>,
    ) -> Result<DialogId, TrapError> {
        let (dialog, trap) = ModalDialog::build(&mut self.doc, options, trigger)?;
        self.traps.insert(&mut self.doc, Box::new(trap));
        let index = self.dialogs.len();
        self.components
            .insert(dialog.owner(), Component::Dialog(index));
        self.dialogs.push(Some(dialog));
        self.flush();
        Ok(DialogId(index))
    }

    /// Turn every element carrying `data-modal-title` into a dialog trigger.
    ///
    /// The dialog body comes from `data-modal-content`. Elements that already
    /// trigger a dialog are skipped. Returns the new dialogs.
    pub fn bind_triggers(&mut self) -> Result<Vec<DialogId>, TrapError> {
        let mut created = Vec::new();
        for trigger in self.doc.elements_with_attribute("data-modal-title") {
            let bound = self
                .dialogs
                .iter()
                .flatten()
                .any(|d| d.trigger() == Some(trigger));
            if bound {
                continue;
            }
            let title = self.doc.dataset(trigger, "modalTitle").unwrap_or_default();
            let content = self
                .doc
                .dataset(trigger, "modalContent")
                .unwrap_or_default();
            let options = DialogOptions::new(title, content);
            created.push(self.build_dialog(options, Some(trigger))?);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(count = created.len(), "dialog triggers bound");
        Ok(created)
    }

    pub fn dialog(&self, id: DialogId) -> Option<&ModalDialog> {
        self.dialogs.get(id.0).and_then(Option::as_ref)
    }

    /// Open a dialog. No-op when already open.
    pub fn open_dialog(&mut self, id: DialogId) -> Result<(), TrapError> {
        let result = self.open_dialog_at(id.0);
        self.flush();
        result
    }

    /// Close a dialog. No-op when not open.
    pub fn close_dialog(&mut self, id: DialogId) -> Result<(), TrapError> {
        let result = self.close_dialog_at(id.0);
        self.flush();
        result
    }

    /// Close a dialog, remove its markup and unregister its trap.
    pub fn destroy_dialog(&mut self, id: DialogId) -> Result<(), TrapError> {
        let mut dialog = self
            .dialogs
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(TrapError::UnknownHandle(id.0))?;
        self.traps.remove(&mut self.doc, dialog.overlay());
        self.components.remove(&dialog.owner());
        dialog.teardown(&mut self.doc);
        self.flush();
        Ok(())
    }

    fn open_dialog_at(&mut self, index: usize) -> Result<(), TrapError> {
        let dialog = dialog_slot(&mut self.dialogs, index)?;
        if dialog.is_open() {
            return Ok(());
        }
        let overlay = dialog.overlay();
        dialog.show(&mut self.doc)?;
        if let Err(err) = self.traps.activate(&mut self.doc, overlay) {
            dialog.cancel_show(&mut self.doc);
            return Err(err);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(overlay = %overlay, "dialog opened");
        Ok(())
    }

    fn close_dialog_at(&mut self, index: usize) -> Result<(), TrapError> {
        let dialog = dialog_slot(&mut self.dialogs, index)?;
        if !dialog.is_open() {
            return Ok(());
        }
        let overlay = dialog.overlay();
        self.traps.deactivate(&mut self.doc, overlay)?;
        self.trap_released(overlay);
        Ok(())
    }

    // --- Focus helpers --------------------------------------------------

    pub fn install_focus_ring(&mut self, options: FocusRingOptions) -> Result<RingId, TrapError> {
        let mut ring = FocusRing::new(&mut self.doc, options);
        ring.install(&mut self.doc)?;
        let index = self.rings.len();
        self.components.insert(ring.owner(), Component::Ring(index));
        self.rings.push(Some(ring));
        Ok(RingId(index))
    }

    /// Remove the ring overlay. The handle is invalid afterwards.
    pub fn uninstall_focus_ring(&mut self, id: RingId) -> Result<(), TrapError> {
        let mut ring = take_slot(&mut self.rings, id.0)?;
        ring.uninstall(&mut self.doc);
        self.components.remove(&ring.owner());
        Ok(())
    }

    pub fn focus_ring(&self, id: RingId) -> Option<&FocusRing> {
        self.rings.get(id.0).and_then(Option::as_ref)
    }

    /// Guard `container`, returning focus to `start` (or its first focusable
    /// element) whenever focus leaves it.
    pub fn install_focus_guard(
        &mut self,
        container: NodeId,
        start: Option<NodeId>,
    ) -> Result<GuardId, TrapError> {
        let mut guard = FocusGuard::new(&mut self.doc, container, start)?;
        guard.install(&mut self.doc);
        let index = self.guards.len();
        self.components
            .insert(guard.owner(), Component::Guard(index));
        self.guards.push(Some(guard));
        Ok(GuardId(index))
    }

    pub fn uninstall_focus_guard(&mut self, id: GuardId) -> Result<(), TrapError> {
        let mut guard = take_slot(&mut self.guards, id.0)?;
        guard.uninstall(&mut self.doc);
        self.components.remove(&guard.owner());
        Ok(())
    }

    pub fn focus_guard(&self, id: GuardId) -> Option<&FocusGuard> {
        self.guards.get(id.0).and_then(Option::as_ref)
    }

    /// Restrict focus to `elements`.
    pub fn install_focus_lock(&mut self, elements: Vec<NodeId>) -> LockId {
        let mut lock = FocusLock::new(&mut self.doc, elements);
        lock.install(&mut self.doc);
        let index = self.locks.len();
        self.components.insert(lock.owner(), Component::Lock(index));
        self.locks.push(Some(lock));
        LockId(index)
    }

    pub fn uninstall_focus_lock(&mut self, id: LockId) -> Result<(), TrapError> {
        let mut lock = take_slot(&mut self.locks, id.0)?;
        lock.uninstall(&mut self.doc);
        self.components.remove(&lock.owner());
        Ok(())
    }

    pub fn focus_lock(&self, id: LockId) -> Option<&FocusLock> {
        self.locks.get(id.0).and_then(Option::as_ref)
    }

    // --- Dispatch -------------------------------------------------------

    /// Run `event` through its route. Returns it with the flags listeners set.
    fn dispatch(&mut self, mut event: DomEvent) -> DomEvent {
        for listener in self.doc.route(&event) {
            if !self.doc.is_listening(listener.id) {
                continue;
            }
            self.deliver(listener.owner, &mut event);
        }
        event
    }

    fn deliver(&mut self, owner: OwnerId, event: &mut DomEvent) {
        if self.traps.container_of(owner).is_some() {
            if let Some(released) = self.traps.handle_event(&mut self.doc, owner, event) {
                self.trap_released(released);
            }
            return;
        }
        match self.components.get(&owner).copied() {
            Some(Component::Ring(index)) => {
                if let Some(Some(ring)) = self.rings.get_mut(index) {
                    ring.handle_event(&mut self.doc, event);
                }
            }
            Some(Component::Guard(index)) => {
                if let Some(Some(guard)) = self.guards.get_mut(index) {
                    guard.handle_event(&mut self.doc, event);
                }
            }
            Some(Component::Lock(index)) => {
                if let Some(Some(lock)) = self.locks.get_mut(index) {
                    lock.handle_event(&mut self.doc, event);
                }
            }
            Some(Component::Dialog(index)) => {
                let action = match self.dialogs.get(index) {
                    Some(Some(dialog)) => dialog.handle_event(&self.doc, event),
                    _ => DialogAction::None,
                };
                let result = match action {
                    DialogAction::Open => self.open_dialog_at(index),
                    DialogAction::Close => self.close_dialog_at(index),
                    DialogAction::None => Ok(()),
                };
                if let Err(_err) = result {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(dialog = index, error = %_err, "dialog action failed");
                }
            }
            None => {}
        }
    }

    /// Deliver queued focus events until the queue is empty or the cap is hit.
    fn flush(&mut self) {
        let mut delivered = 0usize;
        while let Some(event) = self.doc.take_pending() {
            if delivered == MAX_EVENTS_PER_FLUSH {
                let mut dropped = 1;
                while self.doc.take_pending().is_some() {
                    dropped += 1;
                }
                self.dropped_events += dropped;
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    delivered,
                    dropped,
                    "event flush limit reached, dropping queued events"
                );
                return;
            }
            delivered += 1;
            self.dispatch(event);
        }
    }
}

fn dialog_slot(dialogs: &mut [Option<ModalDialog>], index: usize) -> Result<&mut ModalDialog, TrapError> {
    dialogs
        .get_mut(index)
        .and_then(Option::as_mut)
        .ok_or(TrapError::UnknownHandle(index))
}

fn take_slot<T>(slots: &mut [Option<T>], index: usize) -> Result<T, TrapError> {
    slots
        .get_mut(index)
        .and_then(Option::take)
        .ok_or(TrapError::UnknownHandle(index))
}
