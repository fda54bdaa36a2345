#![forbid(unsafe_code)]

//! The generic focus-trap controller.
//!
//! A [`FocusTrap`] confines keyboard focus to a container element. While
//! active it holds capture-phase `focusin`, `focusout` and `keydown`
//! listeners on the document (plus a `mousedown` listener for outside
//! presses) and:
//!
//! - wraps Tab at the last focusable element and Shift+Tab at the first;
//! - pulls focus back in when it lands outside the container;
//! - releases on Escape when configured to;
//! - restores the previously focused element when deactivated.
//!
//! # Invariants
//!
//! 1. Listeners exist exactly while the state is [`TrapState::Active`].
//! 2. `activate` on an active trap and `deactivate` on an inactive trap do
//!    nothing.
//! 3. Pausing keeps the focusable snapshot and the return target.
//!
//! # Failure Modes
//!
//! - A container with no focusable descendants receives focus itself (it is
//!   given `tabindex="-1"` if it has no tab index).
//! - If the return target was removed or hidden, focus falls back to `body`.
//! - The direction used to correct escaped focus is inferred from document
//!   order and can pick the wrong end with unusual `tabindex` layouts.

use std::cmp::Ordering;
use std::fmt;

use ftrap_core::focusable::{document_focus_order, focusable_elements};
use ftrap_core::{
    Document, DomEvent, EventKind, EventType, KeyCode, KeyEvent, ListenerId, ListenerTarget,
    NodeId, OwnerId,
};

use crate::error::TrapError;
use crate::options::{HookKind, TrapHooks, TrapOptions};
use crate::{Trap, TrapSignal, TrapState};

/// A listener a trap wants while it is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ListenerSpec {
    pub target: ListenerTarget,
    pub event: EventType,
    pub capture: bool,
}

impl ListenerSpec {
    pub(crate) const fn document_capture(event: EventType) -> Self {
        Self {
            target: ListenerTarget::Document,
            event,
            capture: true,
        }
    }

    pub(crate) const fn document_bubble(event: EventType) -> Self {
        Self {
            target: ListenerTarget::Document,
            event,
            capture: false,
        }
    }

    pub(crate) const fn node(node: NodeId, event: EventType) -> Self {
        Self {
            target: ListenerTarget::Node(node),
            event,
            capture: false,
        }
    }
}

/// Check that `container` can host a trap.
pub(crate) fn validate_container(doc: &Document, container: NodeId) -> Result<(), TrapError> {
    if doc.is_element(container) && container != doc.root() {
        Ok(())
    } else {
        Err(TrapError::InvalidContainer)
    }
}

/// Generic focus trap bound to one container.
pub struct FocusTrap {
    container: NodeId,
    owner: OwnerId,
    options: TrapOptions,
    hooks: TrapHooks,
    state: TrapState,
    focusable: Vec<NodeId>,
    start_element: Option<NodeId>,
    wanted: Vec<ListenerSpec>,
    installed: Vec<(ListenerSpec, ListenerId)>,
}

impl fmt::Debug for FocusTrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusTrap")
            .field("container", &self.container)
            .field("state", &self.state)
            .field("focusable", &self.focusable)
            .field("start_element", &self.start_element)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl FocusTrap {
    /// Create an inactive trap.
    ///
    /// Fails with [`TrapError::InvalidContainer`] for handles that are not
    /// elements of `doc`, text nodes, and the document root.
    pub fn new(doc: &mut Document, container: NodeId, options: TrapOptions) -> Result<Self, TrapError> {
        validate_container(doc, container)?;
        let mut wanted = vec![
            ListenerSpec::document_capture(EventType::FocusIn),
            ListenerSpec::document_capture(EventType::FocusOut),
            ListenerSpec::document_capture(EventType::KeyDown),
            ListenerSpec::document_capture(EventType::MouseDown),
        ];
        if options.click_outside_deactivates {
            wanted.push(ListenerSpec::document_bubble(EventType::Click));
        }
        Ok(Self {
            container,
            owner: doc.allocate_owner(),
            options,
            hooks: TrapHooks::default(),
            state: TrapState::Inactive,
            focusable: Vec::new(),
            start_element: None,
            wanted,
            installed: Vec::new(),
        })
    }

    /// Attach lifecycle callbacks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: TrapHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn options(&self) -> &TrapOptions {
        &self.options
    }

    /// Element focus returns to on deactivation.
    pub fn start_element(&self) -> Option<NodeId> {
        self.start_element
    }

    /// Add a listener to the set installed while active.
    ///
    /// Installs it right away if the trap is active. Duplicate requests for
    /// the same target and event are merged.
    pub(crate) fn listen(&mut self, doc: &mut Document, spec: ListenerSpec) {
        if self
            .wanted
            .iter()
            .any(|w| w.target == spec.target && w.event == spec.event)
        {
            return;
        }
        self.wanted.push(spec);
        if self.state == TrapState::Active {
            let id = doc.add_listener(spec.target, spec.event, spec.capture, self.owner);
            self.installed.push((spec, id));
        }
    }

    /// Drop a listener added with [`listen`](Self::listen).
    pub(crate) fn unlisten(&mut self, doc: &mut Document, target: ListenerTarget, event: EventType) {
        self.wanted
            .retain(|w| !(w.target == target && w.event == event));
        self.installed.retain(|(spec, id)| {
            let keep = !(spec.target == target && spec.event == event);
            if !keep {
                doc.remove_listener(*id);
            }
            keep
        });
    }

    fn install_listeners(&mut self, doc: &mut Document) {
        for spec in &self.wanted {
            let id = doc.add_listener(spec.target, spec.event, spec.capture, self.owner);
            self.installed.push((*spec, id));
        }
    }

    fn uninstall_listeners(&mut self, doc: &mut Document) {
        for (_, id) in self.installed.drain(..) {
            doc.remove_listener(id);
        }
    }

    /// Recompute the focusable snapshot.
    pub fn refresh(&mut self, doc: &Document) {
        self.focusable = focusable_elements(doc, self.container);
    }

    fn focus_container(&mut self, doc: &mut Document) -> bool {
        if !doc.has_attribute(self.container, "tabindex")
            && doc.set_attribute(self.container, "tabindex", "-1").is_err()
        {
            return false;
        }
        match doc.focus(self.container) {
            Ok(()) => true,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(container = %self.container, error = %_err, "container refused focus");
                false
            }
        }
    }

    fn focus_initial(&mut self, doc: &mut Document) {
        if let Some(initial) = self.options.initial_focus
            && doc.contains(self.container, initial)
            && doc.focus(initial).is_ok()
        {
            return;
        }
        if !self.focus_first(doc) {
            self.focus_container(doc);
        }
    }

    fn restore_focus(&mut self, doc: &mut Document, start: NodeId) {
        if let Err(_err) = doc.focus(start) {
            #[cfg(feature = "tracing")]
            tracing::debug!(target_node = %start, error = %_err, "return focus failed, falling back to body");
            doc.blur_to_body();
        }
    }

    fn on_key_down(&mut self, doc: &mut Document, event: &mut DomEvent, key: KeyEvent) -> TrapSignal {
        match key.code {
            KeyCode::Escape if self.options.escape_deactivates => {
                event.prevent_default();
                TrapSignal::Deactivate
            }
            KeyCode::Tab => {
                self.cycle_tab(doc, event, key.shift());
                TrapSignal::None
            }
            _ => TrapSignal::None,
        }
    }

    fn cycle_tab(&mut self, doc: &mut Document, event: &mut DomEvent, backward: bool) {
        self.refresh(doc);
        let (Some(&first), Some(&last)) = (self.focusable.first(), self.focusable.last()) else {
            event.prevent_default();
            self.focus_container(doc);
            return;
        };
        let active = doc.active_element();
        let destination = if !doc.contains(self.container, active) {
            Some(if backward { last } else { first })
        } else if self.focusable.contains(&active) {
            if backward && active == first {
                Some(last)
            } else if !backward && active == last {
                Some(first)
            } else {
                None
            }
        } else {
            // Inside the container but outside the tab sequence: the next
            // stop by document position, wrapping at either end.
            Some(self.next_by_position(doc, active, backward).unwrap_or(if backward {
                last
            } else {
                first
            }))
        };
        if let Some(node) = destination {
            event.prevent_default();
            self.move_focus(doc, node);
        }
    }

    /// Closest tab stop after (or before) `from` in document order.
    fn next_by_position(&self, doc: &Document, from: NodeId, backward: bool) -> Option<NodeId> {
        let side = if backward {
            Ordering::Less
        } else {
            Ordering::Greater
        };
        let mut candidates = self
            .focusable
            .iter()
            .copied()
            .filter(|&n| doc.compare_position(n, from) == Some(side));
        if backward {
            candidates.last()
        } else {
            candidates.next()
        }
    }

    fn move_focus(&self, doc: &mut Document, node: NodeId) {
        if let Err(_err) = doc.focus(node) {
            #[cfg(feature = "tracing")]
            tracing::debug!(container = %self.container, target_node = %node, error = %_err, "trap focus move failed");
        }
    }

    fn on_focus_in(&mut self, doc: &mut Document, target: NodeId) {
        if doc.contains(self.container, target) {
            return;
        }
        self.refresh(doc);
        let destination = match self.focusable.as_slice() {
            [] => None,
            [only] => Some(*only),
            [first, .., last] => Some(if self.escaped_backward(doc, target, *first) {
                *last
            } else {
                *first
            }),
        };
        #[cfg(feature = "tracing")]
        tracing::trace!(
            container = %self.container,
            escaped_to = %target,
            destination = ?destination,
            "focus escaped trap"
        );
        match destination {
            Some(node) => self.move_focus(doc, node),
            None => {
                self.focus_container(doc);
            }
        }
    }

    /// Guess whether focus left through the start of the container.
    ///
    /// Compares the escaped-to element with the container's first focusable
    /// element in global focus order. Elements before the container mean
    /// Shift+Tab ran off the front, so focus wraps to the last element.
    fn escaped_backward(&self, doc: &Document, target: NodeId, first: NodeId) -> bool {
        let order = document_focus_order(doc);
        let index = |n: NodeId| order.iter().position(|&o| o == n);
        match (index(target), index(first)) {
            (Some(t), Some(f)) => t < f,
            _ => doc.compare_position(target, self.container) == Some(Ordering::Less),
        }
    }

    fn on_focus_out(&mut self, doc: &mut Document, event: &DomEvent) {
        if self.options.pause_on_focus_lost
            && event.related().is_none()
            && !doc.has_window_focus()
            && doc.contains(self.container, event.target)
        {
            #[cfg(feature = "tracing")]
            tracing::debug!(container = %self.container, "focus left the page, pausing trap");
            self.pause(doc);
        }
    }

    fn on_mouse_down(&mut self, doc: &Document, event: &mut DomEvent) -> TrapSignal {
        if doc.contains(self.container, event.target) {
            return TrapSignal::None;
        }
        if self.options.click_outside_deactivates {
            TrapSignal::Deactivate
        } else {
            event.prevent_default();
            TrapSignal::None
        }
    }
}

impl Trap for FocusTrap {
    fn container(&self) -> NodeId {
        self.container
    }

    fn owner(&self) -> OwnerId {
        self.owner
    }

    fn state(&self) -> TrapState {
        self.state
    }

    fn activate(&mut self, doc: &mut Document) {
        match self.state {
            TrapState::Active => return,
            TrapState::Paused => {
                self.resume(doc);
                return;
            }
            TrapState::Inactive => {}
        }
        self.start_element = self.options.return_focus.then(|| doc.active_element());
        self.refresh(doc);
        self.state = TrapState::Active;
        self.install_listeners(doc);
        if self.options.auto_focus {
            self.focus_initial(doc);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(
            container = %self.container,
            focusable = self.focusable.len(),
            "focus trap activated"
        );
        self.hooks.fire(HookKind::Activate, self.container);
    }

    fn deactivate(&mut self, doc: &mut Document) {
        if self.state == TrapState::Inactive {
            return;
        }
        self.uninstall_listeners(doc);
        self.state = TrapState::Inactive;
        if let Some(start) = self.start_element.take()
            && self.options.return_focus
        {
            self.restore_focus(doc, start);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(container = %self.container, "focus trap deactivated");
        self.hooks.fire(HookKind::Deactivate, self.container);
    }

    fn pause(&mut self, doc: &mut Document) {
        if self.state != TrapState::Active {
            return;
        }
        self.uninstall_listeners(doc);
        self.state = TrapState::Paused;
        #[cfg(feature = "tracing")]
        tracing::debug!(container = %self.container, "focus trap paused");
        self.hooks.fire(HookKind::Pause, self.container);
    }

    fn resume(&mut self, doc: &mut Document) {
        if self.state != TrapState::Paused {
            return;
        }
        self.refresh(doc);
        self.install_listeners(doc);
        self.state = TrapState::Active;
        #[cfg(feature = "tracing")]
        tracing::debug!(container = %self.container, "focus trap resumed");
        self.hooks.fire(HookKind::Resume, self.container);
    }

    fn focus_first(&mut self, doc: &mut Document) -> bool {
        self.refresh(doc);
        self.focusable
            .first()
            .is_some_and(|&node| doc.focus(node).is_ok())
    }

    fn focus_last(&mut self, doc: &mut Document) -> bool {
        self.refresh(doc);
        self.focusable
            .last()
            .is_some_and(|&node| doc.focus(node).is_ok())
    }

    fn focusable_elements(&self) -> &[NodeId] {
        &self.focusable
    }

    fn handle_event(&mut self, doc: &mut Document, event: &mut DomEvent) -> TrapSignal {
        if self.state != TrapState::Active {
            return TrapSignal::None;
        }
        let kind = event.kind;
        match kind {
            EventKind::KeyDown(key) => self.on_key_down(doc, event, key),
            EventKind::FocusIn { .. } => {
                self.on_focus_in(doc, event.target);
                TrapSignal::None
            }
            EventKind::FocusOut { .. } => {
                self.on_focus_out(doc, event);
                TrapSignal::None
            }
            EventKind::MouseDown => self.on_mouse_down(doc, event),
            EventKind::Click => {
                if self.options.click_outside_deactivates
                    && !doc.contains(self.container, event.target)
                {
                    TrapSignal::Deactivate
                } else {
                    TrapSignal::None
                }
            }
        }
    }

    fn set_hooks(&mut self, hooks: TrapHooks) {
        self.hooks = hooks;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Fixture {
        doc: Document,
        outside: NodeId,
        container: NodeId,
        buttons: Vec<NodeId>,
    }

    fn fixture(n: usize) -> Fixture {
        let mut doc = Document::new();
        let body = doc.body();
        let outside = doc.create_element("button");
        doc.append_child(body, outside).unwrap();
        let container = doc.create_element("div");
        doc.append_child(body, container).unwrap();
        let buttons = (0..n)
            .map(|_| {
                let b = doc.create_element("button");
                doc.append_child(container, b).unwrap();
                b
            })
            .collect();
        doc.focus(outside).unwrap();
        Fixture {
            doc,
            outside,
            container,
            buttons,
        }
    }

    fn key(doc: &mut Document, trap: &mut FocusTrap, key: KeyEvent) -> (DomEvent, TrapSignal) {
        let mut event = DomEvent::new(EventKind::KeyDown(key), doc.active_element());
        let signal = trap.handle_event(doc, &mut event);
        (event, signal)
    }

    #[test]
    fn rejects_text_nodes_and_unknown_handles() {
        let mut doc = Document::new();
        let text = doc.create_text("x");
        assert_eq!(
            FocusTrap::new(&mut doc, text, TrapOptions::default()).unwrap_err(),
            TrapError::InvalidContainer
        );
        let mut other = Document::new();
        for _ in 0..5 {
            other.create_element("div");
        }
        let foreign = other.create_element("div");
        assert!(FocusTrap::new(&mut doc, foreign, TrapOptions::default()).is_err());
        let root = doc.root();
        assert!(FocusTrap::new(&mut doc, root, TrapOptions::default()).is_err());
    }

    #[test]
    fn activate_focuses_first_and_installs_listeners() {
        let Fixture {
            mut doc,
            outside,
            container,
            buttons,
        } = fixture(3);
        let mut trap = FocusTrap::new(&mut doc, container, TrapOptions::default()).unwrap();
        trap.activate(&mut doc);
        assert_eq!(doc.active_element(), buttons[0]);
        assert_eq!(trap.start_element(), Some(outside));
        assert_eq!(doc.listeners_of(trap.owner()).len(), 4);

        trap.activate(&mut doc);
        assert_eq!(doc.listeners_of(trap.owner()).len(), 4);
    }

    #[test]
    fn deactivate_restores_and_removes_listeners() {
        let Fixture {
            mut doc,
            outside,
            container,
            ..
        } = fixture(2);
        let mut trap = FocusTrap::new(&mut doc, container, TrapOptions::default()).unwrap();
        trap.activate(&mut doc);
        trap.deactivate(&mut doc);
        assert_eq!(doc.active_element(), outside);
        assert_eq!(doc.listener_count(), 0);
        assert_eq!(trap.state(), TrapState::Inactive);
    }

    #[test]
    fn restore_falls_back_to_body_when_start_removed() {
        let Fixture {
            mut doc,
            outside,
            container,
            ..
        } = fixture(1);
        let mut trap = FocusTrap::new(&mut doc, container, TrapOptions::default()).unwrap();
        trap.activate(&mut doc);
        doc.remove(outside).unwrap();
        trap.deactivate(&mut doc);
        assert_eq!(doc.active_element(), doc.body());
    }

    #[test]
    fn empty_container_focuses_itself() {
        let Fixture {
            mut doc, container, ..
        } = fixture(0);
        let mut trap = FocusTrap::new(&mut doc, container, TrapOptions::default()).unwrap();
        trap.activate(&mut doc);
        assert_eq!(doc.active_element(), container);
        assert_eq!(doc.attribute(container, "tabindex"), Some("-1"));
    }

    #[test]
    fn initial_focus_wins_over_first() {
        let Fixture {
            mut doc,
            container,
            buttons,
            ..
        } = fixture(3);
        let options = TrapOptions::default().initial_focus(buttons[2]);
        let mut trap = FocusTrap::new(&mut doc, container, options).unwrap();
        trap.activate(&mut doc);
        assert_eq!(doc.active_element(), buttons[2]);
    }

    #[test]
    fn tab_wraps_at_both_ends() {
        let Fixture {
            mut doc,
            container,
            buttons,
            ..
        } = fixture(3);
        let mut trap = FocusTrap::new(&mut doc, container, TrapOptions::default()).unwrap();
        trap.activate(&mut doc);

        doc.focus(buttons[2]).unwrap();
        let (event, _) = key(&mut doc, &mut trap, KeyEvent::tab());
        assert!(event.default_prevented());
        assert_eq!(doc.active_element(), buttons[0]);

        let (event, _) = key(&mut doc, &mut trap, KeyEvent::shift_tab());
        assert!(event.default_prevented());
        assert_eq!(doc.active_element(), buttons[2]);

        doc.focus(buttons[1]).unwrap();
        let (event, _) = key(&mut doc, &mut trap, KeyEvent::tab());
        assert!(!event.default_prevented());
        assert_eq!(doc.active_element(), buttons[1]);
    }

    #[test]
    fn escape_signals_deactivation() {
        let Fixture {
            mut doc, container, ..
        } = fixture(1);
        let mut trap = FocusTrap::new(&mut doc, container, TrapOptions::default()).unwrap();
        trap.activate(&mut doc);
        let (event, signal) = key(&mut doc, &mut trap, KeyEvent::escape());
        assert_eq!(signal, TrapSignal::Deactivate);
        assert!(event.default_prevented());

        let options = TrapOptions::default().escape_deactivates(false);
        let mut quiet = FocusTrap::new(&mut doc, container, options).unwrap();
        quiet.activate(&mut doc);
        let (_, signal) = key(&mut doc, &mut quiet, KeyEvent::escape());
        assert_eq!(signal, TrapSignal::None);
    }

    #[test]
    fn pause_keeps_snapshot_and_start() {
        let Fixture {
            mut doc,
            outside,
            container,
            buttons,
        } = fixture(2);
        let mut trap = FocusTrap::new(&mut doc, container, TrapOptions::default()).unwrap();
        trap.activate(&mut doc);
        trap.pause(&mut doc);
        assert_eq!(trap.state(), TrapState::Paused);
        assert_eq!(doc.listener_count(), 0);
        assert_eq!(trap.focusable_elements(), buttons.as_slice());
        assert_eq!(trap.start_element(), Some(outside));

        trap.resume(&mut doc);
        assert_eq!(trap.state(), TrapState::Active);
        assert_eq!(doc.listeners_of(trap.owner()).len(), 4);
    }

    #[test]
    fn escaped_focus_wraps_by_direction() {
        let mut doc = Document::new();
        let body = doc.body();
        let before = doc.create_element("button");
        let container = doc.create_element("div");
        let after = doc.create_element("button");
        doc.append_child(body, before).unwrap();
        doc.append_child(body, container).unwrap();
        doc.append_child(body, after).unwrap();
        let inner: Vec<_> = (0..3)
            .map(|_| {
                let b = doc.create_element("button");
                doc.append_child(container, b).unwrap();
                b
            })
            .collect();
        let mut trap = FocusTrap::new(&mut doc, container, TrapOptions::default()).unwrap();
        trap.activate(&mut doc);

        doc.focus(after).unwrap();
        let mut event = DomEvent::new(EventKind::FocusIn { related: None }, after);
        let _ = trap.handle_event(&mut doc, &mut event);
        assert_eq!(doc.active_element(), inner[0]);

        doc.focus(before).unwrap();
        let mut event = DomEvent::new(EventKind::FocusIn { related: None }, before);
        let _ = trap.handle_event(&mut doc, &mut event);
        assert_eq!(doc.active_element(), inner[2]);
    }

    #[test]
    fn outside_press_is_prevented_unless_it_deactivates() {
        let Fixture {
            mut doc,
            outside,
            container,
            ..
        } = fixture(1);
        let mut trap = FocusTrap::new(&mut doc, container, TrapOptions::default()).unwrap();
        trap.activate(&mut doc);
        let mut press = DomEvent::new(EventKind::MouseDown, outside);
        assert_eq!(trap.handle_event(&mut doc, &mut press), TrapSignal::None);
        assert!(press.default_prevented());

        let options = TrapOptions::default().click_outside_deactivates(true);
        let mut loose = FocusTrap::new(&mut doc, container, options).unwrap();
        loose.activate(&mut doc);
        let mut press = DomEvent::new(EventKind::MouseDown, outside);
        assert_eq!(
            loose.handle_event(&mut doc, &mut press),
            TrapSignal::Deactivate
        );
        assert!(!press.default_prevented());
    }
}
