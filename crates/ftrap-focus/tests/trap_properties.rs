#![forbid(unsafe_code)]

//! End-to-end focus trap properties, driven through the page runtime.
//!
//! # Invariants tested
//!
//! 1. After activation with auto focus, focus is inside the container.
//! 2. Tab on the last element wraps to the first; Shift+Tab on the first
//!    wraps to the last.
//! 3. Deactivation restores the element focused before activation.
//! 4. Activation is idempotent; deactivating an inactive trap is a no-op.
//! 5. Invalid containers are rejected with the invalid-container error.
//! 6. An empty container focuses itself.
//! 7. Activating a second trap makes it the only one confining focus.

use std::cell::RefCell;
use std::rc::Rc;

use ftrap_core::{Document, KeyCode, KeyEvent, NodeId};
use ftrap_focus::{Page, TrapError, TrapHooks, TrapOptions, TrapState};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn element(page: &mut Page, parent: NodeId, tag: &str) -> NodeId {
    let doc = page.doc_mut();
    let node = doc.create_element(tag);
    doc.append_child(parent, node).unwrap();
    node
}

/// `body > button#before, div.container > button * n, button#after`
struct Layout {
    page: Page,
    before: NodeId,
    container: NodeId,
    inner: Vec<NodeId>,
    after: NodeId,
}

fn layout(n: usize) -> Layout {
    let mut page = Page::new();
    let body = page.doc().body();
    let before = element(&mut page, body, "button");
    let container = element(&mut page, body, "div");
    let inner = (0..n).map(|_| element(&mut page, container, "button")).collect();
    let after = element(&mut page, body, "button");
    page.focus(before).unwrap();
    Layout {
        page,
        before,
        container,
        inner,
        after,
    }
}

// ===========================================================================
// Activation and return focus
// ===========================================================================

#[test]
fn activation_moves_focus_inside() {
    let Layout {
        mut page,
        container,
        inner,
        ..
    } = layout(3);
    page.create_trap(container, TrapOptions::default()).unwrap();
    page.activate_trap(container).unwrap();
    assert_eq!(page.active_element(), inner[0]);
    assert!(page.doc().contains(container, page.active_element()));
}

#[test]
fn deactivation_restores_previous_focus() {
    let Layout {
        mut page,
        before,
        container,
        ..
    } = layout(2);
    page.create_trap(container, TrapOptions::default()).unwrap();
    page.activate_trap(container).unwrap();
    page.deactivate_trap(container).unwrap();
    assert_eq!(page.active_element(), before);
    assert_eq!(page.doc().listener_count(), 0);
}

#[test]
fn return_focus_can_be_disabled() {
    let Layout {
        mut page,
        container,
        inner,
        ..
    } = layout(2);
    let options = TrapOptions::default().return_focus(false);
    page.create_trap(container, options).unwrap();
    page.activate_trap(container).unwrap();
    page.deactivate_trap(container).unwrap();
    assert_eq!(page.active_element(), inner[0]);
}

#[test]
fn detached_return_target_falls_back_to_body() {
    let Layout {
        mut page,
        before,
        container,
        ..
    } = layout(1);
    page.create_trap(container, TrapOptions::default()).unwrap();
    page.activate_trap(container).unwrap();
    page.doc_mut().remove(before).unwrap();
    page.deactivate_trap(container).unwrap();
    assert_eq!(page.active_element(), page.doc().body());
}

#[test]
fn activate_twice_equals_once_and_deactivate_is_idempotent() {
    let Layout {
        mut page,
        before,
        container,
        ..
    } = layout(2);
    let activations = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&activations);
    let hooks = TrapHooks::new().on_activate(move |_| *counter.borrow_mut() += 1);
    page.create_trap_with_hooks(container, TrapOptions::default(), hooks)
        .unwrap();

    page.activate_trap(container).unwrap();
    let listeners = page.doc().listener_count();
    page.activate_trap(container).unwrap();
    assert_eq!(*activations.borrow(), 1);
    assert_eq!(page.doc().listener_count(), listeners);
    assert_eq!(page.traps().depth(), 1);

    page.deactivate_trap(container).unwrap();
    page.deactivate_trap(container).unwrap();
    assert_eq!(page.active_element(), before);
    assert_eq!(page.traps().depth(), 0);
}

#[test]
fn auto_focus_off_leaves_focus_alone() {
    let Layout {
        mut page,
        before,
        container,
        inner,
        ..
    } = layout(2);
    page.create_trap(container, TrapOptions::default().auto_focus(false))
        .unwrap();
    page.activate_trap(container).unwrap();
    assert_eq!(page.active_element(), before);

    // The first Tab pulls focus in.
    page.press_key(KeyEvent::tab());
    assert_eq!(page.active_element(), inner[0]);
}

// ===========================================================================
// Invalid containers
// ===========================================================================

#[test]
fn invalid_containers_are_rejected() {
    let mut page = Page::new();
    let text = page.doc_mut().create_text("not an element");
    let root = page.doc().root();

    let mut elsewhere = Document::new();
    for _ in 0..16 {
        elsewhere.create_element("div");
    }
    let dangling = elsewhere.create_element("div");

    for candidate in [text, root, dangling] {
        let err = page
            .create_trap(candidate, TrapOptions::default())
            .unwrap_err();
        assert_eq!(err, TrapError::InvalidContainer);
        assert_eq!(
            err.to_string(),
            "Focus trap requires a valid container element"
        );
    }
    assert_eq!(
        page.create_trap_by_id("a string", TrapOptions::default()),
        Err(TrapError::InvalidContainer)
    );
    assert!(page.traps().is_empty());
}

#[test]
fn operations_on_unregistered_containers_fail() {
    let Layout {
        mut page, container, ..
    } = layout(1);
    assert_eq!(
        page.activate_trap(container),
        Err(TrapError::UnknownTrap(container))
    );
    assert_eq!(
        page.remove_trap(container),
        Err(TrapError::UnknownTrap(container))
    );
}

// ===========================================================================
// Empty containers and escape correction
// ===========================================================================

#[test]
fn empty_container_receives_focus_itself() {
    let Layout {
        mut page, container, ..
    } = layout(0);
    page.create_trap(container, TrapOptions::default()).unwrap();
    page.activate_trap(container).unwrap();
    assert_eq!(page.active_element(), container);
    assert_ne!(page.active_element(), page.doc().body());

    // Tab has nowhere to go and stays on the container.
    let event = page.press_key(KeyEvent::tab());
    assert!(event.default_prevented());
    assert_eq!(page.active_element(), container);
}

#[test]
fn programmatic_escape_is_corrected() {
    let Layout {
        mut page,
        container,
        inner,
        after,
        before,
    } = layout(3);
    page.create_trap(container, TrapOptions::default()).unwrap();
    page.activate_trap(container).unwrap();

    page.focus(after).unwrap();
    assert_eq!(page.active_element(), inner[0]);

    page.focus(before).unwrap();
    assert_eq!(page.active_element(), inner[2]);
}

#[test]
fn window_blur_then_tab_returns_inside() {
    let Layout {
        mut page,
        container,
        inner,
        ..
    } = layout(2);
    page.create_trap(container, TrapOptions::default()).unwrap();
    page.activate_trap(container).unwrap();
    page.blur_window();
    assert_eq!(page.active_element(), page.doc().body());

    page.press_key(KeyEvent::shift_tab());
    assert_eq!(page.active_element(), inner[1]);
}

#[test]
fn pause_on_focus_lost_pauses_instead_of_correcting() {
    let Layout {
        mut page,
        container,
        after,
        ..
    } = layout(2);
    let options = TrapOptions::default().pause_on_focus_lost(true);
    page.create_trap(container, options).unwrap();
    page.activate_trap(container).unwrap();

    page.blur_window();
    assert_eq!(page.traps().paused_trap(), Some(container));

    // Paused traps do not correct focus.
    page.focus(after).unwrap();
    assert_eq!(page.active_element(), after);

    page.resume_trap(container).unwrap();
    assert_eq!(page.traps().active_trap(), Some(container));
    page.press_key(KeyEvent::tab());
    assert!(page.doc().contains(container, page.active_element()));
}

#[test]
fn press_on_plain_content_does_not_pause() {
    let Layout {
        mut page,
        container,
        ..
    } = layout(2);
    let paragraph = element(&mut page, container, "p");
    let options = TrapOptions::default().pause_on_focus_lost(true);
    page.create_trap(container, options).unwrap();
    page.activate_trap(container).unwrap();

    page.click(paragraph).unwrap();
    assert_eq!(page.active_element(), page.doc().body());
    assert_eq!(
        page.traps().get(container).unwrap().state(),
        TrapState::Active
    );

    page.blur_window();
    assert_eq!(
        page.traps().get(container).unwrap().state(),
        TrapState::Active
    );
    page.press_key(KeyEvent::tab());
    page.blur_window();
    assert_eq!(page.traps().paused_trap(), Some(container));
}

#[test]
fn tab_from_untabbable_element_moves_to_next_stop() {
    let mut page = Page::new();
    let body = page.doc().body();
    let container = element(&mut page, body, "div");
    let b0 = element(&mut page, container, "button");
    let note = element(&mut page, container, "div");
    page.doc_mut().set_attribute(note, "tabindex", "-1").unwrap();
    let b1 = element(&mut page, container, "button");
    let b2 = element(&mut page, container, "button");
    page.create_trap(container, TrapOptions::default()).unwrap();
    page.activate_trap(container).unwrap();

    page.focus(note).unwrap();
    page.press_key(KeyEvent::tab());
    assert_eq!(page.active_element(), b1);

    page.focus(note).unwrap();
    page.press_key(KeyEvent::shift_tab());
    assert_eq!(page.active_element(), b0);

    // The container itself sits before all of its tab stops.
    page.doc_mut()
        .set_attribute(container, "tabindex", "-1")
        .unwrap();
    page.focus(container).unwrap();
    page.press_key(KeyEvent::tab());
    assert_eq!(page.active_element(), b0);
    page.focus(container).unwrap();
    page.press_key(KeyEvent::shift_tab());
    assert_eq!(page.active_element(), b2);
}

#[test]
fn untabbable_element_after_last_stop_wraps() {
    let mut page = Page::new();
    let body = page.doc().body();
    let container = element(&mut page, body, "div");
    let b0 = element(&mut page, container, "button");
    let b1 = element(&mut page, container, "button");
    let footer = element(&mut page, container, "span");
    page.doc_mut().set_attribute(footer, "tabindex", "-1").unwrap();
    page.create_trap(container, TrapOptions::default()).unwrap();
    page.activate_trap(container).unwrap();

    page.focus(footer).unwrap();
    page.press_key(KeyEvent::tab());
    assert_eq!(page.active_element(), b0);

    page.focus(footer).unwrap();
    page.press_key(KeyEvent::shift_tab());
    assert_eq!(page.active_element(), b1);
}

#[test]
fn other_keys_pass_through() {
    let Layout {
        mut page,
        container,
        inner,
        ..
    } = layout(2);
    page.create_trap(container, TrapOptions::default()).unwrap();
    page.activate_trap(container).unwrap();

    let event = page.press_key(KeyEvent::new(KeyCode::Enter));
    assert!(!event.default_prevented());
    assert_eq!(page.active_element(), inner[0]);
    assert!(page.traps().is_trapped());
}

#[test]
fn click_outside_deactivates_when_enabled() {
    let Layout {
        mut page,
        container,
        after,
        ..
    } = layout(2);
    let options = TrapOptions::default()
        .click_outside_deactivates(true)
        .return_focus(false);
    page.create_trap(container, options).unwrap();
    page.activate_trap(container).unwrap();

    page.click(after).unwrap();
    assert!(!page.traps().is_trapped());
    assert_eq!(page.active_element(), after);
    assert_eq!(page.doc().listener_count(), 0);
}

#[test]
fn data_attributes_configure_trap() {
    let Layout {
        mut page,
        container,
        inner,
        ..
    } = layout(3);
    page.doc_mut()
        .set_attribute(inner[1], "id", "start-here")
        .unwrap();
    page.doc_mut()
        .set_dataset(container, "trapInitialFocus", "start-here")
        .unwrap();
    page.doc_mut()
        .set_dataset(container, "trapEscapeDeactivates", "false")
        .unwrap();
    page.create_trap_from_dataset(container).unwrap();
    page.activate_trap(container).unwrap();
    assert_eq!(page.active_element(), inner[1]);

    page.press_key(KeyEvent::escape());
    assert!(page.traps().is_trapped());
}

// ===========================================================================
// Second trap
// ===========================================================================

#[test]
fn second_trap_becomes_sole_active_trap() {
    let mut page = Page::new();
    let body = page.doc().body();
    let a = element(&mut page, body, "div");
    let a_buttons: Vec<_> = (0..2).map(|_| element(&mut page, a, "button")).collect();
    let b = element(&mut page, body, "div");
    let b_buttons: Vec<_> = (0..2).map(|_| element(&mut page, b, "button")).collect();

    page.create_trap(a, TrapOptions::default()).unwrap();
    page.create_trap(b, TrapOptions::default()).unwrap();
    page.activate_trap(a).unwrap();
    page.activate_trap(b).unwrap();

    assert_eq!(page.traps().active_trap(), Some(b));
    assert_eq!(page.traps().get(a).unwrap().state(), TrapState::Paused);

    page.press_key(KeyEvent::tab());
    page.press_key(KeyEvent::tab());
    assert_eq!(page.active_element(), b_buttons[0]);

    page.deactivate_trap(b).unwrap();
    assert_eq!(page.traps().active_trap(), Some(a));
    assert_eq!(page.active_element(), a_buttons[0]);
}

// ===========================================================================
// Cyclic Tab invariant
// ===========================================================================

#[derive(Debug, Clone, Copy)]
enum Filler {
    Button,
    DisabledButton,
    HiddenInput,
    Span,
    NegativeTabIndex,
}

fn filler() -> impl Strategy<Value = Filler> {
    prop_oneof![
        Just(Filler::Button),
        Just(Filler::DisabledButton),
        Just(Filler::HiddenInput),
        Just(Filler::Span),
        Just(Filler::NegativeTabIndex),
    ]
}

fn build_mixed(page: &mut Page, container: NodeId, kinds: &[Filler]) -> Vec<NodeId> {
    let mut focusable = Vec::new();
    for kind in kinds {
        let node = match kind {
            Filler::Button => element(page, container, "button"),
            Filler::DisabledButton => {
                let b = element(page, container, "button");
                page.doc_mut().set_attribute(b, "disabled", "").unwrap();
                b
            }
            Filler::HiddenInput => {
                let i = element(page, container, "input");
                page.doc_mut().set_attribute(i, "type", "hidden").unwrap();
                i
            }
            Filler::Span => element(page, container, "span"),
            Filler::NegativeTabIndex => {
                let d = element(page, container, "div");
                page.doc_mut().set_attribute(d, "tabindex", "-1").unwrap();
                d
            }
        };
        if matches!(kind, Filler::Button) {
            focusable.push(node);
        }
    }
    focusable
}

proptest! {
    #[test]
    fn tab_cycles_within_container(
        kinds in proptest::collection::vec(filler(), 0..10),
        presses in proptest::collection::vec(any::<bool>(), 1..40),
    ) {
        let mut page = Page::new();
        let body = page.doc().body();
        let before = element(&mut page, body, "button");
        let container = element(&mut page, body, "div");
        let mut focusable = build_mixed(&mut page, container, &kinds);
        // Guarantee at least one stop.
        focusable.push(element(&mut page, container, "button"));
        let after = element(&mut page, body, "a");
        page.doc_mut().set_attribute(after, "href", "#").unwrap();
        page.focus(before).unwrap();

        page.create_trap(container, TrapOptions::default()).unwrap();
        page.activate_trap(container).unwrap();

        let n = focusable.len();
        let mut index = 0usize;
        prop_assert_eq!(page.active_element(), focusable[index]);
        for backward in presses {
            let key = if backward { KeyEvent::shift_tab() } else { KeyEvent::tab() };
            page.press_key(key);
            index = if backward { (index + n - 1) % n } else { (index + 1) % n };
            prop_assert_eq!(page.active_element(), focusable[index]);
        }

        page.deactivate_trap(container).unwrap();
        prop_assert_eq!(page.active_element(), before);
        prop_assert_eq!(page.doc().listener_count(), 0);
    }
}
