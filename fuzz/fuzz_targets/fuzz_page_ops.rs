#![no_main]

use arbitrary::Arbitrary;
use ftrap_core::{Display, KeyEvent, NodeId};
use ftrap_focus::{DialogOptions, DrawerOptions, ModalOptions, Page, TrapOptions, TrapState};
use libfuzzer_sys::fuzz_target;
use web_time::Duration;

#[derive(Debug, Arbitrary)]
enum Op {
    Tab,
    ShiftTab,
    Escape,
    Click(u8),
    Focus(u8),
    BlurWindow,
    Activate(u8),
    Deactivate(u8),
    Pause(u8),
    Resume(u8),
    Hide(u8),
    Remove(u8),
    OpenDialog,
    CloseDialog,
    Tick(u16),
}

fuzz_target!(|ops: Vec<Op>| {
    let mut page = Page::new();
    let body = page.doc().body();
    let mut nodes = vec![body];
    let mut containers = Vec::new();

    // Three containers of two buttons each, plus loose buttons between them.
    for i in 0..3 {
        let loose = button(&mut page, body);
        nodes.push(loose);
        let container = page.doc_mut().create_element("div");
        let _ = page.doc_mut().append_child(body, container);
        nodes.push(container);
        nodes.push(button(&mut page, container));
        nodes.push(button(&mut page, container));
        let created = match i {
            0 => page.create_trap(container, TrapOptions::default()),
            1 => page.create_modal_trap(container, TrapOptions::default(), ModalOptions::default()),
            _ => page.create_drawer_trap(container, TrapOptions::default(), DrawerOptions::default()),
        };
        if created.is_ok() {
            containers.push(container);
        }
    }
    let trigger = button(&mut page, body);
    nodes.push(trigger);
    let Ok(dialog) = page.create_dialog_for(trigger, DialogOptions::new("T", "C")) else {
        return;
    };

    let pick = |list: &[NodeId], i: u8| list.get(i as usize % list.len().max(1)).copied();

    for op in ops.into_iter().take(256) {
        match op {
            Op::Tab => {
                page.press_key(KeyEvent::tab());
            }
            Op::ShiftTab => {
                page.press_key(KeyEvent::shift_tab());
            }
            Op::Escape => {
                page.press_key(KeyEvent::escape());
            }
            Op::Click(i) => {
                if let Some(n) = pick(&nodes, i) {
                    let _ = page.click(n);
                }
            }
            Op::Focus(i) => {
                if let Some(n) = pick(&nodes, i) {
                    let _ = page.focus(n);
                }
            }
            Op::BlurWindow => page.blur_window(),
            Op::Activate(i) => {
                if let Some(c) = pick(&containers, i) {
                    let _ = page.activate_trap(c);
                }
            }
            Op::Deactivate(i) => {
                if let Some(c) = pick(&containers, i) {
                    let _ = page.deactivate_trap(c);
                }
            }
            Op::Pause(i) => {
                if let Some(c) = pick(&containers, i) {
                    let _ = page.pause_trap(c);
                }
            }
            Op::Resume(i) => {
                if let Some(c) = pick(&containers, i) {
                    let _ = page.resume_trap(c);
                }
            }
            Op::Hide(i) => {
                if let Some(n) = pick(&nodes, i) {
                    let _ = page.doc_mut().set_display(n, Display::None);
                }
            }
            Op::Remove(i) => {
                if let Some(n) = pick(&nodes, i)
                    && n != body
                {
                    let _ = page.doc_mut().remove(n);
                }
            }
            Op::OpenDialog => {
                let _ = page.open_dialog(dialog);
            }
            Op::CloseDialog => {
                let _ = page.close_dialog(dialog);
            }
            Op::Tick(ms) => page.tick(Duration::from_millis(u64::from(ms))),
        }

        // Post-conditions that must always hold:
        let traps = page.traps();
        let active: Vec<_> = traps
            .stack()
            .iter()
            .filter(|&&c| traps.get(c).is_some_and(|t| t.state() == TrapState::Active))
            .collect();
        assert!(active.len() <= 1, "more than one active trap");
        if let Some(&&top) = active.first() {
            assert_eq!(traps.active_trap(), Some(top), "active trap is not on top");
        }
        assert!(
            page.doc().is_connected(page.active_element()),
            "focus on detached node"
        );
    }
});

fn button(page: &mut Page, parent: NodeId) -> NodeId {
    let doc = page.doc_mut();
    let node = doc.create_element("button");
    let _ = doc.append_child(parent, node);
    node
}
