#![forbid(unsafe_code)]

//! Focusable-element queries.
//!
//! The candidate set is the usual focus-trap selector list:
//!
//! ```text
//! a[href], button:not([disabled]), input:not([disabled]),
//! select:not([disabled]), textarea:not([disabled]),
//! [contenteditable], [tabindex]:not([tabindex="-1"])
//! ```
//!
//! Candidates are then dropped when they are not rendered (`display: none`
//! on themselves or an ancestor, or computed `visibility: hidden`), disabled,
//! or have an effective tab index of `-1`.
//!
//! Results come back in document order. Positive `tabindex` values do not
//! reorder them; this is a deliberate simplification of browser tab order.

use crate::dom::{Document, NodeId};

const FORM_TAGS: [&str; 4] = ["button", "input", "select", "textarea"];

fn is_form_control(tag: &str) -> bool {
    FORM_TAGS.contains(&tag)
}

fn is_disabled(doc: &Document, id: NodeId, tag: &str) -> bool {
    is_form_control(tag) && doc.has_attribute(id, "disabled")
}

fn is_content_editable(doc: &Document, id: NodeId) -> bool {
    doc.attribute(id, "contenteditable")
        .is_some_and(|v| !v.eq_ignore_ascii_case("false"))
}

fn explicit_tab_index(doc: &Document, id: NodeId) -> Option<i32> {
    doc.attribute(id, "tabindex")?.trim().parse().ok()
}

/// Natively focusable without a `tabindex` attribute.
fn is_natively_focusable(doc: &Document, id: NodeId, tag: &str) -> bool {
    match tag {
        "a" => doc.has_attribute(id, "href"),
        "input" => !doc
            .attribute(id, "type")
            .is_some_and(|t| t.eq_ignore_ascii_case("hidden")),
        t if is_form_control(t) => true,
        _ => is_content_editable(doc, id),
    }
}

/// Effective `element.tabIndex`: the parsed attribute, else `0` for natively
/// focusable elements, else `-1`.
pub fn tab_index(doc: &Document, id: NodeId) -> i32 {
    if let Some(explicit) = explicit_tab_index(doc, id) {
        return explicit;
    }
    match doc.tag(id) {
        Some(tag) if is_natively_focusable(doc, id, tag) => 0,
        _ => -1,
    }
}

fn matches_selector(doc: &Document, id: NodeId, tag: &str) -> bool {
    if tag == "a" && doc.has_attribute(id, "href") {
        return true;
    }
    if is_form_control(tag) && !is_disabled(doc, id, tag) {
        return true;
    }
    if is_content_editable(doc, id) {
        return true;
    }
    explicit_tab_index(doc, id).is_some_and(|t| t >= 0)
}

/// Check if a single element is part of the keyboard tab sequence.
pub fn is_focusable(doc: &Document, id: NodeId) -> bool {
    let Some(tag) = doc.tag(id) else {
        return false;
    };
    matches_selector(doc, id, tag)
        && doc.is_rendered(id)
        && !is_disabled(doc, id, tag)
        && tab_index(doc, id) != -1
}

/// Check if `element.focus()` would succeed.
///
/// Wider than [`is_focusable`]: elements with `tabindex="-1"` and `body`
/// accept programmatic focus even though Tab never lands on them.
pub fn is_programmatically_focusable(doc: &Document, id: NodeId) -> bool {
    if id == doc.body() {
        return true;
    }
    let Some(tag) = doc.tag(id) else {
        return false;
    };
    doc.is_rendered(id)
        && !is_disabled(doc, id, tag)
        && (is_natively_focusable(doc, id, tag) || explicit_tab_index(doc, id).is_some())
}

/// Focusable descendants of `container`, in document order.
///
/// The container itself is never included. An empty or detached container
/// yields an empty list.
pub fn focusable_elements(doc: &Document, container: NodeId) -> Vec<NodeId> {
    doc.descendants(container)
        .into_iter()
        .filter(|&n| is_focusable(doc, n))
        .collect()
}

/// Every focusable element of the document, in document order.
pub fn document_focus_order(doc: &Document) -> Vec<NodeId> {
    focusable_elements(doc, doc.root())
}
