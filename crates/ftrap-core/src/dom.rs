#![forbid(unsafe_code)]

//! Headless document model.
//!
//! A [`Document`] is an arena of nodes rooted at `<html>` with a single
//! `<body>`. It tracks the focused element, document-level and node-level
//! event listeners, and a queue of focus events produced by focus changes.
//! It does not run listeners itself; the owner of the document drains the
//! queue and routes each event (see `ftrap_focus::page::Page`).
//!
//! # Invariants
//!
//! 1. `active_element()` is always a connected element. It falls back to
//!    `body` when the focused node is removed or blurred.
//! 2. Node handles are never reused. A removed node stays addressable but is
//!    no longer connected.
//! 3. Every successful focus change queues exactly one `focusout` (unless the
//!    old element was `body`) followed by one `focusin` (unless the new
//!    element is `body`).
//!
//! # Failure Modes
//!
//! - Handles from another document report [`DomError::UnknownNode`].
//! - Focusing an ineligible node reports [`DomError::NotFocusable`] and leaves
//!   focus where it was, like `HTMLElement.focus()` silently does.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

use crate::error::DomError;
use crate::event::{DomEvent, EventKind, EventType};
use crate::focusable;
use crate::geometry::Rect;

/// Handle to a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Token identifying whoever registered a listener.
///
/// One component holds one owner id and registers at most one listener per
/// event type and target, so `(owner, event type)` tells it which handler
/// to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(u64);

/// Handle to a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// CSS `display`, reduced to what focus logic cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Display {
    #[default]
    Block,
    Inline,
    Flex,
    None,
}

/// CSS `visibility`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

/// What a node holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element { tag: String },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: Vec<(String, String)>,
    display: Display,
    /// `None` inherits from the parent.
    visibility: Option<Visibility>,
    bounds: Rect,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            attributes: Vec::new(),
            display: Display::default(),
            visibility: None,
            bounds: Rect::default(),
        }
    }

    fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element { .. })
    }
}

/// Where a listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerTarget {
    /// `document.addEventListener`.
    Document,
    /// `element.addEventListener`.
    Node(NodeId),
}

/// A registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listener {
    pub id: ListenerId,
    pub target: ListenerTarget,
    pub event: EventType,
    pub capture: bool,
    pub owner: OwnerId,
}

/// An arena-backed element tree with focus and listener bookkeeping.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    body: NodeId,
    active: NodeId,
    window_focused: bool,
    listeners: Vec<Listener>,
    next_listener: u64,
    next_owner: u64,
    pending: VecDeque<DomEvent>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document: `<html><body></body></html>`.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            body: NodeId(1),
            active: NodeId(1),
            window_focused: true,
            listeners: Vec::new(),
            next_listener: 1,
            next_owner: 1,
            pending: VecDeque::new(),
        };
        let root = doc.create_element("html");
        let body = doc.create_element("body");
        doc.nodes[body.index()].parent = Some(root);
        doc.nodes[root.index()].children.push(body);
        doc.root = root;
        doc.body = body;
        doc.active = body;
        doc
    }

    /// The `<html>` element.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The `<body>` element.
    #[inline]
    pub fn body(&self) -> NodeId {
        self.body
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.index()).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes.get_mut(id.index()).ok_or(DomError::UnknownNode(id))
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        let node = self.node_mut(id)?;
        if node.is_element() {
            Ok(node)
        } else {
            Err(DomError::NotAnElement(id))
        }
    }

    // --- Tree -----------------------------------------------------------

    /// Create a detached element. Tag names are stored lowercase.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Text(text.into()))
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(kind));
        id
    }

    /// Check if the handle belongs to this document.
    #[inline]
    pub fn exists(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Check if the handle names an element (not a text node).
    pub fn is_element(&self, id: NodeId) -> bool {
        self.node(id).is_ok_and(Node::is_element)
    }

    /// Tag name of an element.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).ok()?.kind {
            NodeKind::Element { tag } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    /// Text of a text node, or the concatenated text of an element subtree.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Ok(NodeKind::Text(text)) = self.node(id).map(|n| &n.kind) {
            out.push_str(text);
        }
        for node in self.descendants(id) {
            if let Ok(NodeKind::Text(text)) = self.node(node).map(|n| &n.kind) {
                out.push_str(text);
            }
        }
        out
    }

    /// Append `child` as the last child of `parent`, moving it if attached
    /// elsewhere.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.node(child)?;
        if !self.node(parent)?.is_element() {
            return Err(DomError::NotAnElement(parent));
        }
        if child == self.root || self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        self.detach(child);
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
        Ok(())
    }

    /// Detach a node (and its subtree) from the tree.
    ///
    /// If the focused element was inside the subtree, focus silently falls
    /// back to `body` without firing events.
    pub fn remove(&mut self, id: NodeId) -> Result<(), DomError> {
        self.node(id)?;
        if id == self.root || id == self.body {
            return Err(DomError::HierarchyRequest {
                parent: self.root,
                child: id,
            });
        }
        let had_focus = self.contains(id, self.active);
        self.detach(id);
        if had_focus {
            self.active = self.body;
        }
        Ok(())
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|&c| c != id);
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok()?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Inclusive containment, like `Node.contains`.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Check if the node is attached under the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.exists(id) && self.contains(self.root, id)
    }

    /// All descendants of `id` in document (pre-)order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Every connected node in document order, starting with the root.
    pub fn document_order(&self) -> Vec<NodeId> {
        let mut out = vec![self.root];
        out.extend(self.descendants(self.root));
        out
    }

    /// Relative document position of two connected nodes.
    ///
    /// Returns `None` if either node is detached.
    pub fn compare_position(&self, a: NodeId, b: NodeId) -> Option<Ordering> {
        if !self.is_connected(a) || !self.is_connected(b) {
            return None;
        }
        let order = self.document_order();
        let pa = order.iter().position(|&n| n == a)?;
        let pb = order.iter().position(|&n| n == b)?;
        Some(pa.cmp(&pb))
    }

    /// First connected element whose `id` attribute equals `dom_id`.
    pub fn element_by_id(&self, dom_id: &str) -> Option<NodeId> {
        self.document_order()
            .into_iter()
            .find(|&n| self.attribute(n, "id") == Some(dom_id))
    }

    /// Connected elements carrying `name`, in document order.
    pub fn elements_with_attribute(&self, name: &str) -> Vec<NodeId> {
        self.document_order()
            .into_iter()
            .filter(|&n| self.has_attribute(n, name))
            .collect()
    }

    // --- Attributes -----------------------------------------------------

    /// Set an attribute. Names are stored lowercase.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        let node = self.element_mut(id)?;
        match node.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => node.attributes.push((name, value)),
        }
        Ok(())
    }

    /// Remove an attribute. Returns `true` if it was present.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        let Ok(node) = self.element_mut(id) else {
            return false;
        };
        let before = node.attributes.len();
        node.attributes.retain(|(k, _)| *k != name);
        node.attributes.len() != before
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)
            .ok()?
            .attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    /// Read `element.dataset[key]`, e.g. `modalTitle` → `data-modal-title`.
    pub fn dataset(&self, id: NodeId, key: &str) -> Option<&str> {
        self.attribute(id, &dataset_attribute_name(key))
    }

    /// Write `element.dataset[key]`.
    pub fn set_dataset(
        &mut self,
        id: NodeId,
        key: &str,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        self.set_attribute(id, &dataset_attribute_name(key), value)
    }

    /// `classList.add`.
    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        if self.has_class(id, class) {
            return self.element_mut(id).map(|_| ());
        }
        let joined = match self.attribute(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_owned(),
        };
        self.set_attribute(id, "class", joined)
    }

    /// `classList.remove`. Returns `true` if the class was present.
    pub fn remove_class(&mut self, id: NodeId, class: &str) -> bool {
        if !self.has_class(id, class) {
            return false;
        }
        let kept = self
            .attribute(id, "class")
            .unwrap_or_default()
            .split_ascii_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(id, "class", kept).is_ok()
    }

    /// `classList.contains`.
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attribute(id, "class")
            .is_some_and(|list| list.split_ascii_whitespace().any(|c| c == class))
    }

    // --- Style and layout -----------------------------------------------

    pub fn set_display(&mut self, id: NodeId, display: Display) -> Result<(), DomError> {
        self.element_mut(id)?.display = display;
        Ok(())
    }

    /// The node's own `display` (not inherited).
    pub fn display(&self, id: NodeId) -> Display {
        self.node(id).map(|n| n.display).unwrap_or_default()
    }

    /// Set `visibility`; `None` restores inheritance.
    pub fn set_visibility(
        &mut self,
        id: NodeId,
        visibility: Option<Visibility>,
    ) -> Result<(), DomError> {
        self.element_mut(id)?.visibility = visibility;
        Ok(())
    }

    /// Computed `visibility`: the nearest explicit value up the ancestor chain.
    pub fn computed_visibility(&self, id: NodeId) -> Visibility {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Ok(node) = self.node(current) else {
                break;
            };
            if let Some(v) = node.visibility {
                return v;
            }
            cursor = node.parent;
        }
        Visibility::Visible
    }

    /// Check if the node generates a box: connected, no `display: none` on it
    /// or any ancestor, and computed visibility is visible.
    pub fn is_rendered(&self, id: NodeId) -> bool {
        if !self.is_connected(id) {
            return false;
        }
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if self.display(current) == Display::None {
                return false;
            }
            cursor = self.parent(current);
        }
        self.computed_visibility(id) == Visibility::Visible
    }

    pub fn set_bounds(&mut self, id: NodeId, bounds: Rect) -> Result<(), DomError> {
        self.node_mut(id)?.bounds = bounds;
        Ok(())
    }

    /// `getBoundingClientRect`.
    pub fn bounds(&self, id: NodeId) -> Rect {
        self.node(id).map(|n| n.bounds).unwrap_or_default()
    }

    // --- Focus ----------------------------------------------------------

    /// `document.activeElement`.
    #[inline]
    pub fn active_element(&self) -> NodeId {
        self.active
    }

    /// `element.focus()`.
    ///
    /// Focusing the already focused element is a successful no-op.
    pub fn focus(&mut self, id: NodeId) -> Result<(), DomError> {
        self.node(id)?;
        if !focusable::is_programmatically_focusable(self, id) {
            return Err(DomError::NotFocusable(id));
        }
        self.window_focused = true;
        if id != self.active {
            self.move_focus(id);
        }
        Ok(())
    }

    /// Drop focus to `body` while the page keeps window focus, as when a
    /// press lands on something that cannot take focus.
    pub fn blur_to_body(&mut self) {
        self.window_focused = true;
        if self.active != self.body {
            self.move_focus(self.body);
        }
    }

    /// The window lost focus: focus drops to `body` and
    /// [`has_window_focus`](Self::has_window_focus) reports `false` until
    /// something is focused again.
    pub fn blur_window(&mut self) {
        if self.active != self.body {
            self.move_focus(self.body);
        }
        self.window_focused = false;
    }

    /// Check if the page holds window focus.
    pub fn has_window_focus(&self) -> bool {
        self.window_focused
    }

    fn move_focus(&mut self, next: NodeId) {
        let prev = self.active;
        self.active = next;
        let body = self.body;
        let visible = |n: NodeId| (n != body).then_some(n);
        if prev != body {
            self.pending.push_back(DomEvent::new(
                EventKind::FocusOut {
                    related: visible(next),
                },
                prev,
            ));
        }
        if next != body {
            self.pending.push_back(DomEvent::new(
                EventKind::FocusIn {
                    related: visible(prev),
                },
                next,
            ));
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(from = %prev, to = %next, "focus moved");
    }

    /// Next stop in sequential (Tab) navigation from `from`.
    ///
    /// Order is document order over focusable elements. Returns `None` when
    /// running off either end of the document.
    pub fn next_in_sequence(&self, from: NodeId, backward: bool) -> Option<NodeId> {
        let order = focusable::document_focus_order(self);
        if from == self.body || from == self.root || !self.is_connected(from) {
            return if backward {
                order.last().copied()
            } else {
                order.first().copied()
            };
        }
        let positions = self.document_order();
        let pos = |n: NodeId| positions.iter().position(|&p| p == n);
        let origin = pos(from)?;
        if backward {
            order
                .iter()
                .rev()
                .copied()
                .find(|&n| pos(n).is_some_and(|p| p < origin))
        } else {
            order
                .iter()
                .copied()
                .find(|&n| pos(n).is_some_and(|p| p > origin))
        }
    }

    // --- Events ---------------------------------------------------------

    /// Hand out a fresh listener owner token.
    pub fn allocate_owner(&mut self) -> OwnerId {
        let owner = OwnerId(self.next_owner);
        self.next_owner += 1;
        owner
    }

    /// `addEventListener`.
    pub fn add_listener(
        &mut self,
        target: ListenerTarget,
        event: EventType,
        capture: bool,
        owner: OwnerId,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push(Listener {
            id,
            target,
            event,
            capture,
            owner,
        });
        id
    }

    /// `removeEventListener`. Returns `true` if the listener existed.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    /// Remove every listener registered by `owner`. Returns how many there were.
    pub fn remove_listeners_of(&mut self, owner: OwnerId) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.owner != owner);
        before - self.listeners.len()
    }

    pub fn is_listening(&self, id: ListenerId) -> bool {
        self.listeners.iter().any(|l| l.id == id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn listeners_of(&self, owner: OwnerId) -> Vec<Listener> {
        self.listeners
            .iter()
            .filter(|l| l.owner == owner)
            .copied()
            .collect()
    }

    /// Listeners an event visits, in dispatch order.
    ///
    /// Document capture, node capture from the root down, the target itself,
    /// node bubble back up, then document bubble. Events on detached nodes
    /// never reach `document`.
    pub fn route(&self, event: &DomEvent) -> Vec<Listener> {
        let ty = event.event_type();
        let connected = self.is_connected(event.target);
        let mut path = Vec::new();
        let mut cursor = Some(event.target);
        while let Some(current) = cursor {
            path.push(current);
            cursor = self.parent(current);
        }
        path.reverse();

        let mut route = Vec::new();
        if connected {
            route.extend(self.matching(ty, ListenerTarget::Document, true));
        }
        for &node in &path {
            if node == event.target {
                route.extend(self.matching(ty, ListenerTarget::Node(node), true));
                route.extend(self.matching(ty, ListenerTarget::Node(node), false));
            } else {
                route.extend(self.matching(ty, ListenerTarget::Node(node), true));
            }
        }
        for &node in path.iter().rev().skip(1) {
            route.extend(self.matching(ty, ListenerTarget::Node(node), false));
        }
        if connected {
            route.extend(self.matching(ty, ListenerTarget::Document, false));
        }
        route
    }

    fn matching(
        &self,
        ty: EventType,
        target: ListenerTarget,
        capture: bool,
    ) -> impl Iterator<Item = Listener> + '_ {
        self.listeners
            .iter()
            .filter(move |l| l.event == ty && l.target == target && l.capture == capture)
            .copied()
    }

    /// Pop the oldest queued event.
    pub fn take_pending(&mut self) -> Option<DomEvent> {
        self.pending.pop_front()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Map a `dataset` key to its attribute name (`fooBar` → `data-foo-bar`).
pub fn dataset_attribute_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + 8);
    name.push_str("data-");
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            name.push('-');
            name.push(ch.to_ascii_lowercase());
        } else {
            name.push(ch);
        }
    }
    name
}
