//! Headless document tree
//!
//! Surfaces are built out of nodes in a `Document`: an arena of elements with
//! parent/child links, a laid-out rect, a position style, focusability and a
//! small attribute map. The document also tracks the active (focused) element,
//! which is what focus capture and restoration operate on.
//!
//! Node ids are never reused, so a stale `NodeId` held by a closed surface
//! simply stops resolving instead of aliasing a newer node.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};

/// Identifies a node in a `Document`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Computed `position` of a node, as far as containing blocks are concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStyle {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

impl PositionStyle {
    /// Whether descendants with absolute offsets are positioned against this node
    pub fn establishes_containing_block(self) -> bool {
        matches!(
            self,
            PositionStyle::Relative | PositionStyle::Absolute | PositionStyle::Fixed
        )
    }
}

/// A single element in the document
#[derive(Debug, Clone)]
pub struct Node {
    /// Element kind, informational only (e.g. "body", "button", "surface")
    pub tag: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub position: PositionStyle,
    /// Laid-out box in viewport coordinates
    pub rect: Rect,
    /// Offset applied by positioning, relative to the containing block
    pub offset: Option<Point>,
    pub focusable: bool,
    pub disabled: bool,
    pub visible: bool,
    pub text: Option<String>,
    attrs: BTreeMap<String, String>,
}

impl Node {
    fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            parent: None,
            children: Vec::new(),
            position: PositionStyle::Static,
            rect: Rect::default(),
            offset: None,
            focusable: false,
            disabled: false,
            visible: true,
            text: None,
            attrs: BTreeMap::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Arena-backed element tree with a single optional root
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Option<Node>>,
    root: Option<NodeId>,
    active: Option<NodeId>,
    viewport: Rect,
}

impl Document {
    /// Create a document whose root ("body") covers the viewport
    pub fn new(viewport: Rect) -> Self {
        let mut doc = Self::headless(viewport);
        let root = doc.create_element("body");
        if let Some(node) = doc.get_mut(root) {
            node.rect = viewport;
        }
        doc.root = Some(root);
        doc
    }

    /// Create a document with no root element
    ///
    /// Nodes can still be created, but nothing is ever attached, which is the
    /// state surfaces see before the host has built its tree.
    pub fn headless(viewport: Rect) -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            active: None,
            viewport,
        }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    /// Resize the viewport; the root element follows it
    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
        if let Some(root) = self.root {
            self.set_rect(root, viewport);
        }
    }

    // ========================================================================
    // Node creation and lookup
    // ========================================================================

    /// Create a detached element
    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(Node::new(tag)));
        id
    }

    /// Create an element and append it under `parent`
    pub fn append_element(&mut self, parent: NodeId, tag: impl Into<String>) -> Option<NodeId> {
        if !self.exists(parent) {
            return None;
        }
        let id = self.create_element(tag);
        self.append_child(parent, id);
        Some(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub fn exists(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    // ========================================================================
    // Tree mutation
    // ========================================================================

    /// Append `child` as the last child of `parent`, moving it if already placed
    ///
    /// Returns false (and changes nothing) for unknown nodes or when the move
    /// would create a cycle.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.exists(parent) || !self.exists(child) || self.contains(child, parent) {
            return false;
        }
        self.detach(child);
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        true
    }

    /// Insert `child` as the next sibling of `reference`
    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) -> bool {
        let Some(parent) = self.parent(reference) else {
            return false;
        };
        if !self.exists(child) || self.contains(child, parent) {
            return false;
        }
        self.detach(child);
        let Some(node) = self.get_mut(parent) else {
            return false;
        };
        let index = node
            .children
            .iter()
            .position(|c| *c == reference)
            .map(|i| i + 1)
            .unwrap_or(node.children.len());
        node.children.insert(index, child);
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        true
    }

    /// Unlink a node from its parent, keeping its subtree alive
    pub fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        if let Some(node) = self.get_mut(parent) {
            node.children.retain(|c| *c != id);
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = None;
        }
        true
    }

    /// Destroy a node and its whole subtree
    ///
    /// Removing an already-removed node is a no-op. If the active element was
    /// inside the subtree, focus is dropped.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if !self.exists(id) {
            return false;
        }
        self.detach(id);
        let mut doomed = self.descendants(id);
        doomed.push(id);
        for node in doomed {
            if self.active == Some(node) {
                self.active = None;
            }
            if self.root == Some(node) {
                self.root = None;
            }
            if let Some(slot) = self.nodes.get_mut(node.0 as usize) {
                *slot = None;
            }
        }
        true
    }

    // ========================================================================
    // Tree queries
    // ========================================================================

    /// Whether the node is connected to the document root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let Some(root) = self.root else {
            return false;
        };
        if !self.exists(id) {
            return false;
        }
        id == root || self.ancestors(id).any(|a| a == root)
    }

    /// Inclusive containment: a node contains itself
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        if !self.exists(ancestor) || !self.exists(node) {
            return false;
        }
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Ancestors of `id`, nearest first (the node itself excluded)
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    /// Descendants of `id` in document (pre-)order, the node itself excluded
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Nearest ancestor establishing a containing block
    ///
    /// Walks up from the node's parent until a `relative`, `absolute` or
    /// `fixed` element is found. Returns `None` when the walk reaches the root
    /// without a match (the viewport is the containing block).
    pub fn closest_positioned(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id).find(|a| {
            self.get(*a)
                .is_some_and(|n| n.position.establishes_containing_block())
        })
    }

    // ========================================================================
    // Layout and attributes
    // ========================================================================

    pub fn rect(&self, id: NodeId) -> Option<Rect> {
        self.get(id).map(|n| n.rect)
    }

    pub fn set_rect(&mut self, id: NodeId, rect: Rect) {
        if let Some(node) = self.get_mut(id) {
            node.rect = rect;
        }
    }

    pub fn set_position(&mut self, id: NodeId, position: PositionStyle) {
        if let Some(node) = self.get_mut(id) {
            node.position = position;
        }
    }

    pub fn set_offset(&mut self, id: NodeId, offset: Point) {
        if let Some(node) = self.get_mut(id) {
            node.offset = Some(offset);
        }
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        if let Some(node) = self.get_mut(id) {
            node.visible = visible;
        }
    }

    pub fn set_focusable(&mut self, id: NodeId, focusable: bool) {
        if let Some(node) = self.get_mut(id) {
            node.focusable = focusable;
        }
    }

    pub fn set_disabled(&mut self, id: NodeId, disabled: bool) {
        if let Some(node) = self.get_mut(id) {
            node.disabled = disabled;
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let Some(node) = self.get_mut(id) {
            node.text = Some(text.into());
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: impl Into<String>, value: impl Into<String>) {
        if let Some(node) = self.get_mut(id) {
            node.attrs.insert(name.into(), value.into());
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(node) = self.get_mut(id) {
            node.attrs.remove(name);
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id).and_then(|n| n.attr(name))
    }

    // ========================================================================
    // Focus
    // ========================================================================

    pub fn active_element(&self) -> Option<NodeId> {
        self.active.filter(|id| self.exists(*id))
    }

    /// Whether `id` can currently receive focus
    pub fn is_focusable(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| n.focusable && !n.disabled && n.visible)
            && self.is_attached(id)
    }

    /// Move focus to `id`; refuses nodes that cannot take focus
    pub fn focus(&mut self, id: NodeId) -> bool {
        if !self.is_focusable(id) {
            return false;
        }
        self.active = Some(id);
        true
    }

    pub fn blur(&mut self) {
        self.active = None;
    }

    /// First focusable descendant of `id` in document order
    pub fn first_focusable_descendant(&self, id: NodeId) -> Option<NodeId> {
        self.descendants(id)
            .into_iter()
            .find(|d| self.is_focusable(*d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::new(Rect::new(0.0, 0.0, 800.0, 600.0))
    }

    #[test]
    fn test_append_and_contains() {
        let mut doc = doc();
        let root = doc.root().unwrap();
        let panel = doc.append_element(root, "div").unwrap();
        let button = doc.append_element(panel, "button").unwrap();

        assert!(doc.contains(root, button));
        assert!(doc.contains(panel, panel));
        assert!(!doc.contains(button, panel));
        assert!(doc.is_attached(button));
    }

    #[test]
    fn test_append_rejects_cycles() {
        let mut doc = doc();
        let root = doc.root().unwrap();
        let outer = doc.append_element(root, "div").unwrap();
        let inner = doc.append_element(outer, "div").unwrap();

        assert!(!doc.append_child(inner, outer));
        assert_eq!(doc.parent(outer), Some(root));
    }

    #[test]
    fn test_insert_after_places_sibling() {
        let mut doc = doc();
        let root = doc.root().unwrap();
        let a = doc.append_element(root, "a").unwrap();
        let c = doc.append_element(root, "c").unwrap();
        let b = doc.create_element("b");

        assert!(doc.insert_after(a, b));
        assert_eq!(doc.children(root), &[a, b, c]);
    }

    #[test]
    fn test_remove_drops_subtree_and_focus() {
        let mut doc = doc();
        let root = doc.root().unwrap();
        let panel = doc.append_element(root, "div").unwrap();
        let button = doc.append_element(panel, "button").unwrap();
        doc.set_focusable(button, true);
        assert!(doc.focus(button));

        assert!(doc.remove(panel));
        assert!(!doc.exists(button));
        assert_eq!(doc.active_element(), None);
        // Second removal is a no-op
        assert!(!doc.remove(panel));
    }

    #[test]
    fn test_focus_refuses_detached_and_disabled() {
        let mut doc = doc();
        let root = doc.root().unwrap();
        let loose = doc.create_element("button");
        doc.set_focusable(loose, true);
        assert!(!doc.focus(loose));

        let disabled = doc.append_element(root, "button").unwrap();
        doc.set_focusable(disabled, true);
        doc.set_disabled(disabled, true);
        assert!(!doc.focus(disabled));
    }

    #[test]
    fn test_closest_positioned_skips_static_and_self() {
        let mut doc = doc();
        let root = doc.root().unwrap();
        let card = doc.append_element(root, "section").unwrap();
        doc.set_position(card, PositionStyle::Relative);
        let wrapper = doc.append_element(card, "div").unwrap();
        let pane = doc.append_element(wrapper, "surface").unwrap();
        doc.set_position(pane, PositionStyle::Absolute);

        assert_eq!(doc.closest_positioned(pane), Some(card));
        assert_eq!(doc.closest_positioned(card), None);
    }

    #[test]
    fn test_first_focusable_descendant_in_document_order() {
        let mut doc = doc();
        let root = doc.root().unwrap();
        let menu = doc.append_element(root, "menu").unwrap();
        let group = doc.append_element(menu, "group").unwrap();
        let first = doc.append_element(group, "button").unwrap();
        let second = doc.append_element(menu, "button").unwrap();
        doc.set_focusable(first, true);
        doc.set_focusable(second, true);

        assert_eq!(doc.first_focusable_descendant(menu), Some(first));
    }

    #[test]
    fn test_headless_document_attaches_nothing() {
        let mut doc = Document::headless(Rect::new(0.0, 0.0, 100.0, 100.0));
        let node = doc.create_element("div");
        assert_eq!(doc.root(), None);
        assert!(!doc.is_attached(node));
    }
}
