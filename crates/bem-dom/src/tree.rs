//! DOM Tree (arena-based allocation)
//!
//! Nodes are never freed: a detached subtree keeps its ids and can be
//! inserted again later.

use std::cmp::Ordering;

use crate::{ClassList, DomError, DomResult, Node, NodeData, NodeId};

/// Arena-based DOM tree
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
        }
    }

    /// Document node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(Node::element(tag))
    }

    /// Create a detached element with attributes
    pub fn create_element_with_attrs<'a, I>(&mut self, tag: &str, attrs: I) -> NodeId
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut node = Node::element(tag);
        if let Some(el) = node.as_element_mut() {
            for (name, value) in attrs {
                el.set_attr(name, value.to_string());
            }
        }
        self.alloc(node)
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(Node::text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(Node::comment(text.into()))
    }

    pub fn create_doctype(&mut self, name: impl Into<String>) -> NodeId {
        self.alloc(Node::doctype(name.into()))
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::NotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.get_mut(id).ok_or(DomError::NotFound(id))
    }

    /// Number of nodes ever allocated
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent.option())
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.first_child.option())
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.last_child.option())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling.option())
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling.option())
    }

    /// Child nodes of any type
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(id),
        }
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).filter(|&c| self.is_element(c)).collect()
    }

    /// Ancestors, nearest first, excluding `id`
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Descendants in document order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut child = self.last_child(id);
        while let Some(c) = child {
            stack.push(c);
            child = self.prev_sibling(c);
        }
        while let Some(node) = stack.pop() {
            out.push(node);
            let mut child = self.last_child(node);
            while let Some(c) = child {
                stack.push(c);
                child = self.prev_sibling(c);
            }
        }
        out
    }

    /// Whether `node` is `ancestor` or lies inside it
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whether the node is attached to the document
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(NodeId::ROOT, id)
    }

    /// Order two nodes by tree position; nodes in different trees order
    /// by their roots
    pub fn compare_position(&self, a: NodeId, b: NodeId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let pa = self.position_path(a);
        let pb = self.position_path(b);
        pa.cmp(&pb)
    }

    /// Root id followed by the child index at each level
    fn position_path(&self, id: NodeId) -> Vec<u32> {
        let mut path = Vec::new();
        let mut cur = id;
        while let Some(parent) = self.parent(cur) {
            let idx = self.children(parent).position(|c| c == cur).unwrap_or(0);
            path.push(idx as u32);
            cur = parent;
        }
        path.push(cur.0);
        path.reverse();
        path
    }

    /// Sort and deduplicate nodes in document order
    pub fn sort_document_order(&self, nodes: &mut Vec<NodeId>) {
        let mut keyed: Vec<(Vec<u32>, NodeId)> = nodes.iter().map(|&n| (self.position_path(n), n)).collect();
        keyed.sort();
        keyed.dedup_by(|a, b| a.1 == b.1);
        *nodes = keyed.into_iter().map(|(_, n)| n).collect();
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    fn check_insert(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        let target = self.node(parent)?;
        self.node(child)?;
        if !target.can_have_children() || child == NodeId::ROOT || self.contains(child, parent) {
            tracing::debug!(%parent, %child, "rejected insertion");
            return Err(DomError::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    /// Insert `child` under `parent` between `prev` and `next`
    fn link(&mut self, parent: NodeId, child: NodeId, prev: NodeId, next: NodeId) -> DomResult<()> {
        {
            let node = self.node_mut(child)?;
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = next;
        }
        if prev.is_valid() {
            self.node_mut(prev)?.next_sibling = child;
        } else {
            self.node_mut(parent)?.first_child = child;
        }
        if next.is_valid() {
            self.node_mut(next)?.prev_sibling = child;
        } else {
            self.node_mut(parent)?.last_child = child;
        }
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.check_insert(parent, child)?;
        self.detach(child);
        let last = self.node(parent)?.last_child;
        self.link(parent, child, last, NodeId::NONE)
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.check_insert(parent, child)?;
        self.detach(child);
        let first = self.node(parent)?.first_child;
        self.link(parent, child, NodeId::NONE, first)
    }

    /// Insert `node` as the previous sibling of `reference`
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) -> DomResult<()> {
        let parent = self.parent(reference).ok_or(DomError::NotAChild(reference))?;
        self.check_insert(parent, node)?;
        if node == reference {
            return Ok(());
        }
        self.detach(node);
        let prev = self.node(reference)?.prev_sibling;
        self.link(parent, node, prev, reference)
    }

    /// Insert `node` as the next sibling of `reference`
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> DomResult<()> {
        let parent = self.parent(reference).ok_or(DomError::NotAChild(reference))?;
        self.check_insert(parent, node)?;
        if node == reference {
            return Ok(());
        }
        self.detach(node);
        let next = self.node(reference)?.next_sibling;
        self.link(parent, node, reference, next)
    }

    /// Unlink a node from its parent; no-op when already detached
    pub fn detach(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else {
            return;
        };
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);
        if !parent.is_valid() {
            return;
        }
        if let Some(p) = self.get_mut(prev) {
            p.next_sibling = next;
        } else if let Some(p) = self.get_mut(parent) {
            p.first_child = next;
        }
        if let Some(n) = self.get_mut(next) {
            n.prev_sibling = prev;
        } else if let Some(p) = self.get_mut(parent) {
            p.last_child = prev;
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
        tracing::trace!(node = %id, %parent, "detached");
    }

    /// Detach every child, returning them in order
    pub fn remove_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let children: Vec<NodeId> = self.children(id).collect();
        for &child in &children {
            self.detach(child);
        }
        children
    }

    // ------------------------------------------------------------------
    // Element data
    // ------------------------------------------------------------------

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_element)
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.get(id)?.as_element().map(|e| e.name.as_str())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id)?.as_element()?.get_attr(name)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> DomResult<()> {
        let el = self.node_mut(id)?.as_element_mut().ok_or(DomError::NotFound(id))?;
        el.set_attr(name, value.into());
        Ok(())
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.get_mut(id)?.as_element_mut()?.remove_attr(name)
    }

    /// Class tokens of an element; empty for other nodes
    pub fn class_list(&self, id: NodeId) -> ClassList {
        self.get(id)
            .and_then(Node::as_element)
            .map(|e| e.class_list())
            .unwrap_or_default()
    }

    /// Write a class list back to the `class` attribute
    pub fn set_class_list(&mut self, id: NodeId, list: &ClassList) {
        if let Some(el) = self.get_mut(id).and_then(Node::as_element_mut) {
            el.set_attr("class", list.to_string());
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.get(id)
            .and_then(Node::as_element)
            .is_some_and(|e| e.has_class(class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        let mut list = self.class_list(id);
        if list.insert(class) {
            self.set_class_list(id, &list);
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        let mut list = self.class_list(id);
        if list.remove(class) {
            self.set_class_list(id, &list);
        }
    }

    /// Concatenated text of the node and its descendants
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.get(id).and_then(Node::as_text) {
            return text.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|d| self.get(d).and_then(Node::as_text))
            .collect()
    }

    /// Replace children with a single text node
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> DomResult<()> {
        if let Some(NodeData::Text(content)) = self.get_mut(id).map(|n| &mut n.data) {
            *content = text.to_string();
            return Ok(());
        }
        self.remove_children(id);
        if !text.is_empty() {
            let t = self.create_text(text);
            self.append_child(id, t)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Document structure
    // ------------------------------------------------------------------

    /// `<html>` element
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(NodeId::ROOT).find(|&c| self.is_element(c))
    }

    pub fn head(&self) -> Option<NodeId> {
        self.named_child_of_html("head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.named_child_of_html("body")
    }

    fn named_child_of_html(&self, tag: &str) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html).find(|&c| self.tag_name(c) == Some(tag))
    }

    /// First connected element with the given id
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(NodeId::ROOT)
            .into_iter()
            .find(|&n| self.attr(n, "id") == Some(id))
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over child nodes
pub struct Children<'a> {
    tree: &'a DomTree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let cur = self.next?;
        self.next = self.tree.next_sibling(cur);
        Some(cur)
    }
}

/// Iterator over ancestors, nearest first
pub struct Ancestors<'a> {
    tree: &'a DomTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let cur = self.next?;
        self.next = self.tree.parent(cur);
        Some(cur)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let html = tree.create_element("html");
        let body = tree.create_element("body");
        let p = tree.create_element("p");
        tree.append_child(NodeId::ROOT, html).unwrap();
        tree.append_child(html, body).unwrap();
        tree.append_child(body, p).unwrap();
        (tree, html, body, p)
    }

    #[test]
    fn test_append_and_navigate() {
        let (tree, html, body, p) = sample();
        assert_eq!(tree.parent(p), Some(body));
        assert_eq!(tree.body(), Some(body));
        assert_eq!(tree.document_element(), Some(html));
        assert_eq!(tree.ancestors(p).collect::<Vec<_>>(), vec![body, html, NodeId::ROOT]);
        assert!(tree.is_connected(p));
    }

    #[test]
    fn test_insert_before_after() {
        let (mut tree, _, body, p) = sample();
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        let c = tree.create_element("i");
        tree.insert_before(p, a).unwrap();
        tree.insert_after(p, b).unwrap();
        tree.prepend_child(body, c).unwrap();
        assert_eq!(tree.children(body).collect::<Vec<_>>(), vec![c, a, p, b]);
        assert_eq!(tree.last_child(body), Some(b));
    }

    #[test]
    fn test_detach_relinks_siblings() {
        let (mut tree, _, body, p) = sample();
        let q = tree.create_element("q");
        tree.append_child(body, q).unwrap();
        tree.detach(p);

        assert_eq!(tree.first_child(body), Some(q));
        assert_eq!(tree.prev_sibling(q), None);
        assert_eq!(tree.parent(p), None);
        assert!(!tree.is_connected(p));
        tree.detach(p);
    }

    #[test]
    fn test_cycle_rejected() {
        let (mut tree, html, _, p) = sample();
        let err = tree.append_child(p, html).unwrap_err();
        assert_eq!(err, DomError::HierarchyRequest { parent: p, child: html });

        let text = tree.create_text("t");
        assert!(tree.append_child(text, p).is_err());
    }

    #[test]
    fn test_descendants_document_order() {
        let (mut tree, html, body, p) = sample();
        let head = tree.create_element("head");
        tree.prepend_child(html, head).unwrap();
        let t = tree.create_text("hi");
        tree.append_child(p, t).unwrap();

        assert_eq!(tree.descendants(html), vec![head, body, p, t]);
        assert_eq!(tree.text_content(body), "hi");
    }

    #[test]
    fn test_sort_document_order() {
        let (mut tree, html, body, p) = sample();
        let q = tree.create_element("q");
        tree.insert_before(p, q).unwrap();

        let mut nodes = vec![p, html, q, body, p];
        tree.sort_document_order(&mut nodes);
        assert_eq!(nodes, vec![html, body, q, p]);
    }

    #[test]
    fn test_class_helpers() {
        let mut tree = DomTree::new();
        let el = tree.create_element_with_attrs("div", [("class", "a b")]);
        tree.add_class(el, "c");
        tree.remove_class(el, "a");
        assert_eq!(tree.attr(el, "class"), Some("b c"));
        assert!(tree.has_class(el, "c"));
    }
}
