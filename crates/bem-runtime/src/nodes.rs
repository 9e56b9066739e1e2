//! Node sets
//!
//! An ordered list of distinct nodes, optionally tagged with the element
//! name it was looked up by. Blocks use it as their element handle.

use std::fmt;

use bem_dom::NodeId;

/// Ordered set of nodes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet {
    nodes: Vec<NodeId>,
    elem_name: Option<String>,
}

impl NodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set of one node
    pub fn one(node: NodeId) -> Self {
        Self {
            nodes: vec![node],
            elem_name: None,
        }
    }

    /// Set of the given nodes, duplicates dropped
    pub fn from_nodes<I: IntoIterator<Item = NodeId>>(nodes: I) -> Self {
        let mut set = Self::new();
        for node in nodes {
            set.push(node);
        }
        set
    }

    /// Tag the set with an element name
    pub fn named(mut self, elem_name: impl Into<String>) -> Self {
        self.elem_name = Some(elem_name.into());
        self
    }

    pub fn elem_name(&self) -> Option<&str> {
        self.elem_name.as_deref()
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn first(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    /// Add a node; `false` if it was already present
    pub fn push(&mut self, node: NodeId) -> bool {
        if self.contains(node) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    /// Remove a node; `false` if it was absent
    pub fn remove(&mut self, node: NodeId) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|&n| n != node);
        self.nodes.len() != before
    }

    /// Add every node of `other`
    pub fn union(&mut self, other: &NodeSet) {
        for node in other.iter() {
            self.push(node);
        }
    }

    /// Nodes passing `pred`, keeping the element name
    pub fn filter(&self, mut pred: impl FnMut(NodeId) -> bool) -> NodeSet {
        NodeSet {
            nodes: self.iter().filter(|&n| pred(n)).collect(),
            elem_name: self.elem_name.clone(),
        }
    }

    /// One set per node, each keeping the element name
    pub fn split(&self) -> Vec<NodeSet> {
        self.iter()
            .map(|node| NodeSet {
                nodes: vec![node],
                elem_name: self.elem_name.clone(),
            })
            .collect()
    }

    pub fn into_vec(self) -> Vec<NodeId> {
        self.nodes
    }
}

impl fmt::Display for NodeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{node}")?;
        }
        Ok(())
    }
}

impl From<NodeId> for NodeSet {
    fn from(node: NodeId) -> Self {
        NodeSet::one(node)
    }
}

impl From<Vec<NodeId>> for NodeSet {
    fn from(nodes: Vec<NodeId>) -> Self {
        NodeSet::from_nodes(nodes)
    }
}

impl From<&[NodeId]> for NodeSet {
    fn from(nodes: &[NodeId]) -> Self {
        NodeSet::from_nodes(nodes.iter().copied())
    }
}

impl<'a> IntoIterator for &'a NodeSet {
    type Item = NodeId;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, NodeId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter().copied()
    }
}
