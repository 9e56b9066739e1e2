//! BEM DOM - Document Object Model
//!
//! Arena-allocated document tree with the class, attribute and query
//! helpers the block runtime needs.

mod classlist;
mod error;
mod events;
mod node;
mod query;
mod tree;

use std::fmt;

pub use classlist::ClassList;
pub use error::{DomError, DomResult};
pub use events::DomEvent;
pub use node::{Attribute, ElementData, Node, NodeData, NodeType};
pub use query::{ElementQuery, Selector, SimpleSelector};
pub use tree::{Ancestors, Children, DomTree};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root (document) node ID
    pub const ROOT: NodeId = NodeId(0);
    /// Invalid/null node ID
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check if this is a valid node ID
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    fn option(self) -> Option<NodeId> {
        self.is_valid().then_some(self)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
