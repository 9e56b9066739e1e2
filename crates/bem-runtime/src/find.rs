//! Block lookup
//!
//! Finds blocks relative to a block's nodes (or one of its elements)
//! and returns their instances, constructing and initializing any that
//! are still pending.

use bem_core::naming::build_class;
use bem_core::{BlockId, ModVal};
use bem_dom::{NodeId, Selector};

use crate::BemDom;

/// Block type with an optional modifier filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockQuery {
    pub name: String,
    pub modifier: Option<(String, ModVal)>,
}

impl BlockQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifier: None,
        }
    }

    /// Only blocks carrying `name` with `val`
    pub fn with_mod(mut self, name: impl Into<String>, val: impl Into<ModVal>) -> Self {
        self.modifier = Some((name.into(), val.into()));
        self
    }

    fn selector(&self) -> Selector {
        let modifier = self.modifier.as_ref().map(|(n, v)| (n.as_str(), v));
        Selector::class(&build_class(&self.name, None, modifier))
    }
}

impl From<&str> for BlockQuery {
    fn from(name: &str) -> Self {
        BlockQuery::new(name)
    }
}

impl From<String> for BlockQuery {
    fn from(name: String) -> Self {
        BlockQuery::new(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Inside,
    Outside,
    Closest,
    On,
}

impl BemDom {
    /// Blocks strictly inside the context
    pub fn find_blocks_inside(&mut self, id: BlockId, elem: Option<&str>, query: impl Into<BlockQuery>) -> Vec<BlockId> {
        self.find_blocks(id, elem, &query.into(), Direction::Inside, false)
    }

    pub fn find_block_inside(&mut self, id: BlockId, elem: Option<&str>, query: impl Into<BlockQuery>) -> Option<BlockId> {
        self.find_blocks(id, elem, &query.into(), Direction::Inside, true).into_iter().next()
    }

    /// Blocks on ancestors of the context, not on the context itself
    pub fn find_blocks_outside(&mut self, id: BlockId, elem: Option<&str>, query: impl Into<BlockQuery>) -> Vec<BlockId> {
        self.find_blocks(id, elem, &query.into(), Direction::Outside, false)
    }

    /// Nearest block on the context or above it
    pub fn find_block_outside(&mut self, id: BlockId, elem: Option<&str>, query: impl Into<BlockQuery>) -> Option<BlockId> {
        self.find_blocks(id, elem, &query.into(), Direction::Closest, true).into_iter().next()
    }

    /// Blocks sharing the context nodes
    pub fn find_blocks_on(&mut self, id: BlockId, elem: Option<&str>, query: impl Into<BlockQuery>) -> Vec<BlockId> {
        self.find_blocks(id, elem, &query.into(), Direction::On, false)
    }

    pub fn find_block_on(&mut self, id: BlockId, elem: Option<&str>, query: impl Into<BlockQuery>) -> Option<BlockId> {
        self.find_blocks(id, elem, &query.into(), Direction::On, true).into_iter().next()
    }

    pub(crate) fn find_blocks(
        &mut self,
        id: BlockId,
        elem: Option<&str>,
        query: &BlockQuery,
        direction: Direction,
        only_first: bool,
    ) -> Vec<BlockId> {
        let ctx = match elem {
            Some(elem) => self.find_elem(id, elem),
            None => self.block_nodes(id),
        };
        let selector = query.selector();
        let tree = &self.tree;

        let mut nodes: Vec<NodeId> = Vec::new();
        for root in &ctx {
            match direction {
                Direction::Inside => {
                    nodes.extend(tree.descendants(root).into_iter().filter(|&n| selector.matches(tree, n)));
                }
                Direction::Outside => nodes.extend(tree.ancestors(root).filter(|&n| selector.matches(tree, n))),
                // Inclusive of the context node
                Direction::Closest => nodes.extend(selector.closest(tree, root)),
                Direction::On => nodes.extend(Some(root).filter(|&n| selector.matches(tree, n))),
            }
        }
        tree.sort_document_order(&mut nodes);
        if only_first {
            nodes.truncate(1);
        }

        let mut found = Vec::new();
        for node in nodes {
            match self.ensure_block(&query.name, node, None, true) {
                Ok(Some((block, _))) => {
                    self.ensure_inited(block);
                    if !found.contains(&block) {
                        found.push(block);
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(%node, block = %query.name, error = %err, "could not bind found block");
                }
            }
        }
        tracing::trace!(from = %id, block = %query.name, ?direction, found = found.len(), "find blocks");
        found
    }
}
