//! Content mutation
//!
//! Insert markup or nodes around a context node, destroying the blocks
//! it replaces and initializing the blocks it brings in.

use bem_dom::NodeId;
use bem_html::{get_inner_html, get_outer_html, HtmlParser};

use crate::{BemDom, RuntimeError, RuntimeResult};

/// New content: markup parsed as a fragment, or existing nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content<'a> {
    Html(&'a str),
    Nodes(Vec<NodeId>),
}

impl<'a> From<&'a str> for Content<'a> {
    fn from(html: &'a str) -> Self {
        Content::Html(html)
    }
}

impl<'a> From<&'a String> for Content<'a> {
    fn from(html: &'a String) -> Self {
        Content::Html(html)
    }
}

impl From<Vec<NodeId>> for Content<'_> {
    fn from(nodes: Vec<NodeId>) -> Self {
        Content::Nodes(nodes)
    }
}

impl From<NodeId> for Content<'_> {
    fn from(node: NodeId) -> Self {
        Content::Nodes(vec![node])
    }
}

impl BemDom {
    fn materialize(&mut self, content: Content<'_>) -> RuntimeResult<Vec<NodeId>> {
        match content {
            Content::Html(html) => Ok(HtmlParser::new().parse_fragment_into(&mut self.tree, html)?),
            Content::Nodes(nodes) => {
                for &node in &nodes {
                    self.check_node(node)?;
                }
                Ok(nodes)
            }
        }
    }

    /// Markup of the children of `node`
    pub fn inner_html(&self, node: NodeId) -> String {
        get_inner_html(&self.tree, node)
    }

    pub fn outer_html(&self, node: NodeId) -> String {
        get_outer_html(&self.tree, node)
    }

    /// Replace the children of `ctx`
    pub fn update<'a>(&mut self, ctx: NodeId, content: impl Into<Content<'a>>) -> RuntimeResult<Vec<NodeId>> {
        self.check_node(ctx)?;
        self.destruct(ctx, true);
        let nodes = self.materialize(content.into())?;
        for &node in &nodes {
            self.tree.append_child(ctx, node)?;
        }
        self.init(ctx);
        tracing::debug!(%ctx, inserted = nodes.len(), "updated content");
        Ok(nodes)
    }

    /// Replace `ctx` itself
    pub fn replace<'a>(&mut self, ctx: NodeId, content: impl Into<Content<'a>>) -> RuntimeResult<Vec<NodeId>> {
        let parent = self.tree.parent(ctx).ok_or(RuntimeError::Detached(ctx))?;
        let prev = self.tree.prev_sibling(ctx);
        let nodes = self.materialize(content.into())?;
        self.destruct(ctx, false);
        match prev {
            Some(prev) => {
                let mut anchor = prev;
                for &node in &nodes {
                    self.tree.insert_after(anchor, node)?;
                    anchor = node;
                }
            }
            None => {
                for &node in nodes.iter().rev() {
                    self.tree.prepend_child(parent, node)?;
                }
            }
        }
        self.init_nodes(&nodes);
        tracing::debug!(%ctx, inserted = nodes.len(), "replaced node");
        Ok(nodes)
    }

    /// Add content after the last child of `ctx`
    pub fn append<'a>(&mut self, ctx: NodeId, content: impl Into<Content<'a>>) -> RuntimeResult<Vec<NodeId>> {
        self.check_node(ctx)?;
        let nodes = self.materialize(content.into())?;
        for &node in &nodes {
            self.tree.append_child(ctx, node)?;
        }
        self.init_nodes(&nodes);
        Ok(nodes)
    }

    /// Add content before the first child of `ctx`
    pub fn prepend<'a>(&mut self, ctx: NodeId, content: impl Into<Content<'a>>) -> RuntimeResult<Vec<NodeId>> {
        self.check_node(ctx)?;
        let nodes = self.materialize(content.into())?;
        for &node in nodes.iter().rev() {
            self.tree.prepend_child(ctx, node)?;
        }
        self.init_nodes(&nodes);
        Ok(nodes)
    }

    /// Insert content as preceding siblings of `ctx`
    pub fn before<'a>(&mut self, ctx: NodeId, content: impl Into<Content<'a>>) -> RuntimeResult<Vec<NodeId>> {
        self.tree.parent(ctx).ok_or(RuntimeError::Detached(ctx))?;
        let nodes = self.materialize(content.into())?;
        for &node in &nodes {
            self.tree.insert_before(ctx, node)?;
        }
        self.init_nodes(&nodes);
        Ok(nodes)
    }

    /// Insert content as following siblings of `ctx`
    pub fn after<'a>(&mut self, ctx: NodeId, content: impl Into<Content<'a>>) -> RuntimeResult<Vec<NodeId>> {
        self.tree.parent(ctx).ok_or(RuntimeError::Detached(ctx))?;
        let nodes = self.materialize(content.into())?;
        let mut anchor = ctx;
        for &node in &nodes {
            self.tree.insert_after(anchor, node)?;
            anchor = node;
        }
        self.init_nodes(&nodes);
        Ok(nodes)
    }
}
