//! HTML5 Parser implementation
//!
//! Uses html5ever's RcDom and converts it into a [`DomTree`].
//! Whitespace-only text nodes are dropped.

use bem_dom::{DomTree, NodeId};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use crate::{HtmlError, HtmlResult};

/// HTML5 parser
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    fn parse_rcdom(&self, html: &str) -> HtmlResult<RcDom> {
        Ok(parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())?)
    }

    /// Parse HTML string into a new tree
    pub fn parse(&self, html: &str) -> HtmlResult<DomTree> {
        tracing::debug!(bytes = html.len(), "parsing HTML document");
        let dom = self.parse_rcdom(html)?;

        let mut tree = DomTree::new();
        self.convert_node(&dom.document, &mut tree, NodeId::ROOT)?;

        tracing::debug!(nodes = tree.len(), "parsed HTML document");
        Ok(tree)
    }

    /// Parse body content into `tree`, returning the new top-level nodes
    /// detached and in order
    pub fn parse_fragment_into(&self, tree: &mut DomTree, html: &str) -> HtmlResult<Vec<NodeId>> {
        // Opening the body first keeps head-only tags in the fragment
        let dom = self.parse_rcdom(&format!("<!DOCTYPE html><body>{html}"))?;
        let body = find_child(&dom.document, "html")
            .and_then(|html| find_child(&html, "body"))
            .ok_or(HtmlError::MissingBody)?;

        let holder = tree.create_element("body");
        for child in body.children.borrow().iter() {
            self.convert_node(child, tree, holder)?;
        }
        let nodes = tree.remove_children(holder);
        tracing::trace!(count = nodes.len(), "parsed HTML fragment");
        Ok(nodes)
    }

    /// Convert an RcDom node to our DOM format
    fn convert_node(&self, handle: &Handle, tree: &mut DomTree, parent: NodeId) -> HtmlResult<()> {
        match &handle.data {
            RcNodeData::Document => {
                // Document node - just process children
                for child in handle.children.borrow().iter() {
                    self.convert_node(child, tree, parent)?;
                }
            }
            RcNodeData::Doctype { name, .. } => {
                let id = tree.create_doctype(name.to_string());
                tree.append_child(parent, id)?;
            }
            RcNodeData::Text { contents } => {
                let text = contents.borrow().to_string();
                if !text.trim().is_empty() {
                    let id = tree.create_text(text);
                    tree.append_child(parent, id)?;
                }
            }
            RcNodeData::Comment { contents } => {
                let id = tree.create_comment(contents.to_string());
                tree.append_child(parent, id)?;
            }
            RcNodeData::Element { name, attrs, .. } => {
                let attrs = attrs.borrow();
                let id = tree.create_element_with_attrs(
                    &name.local,
                    attrs.iter().map(|a| (&*a.name.local, &*a.value)),
                );
                tree.append_child(parent, id)?;

                for child in handle.children.borrow().iter() {
                    self.convert_node(child, tree, id)?;
                }
            }
            RcNodeData::ProcessingInstruction { .. } => {}
        }
        Ok(())
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

fn find_child(handle: &Handle, tag: &str) -> Option<Handle> {
    handle
        .children
        .borrow()
        .iter()
        .find(|c| matches!(&c.data, RcNodeData::Element { name, .. } if &*name.local == tag))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let html = "<html><head><title>Test</title></head><body><p class=\"x\">Hello</p></body></html>";
        let tree = HtmlParser::new().parse(html).unwrap();

        let body = tree.body().unwrap();
        let p = tree.first_child(body).unwrap();
        assert_eq!(tree.tag_name(p), Some("p"));
        assert_eq!(tree.attr(p, "class"), Some("x"));
        assert_eq!(tree.text_content(p), "Hello");
    }

    #[test]
    fn test_parse_fragment_detached() {
        let mut tree = DomTree::new();
        let nodes = HtmlParser::new()
            .parse_fragment_into(&mut tree, "<div>a</div>  <meta name=\"m\"><span>b</span>")
            .unwrap();

        assert_eq!(nodes.len(), 3);
        assert_eq!(tree.tag_name(nodes[0]), Some("div"));
        assert_eq!(tree.tag_name(nodes[1]), Some("meta"));
        assert!(nodes.iter().all(|&n| tree.parent(n).is_none()));
    }

    #[test]
    fn test_whitespace_text_dropped() {
        let tree = HtmlParser::new().parse("<body>\n  <div>\n </div>\n</body>").unwrap();
        let div = tree.first_child(tree.body().unwrap()).unwrap();
        assert_eq!(tree.children(div).count(), 0);
    }
}
