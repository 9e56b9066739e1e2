//! Element Query and Methods
//!
//! querySelector, getElementsByClassName, closest, matches. Selectors are
//! compounds of simple selectors (`div.block__elem#main`); combinators
//! are not supported.

use crate::{DomError, DomResult, DomTree, NodeId};

/// Element query trait
pub trait ElementQuery {
    /// Query single element by CSS selector
    fn query_selector(&self, root: NodeId, selector: &str) -> DomResult<Option<NodeId>>;

    /// Query all elements by CSS selector
    fn query_selector_all(&self, root: NodeId, selector: &str) -> DomResult<Vec<NodeId>>;

    /// Get elements by class name
    fn get_elements_by_class_name(&self, root: NodeId, class: &str) -> Vec<NodeId>;

    /// Get elements by tag name
    fn get_elements_by_tag_name(&self, root: NodeId, tag: &str) -> Vec<NodeId>;

    /// Find closest inclusive ancestor matching selector
    fn closest(&self, element: NodeId, selector: &str) -> DomResult<Option<NodeId>>;

    /// Check if element matches selector
    fn matches(&self, element: NodeId, selector: &str) -> DomResult<bool>;
}

/// Simple selector for matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    Tag(String),
    Class(String),
    Id(String),
    Universal,
}

impl SimpleSelector {
    /// Parse a simple selector string
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        if s == "*" {
            Some(Self::Universal)
        } else if let Some(id) = s.strip_prefix('#') {
            (!id.is_empty()).then(|| Self::Id(id.to_string()))
        } else if let Some(class) = s.strip_prefix('.') {
            (!class.is_empty()).then(|| Self::Class(class.to_string()))
        } else {
            Some(Self::Tag(s.to_lowercase()))
        }
    }

    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        let Some(el) = tree.get(node).and_then(|n| n.as_element()) else {
            return false;
        };
        match self {
            Self::Universal => true,
            Self::Tag(tag) => el.name.eq_ignore_ascii_case(tag),
            Self::Id(id) => el.id() == Some(id.as_str()),
            Self::Class(class) => el.has_class(class),
        }
    }
}

/// Compound selector: every part must match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    parts: Vec<SimpleSelector>,
}

impl Selector {
    pub fn parse(s: &str) -> DomResult<Self> {
        let s = s.trim();
        let invalid = || DomError::InvalidSelector(s.to_string());
        if s.is_empty() || s.contains(char::is_whitespace) {
            return Err(invalid());
        }

        let mut parts = Vec::new();
        let mut start = 0;
        for (i, c) in s.char_indices().skip(1) {
            if c == '.' || c == '#' {
                parts.push(SimpleSelector::parse(&s[start..i]).ok_or_else(invalid)?);
                start = i;
            }
        }
        parts.push(SimpleSelector::parse(&s[start..]).ok_or_else(invalid)?);
        Ok(Self { parts })
    }

    /// Selector matching elements carrying `class`
    pub fn class(class: &str) -> Self {
        Self {
            parts: vec![SimpleSelector::Class(class.to_string())],
        }
    }

    pub fn parts(&self) -> &[SimpleSelector] {
        &self.parts
    }

    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        tree.is_element(node) && self.parts.iter().all(|p| p.matches(tree, node))
    }

    /// Matching descendants of `root` in document order
    pub fn query_all(&self, tree: &DomTree, root: NodeId) -> Vec<NodeId> {
        tree.descendants(root)
            .into_iter()
            .filter(|&n| self.matches(tree, n))
            .collect()
    }

    /// Nearest inclusive ancestor matching the selector
    pub fn closest(&self, tree: &DomTree, node: NodeId) -> Option<NodeId> {
        std::iter::once(node)
            .chain(tree.ancestors(node))
            .find(|&n| self.matches(tree, n))
    }
}

impl ElementQuery for DomTree {
    fn query_selector(&self, root: NodeId, selector: &str) -> DomResult<Option<NodeId>> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .descendants(root)
            .into_iter()
            .find(|&n| selector.matches(self, n)))
    }

    fn query_selector_all(&self, root: NodeId, selector: &str) -> DomResult<Vec<NodeId>> {
        Ok(Selector::parse(selector)?.query_all(self, root))
    }

    fn get_elements_by_class_name(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        Selector::class(class).query_all(self, root)
    }

    fn get_elements_by_tag_name(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        let selector = Selector {
            parts: vec![SimpleSelector::Tag(tag.to_lowercase())],
        };
        selector.query_all(self, root)
    }

    fn closest(&self, element: NodeId, selector: &str) -> DomResult<Option<NodeId>> {
        Ok(Selector::parse(selector)?.closest(self, element))
    }

    fn matches(&self, element: NodeId, selector: &str) -> DomResult<bool> {
        Ok(Selector::parse(selector)?.matches(self, element))
    }
}
