//! Serialization
//!
//! Writes nodes back out as markup. Text and attribute values are
//! escaped; `script` and `style` content is written as is and void
//! elements get no end tag.

use std::fmt::{self, Write};

use bem_dom::{DomTree, NodeData, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Markup of `node` including the node itself
pub fn get_outer_html(tree: &DomTree, node: NodeId) -> String {
    let mut out = String::new();
    // Writing into a String never fails
    let _ = write_node(tree, node, &mut out);
    out
}

/// Markup of the children of `node`
pub fn get_inner_html(tree: &DomTree, node: NodeId) -> String {
    let mut out = String::new();
    let _ = write_children(tree, node, &mut out);
    out
}

/// Write `node` and its subtree
pub fn write_node<W: Write>(tree: &DomTree, node: NodeId, out: &mut W) -> fmt::Result {
    let Some(data) = tree.get(node).map(|n| &n.data) else {
        return Ok(());
    };
    match data {
        NodeData::Document => write_children(tree, node, out),
        NodeData::Element(el) => {
            let tag = el.name.as_str();
            write!(out, "<{tag}")?;
            for attr in &el.attrs {
                if attr.value.is_empty() {
                    write!(out, " {}", attr.name)?;
                } else {
                    write!(out, " {}=\"{}\"", attr.name, Escaped::attr(&attr.value))?;
                }
            }
            if VOID_ELEMENTS.contains(&tag) {
                return out.write_str(" />");
            }
            out.write_char('>')?;

            if RAW_TEXT_ELEMENTS.contains(&tag) {
                for child in tree.children(node) {
                    if let Some(text) = tree.get(child).and_then(|c| c.as_text()) {
                        out.write_str(text)?;
                    }
                }
            } else {
                write_children(tree, node, out)?;
            }
            write!(out, "</{tag}>")
        }
        NodeData::Text(text) => write!(out, "{}", Escaped::text(text)),
        NodeData::Comment(text) => write!(out, "<!--{text}-->"),
        NodeData::Doctype { name } => write!(out, "<!DOCTYPE {name}>"),
    }
}

/// Write the children of `node` in order
pub fn write_children<W: Write>(tree: &DomTree, node: NodeId, out: &mut W) -> fmt::Result {
    for child in tree.children(node) {
        write_node(tree, child, out)?;
    }
    Ok(())
}

/// Escapes markup characters while formatting
struct Escaped<'a> {
    raw: &'a str,
    quote: bool,
}

impl<'a> Escaped<'a> {
    fn text(raw: &'a str) -> Self {
        Self { raw, quote: false }
    }

    fn attr(raw: &'a str) -> Self {
        Self { raw, quote: true }
    }
}

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.raw.chars() {
            match c {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '"' if self.quote => f.write_str("&quot;")?,
                c => f.write_char(c)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escaping() {
        assert_eq!(
            Escaped::text("Hello <world> & \"friends\"").to_string(),
            "Hello &lt;world&gt; &amp; \"friends\""
        );
        assert_eq!(
            Escaped::attr("{\"b\":{}} & <x>").to_string(),
            "{&quot;b&quot;:{}} &amp; &lt;x&gt;"
        );
    }

    #[test]
    fn test_outer_and_inner() {
        let mut tree = DomTree::new();
        let div = tree.create_element_with_attrs("div", [("class", "b i-bem"), ("hidden", "")]);
        let br = tree.create_element("br");
        let text = tree.create_text("a<b");
        tree.append_child(div, text).unwrap();
        tree.append_child(div, br).unwrap();

        assert_eq!(
            get_outer_html(&tree, div),
            "<div class=\"b i-bem\" hidden>a&lt;b<br /></div>"
        );
        assert_eq!(get_inner_html(&tree, div), "a&lt;b<br />");
    }

    #[test]
    fn test_raw_text_unescaped() {
        let mut tree = DomTree::new();
        let script = tree.create_element("script");
        let code = tree.create_text("if (a < b) {}");
        tree.append_child(script, code).unwrap();
        assert_eq!(get_outer_html(&tree, script), "<script>if (a < b) {}</script>");
    }

    #[test]
    fn test_empty_document_writes_nothing() {
        let tree = DomTree::new();
        let mut out = String::new();
        write_node(&tree, NodeId::ROOT, &mut out).unwrap();
        assert!(out.is_empty());
    }
}
