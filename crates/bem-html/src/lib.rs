//! BEM HTML
//!
//! HTML5 parsing into [`DomTree`] (built on html5ever) and serialization
//! back to markup.

mod error;
mod parser;
mod serializer;

use bem_dom::DomTree;

pub use error::{HtmlError, HtmlResult};
pub use parser::HtmlParser;
pub use serializer::{get_inner_html, get_outer_html, write_children, write_node};

/// Parse an HTML string into a new tree
pub fn parse(html: &str) -> HtmlResult<DomTree> {
    HtmlParser::new().parse(html)
}
