//! HTML errors

use bem_dom::DomError;

pub type HtmlResult<T> = Result<T, HtmlError>;

#[derive(Debug, thiserror::Error)]
pub enum HtmlError {
    #[error("HTML input error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tree construction failed: {0}")]
    Dom(#[from] DomError),

    #[error("Parsed document has no body")]
    MissingBody,
}
