//! Error types

use bem_core::BemError;
use bem_dom::{DomError, NodeId};
use bem_html::HtmlError;

/// Runtime error
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Block error: {0}")]
    Core(#[from] BemError),

    #[error("HTML error: {0}")]
    Html(#[from] HtmlError),

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error("Malformed block parameters on {node}: {reason}")]
    MalformedParams { node: NodeId, reason: String },

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node {0} has no parent")]
    Detached(NodeId),
}

/// Result alias for the runtime
pub type RuntimeResult<T> = Result<T, RuntimeError>;
