//! Error types

use crate::block::BlockId;

/// Block layer error
#[derive(Debug, thiserror::Error)]
pub enum BemError {
    #[error("Base block \"{ancestor}\" for \"{requested_by}\" is undefined")]
    TypeResolution { ancestor: String, requested_by: String },

    #[error("Block \"{0}\" is not declared")]
    UnknownBlock(String),

    #[error("Block \"{block}\" has no method \"{method}\"")]
    UnknownMethod { block: String, method: String },

    #[error("Invalid name \"{0}\"")]
    InvalidName(String),

    #[error("Block {0} is not alive")]
    Destructed(BlockId),
}

/// Result alias for the block layer
pub type BemResult<T> = Result<T, BemError>;
