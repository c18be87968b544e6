use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid share id {id:?}: {reason}")]
    InvalidShareId { id: String, reason: String },
}
