use share_store::StoreError;

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("The share {id} does not exist")]
    NotFound { id: String },

    #[error("The share {id} must be owned by {issuer} to be deleted; current owner is {owner}")]
    Unauthorized {
        id: String,
        owner: String,
        issuer: String,
    },

    #[error("The share {id} already exists")]
    AlreadyExists { id: String },

    #[error("The share {id} was deleted; its id cannot be reused")]
    Retired { id: String },

    #[error("invalid new owner for share {id}: {reason}")]
    InvalidOwner { id: String, reason: String },

    #[error("invalid share id {id:?}: {reason}")]
    InvalidShareId { id: String, reason: String },

    #[error("share {id} kept changing concurrently; gave up after {attempts} attempts")]
    Conflict { id: String, attempts: u32 },

    #[error("record {id} is not a share: {reason}")]
    Codec { id: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("{function} expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Returns `true` for the not-found class of failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` for the authorization class of failures.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
