/// Errors from world-state operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A log frame or value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A lock guarding backend state was poisoned by a panicking writer.
    #[error("world state lock poisoned")]
    LockPoisoned,

    /// Range start sorts after range end.
    #[error("invalid range: start {start:?} is after end {end:?}")]
    InvalidRange { start: String, end: String },

    /// The backend cannot serve requests.
    #[error("world state unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for world-state operations.
pub type StoreResult<T> = Result<T, StoreError>;
