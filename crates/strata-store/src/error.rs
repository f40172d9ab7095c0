use strata_types::AnchorId;

/// Errors from tiered store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Required configuration is absent; the store cannot be built.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport failure against the cache tier after a successful probe.
    #[error("cache tier error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Transport failure against the durable tier after a successful probe.
    #[error("durable tier error: {0}")]
    Durable(#[from] mongodb::error::Error),

    /// Encode or decode failure for a stored blob.
    #[error(transparent)]
    Codec(#[from] strata_codec::CodecError),

    /// A durable-tier document exists but its payload field is unusable.
    #[error("corrupt document for {id}: {reason}")]
    CorruptDocument { id: AnchorId, reason: String },

    /// The local fallback table cannot be read or rebuilt.
    #[error("fallback store error: {0}")]
    Fallback(String),

    /// I/O error from the local fallback file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation attempted on a closed store.
    #[error("store is closed")]
    Closed,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
