use thiserror::Error;

/// Errors from encoding or decoding an anchor.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The blob carries a format version this build does not understand.
    #[error("unsupported wire format version {0}")]
    UnsupportedVersion(u8),

    /// A node reference points outside the node table.
    #[error("node reference {index} out of range (table has {len} nodes)")]
    InvalidNodeRef { index: u32, len: usize },

    /// Serialization failure while encoding.
    #[error("encode error: {0}")]
    Encode(String),

    /// The blob is truncated, corrupt, or otherwise undecodable.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
