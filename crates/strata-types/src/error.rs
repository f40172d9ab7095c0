use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid anchor id: {0}")]
    InvalidAnchorId(String),

    #[error("node index {index} out of range (graph has {len} nodes)")]
    InvalidNodeRef { index: u32, len: usize },
}
