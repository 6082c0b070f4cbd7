use thiserror::Error;

/// Errors raised by commitment tree operations. All of them are local and
/// deterministic; none leaves the tree partially mutated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("commitment tree is full ({capacity} leaves)")]
    TreeFull { capacity: u64 },

    #[error("leaf index {index} out of range ({filled} leaves filled)")]
    IndexOutOfRange { index: u64, filled: u64 },

    /// Persisted state was written for a different depth. This is a
    /// deployment misconfiguration and must not be recovered from.
    #[error("tree depth mismatch: configured {configured}, persisted state has {persisted}")]
    DepthMismatch { configured: u8, persisted: u8 },

    #[error("unsupported tree depth {0} (expected 1..=63)")]
    InvalidDepth(u8),

    #[error("malformed tree snapshot: {0}")]
    Snapshot(String),
}

impl TreeError {
    /// Configuration errors are fatal to the deployment rather than the call.
    pub fn is_configuration(&self) -> bool {
        matches!(self, TreeError::DepthMismatch { .. } | TreeError::InvalidDepth(_))
    }
}
