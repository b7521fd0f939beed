use thiserror::Error;

/// Which table invariant was found broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptKind {
    /// A hashed file was found with a closed descriptor.
    ClosedDescriptor,
    /// A file flagged as hashed is not in its bucket.
    NotInBucket,
}

impl std::fmt::Display for CorruptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorruptKind::ClosedDescriptor => f.write_str("hashed file has a closed descriptor"),
            CorruptKind::NotInBucket => f.write_str("hashed file missing from its bucket"),
        }
    }
}

/// Errors that can occur during index operations
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Corrupt index: {kind} ({name})")]
    Corrupt { kind: CorruptKind, name: String },

    #[error("Invalid bucket count {count}: must be in 1..={max}")]
    InvalidBucketCount { count: usize, max: usize },
}

impl HashError {
    pub(crate) fn corrupt(kind: CorruptKind, name: &str) -> Self {
        HashError::Corrupt {
            kind,
            name: name.to_string(),
        }
    }

    /// True for invariant violations, which are never retryable.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, HashError::Corrupt { .. })
    }
}

pub type Result<T> = std::result::Result<T, HashError>;
