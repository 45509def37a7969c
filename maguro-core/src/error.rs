//! Error types for the maguro core library.
//!
//! Defines the error enum exposed by the public API, a stable code enum for
//! logging and metrics surfaces, and a convenient result alias.

use std::{fmt, io, path::PathBuf, sync::Arc};

use thiserror::Error;

/// Stable codes describing [`MaguroError`] variants.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum MaguroErrorCode {
    /// The supplied [`KeySource`](crate::KeySource) contained no keys.
    EmptySource,
    /// The key count exceeded the addressable edge space.
    TooManyKeys,
    /// The resize threshold must be at least one attempt.
    InvalidResizeThreshold,
    /// The requested table size cannot hold the key set.
    InvalidTableSize,
    /// Doubling the vertex count overflowed the 32-bit table space.
    TableSizeOverflow,
    /// The guard-paged graph buffer region could not be allocated.
    BufferAllocation,
    /// A guard page could not be protected.
    GuardProtection,
    /// A file-work operation (prepare or save) failed.
    FileWork,
    /// The resize limit was reached without finding a solution.
    ResizeLimitExhausted,
    /// The build was shut down before a solution was found.
    Cancelled,
    /// The verifier observed two keys mapping to the same index.
    IndexCollision,
    /// A solver worker thread panicked.
    WorkerPanicked,
}

impl MaguroErrorCode {
    /// Return the stable machine-readable representation of this error code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmptySource => "MAGURO_EMPTY_SOURCE",
            Self::TooManyKeys => "MAGURO_TOO_MANY_KEYS",
            Self::InvalidResizeThreshold => "MAGURO_INVALID_RESIZE_THRESHOLD",
            Self::InvalidTableSize => "MAGURO_INVALID_TABLE_SIZE",
            Self::TableSizeOverflow => "MAGURO_TABLE_SIZE_OVERFLOW",
            Self::BufferAllocation => "MAGURO_BUFFER_ALLOCATION",
            Self::GuardProtection => "MAGURO_GUARD_PROTECTION",
            Self::FileWork => "MAGURO_FILE_WORK",
            Self::ResizeLimitExhausted => "MAGURO_RESIZE_LIMIT_EXHAUSTED",
            Self::Cancelled => "MAGURO_CANCELLED",
            Self::IndexCollision => "MAGURO_INDEX_COLLISION",
            Self::WorkerPanicked => "MAGURO_WORKER_PANICKED",
        }
    }
}

impl fmt::Display for MaguroErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type produced when configuring or running a build.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum MaguroError {
    /// The supplied [`KeySource`](crate::KeySource) contained no keys.
    #[error("key source `{key_source}` contains no keys")]
    EmptySource {
        /// Name reported by the key source.
        key_source: Arc<str>,
    },
    /// The key count exceeded the addressable edge space.
    #[error("key source `{key_source}` has {keys} keys but at most {maximum} are supported")]
    TooManyKeys {
        /// Name reported by the key source.
        key_source: Arc<str>,
        /// Number of keys in the source.
        keys: usize,
        /// Largest supported key count.
        maximum: usize,
    },
    /// The resize threshold must be at least one attempt.
    #[error("resize_threshold must be at least 1 (got {got})")]
    InvalidResizeThreshold {
        /// Value supplied by the caller.
        got: u64,
    },
    /// The requested table size cannot hold the key set.
    #[error("requested table size {requested} must exceed the edge count {minimum}")]
    InvalidTableSize {
        /// Requested number of table elements after rounding.
        requested: u32,
        /// Smallest vertex count that can hold the key set.
        minimum: u32,
    },
    /// Doubling the vertex count overflowed the 32-bit table space.
    #[error("table resize from {last} vertices overflowed the 32-bit vertex space")]
    TableSizeOverflow {
        /// Vertex count in effect before the failed doubling.
        last: u32,
    },
    /// The guard-paged graph buffer region could not be allocated.
    #[error("failed to allocate {bytes} bytes of graph buffer space")]
    BufferAllocation {
        /// Size of the attempted allocation.
        bytes: usize,
    },
    /// A guard page could not be protected.
    #[error("failed to protect the guard page at region offset {offset}")]
    GuardProtection {
        /// Byte offset of the guard page within the buffer region.
        offset: usize,
    },
    /// A file-work operation (prepare or save) failed.
    #[error("file work `{stage}` failed for `{path}`: {source}")]
    FileWork {
        /// Which work item failed (`prepare` or `save`).
        stage: &'static str,
        /// Path the file worker was operating on.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// The resize limit was reached without finding a solution.
    #[error(
        "no solution after {attempts} attempts and {resize_events} resizes \
         (closest approach: {closest_approach} edges short)"
    )]
    ResizeLimitExhausted {
        /// Attempts made across all table sizes.
        attempts: u64,
        /// Resize events consumed.
        resize_events: u32,
        /// Fewest undeleted edges observed in any failed attempt.
        closest_approach: u64,
    },
    /// The build was shut down before a solution was found.
    #[error("the build was cancelled before a solution was found")]
    Cancelled,
    /// The verifier observed two keys mapping to the same index.
    #[error("keys {key:#010x} and {previous_key:#010x} both map to index {index}")]
    IndexCollision {
        /// Index produced by both keys.
        index: u32,
        /// Key currently being verified.
        key: u32,
        /// Key that previously produced the same index.
        previous_key: u32,
    },
    /// A solver worker thread panicked.
    #[error("solver worker {worker} panicked")]
    WorkerPanicked {
        /// Slot index of the panicking worker.
        worker: usize,
    },
}

impl MaguroError {
    /// Retrieve the stable [`MaguroErrorCode`] for this error.
    #[must_use]
    pub const fn code(&self) -> MaguroErrorCode {
        match self {
            Self::EmptySource { .. } => MaguroErrorCode::EmptySource,
            Self::TooManyKeys { .. } => MaguroErrorCode::TooManyKeys,
            Self::InvalidResizeThreshold { .. } => MaguroErrorCode::InvalidResizeThreshold,
            Self::InvalidTableSize { .. } => MaguroErrorCode::InvalidTableSize,
            Self::TableSizeOverflow { .. } => MaguroErrorCode::TableSizeOverflow,
            Self::BufferAllocation { .. } => MaguroErrorCode::BufferAllocation,
            Self::GuardProtection { .. } => MaguroErrorCode::GuardProtection,
            Self::FileWork { .. } => MaguroErrorCode::FileWork,
            Self::ResizeLimitExhausted { .. } => MaguroErrorCode::ResizeLimitExhausted,
            Self::Cancelled => MaguroErrorCode::Cancelled,
            Self::IndexCollision { .. } => MaguroErrorCode::IndexCollision,
            Self::WorkerPanicked { .. } => MaguroErrorCode::WorkerPanicked,
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, MaguroError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_identifiers() {
        let err = MaguroError::Cancelled;
        assert_eq!(err.code().as_str(), "MAGURO_CANCELLED");

        let err = MaguroError::IndexCollision {
            index: 3,
            key: 7,
            previous_key: 9,
        };
        assert_eq!(err.code(), MaguroErrorCode::IndexCollision);
    }

    #[test]
    fn display_includes_structured_fields() {
        let err = MaguroError::ResizeLimitExhausted {
            attempts: 4096,
            resize_events: 5,
            closest_approach: 17,
        };
        let text = err.to_string();
        assert!(text.contains("4096"));
        assert!(text.contains("17 edges short"));
    }
}
