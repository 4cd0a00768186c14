//! Errors raised while building or loading a heap.

use std::io;

use core_types::{HeapRef, ProfilerError};
use thiserror::Error;

/// Errors from heap construction and snapshot loading.
#[derive(Debug, Error)]
pub enum HeapError {
    /// A handle that this heap never allocated
    #[error("unknown object {0}")]
    UnknownObject(HeapRef),

    /// A snapshot referred to an object index it does not define
    #[error("snapshot refers to object #{index} but defines only {count} objects")]
    UnknownSnapshotRef {
        /// Index that was referenced
        index: usize,
        /// Number of objects in the snapshot
        count: usize,
    },

    /// A snapshot function's line range is reversed or too long
    #[error("snapshot object #{index} has invalid line range {line_start}..={line_end}")]
    InvalidLineRange {
        /// Index of the function object
        index: usize,
        /// First line given
        line_start: u32,
        /// Last line given
        line_end: u32,
    },

    /// Snapshot JSON could not be parsed
    #[error("invalid heap snapshot: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot file could not be read
    #[error("cannot read heap snapshot: {0}")]
    Io(#[from] io::Error),
}

impl From<HeapError> for ProfilerError {
    fn from(err: HeapError) -> Self {
        match err {
            HeapError::UnknownObject(r) => {
                ProfilerError::ConsistencyViolation(format!("target heap has no object {r}"))
            }
            other => ProfilerError::setup(other.to_string()),
        }
    }
}

/// Result type for heap operations
pub type HeapResult<T> = Result<T, HeapError>;
