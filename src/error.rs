//! Crate-wide error type.
//!
//! One enum covers every failure mode described for the tree, its paged
//! memory manager, and the write-ahead log. Point lookups that simply miss
//! return `Ok(None)`, not an error — `NotFound` is modeled as an `Option`
//! at the API boundary, matching the contract in the tree's public methods.

use std::io;
use thiserror::Error;

pub type TreeResult<T> = Result<T, TreeError>;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("page {0} is beyond the end of the file and not present in the WAL")]
    ReachedEndOfFile(u32),

    #[error("corrupted file: {0}")]
    CorruptedFile(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("operation attempted on a closed tree")]
    ClosedTree,
}

impl TreeError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        TreeError::InvalidArgument(msg.into())
    }

    pub fn corrupted(msg: impl Into<String>) -> Self {
        TreeError::CorruptedFile(msg.into())
    }
}
