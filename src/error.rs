//! Error taxonomy for the indexing and diff engine.
//!
//! Structural and I/O failures propagate to the caller. Per-line failures while
//! loading a manifest ([`IndexError::DataLine`]) and per-file failures while
//! walking a tree are recovered locally by their callers: logged and skipped.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the indexing core.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A required argument was empty or otherwise unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A path did not agree with the file name or index root it was paired with.
    #[error("path '{path}' does not match '{expected}'")]
    PathMismatch {
        /// The path that was supplied.
        path: String,
        /// The name or root it was expected to match.
        expected: String,
    },

    /// An open, read, write or sync failed.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The manifest header was malformed; fatal to a load.
    #[error("line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What was wrong with the header.
        message: String,
    },

    /// A manifest data line could not be decoded; recovered by skipping it.
    #[error("line {line}: skipping '{content}'; {reason}")]
    DataLine {
        /// 1-based line number.
        line: usize,
        /// Raw text of the line.
        content: String,
        /// Why the line was rejected.
        reason: String,
    },

    /// Refused to store an index with no entries.
    #[error("cannot store an empty index")]
    EmptyIndex,

    /// The manifest contained no lines at all.
    #[error("no data loaded from '{}'", path.display())]
    NoDataLoaded {
        /// Manifest that was read.
        path: PathBuf,
    },

    /// A walk produced no entries and at least one error.
    #[error("no files successfully read from '{root}' ({errors} errors)")]
    AggregateWalk {
        /// Root of the walk.
        root: String,
        /// Number of errors encountered.
        errors: usize,
    },

    /// An entry failed the validity invariant.
    #[error("cannot add invalid entry: {0}")]
    InvalidEntry(String),
}

impl IndexError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used throughout the core.
pub type Result<T, E = IndexError> = std::result::Result<T, E>;
