#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
// Allow pedantic strict lints that create false positives in this codebase
#![allow(clippy::arithmetic_side_effects)] // Simple counters and size calculations cannot overflow
#![allow(clippy::float_arithmetic)] // Required for size and rate formatting
#![allow(clippy::indexing_slicing)] // Bounds checked by logic

//! # yabrc - Yet Another Bit Rot Checker
//!
//! yabrc detects silent data corruption. It walks a directory tree, hashes
//! every regular file with SHA-256, and saves the result as a compressed
//! manifest. Later manifests are compared against earlier ones: a file whose
//! content changed while its size and modification time did not is the
//! signature of bit rot.
//!
//! ## Features
//!
//! - **Labelled manifests**: gzip text manifests named `<baseName><ext>` so
//!   several snapshots of one tree live side by side
//! - **Fast rebuilds**: unchanged files reuse their previous entry without
//!   being read
//! - **Deterministic diffs**: every difference is reported in path order
//! - **Unicode safe paths**: separators fixed and NFC normalized before any
//!   comparison
//!
//! ## Architecture
//!
//! - [`fs`]: Filesystem abstraction with a real and an in-memory implementation
//! - [`storage`]: Entries, the index, and the manifest codec
//! - [`scanner`]: Incremental index builder
//! - [`diff`]: Index comparison and difference reporters
//! - [`config`]: TOML configuration
//! - [`commands`]: Command implementations
//! - [`output`]: Console output and prompts
//! - [`utils`]: Path and formatting helpers
//!
//! ## Example Usage
//!
//! ```
//! use yabrc::config::Config;
//! use yabrc::diff::{CountingReporter, compare};
//! use yabrc::fs::MemoryFileSystem;
//! use yabrc::scanner::IndexBuilder;
//!
//! # fn main() -> anyhow::Result<()> {
//! let fs = MemoryFileSystem::new();
//! fs.add_file("/photos/a.jpg", b"pixels");
//!
//! let config = Config::new("/photos", "photos", "/manifests", &[])?;
//! let before = IndexBuilder::new(&config, &fs).build(None)?.index;
//!
//! fs.add_file("/photos/a.jpg", b"pixelz");
//! let after = IndexBuilder::new(&config, &fs).build(None)?.index;
//!
//! let mut reporter = CountingReporter::default();
//! assert!(!compare(Some(&before), Some(&after), false, &mut reporter));
//! assert_eq!(reporter.hash_changed, vec!["a.jpg"]);
//! # Ok(())
//! # }
//! ```

/// Command-line interface definitions (argument parsing structures).
pub mod cli;

/// Command implementations.
pub mod commands;

/// Configuration parsing and validation.
pub mod config;

/// Index comparison and difference reporting.
pub mod diff;

/// Error taxonomy of the indexing core.
pub mod error;

/// Filesystem abstraction.
pub mod fs;

/// Console output and prompts.
pub mod output;

/// Incremental index builder.
pub mod scanner;

/// Entries, indexes and manifests.
pub mod storage;

/// Utility functions and helpers.
pub mod utils;

/// Current version of the yabrc binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Label of the current manifest when none is given.
pub const DEFAULT_EXTENSION: &str = "_current";
