//! Command-line interface definitions for yabrc.
//!
//! The CLI definitions are shared between the main binary and build tools
//! (like xtask) for man page generation.
//!
//! Note: Field-level documentation is provided via clap attributes, so we
//! allow missing_docs for this module to avoid redundant documentation.

#![allow(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Main CLI structure for yabrc.
#[derive(Parser)]
#[command(
    name = "yabrc",
    version = crate::VERSION,
    about = "Yet another bit rot checker",
    long_about = "Hashes every file under a directory into a compressed manifest and \
                  compares manifests over time to find silently corrupted files"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Label of the manifest to read or write
    #[arg(short, long, global = true, default_value = crate::DEFAULT_EXTENSION)]
    pub ext: String,
}

/// All available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Build a fresh index and save it as the current manifest
    Update {
        /// Config file
        config: PathBuf,

        /// Reuse entries of unchanged files from the current manifest
        #[arg(short, long)]
        fast: bool,

        /// Save without asking for confirmation
        #[arg(short, long)]
        autosave: bool,

        /// Overwrite the current manifest instead of keeping it
        #[arg(short, long)]
        overwrite: bool,

        /// Label the current manifest is moved to (default: its timestamp)
        #[arg(long, alias = "old_ext")]
        old_ext: Option<String>,
    },

    /// Compare two manifests
    Compare {
        /// Config of the reference manifest
        config1: PathBuf,

        /// Config of the second manifest (default: config1)
        config2: Option<PathBuf>,

        /// Label of the second manifest
        #[arg(long, default_value = crate::DEFAULT_EXTENSION)]
        ext2: String,

        /// Do not report files missing from the reference manifest
        #[arg(short, long)]
        ignore_missing: bool,

        /// Report differences as a JSON array on stdout
        #[arg(short, long)]
        json: bool,
    },

    /// Print manifest summaries
    Print {
        /// Config files
        #[arg(required = true)]
        configs: Vec<PathBuf>,

        /// Print every entry
        #[arg(long, conflicts_with = "json")]
        entries: bool,

        /// Print manifests as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show version and licence
    Version,

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
