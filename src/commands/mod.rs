//! Command implementations behind the `yabrc` subcommands.
//!
//! Commands take the [`FileSystem`](crate::fs::FileSystem) they operate on and
//! any interactive or output channel explicitly, so they run the same against
//! the real disk and against an in-memory tree.

/// Compare two manifests
pub mod compare;
/// Print manifest summaries, entries or JSON
pub mod print;
/// Build a fresh index and save it as the current manifest
pub mod update;
/// Version banner
pub mod version;

use crate::config::Config;
use crate::fs::FileSystem;
use crate::storage::index::Index;
use anyhow::{Context, Result};
use std::path::Path;

/// Loads the config at `config_path` and the manifest labelled `ext` for it.
///
/// # Errors
///
/// Returns an error if the config or the manifest cannot be loaded.
pub fn load_index(fs: &dyn FileSystem, config_path: &Path, ext: &str) -> Result<(Config, Index)> {
    let config = Config::load(config_path)?;
    let index = Index::load_for(fs, &config, ext).with_context(|| {
        format!(
            "cannot load index '{}'",
            config.index_file(ext).display()
        )
    })?;
    Ok((config, index))
}
