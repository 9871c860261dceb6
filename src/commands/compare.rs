use super::load_index;
use crate::diff::{Reporter, compare};
use crate::fs::FileSystem;
use anyhow::Result;
use std::path::Path;
use tracing::info;

/// Compares the manifest `ext` of `config1` against the manifest `ext2` of
/// `config2`, or of `config1` again when no second config is given.
///
/// Returns whether the two are the same. Differences go to `reporter`.
///
/// # Errors
///
/// Returns an error if either config or manifest cannot be loaded.
pub fn execute(
    fs: &dyn FileSystem,
    config1: &Path,
    config2: Option<&Path>,
    ext: &str,
    ext2: &str,
    ignore_missing: bool,
    reporter: &mut dyn Reporter,
) -> Result<bool> {
    let (_, first) = load_index(fs, config1, ext)?;
    let (_, second) = load_index(fs, config2.unwrap_or(config1), ext2)?;

    info!("comparing {first} vs {second}");
    Ok(compare(Some(&first), Some(&second), ignore_missing, reporter))
}
