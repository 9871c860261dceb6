use crate::config::Config;
use crate::diff::{LoggingReporter, compare};
use crate::error::IndexError;
use crate::fs::FileSystem;
use crate::output;
use crate::scanner::IndexBuilder;
use crate::storage::index::Index;
use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Switches for [`execute`].
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Label of the current manifest
    pub ext: String,
    /// Label the previous manifest is moved to; defaults to its timestamp
    pub old_ext: Option<String>,
    /// Reuse unchanged entries of the current manifest instead of hashing
    pub fast: bool,
    /// Never ask for confirmation
    pub autosave: bool,
    /// Replace the current manifest instead of keeping it under `old_ext`
    pub overwrite: bool,
}

/// How an update ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The fresh index matched the current manifest; nothing was written
    Unchanged,
    /// The fresh index was saved to this path
    Saved(PathBuf),
    /// A confirmation was refused
    Declined,
}

/// Rebuilds the index for the config at `config_path` and saves it as the
/// manifest labelled `options.ext`.
///
/// When a current manifest exists, the new index is compared against it and
/// nothing is written if they match. Otherwise the current manifest is moved
/// aside (unless overwriting) before the new one is stored. `confirm` is asked
/// before each write unless `options.autosave` is set.
///
/// # Errors
///
/// Returns an error if:
/// - the config cannot be loaded
/// - the build fails as a whole
/// - the current manifest cannot be moved aside
/// - the new manifest cannot be written
pub fn execute(
    fs: &dyn FileSystem,
    config_path: &Path,
    options: &UpdateOptions,
    confirm: &mut dyn FnMut(&str) -> bool,
) -> Result<UpdateOutcome> {
    let config = Config::load(config_path)?;
    let index_file = config.index_file(&options.ext);

    let existing = match Index::load_for(fs, &config, &options.ext) {
        Ok(index) => Some(index),
        Err(err) => {
            warn!(
                "cannot open index '{}' ({err}); assuming new index creation",
                index_file.display()
            );
            if options.fast {
                warn!("ignoring --fast on new index");
            }
            None
        }
    };

    let prior = if options.fast { existing.as_ref() } else { None };
    let index = IndexBuilder::new(&config, fs)
        .build(prior)
        .with_context(|| format!("cannot build index for '{}'", config.root()))?
        .index;

    if let Some(existing) = &existing {
        info!("comparing '{}' {index} vs {existing}", config.root());

        let mut reporter = LoggingReporter::new();
        if compare(Some(&index), Some(existing), false, &mut reporter) {
            info!("Indexes are the same");
            return Ok(UpdateOutcome::Unchanged);
        }

        if !options.overwrite {
            let old_ext = options.old_ext.clone().unwrap_or_else(|| {
                let stamp = existing.timestamp().with_timezone(&Local);
                format!("_{}", stamp.format("%Y%m%d_%H%M%S"))
            });
            let old_file = config.index_file(&old_ext);

            let prompt = format!(
                "move '{}' to '{}'",
                index_file.display(),
                old_file.display()
            );
            if !options.autosave && !confirm(&prompt) {
                return Ok(UpdateOutcome::Declined);
            }

            fs.rename(&index_file, &old_file)
                .map_err(|e| IndexError::io(&index_file, e))
                .with_context(|| format!("cannot move '{}'", index_file.display()))?;
            output::action(
                "Moved",
                &format!("'{}' to '{}'", index_file.display(), old_file.display()),
            );
        }
    }

    let prompt = if options.overwrite && existing.is_some() {
        format!("overwrite Index '{}'", index_file.display())
    } else {
        format!("save Index to '{}'", index_file.display())
    };
    if !options.autosave && !confirm(&prompt) {
        return Ok(UpdateOutcome::Declined);
    }

    index
        .store_for(fs, &config, &options.ext)
        .with_context(|| format!("cannot save index to '{}'", index_file.display()))?;
    output::action("Saved", &format!("'{}'", index_file.display()));

    Ok(UpdateOutcome::Saved(index_file))
}
