//! Incremental index builder.
//!
//! Walks the configured root, hashing every regular, non-empty file. When a
//! prior index is supplied, files whose size is unchanged and whose
//! modification time is not after the recorded one reuse the prior entry
//! without being read.

use crate::config::Config;
use crate::error::{IndexError, Result};
use crate::fs::{FileInfo, FileSystem, WalkControl};
use crate::storage::index::Index;
use crate::storage::truncate_to_secs;
use crate::utils::formatters::{format_elapsed, format_size};
use crate::utils::paths;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// File manager metadata that changes independently of real content.
pub const METADATA_FILES: &[&str] = &["desktop.ini", ".DS_Store"];

/// Counters collected while building.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Directories visited, including the root
    pub dirs: usize,
    /// Files read and hashed
    pub hashed: usize,
    /// Bytes read and hashed
    pub hashed_bytes: u64,
    /// Files whose prior entry was reused
    pub reused: usize,
    /// Bytes covered by reused entries
    pub reused_bytes: u64,
    /// Zero byte files skipped
    pub zero_byte: usize,
    /// File manager metadata files skipped
    pub metadata: usize,
    /// Symlinks, devices and other non-regular entries skipped
    pub non_file: usize,
    /// Walk and hashing errors
    pub errors: usize,
    /// Wall time of the build
    pub elapsed: Duration,
}

impl BuildStats {
    /// Files not hashed, for any reason other than an error.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.reused + self.zero_byte + self.metadata + self.non_file
    }

    /// Hashed files per second.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn files_per_sec(&self) -> f64 {
        per_second(self.hashed as f64, self.elapsed)
    }

    /// Hashed bytes per second.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn bytes_per_sec(&self) -> u64 {
        per_second(self.hashed_bytes as f64, self.elapsed) as u64
    }

    /// Logs the end of build summary at info level.
    pub fn log_summary(&self, index: &Index) {
        info!(
            "{index} indexed {} in {}",
            format_size(self.hashed_bytes),
            format_elapsed(self.elapsed)
        );
        info!(
            "{} directories, {} files hashed, {} errors; {:.0} files/sec; {}/sec",
            self.dirs,
            self.hashed,
            self.errors,
            self.files_per_sec(),
            format_size(self.bytes_per_sec())
        );

        let skipped = self.skipped();
        if skipped > 0 {
            info!(
                "{skipped} skipped ({}); {} not changed, {} zero byte, {} dir metadata, {} non-file",
                format_size(self.reused_bytes),
                self.reused,
                self.zero_byte,
                self.metadata,
                self.non_file
            );
        }
    }
}

fn per_second(amount: f64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { amount / secs } else { 0.0 }
}

/// A freshly built index together with the counters gathered building it.
#[derive(Debug, Clone)]
pub struct BuildResult {
    /// The new index
    pub index: Index,
    /// What the walk did
    pub stats: BuildStats,
}

/// Builds an [`Index`] by walking `config.root()` on a [`FileSystem`].
pub struct IndexBuilder<'a> {
    config: &'a Config,
    fs: &'a dyn FileSystem,
}

impl<'a> IndexBuilder<'a> {
    /// Creates a builder for `config` on `fs`.
    #[must_use]
    pub fn new(config: &'a Config, fs: &'a dyn FileSystem) -> Self {
        Self { config, fs }
    }

    /// Walks the tree and builds a new index.
    ///
    /// With `prior`, unchanged files reuse their prior entry. Per-file errors
    /// are counted and logged and never stop the walk.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the configured root is empty
    /// - the walk could not run at all
    /// - nothing was indexed and at least one error occurred
    pub fn build(&self, prior: Option<&Index>) -> Result<BuildResult> {
        let mut index = Index::new(self.config.root())?;
        let root = index.root().to_string();

        info!("building index for '{root}'");

        let start = Instant::now();
        let mut stats = BuildStats::default();

        self.fs
            .walk(Path::new(&root), &mut |path, info| {
                let info = match info {
                    Ok(info) => info,
                    Err(err) => {
                        stats.errors += 1;
                        warn!("error reading '{}': {err}", path.display());
                        return WalkControl::Continue;
                    }
                };

                let Some(path) = path.to_str() else {
                    stats.errors += 1;
                    warn!("skipping '{}': not valid UTF-8", path.display());
                    return WalkControl::Continue;
                };

                self.visit(&mut index, &mut stats, prior, &paths::to_slash(path), info)
            })
            .map_err(|e| IndexError::io(&root, e))?;

        stats.elapsed = start.elapsed();
        stats.log_summary(&index);

        // distinguishes an empty tree from one where nothing could be read
        if index.is_empty() && stats.errors > 0 {
            return Err(IndexError::AggregateWalk {
                root,
                errors: stats.errors,
            });
        }

        Ok(BuildResult { index, stats })
    }

    fn visit(
        &self,
        index: &mut Index,
        stats: &mut BuildStats,
        prior: Option<&Index>,
        path: &str,
        info: &FileInfo,
    ) -> WalkControl {
        if info.is_dir() {
            if self.config.ignore_dir(path) {
                debug!("skipping dir '{path}'");
                return WalkControl::SkipDir;
            }
            debug!("indexing dir '{path}'");
            stats.dirs += 1;
            return WalkControl::Continue;
        }

        if METADATA_FILES.iter().any(|name| path.ends_with(name)) {
            stats.metadata += 1;
            return WalkControl::Continue;
        }

        if !info.is_file() {
            warn!("skipping non-file '{path}' ({:?})", info.kind);
            stats.non_file += 1;
            return WalkControl::Continue;
        }

        if info.size == 0 {
            stats.zero_byte += 1;
            return WalkControl::Continue;
        }

        let reusable = prior.and_then(|prior| {
            let relative = index.relative_path(path);
            let modified = truncate_to_secs(DateTime::<Utc>::from(info.modified));

            match prior.get(&relative) {
                Some(entry)
                    if entry.size == info.size
                        && modified <= truncate_to_secs(entry.last_mod) =>
                {
                    trace!(
                        "reusing '{relative}': {modified} vs {} & {} bytes",
                        entry.last_mod,
                        entry.size
                    );
                    Some(entry.clone())
                }
                Some(entry) => {
                    debug!(
                        "rescanning '{relative}': {modified} vs {} & {} vs {} bytes",
                        entry.last_mod, info.size, entry.size
                    );
                    None
                }
                None => {
                    debug!("adding new file '{relative}'");
                    None
                }
            }
        });

        let result = if let Some(entry) = reusable {
            stats.reused += 1;
            stats.reused_bytes += info.size;
            index.add_entry(entry)
        } else {
            stats.hashed += 1;
            stats.hashed_bytes += info.size;
            index.add(self.fs, path, info)
        };

        if let Err(err) = result {
            stats.errors += 1;
            error!("cannot add '{path}' to index: {err}");
        }

        WalkControl::Continue
    }
}
