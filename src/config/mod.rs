//! Index configuration: the tree to index, where manifests go, and which
//! directories to leave out.

/// TOML config file parsing
pub mod parser;

use crate::utils::paths;
use anyhow::{Context, Result, bail};
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

/// Where an index lives, where its manifests are saved, and which
/// directories the builder leaves out.
#[derive(Debug, Clone)]
pub struct Config {
    root: String,
    base_name: String,
    save_path: String,
    ignored_dirs: Vec<Regex>,
}

impl Config {
    /// Builds a config from already parsed values.
    ///
    /// `root` is separator fixed, cleaned and NFC normalized. `save_path` is
    /// separator fixed. Each ignored directory pattern is trimmed, skipped when
    /// empty, NFC normalized and compiled.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `root` or `base_name` is empty
    /// - an ignored directory pattern is not a valid regular expression
    pub fn new(
        root: &str,
        base_name: &str,
        save_path: &str,
        ignored_dirs: &[String],
    ) -> Result<Self> {
        if root.is_empty() {
            bail!("'root' must be defined");
        }
        if base_name.is_empty() {
            bail!("'baseName' must be defined");
        }

        let root = paths::nfc(&paths::clean(&paths::to_slash(root)));
        let save_path = paths::to_slash(save_path);

        let ignored_dirs = ignored_dirs
            .iter()
            .map(|pattern| pattern.trim())
            .filter(|pattern| !pattern.is_empty())
            .map(|pattern| {
                Regex::new(&paths::nfc(pattern))
                    .with_context(|| format!("invalid ignoredDirs pattern '{pattern}'"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            root,
            base_name: base_name.to_string(),
            save_path,
            ignored_dirs,
        })
    }

    /// Loads and validates a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// fails validation (see [`Config::new`]).
    pub fn load(path: &Path) -> Result<Self> {
        info!("loading config from '{}'", path.display());

        let config = parser::parse_config_file(path)
            .with_context(|| format!("cannot read config file '{}'", path.display()))?;

        info!("'{}'={config}", path.display());
        Ok(config)
    }

    /// Root of the indexed tree.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Manifest file name prefix.
    #[must_use]
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Directory manifests are saved in.
    #[must_use]
    pub fn save_path(&self) -> &str {
        &self.save_path
    }

    /// True if any ignored directory pattern matches somewhere in `dir`.
    #[must_use]
    pub fn ignore_dir(&self, dir: &str) -> bool {
        let dir = paths::nfc(dir);
        self.ignored_dirs.iter().any(|re| {
            let matched = re.is_match(&dir);
            if matched {
                trace!("'{dir}' matches '{re}'");
            }
            matched
        })
    }

    /// Manifest path for the label `ext`: `<savePath>/<baseName><ext>`.
    #[must_use]
    pub fn index_file(&self, ext: &str) -> PathBuf {
        let name = format!("{}{ext}", self.base_name);
        if self.save_path.is_empty() {
            return PathBuf::from(name);
        }
        PathBuf::from(paths::clean(&format!("{}/{name}", self.save_path)))
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ignored: Vec<&str> = self.ignored_dirs.iter().map(Regex::as_str).collect();
        write!(
            f,
            "{{root: '{}', baseName: '{}', savePath: '{}', ignoredDirs: [ {} ]}}",
            self.root,
            self.base_name,
            self.save_path,
            ignored.join(", ")
        )
    }
}

/// Directory of a config file, used as the default save path.
pub(crate) fn config_dir(config_file: &Path) -> String {
    let slashed = paths::to_slash(&config_file.to_string_lossy());
    let dir = match slashed.rfind('/') {
        Some(0) => "/".to_string(),
        Some(i) => slashed[..i].to_string(),
        None => ".".to_string(),
    };
    debug!("set empty 'savePath' to '{dir}'");
    dir
}
