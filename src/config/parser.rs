use super::{Config, config_dir};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// `ignoredDirs` may be a single pattern or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Patterns {
    One(String),
    Many(Vec<String>),
}

impl Patterns {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(pattern) => vec![pattern],
            Self::Many(patterns) => patterns,
        }
    }
}

/// On-disk shape of a config file before validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    #[serde(default)]
    root: String,
    #[serde(default)]
    base_name: String,
    #[serde(default)]
    save_path: String,
    #[serde(default)]
    ignored_dirs: Option<Patterns>,
}

/// Reads and validates the TOML config at `path`. A missing `savePath`
/// defaults to the directory holding the config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the values are
/// invalid.
pub fn parse_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config_str(&content, || config_dir(path))
}

/// Parses TOML text. `default_save_path` is only called when the text has no
/// `savePath`.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or the values are invalid.
pub fn parse_config_str(
    content: &str,
    default_save_path: impl FnOnce() -> String,
) -> Result<Config> {
    let raw: RawConfig = toml::from_str(content).context("Failed to parse TOML config")?;

    let save_path = if raw.save_path.trim().is_empty() {
        default_save_path()
    } else {
        raw.save_path
    };
    let ignored = raw.ignored_dirs.map(Patterns::into_vec).unwrap_or_default();

    Config::new(&raw.root, &raw.base_name, &save_path, &ignored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() -> Result<()> {
        let config = parse_config_str(
            r#"
root = "/data/photos"
baseName = "photos"
savePath = "/var/lib/yabrc"
ignoredDirs = ["\\.thumbnails$", "/tmp$"]
"#,
            || unreachable!(),
        )?;

        assert_eq!(config.root(), "/data/photos");
        assert_eq!(config.base_name(), "photos");
        assert_eq!(config.save_path(), "/var/lib/yabrc");
        assert!(config.ignore_dir("/data/photos/.thumbnails"));
        assert!(config.ignore_dir("/data/photos/tmp"));
        Ok(())
    }

    #[test]
    fn test_single_pattern_string() -> Result<()> {
        let config = parse_config_str(
            r#"
root = "/r"
baseName = "b"
savePath = "/s"
ignoredDirs = "skip"
"#,
            || unreachable!(),
        )?;
        assert!(config.ignore_dir("/r/skip"));
        Ok(())
    }

    #[test]
    fn test_missing_required_keys() {
        assert!(parse_config_str("baseName = \"b\"", || "/s".into()).is_err());
        assert!(parse_config_str("root = \"/r\"", || "/s".into()).is_err());
    }

    #[test]
    fn test_malformed_toml() {
        assert!(parse_config_str("root = ", || "/s".into()).is_err());
    }

    #[test]
    fn test_save_path_defaults_to_config_dir() -> Result<()> {
        let temp = TempDir::new()?;
        let config_path = temp.path().join("photos.toml");
        fs::write(&config_path, "root = \"/r\"\nbaseName = \"photos\"\n")?;

        let config = parse_config_file(&config_path)?;
        let expected = temp.path().to_string_lossy().replace('\\', "/");
        assert_eq!(config.save_path(), expected);
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        assert!(parse_config_file(Path::new("/definitely/not/here.toml")).is_err());
    }
}
