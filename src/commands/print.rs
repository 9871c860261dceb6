use super::load_index;
use crate::fs::FileSystem;
use anyhow::{Context, Result, bail};
use chrono::Utc;
use std::io::Write;
use std::path::PathBuf;

/// Prints the manifest `ext` of every config in `configs` to `out`.
///
/// By default each manifest is summarized on one line. With `entries` every
/// entry follows its summary in path order, and manifests are separated by a
/// blank line. With `json` the verbose JSON form of every manifest is written
/// as one array.
///
/// # Errors
///
/// Returns an error if:
/// - both `entries` and `json` are set
/// - a config or manifest cannot be loaded
/// - writing to `out` fails
pub fn execute(
    fs: &dyn FileSystem,
    configs: &[PathBuf],
    ext: &str,
    entries: bool,
    json: bool,
    out: &mut dyn Write,
) -> Result<()> {
    if entries && json {
        bail!("entries and json flags are mutually exclusive");
    }

    let now = Utc::now();
    let mut rendered = Vec::with_capacity(configs.len());

    for (i, config_path) in configs.iter().enumerate() {
        let (_, index) = load_index(fs, config_path, ext)?;

        if json {
            rendered.push(index.to_json().context("cannot render index as JSON")?);
            continue;
        }

        if entries && i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "{}", index.summary(&now))?;
        if entries {
            for entry in index.sorted_entries() {
                writeln!(out, "{}", entry.describe(&now))?;
            }
        }
    }

    if json {
        writeln!(out, "[{}]", rendered.join(","))?;
    }

    Ok(())
}
