//! Gzip compressed, line oriented manifest format.
//!
//! ```text
//! <root>,<unixTimestampSeconds>
//! <relativePath>,<unixLastModSeconds>,<sizeBytes>,<base64Hash>
//! ...
//! ```
//!
//! Paths are written without escaping, so a path may itself contain commas.
//! The decoder treats the last three fields of a data line as mtime, size and
//! hash and rejoins everything before them into the path. A truncated line
//! whose path ends in a comma followed by digits can therefore be misread as
//! a shorter path with a different mtime; the format has no way to tell.

use super::Entry;
use super::index::Index;
use crate::error::{IndexError, Result};
use crate::fs::FileSystem;
use crate::utils::paths;
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::{debug, trace, warn};

/// One comma separated field, as written and with surrounding whitespace
/// removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    /// Text exactly as it appeared between separators
    pub raw: &'a str,
    /// `raw` with surrounding whitespace trimmed
    pub trimmed: &'a str,
}

/// Splits a line on `,` keeping both raw and trimmed forms.
#[must_use]
pub fn split_fields(line: &str) -> Vec<Field<'_>> {
    line.split(',')
        .map(|raw| Field {
            raw,
            trimmed: raw.trim(),
        })
        .collect()
}

/// True when every field is empty after trimming. A line of nothing but
/// commas counts as blank.
#[must_use]
pub fn is_blank(fields: &[Field<'_>]) -> bool {
    fields.iter().all(|f| f.trimmed.is_empty())
}

/// Decodes the header line and returns the index timestamp.
///
/// The root field must equal one of `accepted_roots`. Older manifests wrote
/// the root with its trailing separator, so callers pass both forms.
///
/// # Errors
///
/// Returns [`IndexError::Parse`] if the root does not match or the timestamp
/// is not an integer.
pub fn decode_header(
    line_no: usize,
    fields: &[Field<'_>],
    accepted_roots: &[&str],
) -> Result<DateTime<Utc>> {
    let line = join_raw(fields);
    let root = fields.first().map_or("", |f| f.trimmed);

    if !accepted_roots.contains(&root) {
        return Err(IndexError::Parse {
            line: line_no,
            message: format!(
                "header '{line}' must define a root path that matches '{}'",
                accepted_roots.first().copied().unwrap_or_default()
            ),
        });
    }

    fields
        .get(1)
        .and_then(|f| f.trimmed.parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| IndexError::Parse {
            line: line_no,
            message: format!("header '{line}' must include an integer timestamp"),
        })
}

/// Decodes one data line into an entry keyed by its relative path.
///
/// Every field before the last three belongs to the path. The first is used
/// trimmed; later ones keep their original whitespace because it may be part
/// of a file name. The rejoined path is NFC normalized.
///
/// Only the numeric fields are checked. An empty path or hash is kept as
/// read; [`Index::add_entry`] is where validity is enforced. Sizes are
/// unsigned, so a negative size does not parse.
///
/// # Errors
///
/// Returns [`IndexError::DataLine`] when there are fewer than four fields,
/// or mtime or size is not an integer in range.
pub fn decode_entry(line_no: usize, fields: &[Field<'_>]) -> Result<Entry> {
    let reject = |reason: String| IndexError::DataLine {
        line: line_no,
        content: join_raw(fields),
        reason,
    };

    if fields.len() < 4 {
        return Err(reject(format!(
            "expected at least 4 fields, found {}",
            fields.len()
        )));
    }

    let tail = fields.len() - 3;
    let mut path = fields[0].trimmed.to_string();
    for field in &fields[1..tail] {
        path.push(',');
        path.push_str(field.raw);
    }
    let path = paths::nfc(&path);

    if tail > 1 {
        trace!("{line_no}: path '{path}' contains commas");
    }

    let mtime = fields[tail].trimmed;
    let last_mod = mtime
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| reject(format!("'{mtime}' must be a Unix time value")))?;

    let size = fields[tail + 1].trimmed;
    let size = size
        .parse::<u64>()
        .map_err(|_| reject(format!("'{size}' must be a non-negative integer")))?;

    let hash = fields[tail + 2].trimmed;

    Ok(Entry::new(path, last_mod, size, hash))
}

fn join_raw(fields: &[Field<'_>]) -> String {
    fields.iter().map(|f| f.raw).collect::<Vec<_>>().join(",")
}

/// Writes `index` to `dest` as a gzip manifest and syncs it to disk.
///
/// Entries are written in path order. The parent directory is created if
/// needed. On success the data has been flushed through the compressor and
/// the file handle has been synced.
///
/// # Errors
///
/// Returns an error if:
/// - the index has no root
/// - the index has no entries
/// - any create, write, flush or sync fails
pub fn store(index: &Index, fs: &dyn FileSystem, dest: &Path) -> Result<()> {
    if index.root().is_empty() {
        return Err(IndexError::InvalidArgument(
            "cannot store an index without a root".into(),
        ));
    }
    if index.is_empty() {
        return Err(IndexError::EmptyIndex);
    }

    debug!("storing index to '{}'", dest.display());

    if let Some(parent) = dest.parent()
        && !parent.as_os_str().is_empty()
    {
        fs.create_dir_all(parent)
            .map_err(|e| IndexError::io(parent, e))?;
    }

    let io_err = |e| IndexError::io(dest, e);
    let file = fs.create(dest).map_err(io_err)?;
    let mut gz = GzEncoder::new(file, Compression::default());

    writeln!(gz, "{},{}", index.root(), index.timestamp().timestamp()).map_err(io_err)?;

    for entry in index.sorted_entries() {
        trace!("writing {}", entry.path);
        writeln!(
            gz,
            "{},{},{},{}",
            entry.path,
            entry.last_mod_secs(),
            entry.size,
            entry.hash
        )
        .map_err(io_err)?;
    }

    gz.flush().map_err(io_err)?;
    let mut file = gz.finish().map_err(io_err)?;
    file.sync_all().map_err(io_err)?;

    debug!("stored {} entries to '{}'", index.len(), dest.display());
    Ok(())
}

/// Reads the gzip manifest at `source` into a new index rooted at `root`.
///
/// Blank lines are skipped. The first other line is the header and must
/// name `root`. Data lines that fail to decode are logged and skipped.
///
/// # Errors
///
/// Returns an error if:
/// - `root` is empty
/// - the file cannot be opened, decompressed or read
/// - the header is malformed or names a different root
/// - the file contained no lines at all
pub fn load(fs: &dyn FileSystem, root: &str, source: &Path) -> Result<Index> {
    let mut index = Index::new(root)?;
    let accepted = [index.root().to_string(), index.root_with_slash().to_string()];
    let accepted: Vec<&str> = accepted.iter().map(String::as_str).collect();

    debug!("loading index from '{}'", source.display());

    let io_err = |e| IndexError::io(source, e);
    let file = fs.open(source).map_err(io_err)?;
    let mut reader = BufReader::new(GzDecoder::new(file));

    let mut line_no = 0;
    let mut header_read = false;
    let mut skipped = 0;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).map_err(io_err)? == 0 {
            break;
        }
        line_no += 1;

        let text = String::from_utf8_lossy(&buf);
        let line = text.trim_end_matches('\n').trim_end_matches('\r');
        let fields = split_fields(line);

        if is_blank(&fields) {
            trace!("{line_no}: skipping blank line");
            continue;
        }

        if !header_read {
            let timestamp = decode_header(line_no, &fields, &accepted)?;
            index.set_timestamp(timestamp);
            header_read = true;
            continue;
        }

        match decode_entry(line_no, &fields) {
            Ok(entry) => {
                trace!("{line_no}: loaded {}", entry.path);
                index.insert_loaded(entry);
            }
            Err(err) => {
                warn!("{err}");
                skipped += 1;
            }
        }
    }

    if line_no == 0 {
        return Err(IndexError::NoDataLoaded {
            path: source.to_path_buf(),
        });
    }

    debug!(
        "loaded {} entries from '{}' ({skipped} lines skipped)",
        index.len(),
        source.display()
    );
    Ok(index)
}
