/// In-memory index of entries under one root
pub mod index;
/// Gzip manifest store and load
pub mod manifest;

use crate::error::{IndexError, Result};
use crate::fs::{FileInfo, FileSystem};
use crate::utils::formatters::{format_relative_time, format_size};
use crate::utils::paths;
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, Read};
use std::path::Path;

/// Length of an unpadded base64 SHA-256 digest.
pub const HASH_LEN: usize = 43;

/// Modification time of an entry that never had one. No file stat maps to it.
pub const UNSET_TIME: DateTime<Utc> = DateTime::<Utc>::MIN_UTC;

/// Identity record for one file: where it is, when it last changed, how big
/// it is and what its content hashes to.
///
/// Entries are values. The index replaces them wholesale and never edits one
/// in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Path, relative to the index root once stored in an index
    pub path: String,
    /// Modification time
    #[serde(with = "chrono::serde::ts_seconds")]
    pub last_mod: DateTime<Utc>,
    /// Size in bytes
    pub size: u64,
    /// Unpadded base64 SHA-256 of the content
    pub hash: String,
}

impl Entry {
    /// Creates an entry from already known values. No validation is done; see
    /// [`Entry::is_valid`].
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        last_mod: DateTime<Utc>,
        size: u64,
        hash: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            last_mod,
            size,
            hash: hash.into(),
        }
    }

    /// Hashes the file at `path` and records its metadata from `info`.
    ///
    /// `path` must be the normalized path the entry will carry; its last
    /// element has to match the NFC normalized `info.name`. The file itself is
    /// opened by joining the directory of `path` with `info.name` as reported
    /// by the filesystem, so names stored decomposed on disk still open.
    ///
    /// Size and modification time are taken from `info` as is.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `path` is empty
    /// - the last element of `path` does not match `info.name`
    /// - the file cannot be opened or read
    pub fn build(fs: &dyn FileSystem, path: &str, info: &FileInfo) -> Result<Self> {
        if path.is_empty() {
            return Err(IndexError::InvalidArgument("path cannot be empty".into()));
        }

        let name = paths::nfc(&info.name);
        if paths::base_name(path) != name {
            return Err(IndexError::PathMismatch {
                path: path.to_string(),
                expected: info.name.clone(),
            });
        }

        let on_disk = format!("{}{}", paths::parent(path), info.name);
        let reader = fs
            .open(Path::new(&on_disk))
            .map_err(|e| IndexError::io(&on_disk, e))?;
        let hash = hash_reader(reader).map_err(|e| IndexError::io(&on_disk, e))?;

        Ok(Self {
            path: path.to_string(),
            last_mod: DateTime::<Utc>::from(info.modified),
            size: info.size,
            hash,
        })
    }

    /// True when the path is set, the modification time is set, the size is
    /// positive and the hash has the digest length.
    ///
    /// An unset modification time is [`UNSET_TIME`]. The Unix epoch is a real
    /// time and counts as set.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.path.is_empty()
            && self.last_mod != UNSET_TIME
            && self.size > 0
            && self.hash.len() == HASH_LEN
    }

    /// Modification time at the one second resolution manifests keep.
    #[must_use]
    pub fn last_mod_secs(&self) -> i64 {
        self.last_mod.timestamp()
    }

    /// Human rendering with times relative to `now`.
    #[must_use]
    pub fn describe(&self, now: &DateTime<Utc>) -> String {
        format!(
            "{{path: '{}', lastMod: {}, size: {}, hash: {}}}",
            self.path,
            format_relative_time(now, &self.last_mod),
            format_size(self.size),
            self.hash
        )
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(&Utc::now()))
    }
}

/// Streams `reader` through SHA-256 and returns the unpadded base64 digest.
///
/// # Errors
///
/// Returns an error if reading fails.
pub fn hash_reader(mut reader: impl Read) -> io::Result<String> {
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(STANDARD_NO_PAD.encode(hasher.finalize()))
}

/// Hashes an in-memory buffer.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> String {
    STANDARD_NO_PAD.encode(Sha256::digest(data))
}

/// Truncates to whole seconds.
#[must_use]
pub fn truncate_to_secs(time: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or(time)
}
