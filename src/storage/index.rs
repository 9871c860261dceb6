use super::{Entry, manifest, truncate_to_secs};
use crate::config::Config;
use crate::error::{IndexError, Result};
use crate::fs::{FileInfo, FileSystem};
use crate::utils::formatters::format_relative_time;
use crate::utils::paths;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace};

/// Snapshot of one directory tree at one point in time.
///
/// Entries are keyed by their path relative to the root. The root is kept
/// normalized: `/` separators, lexically cleaned, NFC, and a trailing `/` so
/// relative keys never start with a separator.
///
/// `Index::default()` is the zero-value index. It has no root and refuses
/// [`Index::add`], [`Index::add_entry`] and [`manifest::store`].
#[derive(Debug, Clone, Default)]
pub struct Index {
    root: String,
    root_with_slash: String,
    root_len: usize,
    timestamp: DateTime<Utc>,
    data: HashMap<String, Entry>,
}

/// Shape of the JSON diagnostic rendering.
#[derive(Serialize)]
struct JsonIndex<'a> {
    root: &'a str,
    timestamp: i64,
    size: usize,
    entries: Vec<&'a Entry>,
}

impl Index {
    /// Creates an empty index rooted at `root`, stamped with the current time
    /// truncated to seconds.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is empty.
    pub fn new(root: &str) -> Result<Self> {
        if root.is_empty() {
            return Err(IndexError::InvalidArgument("root cannot be empty".into()));
        }

        let root = paths::nfc(&paths::clean(&paths::to_slash(root)));
        let root_with_slash = if root.ends_with('/') {
            root.clone()
        } else {
            format!("{root}/")
        };
        let root_len = root_with_slash.chars().count();

        Ok(Self {
            root,
            root_with_slash,
            root_len,
            timestamp: truncate_to_secs(Utc::now()),
            data: HashMap::new(),
        })
    }

    /// Hashes the file at `path` and adds it.
    ///
    /// Zero byte files are skipped without error. `path` is normalized and
    /// must lie under the root; the entry is stored under its relative path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the index has no root
    /// - `path` does not start with the root
    /// - the entry cannot be built (see [`Entry::build`])
    pub fn add(&mut self, fs: &dyn FileSystem, path: &str, info: &FileInfo) -> Result<()> {
        if self.root.is_empty() {
            return Err(IndexError::InvalidArgument(
                "cannot add to an index without a root".into(),
            ));
        }

        if info.size == 0 {
            debug!("{self}: skipped zero byte file '{path}'");
            return Ok(());
        }

        let path = paths::normalize(path);
        if !path.starts_with(&self.root_with_slash) {
            return Err(IndexError::PathMismatch {
                path,
                expected: self.root_with_slash.clone(),
            });
        }

        let entry = Entry::build(fs, &path, info)?;
        self.insert_stripped(entry);
        Ok(())
    }

    /// Adds an already built entry.
    ///
    /// An entry whose path starts with this root is re-keyed relative to it.
    /// Any other path, already relative or from a different root, is stored
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the index has no root or the entry is not valid.
    pub fn add_entry(&mut self, entry: Entry) -> Result<()> {
        if self.root.is_empty() {
            return Err(IndexError::InvalidArgument(
                "cannot add to an index without a root".into(),
            ));
        }

        if !entry.is_valid() {
            return Err(IndexError::InvalidEntry(entry.describe(&Utc::now())));
        }

        if entry.path.starts_with(&self.root_with_slash) {
            self.insert_stripped(entry);
        } else {
            trace!("{self}: added {entry}");
            self.data.insert(entry.path.clone(), entry);
        }
        Ok(())
    }

    /// Stores a decoded entry under its path without validation.
    pub(crate) fn insert_loaded(&mut self, entry: Entry) {
        self.data.insert(entry.path.clone(), entry);
    }

    fn insert_stripped(&mut self, mut entry: Entry) {
        entry.path = paths::strip_chars(&entry.path, self.root_len).to_string();
        trace!("{self}: added {entry}");
        self.data.insert(entry.path.clone(), entry);
    }

    /// Returns `path` NFC normalized, without the root prefix if it has one.
    #[must_use]
    pub fn relative_path(&self, path: &str) -> String {
        let path = paths::nfc(path);
        if !self.root.is_empty() && path.starts_with(&self.root_with_slash) {
            return paths::strip_chars(&path, self.root_len).to_string();
        }
        path
    }

    /// Looks up an entry by relative path.
    #[must_use]
    pub fn get(&self, relative_path: &str) -> Option<&Entry> {
        self.data.get(relative_path)
    }

    /// Visits every entry. The order is unspecified.
    pub fn for_each(&self, mut visit: impl FnMut(&Entry)) {
        for entry in self.data.values() {
            visit(entry);
        }
    }

    /// Iterates over entries in unspecified order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.data.values()
    }

    /// Entries ordered by path.
    #[must_use]
    pub fn sorted_entries(&self) -> Vec<&Entry> {
        let mut entries: Vec<&Entry> = self.data.values().collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Normalized root without the trailing separator (`/` stays `/`).
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Normalized root with the trailing separator.
    #[must_use]
    pub fn root_with_slash(&self) -> &str {
        &self.root_with_slash
    }

    /// Creation time, whole seconds.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Replaces the creation time, truncating to whole seconds.
    pub fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = truncate_to_secs(timestamp);
    }

    /// Compact one line summary with the timestamp relative to `now`.
    #[must_use]
    pub fn summary(&self, now: &DateTime<Utc>) -> String {
        format!(
            "{{root: '{}', timestamp: {}, size: {}}}",
            self.root,
            format_relative_time(now, &self.timestamp),
            self.len()
        )
    }

    /// Verbose JSON rendering including every entry, ordered by path.
    ///
    /// This is a reporting surface only; manifests are never read back from
    /// it.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&JsonIndex {
            root: &self.root,
            timestamp: self.timestamp.timestamp(),
            size: self.len(),
            entries: self.sorted_entries(),
        })
    }

    /// Loads the manifest for `config` labelled with `ext`.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be read or its header is bad.
    pub fn load_for(fs: &dyn FileSystem, config: &Config, ext: &str) -> Result<Self> {
        manifest::load(fs, config.root(), &config.index_file(ext))
    }

    /// Stores this index as the manifest for `config` labelled with `ext`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is empty or the manifest cannot be
    /// written durably.
    pub fn store_for(&self, fs: &dyn FileSystem, config: &Config, ext: &str) -> Result<()> {
        manifest::store(self, fs, &config.index_file(ext))
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary(&Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::storage::hash_bytes;
    use chrono::TimeZone;
    use rstest::rstest;
    use std::path::Path;

    fn valid_entry(path: &str) -> Entry {
        Entry::new(
            path,
            Utc.timestamp_opt(1_600_000_000, 0).unwrap(),
            10,
            hash_bytes(path.as_bytes()),
        )
    }

    #[rstest]
    #[case("/data", "/data", "/data/")]
    #[case("/data/", "/data", "/data/")]
    #[case(r"C:\data\photos", "C:/data/photos", "C:/data/photos/")]
    #[case("/data//x/../y", "/data/y", "/data/y/")]
    #[case("/", "/", "/")]
    fn test_new_normalizes_root(
        #[case] input: &str,
        #[case] root: &str,
        #[case] with_slash: &str,
    ) {
        let index = Index::new(input).unwrap();
        assert_eq!(index.root(), root);
        assert_eq!(index.root_with_slash(), with_slash);
        assert!(index.is_empty());
    }

    #[test]
    fn test_new_rejects_empty_root() {
        assert!(matches!(
            Index::new(""),
            Err(IndexError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_new_timestamp_is_whole_seconds() {
        let index = Index::new("/r").unwrap();
        assert_eq!(index.timestamp().timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_add_stores_relative_path() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/r/dir/file.txt", b"content");
        let info = fs.stat(Path::new("/r/dir/file.txt")).unwrap();

        let mut index = Index::new("/r").unwrap();
        index.add(&fs, "/r/dir/file.txt", &info).unwrap();

        let entry = index.get("dir/file.txt").unwrap();
        assert_eq!(entry.path, "dir/file.txt");
        assert_eq!(entry.hash, hash_bytes(b"content"));
    }

    #[test]
    fn test_add_multibyte_root() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/données/été.txt", b"summer");
        let info = fs.stat(Path::new("/données/été.txt")).unwrap();

        let mut index = Index::new("/données").unwrap();
        index.add(&fs, "/données/été.txt", &info).unwrap();

        assert!(index.get("été.txt").is_some());
    }

    #[test]
    fn test_add_skips_zero_byte() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/r/empty", b"");
        let info = fs.stat(Path::new("/r/empty")).unwrap();

        let mut index = Index::new("/r").unwrap();
        index.add(&fs, "/r/empty", &info).unwrap();
        assert!(index.is_empty());
        assert_eq!(fs.open_count("/r/empty"), 0);
    }

    #[test]
    fn test_add_rejects_path_outside_root() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/other/f", b"x");
        let info = fs.stat(Path::new("/other/f")).unwrap();

        let mut index = Index::new("/r").unwrap();
        assert!(matches!(
            index.add(&fs, "/other/f", &info),
            Err(IndexError::PathMismatch { .. })
        ));
    }

    #[test]
    fn test_add_normalizes_windows_separators() {
        let fs = MemoryFileSystem::new();
        fs.add_file("C:/data/a/b.txt", b"x");
        let info = fs.stat(Path::new("C:/data/a/b.txt")).unwrap();

        let mut index = Index::new(r"C:\data").unwrap();
        index.add(&fs, r"C:\data\a\b.txt", &info).unwrap();
        assert!(index.get("a/b.txt").is_some());
    }

    #[test]
    fn test_zero_value_index_rejects_add() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/r/f", b"x");
        let info = fs.stat(Path::new("/r/f")).unwrap();

        let mut index = Index::default();
        assert!(index.add(&fs, "/r/f", &info).is_err());
        assert!(index.add_entry(valid_entry("f")).is_err());
    }

    #[test]
    fn test_add_entry_strips_own_root_only() {
        let mut index = Index::new("/r").unwrap();
        index.add_entry(valid_entry("/r/a/b")).unwrap();
        index.add_entry(valid_entry("/elsewhere/c")).unwrap();
        index.add_entry(valid_entry("already/relative")).unwrap();

        assert!(index.get("a/b").is_some());
        assert!(index.get("/elsewhere/c").is_some());
        assert!(index.get("already/relative").is_some());
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_add_entry_rejects_invalid() {
        let mut index = Index::new("/r").unwrap();
        let mut entry = valid_entry("a");
        entry.size = 0;
        assert!(matches!(
            index.add_entry(entry),
            Err(IndexError::InvalidEntry(_))
        ));
    }

    #[test]
    fn test_add_entry_replaces_wholesale() {
        let mut index = Index::new("/r").unwrap();
        index.add_entry(valid_entry("a")).unwrap();

        let mut replacement = valid_entry("a");
        replacement.size = 99;
        index.add_entry(replacement).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.get("a").unwrap().size, 99);
    }

    #[test]
    fn test_relative_path() {
        let index = Index::new("/r").unwrap();
        assert_eq!(index.relative_path("/r/x/y"), "x/y");
        assert_eq!(index.relative_path("/q/x"), "/q/x");
        assert_eq!(index.relative_path("/r/cafe\u{0301}"), "caf\u{00e9}");
    }

    #[test]
    fn test_for_each_visits_all() {
        let mut index = Index::new("/r").unwrap();
        for p in ["c", "a", "b"] {
            index.add_entry(valid_entry(p)).unwrap();
        }

        let mut seen = Vec::new();
        index.for_each(|e| seen.push(e.path.clone()));
        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c"]);

        let sorted: Vec<&str> = index.sorted_entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(sorted, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_summary_and_json() {
        let mut index = Index::new("/r").unwrap();
        let ts = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
        index.set_timestamp(ts);
        index.add_entry(valid_entry("a")).unwrap();

        let now = Utc.timestamp_opt(1_600_000_120, 0).unwrap();
        let summary = index.summary(&now);
        assert_eq!(summary, "{root: '/r', timestamp: 2 minutes ago, size: 1}");

        let json = index.to_json().unwrap();
        assert!(json.len() > summary.len());

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["root"], "/r");
        assert_eq!(value["timestamp"], 1_600_000_000);
        assert_eq!(value["size"], 1);
        assert_eq!(value["entries"][0]["path"], "a");
        assert_eq!(value["entries"][0]["lastMod"], 1_600_000_000);
        assert_eq!(value["entries"][0]["size"], 10);
        assert_eq!(value["entries"][0]["hash"], hash_bytes(b"a"));
    }
}
