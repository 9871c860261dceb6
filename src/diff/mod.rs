//! Index comparison.
//!
//! [`compare`] walks the sorted union of relative paths of two indexes and
//! reports every difference to a [`Reporter`]. Three reporters ship with the
//! crate:
//! - [`LoggingReporter`] writes human readable lines through `tracing`
//! - [`CountingReporter`] counts events and remembers the paths involved
//! - [`JsonReporter`] collects machine readable records

use crate::storage::Entry;
use crate::storage::index::Index;
use crate::utils::formatters::{format_relative_time, format_size};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::ptr;
use tracing::info;

/// Receives the differences found by [`compare`].
pub trait Reporter {
    /// `missing` exists on one side and has no counterpart in `other`.
    fn on_missing(&mut self, missing: &Entry, other: &Index);

    /// The same path has different hashes; `a` is from the first index.
    fn on_hash_change(&mut self, a: &Entry, b: &Entry);
}

/// Compares two indexes, reporting every difference.
///
/// `a` is the reference side. Paths only in `b` are reported and make the
/// result unequal unless `ignore_missing` is set. Paths only in `a` are always
/// reported and always make the result unequal.
///
/// Returns true when no counted difference was found. The same instance
/// compared with itself, and two absent indexes, are equal without any
/// reporting; one absent side is unequal.
pub fn compare(
    a: Option<&Index>,
    b: Option<&Index>,
    ignore_missing: bool,
    reporter: &mut dyn Reporter,
) -> bool {
    let (a, b) = match (a, b) {
        (None, None) => return true,
        (Some(a), Some(b)) if ptr::eq(a, b) => return true,
        (Some(a), Some(b)) => (a, b),
        _ => return false,
    };

    let paths: BTreeSet<&str> = a
        .entries()
        .chain(b.entries())
        .map(|entry| entry.path.as_str())
        .collect();

    let mut same = true;
    for path in paths {
        match (a.get(path), b.get(path)) {
            (None, Some(only_b)) => {
                if !ignore_missing {
                    reporter.on_missing(only_b, a);
                    same = false;
                }
            }
            (Some(only_a), None) => {
                reporter.on_missing(only_a, b);
                same = false;
            }
            (Some(e1), Some(e2)) => {
                if e1.hash != e2.hash {
                    reporter.on_hash_change(e1, e2);
                    same = false;
                }
            }
            (None, None) => {}
        }
    }

    same
}

/// Writes each difference as an `info` line, with times relative to the
/// moment the reporter was created.
#[derive(Debug, Clone)]
pub struct LoggingReporter {
    now: DateTime<Utc>,
}

impl LoggingReporter {
    /// Creates a reporter anchored at the current time.
    #[must_use]
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Creates a reporter anchored at `now`.
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Line reported for an entry missing from `other`.
    #[must_use]
    pub fn missing_line(&self, missing: &Entry, other: &Index) -> String {
        format!(
            "! '{}': '{}' {}",
            missing.path,
            other.root(),
            format_relative_time(&self.now, &other.timestamp())
        )
    }

    /// Line reported for a hash change.
    #[must_use]
    pub fn hash_change_line(&self, a: &Entry, b: &Entry) -> String {
        let t1 = format_relative_time(&self.now, &a.last_mod);
        let t2 = format_relative_time(&self.now, &b.last_mod);

        if a.size == b.size {
            return format!("# '{}': {t1} vs {t2}", a.path);
        }

        let marker = if a.size > b.size { '>' } else { '<' };
        format!(
            "{marker} '{}': {} {t1} vs {t2}",
            a.path,
            format_size(a.size.abs_diff(b.size))
        )
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for LoggingReporter {
    fn on_missing(&mut self, missing: &Entry, other: &Index) {
        info!("{}", self.missing_line(missing, other));
    }

    fn on_hash_change(&mut self, a: &Entry, b: &Entry) {
        info!("{}", self.hash_change_line(a, b));
    }
}

/// Counts differences and keeps the affected paths in report order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountingReporter {
    /// Paths reported missing
    pub missing: Vec<String>,
    /// Paths reported with a changed hash
    pub hash_changed: Vec<String>,
}

impl CountingReporter {
    /// Number of missing reports.
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.missing.len()
    }

    /// Number of hash change reports.
    #[must_use]
    pub fn hash_change_count(&self) -> usize {
        self.hash_changed.len()
    }
}

impl Reporter for CountingReporter {
    fn on_missing(&mut self, missing: &Entry, _other: &Index) {
        self.missing.push(missing.path.clone());
    }

    fn on_hash_change(&mut self, a: &Entry, _b: &Entry) {
        self.hash_changed.push(a.path.clone());
    }
}

/// One difference in machine readable form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DiffRecord {
    /// Path present on one side only
    #[serde(rename_all = "camelCase")]
    Missing {
        /// Relative path
        path: String,
        /// Root of the index lacking the path
        missing_from: String,
        /// Timestamp of the index lacking the path, in seconds
        missing_from_timestamp: i64,
    },
    /// Path present on both sides with different content
    #[serde(rename_all = "camelCase")]
    HashChange {
        /// Relative path
        path: String,
        /// Size in the second index minus size in the first
        size_delta: i128,
        /// Modification time in the first index, in seconds
        last_mod_a: i64,
        /// Modification time in the second index, in seconds
        last_mod_b: i64,
        /// Hash in the first index
        hash_a: String,
        /// Hash in the second index
        hash_b: String,
    },
}

/// Collects [`DiffRecord`]s for JSON output.
#[derive(Debug, Clone, Default)]
pub struct JsonReporter {
    records: Vec<DiffRecord>,
}

impl JsonReporter {
    /// Records collected so far, in report order.
    #[must_use]
    pub fn records(&self) -> &[DiffRecord] {
        &self.records
    }

    /// Renders the records as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.records)
    }
}

impl Reporter for JsonReporter {
    fn on_missing(&mut self, missing: &Entry, other: &Index) {
        self.records.push(DiffRecord::Missing {
            path: missing.path.clone(),
            missing_from: other.root().to_string(),
            missing_from_timestamp: other.timestamp().timestamp(),
        });
    }

    fn on_hash_change(&mut self, a: &Entry, b: &Entry) {
        self.records.push(DiffRecord::HashChange {
            path: a.path.clone(),
            size_delta: i128::from(b.size) - i128::from(a.size),
            last_mod_a: a.last_mod_secs(),
            last_mod_b: b.last_mod_secs(),
            hash_a: a.hash.clone(),
            hash_b: b.hash.clone(),
        });
    }
}
