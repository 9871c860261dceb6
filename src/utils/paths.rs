//! Path normalization shared by the index, the builder and the config.
//!
//! Index paths are plain strings using `/` as the separator, NFC normalized so
//! the same name written by different filesystems compares equal.

use unicode_normalization::UnicodeNormalization;

/// Replaces Windows `\` separators with `/`.
#[must_use]
pub fn to_slash(path: &str) -> String {
    path.replace('\\', "/")
}

/// Unicode NFC normalization.
#[must_use]
pub fn nfc(s: &str) -> String {
    s.nfc().collect()
}

/// Separator fix followed by NFC normalization.
#[must_use]
pub fn normalize(path: &str) -> String {
    nfc(&to_slash(path))
}

/// Lexically cleans a `/` separated path.
///
/// Repeated separators and `.` elements are removed and `..` elements are
/// resolved against the preceding element. A rooted path never climbs above
/// `/`. The empty path cleans to `.`.
#[must_use]
pub fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            _ => parts.push(part),
        }
    }

    let joined = parts.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Last element of a `/` separated path, ignoring trailing separators.
#[must_use]
pub fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return if path.is_empty() { "." } else { "/" };
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Everything before the last element of a `/` separated path, or `""`.
#[must_use]
pub fn parent(path: &str) -> &str {
    path.rfind('/').map_or("", |i| &path[..=i])
}

/// Drops the first `chars` code points of `path`.
///
/// Counting code points rather than bytes keeps the remainder valid when the
/// prefix contains multi-byte UTF-8 sequences.
#[must_use]
pub fn strip_chars(path: &str, chars: usize) -> &str {
    path.char_indices()
        .nth(chars)
        .map_or("", |(offset, _)| &path[offset..])
}
