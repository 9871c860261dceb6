//! Utility functions and helpers.
//!
//! # Submodules
//!
//! - [`formatters`]: Human readable sizes, timestamps and durations
//! - [`paths`]: Separator, cleaning and Unicode normalization of path strings
//!
//! # Examples
//!
//! ```
//! use yabrc::utils::{formatters::format_size, paths};
//!
//! assert_eq!(format_size(1024 * 1024), "1.00 MB");
//! assert_eq!(paths::normalize(r"C:\data\photo.jpg"), "C:/data/photo.jpg");
//! ```

/// Output formatting
pub mod formatters;
/// Path string manipulation
pub mod paths;
