//! File naming for captures and their reduced copies.
//!
//! Captures are named by the local wall-clock second they were taken:
//!
//! ```text
//! 20250314-091502.jpg               # camera output
//! compressed_20250314-091502.jpg    # reduced copy sent to the server
//! ```
//!
//! Two captures within the same second share a name; the later one
//! overwrites the earlier.

use chrono::{DateTime, TimeZone};
use std::path::Path;

/// `strftime` pattern for capture names (`yyyyMMdd-HHmmss`).
pub const CAPTURE_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Prefix marking a reduced copy.
pub const REDUCED_PREFIX: &str = "compressed_";

/// Build the capture file name for a timestamp.
///
/// ```
/// # use billboard_detector::naming::capture_file_name;
/// use chrono::{TimeZone, Utc};
/// let ts = Utc.with_ymd_and_hms(2025, 3, 14, 9, 15, 2).unwrap();
/// assert_eq!(capture_file_name(&ts), "20250314-091502.jpg");
/// ```
pub fn capture_file_name<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}.jpg", timestamp.format(CAPTURE_TIMESTAMP_FORMAT))
}

/// Name of the reduced copy of `original`.
///
/// Only the file name is used; the directory part is dropped.
pub fn reduced_file_name(original: &Path) -> String {
    let name = original
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{REDUCED_PREFIX}{name}")
}
