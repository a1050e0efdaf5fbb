//! Shared types passed between the capture, location, and upload stages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A device position as reported by the location provider.
///
/// Coordinates are signed decimal degrees. No range validation happens
/// client side: the analysis server owns the geofence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPosition {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for GeoPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// The analysis server's decision for a submitted photo.
///
/// Deserialized straight from the `/analyze` response body:
///
/// ```json
/// {"is_authorized": true, "reason": "permit on file"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnalysisVerdict {
    is_authorized: bool,
    reason: String,
}

impl AnalysisVerdict {
    pub fn new(is_authorized: bool, reason: impl Into<String>) -> Self {
        Self {
            is_authorized,
            reason: reason.into(),
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.is_authorized
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// A still written to disk by the camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl CapturedImage {
    /// Stat a freshly written capture. Fails if the camera reported success
    /// but never materialized the file.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            size_bytes: meta.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_deserializes_from_server_body() {
        let v: AnalysisVerdict =
            serde_json::from_str(r#"{"is_authorized": true, "reason": "permit on file"}"#)
                .unwrap();
        assert!(v.is_authorized());
        assert_eq!(v.reason(), "permit on file");
    }

    #[test]
    fn verdict_missing_reason_is_rejected() {
        let result: Result<AnalysisVerdict, _> =
            serde_json::from_str(r#"{"is_authorized": false}"#);
        assert!(result.is_err());
    }

    #[test]
    fn position_display_uses_plain_decimals() {
        let p = GeoPosition::new(9.9252, -78.1198);
        assert_eq!(p.to_string(), "9.9252, -78.1198");
    }

    #[test]
    fn captured_image_reads_size() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("shot.jpg");
        std::fs::write(&path, [0u8; 42]).unwrap();

        let img = CapturedImage::from_file(&path).unwrap();
        assert_eq!(img.size_bytes, 42);
        assert_eq!(img.path, path);
    }

    #[test]
    fn captured_image_missing_file_errors() {
        assert!(CapturedImage::from_file(Path::new("/nonexistent/shot.jpg")).is_err());
    }
}
