//! Client configuration module.
//!
//! Handles loading, validating, and merging `billboard.toml`. Stock defaults
//! are overridden by whatever the user file specifies; everything is optional.
//!
//! ## Configuration Options
//!
//! ```toml
//! [server]
//! base_url = "http://127.0.0.1:8000/"   # Analysis server root; /analyze is appended
//! # connect_timeout_secs = 10           # Omit for the HTTP client default
//! # timeout_secs = 30                   # Omit for no overall request timeout
//!
//! [reduction]
//! pixel_budget = 2000000                # Max pixels in the uploaded image
//! quality = 85                          # JPEG quality (1-100)
//!
//! [camera]
//! command = []                          # e.g. ["libcamera-still", "-n", "-o", "{output}"]
//! # still = "fixtures/billboard.jpg"    # Copy a fixed still instead of shooting
//!
//! [location]
//! # latitude = 9.9252                   # Fixed position
//! # longitude = 78.1198
//! # fix_file = "/run/gps/last-fix.json" # Last known fix written by a GPS daemon
//!
//! [storage]
//! app_name = "BillboardDetector"        # Folder name under the Pictures directory
//! # output_dir = "captures"             # Override the capture directory
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Default config file name looked up in the working directory.
pub const CONFIG_FILENAME: &str = "billboard.toml";

/// Client configuration loaded from `billboard.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Analysis server endpoint and timeouts.
    pub server: ServerConfig,
    /// Image reduction settings (pixel budget, quality).
    pub reduction: ReductionConfig,
    /// How stills are captured.
    pub camera: CameraConfig,
    /// Where the position comes from.
    pub location: LocationConfig,
    /// Where captures are written.
    pub storage: StorageConfig,
}

impl ClientConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.base_url must not be empty".into(),
            ));
        }
        if self.reduction.quality == 0 || self.reduction.quality > 100 {
            return Err(ConfigError::Validation(
                "reduction.quality must be 1-100".into(),
            ));
        }
        if self.reduction.pixel_budget == 0 {
            return Err(ConfigError::Validation(
                "reduction.pixel_budget must be non-zero".into(),
            ));
        }
        if !self.camera.command.is_empty() && self.camera.still.is_some() {
            return Err(ConfigError::Validation(
                "camera.command and camera.still are mutually exclusive".into(),
            ));
        }
        if self.location.latitude.is_some() != self.location.longitude.is_some() {
            return Err(ConfigError::Validation(
                "location.latitude and location.longitude must be set together".into(),
            ));
        }
        if self.location.latitude.is_some() && self.location.fix_file.is_some() {
            return Err(ConfigError::Validation(
                "location: fixed coordinates and fix_file are mutually exclusive".into(),
            ));
        }
        if self.storage.app_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.app_name must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Analysis server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Server root. The `analyze` endpoint is resolved relative to it.
    pub base_url: String,
    /// TCP connect timeout. `None` keeps the client default.
    pub connect_timeout_secs: Option<u64>,
    /// Whole-request timeout. `None` means no timeout.
    pub timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/".to_string(),
            connect_timeout_secs: None,
            timeout_secs: None,
        }
    }
}

/// Image reduction settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReductionConfig {
    /// Pixel-count ceiling for the uploaded image.
    pub pixel_budget: u64,
    /// JPEG re-encode quality (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            pixel_budget: crate::imaging::DEFAULT_PIXEL_BUDGET,
            quality: 85,
        }
    }
}

impl ReductionConfig {
    pub fn to_reduce_config(&self) -> crate::imaging::ReduceConfig {
        crate::imaging::ReduceConfig {
            pixel_budget: self.pixel_budget,
            quality: crate::imaging::Quality::new(self.quality),
        }
    }
}

/// Camera settings.
///
/// Exactly one of `command` or `still` selects the camera. With neither set
/// the camera is unbound and every capture fails with "not ready".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    /// External still-capture command. `{output}` is replaced with the target path.
    pub command: Vec<String>,
    /// Fixed still image copied on every capture.
    pub still: Option<PathBuf>,
}

/// Location settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocationConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// JSON file holding the last known fix: `{"latitude": .., "longitude": ..}`.
    pub fix_file: Option<PathBuf>,
}

/// Capture storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Folder name created under the user's Pictures directory.
    pub app_name: String,
    /// Explicit capture directory, bypassing the platform lookup.
    pub output_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            app_name: "BillboardDetector".to_string(),
            output_dir: None,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// Base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ClientConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ClientConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ClientConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given file.
///
/// A missing file yields the stock defaults; a present but invalid file is an error.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("no config at {}, using defaults", path.display());
        return resolve_config(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    resolve_config(Some(value))
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Billboard Detector Configuration
# ================================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Analysis server
# ---------------------------------------------------------------------------
[server]
# Server root. Photos are POSTed to <base_url>analyze.
base_url = "http://127.0.0.1:8000/"
# TCP connect timeout in seconds (omit for the client default).
# connect_timeout_secs = 10
# Whole-request timeout in seconds (omit for none).
# timeout_secs = 30

# ---------------------------------------------------------------------------
# Image reduction before upload
# ---------------------------------------------------------------------------
[reduction]
# Photos larger than this many pixels are subsampled by a power of two.
pixel_budget = 2000000
# JPEG quality for the uploaded copy (1-100).
quality = 85

# ---------------------------------------------------------------------------
# Camera
# ---------------------------------------------------------------------------
[camera]
# Command that writes a still to {output}. Pick one of command or still.
command = []
# command = ["libcamera-still", "-n", "-o", "{output}"]
# command = ["fswebcam", "--no-banner", "-r", "1920x1080", "{output}"]
# Copy this fixed image instead of shooting (bench testing).
# still = "billboard.jpg"

# ---------------------------------------------------------------------------
# Location
# ---------------------------------------------------------------------------
[location]
# Fixed coordinates in decimal degrees...
# latitude = 9.9252
# longitude = 78.1198
# ...or a JSON file with the last known fix, refreshed by a GPS daemon:
# {"latitude": 9.9252, "longitude": 78.1198}
# fix_file = "/run/gps/last-fix.json"

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Folder created under your Pictures directory for captures.
app_name = "BillboardDetector"
# Write captures here instead.
# output_dir = "captures"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_has_expected_values() {
        let config = ClientConfig::default();
        assert_eq!(config.server.base_url, "http://127.0.0.1:8000/");
        assert_eq!(config.reduction.pixel_budget, 2_000_000);
        assert_eq!(config.reduction.quality, 85);
        assert!(config.camera.command.is_empty());
        assert_eq!(config.storage.app_name, "BillboardDetector");
    }

    #[test]
    fn default_config_is_valid() {
        assert!(ClientConfig::default().validate().is_ok());
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let value: toml::Value = toml::from_str(stock_config_toml()).unwrap();
        let config = resolve_config(Some(value)).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml = r#"
[server]
base_url = "https://analyzer.example.org/"

[location]
latitude = 9.9252
longitude = 78.1198
"#;
        let value: toml::Value = toml::from_str(toml).unwrap();
        let config = resolve_config(Some(value)).unwrap();
        assert_eq!(config.server.base_url, "https://analyzer.example.org/");
        assert_eq!(config.location.latitude, Some(9.9252));
        assert_eq!(config.reduction.quality, 85);
    }

    #[test]
    fn unknown_key_rejected() {
        let value: toml::Value = toml::from_str("[server]\nbase_uri = \"x\"").unwrap();
        assert!(matches!(
            resolve_config(Some(value)),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn quality_out_of_range_rejected() {
        let mut config = ClientConfig::default();
        config.reduction.quality = 101;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
        config.reduction.quality = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn half_a_position_rejected() {
        let mut config = ClientConfig::default();
        config.location.latitude = Some(1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn fixed_position_and_fix_file_rejected() {
        let mut config = ClientConfig::default();
        config.location.latitude = Some(1.0);
        config.location.longitude = Some(2.0);
        config.location.fix_file = Some("fix.json".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn command_and_still_rejected() {
        let mut config = ClientConfig::default();
        config.camera.command = vec!["snap".into(), "{output}".into()];
        config.camera.still = Some("a.jpg".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn reduction_config_maps_to_imaging() {
        let rc = ReductionConfig {
            pixel_budget: 1000,
            quality: 70,
        }
        .to_reduce_config();
        assert_eq!(rc.pixel_budget, 1000);
        assert_eq!(rc.quality.value(), 70);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"quality = 90"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"quality = 70"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("quality").unwrap().as_integer(), Some(70));
    }

    #[test]
    fn merge_toml_nested_tables_preserve_base_keys() {
        let base: toml::Value = toml::from_str(
            r#"
[reduction]
pixel_budget = 2000000
quality = 85
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str("[reduction]\nquality = 60").unwrap();
        let merged = merge_toml(base, overlay);
        let reduction = merged.get("reduction").unwrap();
        assert_eq!(reduction.get("quality").unwrap().as_integer(), Some(60));
        assert_eq!(
            reduction.get("pixel_budget").unwrap().as_integer(),
            Some(2_000_000)
        );
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            r#"
[camera]
command = ["fswebcam", "{output}"]

[storage]
output_dir = "shots"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.camera.command, vec!["fswebcam", "{output}"]);
        assert_eq!(config.storage.output_dir, Some(PathBuf::from("shots")));
        assert_eq!(config.storage.app_name, "BillboardDetector");
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&path, "this is not valid toml [[[").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }
}
