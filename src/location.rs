//! Location supplier and the shared position slot.
//!
//! The supplier asks a [`LocationProvider`] for the last known position once
//! per [`LocationSupplier::request`] call and writes any fix into a
//! [`PositionCell`]. The workflow reads the cell when a capture is ready to
//! upload. There is no live stream and no timeout: a lookup runs until the
//! provider answers.
//!
//! "No fix yet" is a normal answer ([`LocationFix::Unavailable`]), not an
//! error. Provider errors are logged and folded into `Unavailable` as well.

use crate::config::LocationConfig;
use crate::types::GeoPosition;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Error, Debug)]
pub enum LocationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed fix: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result of a single last-known-position lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationFix {
    Position(GeoPosition),
    Unavailable,
}

/// Source of the device's last known position.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// `Ok(None)` when no recent fix exists.
    async fn last_known_position(&self) -> Result<Option<GeoPosition>, LocationError>;
}

/// Provider that always reports the same position (or none).
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Option<GeoPosition>);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn last_known_position(&self) -> Result<Option<GeoPosition>, LocationError> {
        Ok(self.0)
    }
}

/// Provider reading a JSON fix file kept fresh by a GPS daemon.
///
/// ```json
/// {"latitude": 9.9252, "longitude": 78.1198}
/// ```
///
/// A missing file means no fix has been recorded yet.
#[derive(Debug, Clone)]
pub struct FileLocation {
    path: PathBuf,
}

impl FileLocation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LocationProvider for FileLocation {
    async fn last_known_position(&self) -> Result<Option<GeoPosition>, LocationError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }
}

/// Build the provider selected by config, if any.
pub fn provider_from_config(config: &LocationConfig) -> Option<Arc<dyn LocationProvider>> {
    if let (Some(latitude), Some(longitude)) = (config.latitude, config.longitude) {
        return Some(Arc::new(FixedLocation(Some(GeoPosition::new(
            latitude, longitude,
        )))));
    }
    config
        .fix_file
        .as_ref()
        .map(|p| Arc::new(FileLocation::new(p.clone())) as Arc<dyn LocationProvider>)
}

/// Single-slot register holding the most recent position.
///
/// Last writer wins. Readers see either nothing or a complete position,
/// never a torn value.
#[derive(Clone)]
pub struct PositionCell {
    slot: Arc<watch::Sender<Option<GeoPosition>>>,
}

impl Default for PositionCell {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionCell {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(watch::Sender::new(None)),
        }
    }

    /// Replace the stored position, returning the previous one.
    pub fn store(&self, position: GeoPosition) -> Option<GeoPosition> {
        self.slot.send_replace(Some(position))
    }

    pub fn load(&self) -> Option<GeoPosition> {
        *self.slot.borrow()
    }

    pub fn clear(&self) {
        self.slot.send_replace(None);
    }
}

/// Issues last-known-position lookups and records the answers.
#[derive(Clone)]
pub struct LocationSupplier {
    provider: Arc<dyn LocationProvider>,
    cell: PositionCell,
}

impl LocationSupplier {
    pub fn new(provider: Arc<dyn LocationProvider>, cell: PositionCell) -> Self {
        Self { provider, cell }
    }

    pub fn cell(&self) -> &PositionCell {
        &self.cell
    }

    /// Start one lookup in the background.
    ///
    /// A fix is written to the cell before the handle resolves. An
    /// unavailable answer leaves the cell untouched.
    pub fn request(&self) -> JoinHandle<LocationFix> {
        let provider = Arc::clone(&self.provider);
        let cell = self.cell.clone();
        tokio::spawn(async move {
            match provider.last_known_position().await {
                Ok(Some(position)) => {
                    cell.store(position);
                    tracing::debug!(%position, "location updated");
                    LocationFix::Position(position)
                }
                Ok(None) => {
                    tracing::debug!("no last known location");
                    LocationFix::Unavailable
                }
                Err(e) => {
                    tracing::warn!("location lookup failed: {e}");
                    LocationFix::Unavailable
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingProvider {
        calls: AtomicUsize,
        answer: Option<GeoPosition>,
    }

    #[async_trait]
    impl LocationProvider for CountingProvider {
        async fn last_known_position(&self) -> Result<Option<GeoPosition>, LocationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer)
        }
    }

    #[test]
    fn cell_starts_empty() {
        assert_eq!(PositionCell::new().load(), None);
    }

    #[test]
    fn cell_last_writer_wins() {
        let cell = PositionCell::new();
        let a = GeoPosition::new(1.0, 2.0);
        let b = GeoPosition::new(3.0, 4.0);

        assert_eq!(cell.store(a), None);
        assert_eq!(cell.store(b), Some(a));
        assert_eq!(cell.load(), Some(b));

        cell.clear();
        assert_eq!(cell.load(), None);
    }

    #[test]
    fn cell_clones_share_the_slot() {
        let cell = PositionCell::new();
        let reader = cell.clone();
        cell.store(GeoPosition::new(9.9, 78.1));
        assert_eq!(reader.load(), Some(GeoPosition::new(9.9, 78.1)));
    }

    #[tokio::test]
    async fn request_stores_fix() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            answer: Some(GeoPosition::new(9.9252, 78.1198)),
        });
        let supplier = LocationSupplier::new(provider.clone(), PositionCell::new());

        let fix = supplier.request().await.unwrap();

        assert_eq!(fix, LocationFix::Position(GeoPosition::new(9.9252, 78.1198)));
        assert_eq!(supplier.cell().load(), Some(GeoPosition::new(9.9252, 78.1198)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unavailable_keeps_previous_fix() {
        let cell = PositionCell::new();
        cell.store(GeoPosition::new(1.0, 1.0));
        let supplier = LocationSupplier::new(Arc::new(FixedLocation(None)), cell.clone());

        assert_eq!(supplier.request().await.unwrap(), LocationFix::Unavailable);
        assert_eq!(cell.load(), Some(GeoPosition::new(1.0, 1.0)));
    }

    #[tokio::test]
    async fn file_location_reads_fix() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("fix.json");
        std::fs::write(&path, r#"{"latitude": -33.8688, "longitude": 151.2093}"#).unwrap();

        let pos = FileLocation::new(&path).last_known_position().await.unwrap();
        assert_eq!(pos, Some(GeoPosition::new(-33.8688, 151.2093)));
    }

    #[tokio::test]
    async fn file_location_missing_file_is_no_fix() {
        let pos = FileLocation::new("/nonexistent/fix.json")
            .last_known_position()
            .await
            .unwrap();
        assert_eq!(pos, None);
    }

    #[tokio::test]
    async fn malformed_fix_is_error_but_supplier_reports_unavailable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("fix.json");
        std::fs::write(&path, "{\"lat\": 1}").unwrap();

        let provider = FileLocation::new(&path);
        assert!(matches!(
            provider.last_known_position().await,
            Err(LocationError::Json(_))
        ));

        let supplier = LocationSupplier::new(Arc::new(provider), PositionCell::new());
        assert_eq!(supplier.request().await.unwrap(), LocationFix::Unavailable);
        assert_eq!(supplier.cell().load(), None);
    }

    #[test]
    fn config_selects_provider() {
        assert!(provider_from_config(&LocationConfig::default()).is_none());
        assert!(
            provider_from_config(&LocationConfig {
                latitude: Some(1.0),
                longitude: Some(2.0),
                fix_file: None,
            })
            .is_some()
        );
        assert!(
            provider_from_config(&LocationConfig {
                fix_file: Some("fix.json".into()),
                ..LocationConfig::default()
            })
            .is_some()
        );
    }
}
