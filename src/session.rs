//! Startup wiring: permission preflight and workflow assembly.
//!
//! The workflow only starts once both the camera and a location source are
//! available. Either one missing is reported as a single
//! "Permissions not granted." failure listing what is absent.

use crate::capture::{CaptureTrigger, camera_from_config};
use crate::config::ClientConfig;
use crate::location::{LocationProvider, LocationSupplier, PositionCell, provider_from_config};
use crate::storage::{self, StorageError};
use crate::upload::{UploadClient, UploadError};
use crate::workflow::{Workflow, WorkflowEvent};
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use thiserror::Error;

/// Capability the client needs before it may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Camera,
    Location,
}

impl Permission {
    /// What to fix in the config when this permission is missing.
    pub fn hint(self) -> &'static str {
        match self {
            Permission::Camera => "set camera.command or camera.still",
            Permission::Location => {
                "set location.latitude/longitude, location.fix_file or pass --lat/--lon"
            }
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Camera => write!(f, "camera"),
            Permission::Location => write!(f, "location"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Permissions not granted.")]
    PermissionsNotGranted(Vec<Permission>),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// Check every permission, reporting all that are missing at once.
pub fn preflight(
    trigger: &CaptureTrigger,
    provider: Option<Arc<dyn LocationProvider>>,
) -> Result<Arc<dyn LocationProvider>, SessionError> {
    let mut missing = Vec::new();
    if !trigger.is_ready() {
        missing.push(Permission::Camera);
    }
    match provider {
        Some(provider) if missing.is_empty() => Ok(provider),
        Some(_) => Err(SessionError::PermissionsNotGranted(missing)),
        None => {
            missing.push(Permission::Location);
            Err(SessionError::PermissionsNotGranted(missing))
        }
    }
}

/// Build a ready-to-trigger workflow from config.
///
/// Nothing is captured or requested here; call
/// [`Workflow::refresh_location`] to prime the position.
pub fn open(config: &ClientConfig, events: Sender<WorkflowEvent>) -> Result<Workflow, SessionError> {
    let trigger = CaptureTrigger::new(camera_from_config(&config.camera));
    let provider = preflight(&trigger, provider_from_config(&config.location))?;

    let output_dir = storage::output_directory(&config.storage)?;
    tracing::debug!("capture directory: {}", output_dir.display());
    let uploader = UploadClient::new(&config.server)?;
    tracing::debug!("analysis endpoint: {}", uploader.endpoint());

    let location = LocationSupplier::new(provider, PositionCell::new());
    Ok(
        Workflow::new(trigger, location, uploader, output_dir, events)
            .with_reduce_config(config.reduction.to_reduce_config()),
    )
}
