//! Capture directory resolution.
//!
//! Lookup order, first directory that exists or can be created wins:
//!
//! ```text
//! 1. storage.output_dir                 (explicit override)
//! 2. <Pictures>/<app_name>/             (dirs::picture_dir)
//! 3. <data dir>/<app_name>/images/      (dirs::data_dir)
//! 4. <data dir>/<app_name>/
//! ```

use crate::config::StorageConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("could not create {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("no usable capture directory")]
    NoDirectory,
}

fn ensure_dir(path: &Path) -> bool {
    path.is_dir() || std::fs::create_dir_all(path).is_ok()
}

/// Resolve the capture directory from explicit candidates.
///
/// Split out from [`output_directory`] so the fallback chain can be tested
/// without depending on the host's XDG layout.
pub fn resolve_output_directory(
    app_name: &str,
    pictures: Option<PathBuf>,
    data: Option<PathBuf>,
) -> Result<PathBuf, StorageError> {
    if let Some(pics) = pictures {
        let app_dir = pics.join(app_name);
        if ensure_dir(&app_dir) {
            return Ok(app_dir);
        }
        tracing::debug!("pictures directory {} unusable", app_dir.display());
    }

    let internal = data.map(|d| d.join(app_name));
    if let Some(internal) = internal {
        let images = internal.join("images");
        if ensure_dir(&images) {
            return Ok(images);
        }
        if ensure_dir(&internal) {
            return Ok(internal);
        }
    }

    Err(StorageError::NoDirectory)
}

/// Directory new captures and their reduced copies are written to.
pub fn output_directory(config: &StorageConfig) -> Result<PathBuf, StorageError> {
    if let Some(dir) = &config.output_dir {
        std::fs::create_dir_all(dir).map_err(|source| StorageError::Create {
            path: dir.clone(),
            source,
        })?;
        return Ok(dir.clone());
    }
    resolve_output_directory(&config.app_name, dirs::picture_dir(), dirs::data_dir())
}
