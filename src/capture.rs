//! Capture trigger and camera backends.
//!
//! A [`CaptureTrigger`] owns the bound camera. Each [`CaptureTrigger::capture`]
//! call writes one still to `<output_dir>/<yyyyMMdd-HHmmss>.jpg` on the
//! blocking worker pool and reports exactly one outcome. Nothing is retried.
//!
//! | Camera | Source of the still |
//! |---|---|
//! | [`CommandCamera`] | external program, e.g. `libcamera-still -o {output}` |
//! | [`FileCamera`] | copies a fixed image (bench runs, demos) |

use crate::config::CameraConfig;
use crate::naming::capture_file_name;
use crate::types::CapturedImage;
use chrono::{DateTime, TimeZone};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use thiserror::Error;

/// Placeholder in camera command arguments replaced by the output path.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("camera not ready")]
    NotReady,
    #[error("photo capture failed: {0}")]
    Failed(String),
    #[error("camera reported success but {path} is missing: {source}")]
    Missing {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A device that can write a still image to a path.
pub trait Camera: Send + Sync {
    /// Whether the camera is bound and able to shoot.
    fn is_ready(&self) -> bool;

    /// Write one still to `output`. Blocks until the file is written.
    fn take_picture(&self, output: &Path) -> Result<(), CaptureError>;
}

/// Camera driven by an external still-capture program.
#[derive(Debug, Clone)]
pub struct CommandCamera {
    argv: Vec<String>,
}

impl CommandCamera {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    /// Arguments with the output path substituted. If no argument carries the
    /// placeholder, the path is appended.
    fn args_for(&self, output: &Path) -> Vec<String> {
        let out = output.to_string_lossy();
        let rest = self.argv.iter().skip(1);
        let mut args: Vec<String> = rest
            .clone()
            .map(|a| a.replace(OUTPUT_PLACEHOLDER, &out))
            .collect();
        if !rest.clone().any(|a| a.contains(OUTPUT_PLACEHOLDER)) {
            args.push(out.into_owned());
        }
        args
    }
}

impl Camera for CommandCamera {
    fn is_ready(&self) -> bool {
        !self.argv.is_empty()
    }

    fn take_picture(&self, output: &Path) -> Result<(), CaptureError> {
        let program = self.argv.first().ok_or(CaptureError::NotReady)?;
        let result = Command::new(program)
            .args(self.args_for(output))
            .output()
            .map_err(|e| CaptureError::Failed(format!("{program}: {e}")))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            let detail = if stderr.is_empty() {
                result.status.to_string()
            } else {
                stderr
            };
            return Err(CaptureError::Failed(format!("{program}: {detail}")));
        }
        Ok(())
    }
}

/// Camera that "shoots" by copying a fixed image.
#[derive(Debug, Clone)]
pub struct FileCamera {
    still: PathBuf,
}

impl FileCamera {
    pub fn new(still: impl Into<PathBuf>) -> Self {
        Self {
            still: still.into(),
        }
    }
}

impl Camera for FileCamera {
    fn is_ready(&self) -> bool {
        self.still.is_file()
    }

    fn take_picture(&self, output: &Path) -> Result<(), CaptureError> {
        std::fs::copy(&self.still, output)
            .map(|_| ())
            .map_err(|e| CaptureError::Failed(format!("{}: {e}", self.still.display())))
    }
}

/// Build the camera selected by config, if any.
pub fn camera_from_config(config: &CameraConfig) -> Option<Arc<dyn Camera>> {
    if let Some(still) = &config.still {
        return Some(Arc::new(FileCamera::new(still.clone())));
    }
    if !config.command.is_empty() {
        return Some(Arc::new(CommandCamera::new(config.command.clone())));
    }
    None
}

/// Fires the camera on request.
#[derive(Clone, Default)]
pub struct CaptureTrigger {
    camera: Option<Arc<dyn Camera>>,
}

impl CaptureTrigger {
    pub fn new(camera: Option<Arc<dyn Camera>>) -> Self {
        Self { camera }
    }

    pub fn is_ready(&self) -> bool {
        self.camera.as_ref().is_some_and(|c| c.is_ready())
    }

    /// Shoot one still into `output_dir`, named after `now`.
    ///
    /// Fails fast with [`CaptureError::NotReady`] when no camera is bound.
    pub async fn capture<Tz>(
        &self,
        output_dir: &Path,
        now: DateTime<Tz>,
    ) -> Result<CapturedImage, CaptureError>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let camera = match &self.camera {
            Some(c) if c.is_ready() => Arc::clone(c),
            _ => return Err(CaptureError::NotReady),
        };

        let path = output_dir.join(capture_file_name(&now));
        tracing::debug!("output file: {}", path.display());

        let target = path.clone();
        tokio::task::spawn_blocking(move || camera.take_picture(&target))
            .await
            .map_err(|e| CaptureError::Failed(e.to_string()))??;

        let image = CapturedImage::from_file(&path)
            .map_err(|source| CaptureError::Missing { path, source })?;
        tracing::debug!(size = image.size_bytes, "image saved");
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 15, 2).unwrap()
    }

    /// Camera that records every shot and optionally fails.
    struct RecordingCamera {
        shots: Mutex<Vec<PathBuf>>,
        fail: bool,
    }

    impl Camera for RecordingCamera {
        fn is_ready(&self) -> bool {
            true
        }

        fn take_picture(&self, output: &Path) -> Result<(), CaptureError> {
            self.shots.lock().unwrap().push(output.to_path_buf());
            if self.fail {
                return Err(CaptureError::Failed("sensor timeout".into()));
            }
            std::fs::write(output, b"jpeg").map_err(|e| CaptureError::Failed(e.to_string()))
        }
    }

    #[tokio::test]
    async fn unbound_trigger_is_not_ready() {
        let tmp = TempDir::new().unwrap();
        let trigger = CaptureTrigger::default();
        assert!(!trigger.is_ready());

        let result = trigger.capture(tmp.path(), fixed_time()).await;
        assert!(matches!(result, Err(CaptureError::NotReady)));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn capture_writes_timestamped_file() {
        let tmp = TempDir::new().unwrap();
        let camera = Arc::new(RecordingCamera {
            shots: Mutex::new(Vec::new()),
            fail: false,
        });
        let trigger = CaptureTrigger::new(Some(camera.clone() as Arc<dyn Camera>));

        let image = trigger.capture(tmp.path(), fixed_time()).await.unwrap();

        assert_eq!(image.path, tmp.path().join("20250314-091502.jpg"));
        assert_eq!(image.size_bytes, 4);
        assert_eq!(camera.shots.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn capture_failure_is_reported_once() {
        let tmp = TempDir::new().unwrap();
        let camera = Arc::new(RecordingCamera {
            shots: Mutex::new(Vec::new()),
            fail: true,
        });
        let trigger = CaptureTrigger::new(Some(camera.clone() as Arc<dyn Camera>));

        let err = trigger.capture(tmp.path(), fixed_time()).await.unwrap_err();
        assert_eq!(err.to_string(), "photo capture failed: sensor timeout");
        // No retry
        assert_eq!(camera.shots.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn file_camera_copies_still() {
        let tmp = TempDir::new().unwrap();
        let still = tmp.path().join("still.jpg");
        std::fs::write(&still, b"0123456789").unwrap();
        let out_dir = tmp.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();

        let trigger = CaptureTrigger::new(Some(Arc::new(FileCamera::new(&still))));
        let image = trigger.capture(&out_dir, fixed_time()).await.unwrap();
        assert_eq!(image.size_bytes, 10);
    }

    #[test]
    fn file_camera_missing_still_is_not_ready() {
        assert!(!FileCamera::new("/nonexistent/still.jpg").is_ready());
    }

    #[test]
    fn command_args_substitute_placeholder() {
        let cam = CommandCamera::new(vec![
            "libcamera-still".into(),
            "-o".into(),
            "{output}".into(),
        ]);
        assert_eq!(
            cam.args_for(Path::new("/tmp/x.jpg")),
            vec!["-o".to_string(), "/tmp/x.jpg".to_string()]
        );
    }

    #[test]
    fn command_args_append_when_no_placeholder() {
        let cam = CommandCamera::new(vec!["fswebcam".into(), "--no-banner".into()]);
        assert_eq!(
            cam.args_for(Path::new("/tmp/x.jpg")),
            vec!["--no-banner".to_string(), "/tmp/x.jpg".to_string()]
        );
    }

    #[test]
    fn empty_command_is_not_ready() {
        assert!(!CommandCamera::new(vec![]).is_ready());
    }

    #[cfg(unix)]
    #[test]
    fn command_camera_runs_program() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("shot.jpg");
        let cam = CommandCamera::new(vec![
            "sh".into(),
            "-c".into(),
            "printf jpeg > \"$0\"".into(),
            "{output}".into(),
        ]);
        cam.take_picture(&out).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"jpeg");
    }

    #[cfg(unix)]
    #[test]
    fn command_camera_failure_carries_stderr() {
        let tmp = TempDir::new().unwrap();
        let cam = CommandCamera::new(vec![
            "sh".into(),
            "-c".into(),
            "echo 'no camera found' >&2; exit 3".into(),
        ]);
        let err = cam.take_picture(&tmp.path().join("x.jpg")).unwrap_err();
        assert_eq!(err.to_string(), "photo capture failed: sh: no camera found");
    }

    #[test]
    fn config_selects_camera() {
        assert!(camera_from_config(&CameraConfig::default()).is_none());
        let cfg = CameraConfig {
            command: vec!["snap".into()],
            still: None,
        };
        assert!(camera_from_config(&cfg).is_some());
    }
}
