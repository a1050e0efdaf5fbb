//! Upload coordinator: one multipart `POST /analyze` per capture.
//!
//! ## Request
//!
//! ```text
//! POST {base_url}analyze
//! Content-Type: multipart/form-data
//!
//!   image      binary, file name of the upload, image/jpeg
//!   latitude   text/plain, decimal degrees
//!   longitude  text/plain, decimal degrees
//! ```
//!
//! ## Response
//!
//! A 2xx body is an [`AnalysisVerdict`]. Anything else is reported with its
//! status code and reason phrase; error bodies are not parsed.
//!
//! There is exactly one attempt per call: no retries, no backoff.

use crate::config::ServerConfig;
use crate::types::{AnalysisVerdict, GeoPosition};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Path of the analysis endpoint relative to the server root.
pub const ANALYZE_PATH: &str = "analyze";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("invalid server URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("HTTP client setup failed: {0}")]
    Client(#[from] reqwest::Error),
}

/// What happened to one upload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The server answered with a verdict.
    Verdict(AnalysisVerdict),
    /// No position was known, so nothing was sent.
    LocationUnavailable,
    /// The server answered with a non-2xx status.
    Rejected { status: u16, message: String },
    /// No usable response: connect, I/O, timeout, or undecodable body.
    TransportFailed(String),
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Verdict(_))
    }
}

/// The user-visible result text.
impl fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadOutcome::Verdict(v) => {
                write!(f, "Authorized: {}\nReason: {}", v.is_authorized(), v.reason())
            }
            UploadOutcome::LocationUnavailable => {
                write!(f, "Location not available. Cannot upload.")
            }
            UploadOutcome::Rejected { status, message } if message.is_empty() => {
                write!(f, "Error: {status}")
            }
            UploadOutcome::Rejected { status, message } => write!(f, "Error: {status} {message}"),
            UploadOutcome::TransportFailed(msg) => write!(f, "Upload failed: {msg}"),
        }
    }
}

/// Flatten a reqwest error and its source chain into one line.
///
/// Timeouts collapse to the bare word `timeout`.
fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        return "timeout".to_string();
    }
    let mut msg = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}

/// Decimal text for a coordinate form part. Whole degrees keep one
/// fractional digit (`1.0`, not `1`).
fn coordinate_text(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Resolve the analyze endpoint, tolerating a base URL without a trailing slash.
pub fn analyze_url(base_url: &str) -> Result<Url, UploadError> {
    fn invalid(url: &str, reason: impl fmt::Display) -> UploadError {
        UploadError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
    let mut base = Url::parse(base_url).map_err(|e| invalid(base_url, e))?;
    if base.cannot_be_a_base() {
        return Err(invalid(base_url, "not a hierarchical URL"));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(ANALYZE_PATH).map_err(|e| invalid(base_url, e))
}

/// HTTP client bound to one analysis server.
#[derive(Debug, Clone)]
pub struct UploadClient {
    http: Client,
    endpoint: Url,
}

impl UploadClient {
    pub fn new(config: &ServerConfig) -> Result<Self, UploadError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            http: builder.build()?,
            endpoint: analyze_url(&config.base_url)?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn build_form(image: &Path, position: GeoPosition) -> Result<Form, String> {
        let bytes = tokio::fs::read(image)
            .await
            .map_err(|e| format!("{}: {e}", image.display()))?;
        let file_name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.jpg".to_string());

        let text = |value: f64| {
            Part::text(coordinate_text(value))
                .mime_str("text/plain")
                .map_err(|e| e.to_string())
        };
        let image_part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("image/jpeg")
            .map_err(|e| e.to_string())?;

        Ok(Form::new()
            .part("image", image_part)
            .part("latitude", text(position.latitude)?)
            .part("longitude", text(position.longitude)?))
    }

    /// Send `image` with `position` to the analysis endpoint.
    ///
    /// Refuses immediately, without any network traffic, when `position`
    /// is `None`.
    pub async fn upload(&self, image: &Path, position: Option<GeoPosition>) -> UploadOutcome {
        let Some(position) = position else {
            tracing::warn!("location not available, upload skipped");
            return UploadOutcome::LocationUnavailable;
        };

        let form = match Self::build_form(image, position).await {
            Ok(form) => form,
            Err(msg) => {
                tracing::error!("upload failed: {msg}");
                return UploadOutcome::TransportFailed(msg);
            }
        };

        tracing::debug!(endpoint = %self.endpoint, %position, "uploading {}", image.display());
        let response = match self.http.post(self.endpoint.clone()).multipart(form).send().await {
            Ok(r) => r,
            Err(e) => {
                let msg = describe_transport_error(&e);
                tracing::error!("upload failed: {msg}");
                return UploadOutcome::TransportFailed(msg);
            }
        };

        let status = response.status();
        if !status.is_success() {
            return UploadOutcome::Rejected {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            };
        }

        match response.json::<AnalysisVerdict>().await {
            Ok(verdict) => UploadOutcome::Verdict(verdict),
            Err(e) => {
                let msg = describe_transport_error(&e);
                tracing::error!("undecodable verdict: {msg}");
                UploadOutcome::TransportFailed(msg)
            }
        }
    }
}
