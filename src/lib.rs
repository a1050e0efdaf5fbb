//! # Billboard Detector
//!
//! Field client for billboard permit checks. Press the shutter, and the
//! client captures a photo, shrinks it to a bandwidth-friendly size, tags it
//! with the device's last known position, and asks the analysis server
//! whether the billboard is authorized at that spot.
//!
//! # Pipeline
//!
//! ```text
//! trigger → capture → reduce → read position → POST /analyze → verdict
//!              │          │           ↑
//!              │          │     location lookup (background, on request)
//!              ▼          ▼
//!     20250314-091502.jpg  compressed_20250314-091502.jpg
//! ```
//!
//! Every stage runs in order and hands its result to the next. Stages that
//! can fail without stopping the cycle (reduction) fall back silently; stages
//! that can't (capture, upload) end the cycle with a user-visible message.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`capture`] | Camera trait, command/file cameras, timestamped capture |
//! | [`imaging`] | Power-of-two subsampling to a pixel budget, JPEG re-encode |
//! | [`location`] | Last-known-position lookups and the shared position slot |
//! | [`upload`] | Multipart upload and verdict decoding |
//! | [`workflow`] | The capture-to-verdict state machine and its events |
//! | [`session`] | Permission preflight and workflow assembly from config |
//! | [`config`] | `billboard.toml` loading, merging, and validation |
//! | [`storage`] | Capture directory resolution |
//! | [`naming`] | Capture and reduced-copy file names |
//! | [`types`] | Shared value types (`GeoPosition`, `AnalysisVerdict`) |
//! | [`output`] | CLI output formatting |
//!
//! # Platform seams
//!
//! Camera and location hardware sit behind traits ([`capture::Camera`],
//! [`location::LocationProvider`]) so the workflow runs identically against
//! a Raspberry Pi camera command, a GPS daemon's fix file, or test doubles.
//! Imaging goes through [`imaging::ImageBackend`] for the same reason.

pub mod capture;
pub mod config;
pub mod imaging;
pub mod location;
pub mod naming;
pub mod output;
pub mod session;
pub mod storage;
pub mod types;
pub mod upload;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_helpers;
