//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the reducer needs:
//! identify (header-only bounds read) and reduce (decode, subsample,
//! re-encode as JPEG).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate with no system libraries.

use super::params::ReduceParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Send + Sync` so a backend can be shared with the blocking worker pool.
pub trait ImageBackend: Send + Sync {
    /// Read image bounds without decoding pixel data.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode `params.source` subsampled by `params.factor` and write it to
    /// `params.output` as JPEG at `params.quality`.
    fn reduce(&self, params: &ReduceParams) -> Result<(), BackendError>;
}
