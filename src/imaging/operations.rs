//! High-level reduction operation.
//!
//! Combines the sample-factor calculation with backend execution and applies
//! the fail-open policy: any failure leaves the original capture in place.

use super::backend::{Dimensions, ImageBackend};
use super::calculations::{DEFAULT_PIXEL_BUDGET, calculate_sample_factor};
use super::params::{Quality, ReduceParams};
use crate::naming::reduced_file_name;
use std::fmt;
use std::path::{Path, PathBuf};

/// Configuration for image reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReduceConfig {
    pub pixel_budget: u64,
    pub quality: Quality,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            pixel_budget: DEFAULT_PIXEL_BUDGET,
            quality: Quality::default(),
        }
    }
}

/// Which step of the reduction gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// Bounds could not be read (missing, empty, or unrecognised file).
    Bounds(String),
    /// Decoding, subsampling, or encoding failed.
    Encode(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Bounds(e) => write!(f, "could not read bounds: {e}"),
            FallbackReason::Encode(e) => write!(f, "could not re-encode: {e}"),
        }
    }
}

/// Outcome of a reduction attempt.
///
/// Callers that only need a file to upload use [`Reduction::into_path`];
/// the variants keep the fallback observable for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reduction {
    Reduced {
        path: PathBuf,
        original: Dimensions,
        factor: u32,
    },
    Unreduced {
        path: PathBuf,
        reason: FallbackReason,
    },
}

impl Reduction {
    /// The file to upload: the reduced copy, or the untouched original.
    pub fn path(&self) -> &Path {
        match self {
            Reduction::Reduced { path, .. } | Reduction::Unreduced { path, .. } => path,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            Reduction::Reduced { path, .. } | Reduction::Unreduced { path, .. } => path,
        }
    }

    pub fn is_reduced(&self) -> bool {
        matches!(self, Reduction::Reduced { .. })
    }
}

/// Plan a reduction without executing it.
///
/// The output lands next to the source as `compressed_<name>` unless an
/// explicit output directory is given.
pub fn plan_reduction(
    source: &Path,
    output_dir: &Path,
    dims: Dimensions,
    config: &ReduceConfig,
) -> ReduceParams {
    ReduceParams {
        source: source.to_path_buf(),
        output: output_dir.join(reduced_file_name(source)),
        factor: calculate_sample_factor((dims.width, dims.height), config.pixel_budget),
        quality: config.quality,
    }
}

/// Best-effort reduction of a captured image.
///
/// Never fails: every error path returns [`Reduction::Unreduced`] carrying the
/// original path. Images already within budget are still re-encoded at the
/// configured quality.
pub fn reduce_image(
    backend: &impl ImageBackend,
    source: &Path,
    output_dir: &Path,
    config: &ReduceConfig,
) -> Reduction {
    let dims = match backend.identify(source) {
        Ok(dims) => dims,
        Err(e) => {
            let reason = FallbackReason::Bounds(e.to_string());
            tracing::warn!(source = %source.display(), %reason, "using original image");
            return Reduction::Unreduced {
                path: source.to_path_buf(),
                reason,
            };
        }
    };

    let params = plan_reduction(source, output_dir, dims, config);
    tracing::debug!(
        width = dims.width,
        height = dims.height,
        factor = params.factor,
        "reducing {}",
        source.display()
    );

    if let Err(e) = backend.reduce(&params) {
        // Don't leave a half-written copy behind
        let _ = std::fs::remove_file(&params.output);
        let reason = FallbackReason::Encode(e.to_string());
        tracing::warn!(source = %source.display(), %reason, "using original image");
        return Reduction::Unreduced {
            path: source.to_path_buf(),
            reason,
        };
    }

    let kb = |p: &Path| std::fs::metadata(p).map(|m| m.len() / 1024).unwrap_or(0);
    tracing::debug!(
        "original: {} KB, compressed: {} KB",
        kb(source),
        kb(&params.output)
    );

    Reduction::Reduced {
        path: params.output,
        original: dims,
        factor: params.factor,
    }
}

/// Reduce with the production backend and collapse to a single path.
///
/// This is the boundary contract: `reduce(path) -> path`, never an error.
pub fn reduce(source: &Path, output_dir: &Path, config: &ReduceConfig) -> PathBuf {
    reduce_image(&super::RustBackend::new(), source, output_dir, config).into_path()
}
