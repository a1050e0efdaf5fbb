//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how*. They are the interface
//! between [`operations`](super::operations), which decides the sample factor
//! and output path, and the [`backend`](super::backend), which does the pixel
//! work. A mock backend can then record the plan without touching pixels.

use std::path::PathBuf;

/// Quality setting for lossy JPEG encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Parameters for a subsample-and-reencode operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReduceParams {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Power-of-two subsampling factor. `1` keeps full resolution.
    pub factor: u32,
    pub quality: Quality,
}
