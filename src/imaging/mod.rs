//! Image reduction in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Reduce → JPEG** | subsample by power of two + `JpegEncoder` at quality 85 |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for the sample-factor heuristic (unit testable)
//! - **Parameters**: Data structures describing a reduction
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: [`reduce_image`], which applies the fail-open policy

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{DEFAULT_PIXEL_BUDGET, calculate_sample_factor, calculate_sampled_dimensions};
pub use operations::{FallbackReason, ReduceConfig, Reduction, plan_reduction, reduce, reduce_image};
pub use params::{Quality, ReduceParams};
pub use rust_backend::RustBackend;
