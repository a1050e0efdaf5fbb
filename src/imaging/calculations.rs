//! Pure calculation functions for the reduction heuristic.
//!
//! All functions here are pure and testable without any I/O or images.

/// Default pixel-count ceiling for uploaded images (~2 MP).
pub const DEFAULT_PIXEL_BUDGET: u64 = 2_000_000;

/// Pick the smallest power-of-two subsampling factor that brings the image
/// under the pixel budget.
///
/// The factor divides both edges, so the pixel count drops by `factor²`.
/// Images already within budget get factor `1`. A zero budget is treated
/// as `1` so the loop terminates.
///
/// # Examples
/// ```
/// # use billboard_detector::imaging::calculate_sample_factor;
/// // 12 MP phone shot → factor 4 → 0.75 MP
/// assert_eq!(calculate_sample_factor((4000, 3000), 2_000_000), 4);
///
/// // Already small → untouched
/// assert_eq!(calculate_sample_factor((1600, 1200), 2_000_000), 1);
/// ```
pub fn calculate_sample_factor(dims: (u32, u32), budget: u64) -> u32 {
    let budget = budget.max(1);
    let total = dims.0 as u64 * dims.1 as u64;
    let mut factor: u32 = 1;
    // Stop before overflow; at 2^31 any real image is far below budget.
    while factor < (1 << 31) && total / (factor as u64 * factor as u64) > budget {
        factor <<= 1;
    }
    factor
}

/// Output dimensions after subsampling by `factor`.
///
/// Each edge is integer-divided and never drops below one pixel.
pub fn calculate_sampled_dimensions(dims: (u32, u32), factor: u32) -> (u32, u32) {
    let factor = factor.max(1);
    ((dims.0 / factor).max(1), (dims.1 / factor).max(1))
}
