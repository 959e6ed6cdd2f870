//! Floating-point tolerances
//!
//! Weights in profile histograms are sums of many small contributions and are
//! routinely re-derived (rebinned, crossed, decoded). Comparisons against zero
//! and against bin boundaries therefore go through a single fudge factor.

/// Absolute tolerance below which a weight or value is treated as zero.
pub const FP_FUDGE_EPS: f64 = 1.0e-10;

/// Tolerance for sanity checks on reconstructed weight totals.
pub const WEIGHT_CHECK_EPS: f64 = 1.0e-10;

/// Snap values below [`FP_FUDGE_EPS`] to exactly zero.
#[inline]
pub fn snap_to_zero(x: f64) -> f64 {
    if x < FP_FUDGE_EPS {
        0.0
    } else {
        x
    }
}

/// True when `x` is meaningfully above zero.
#[inline]
pub fn is_nonzero(x: f64) -> bool {
    x > FP_FUDGE_EPS
}
