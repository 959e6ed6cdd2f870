//! Mathematical utilities for profile distributions
//!
//! Parametric reference shapes (truncated normals) are built from the normal
//! CDF. The approximation here is the Abramowitz and Stegun rational formula
//! 7.1.26, which is accurate to about 1.5e-7 and cheap enough to call once per
//! bin.

/// Distribution-related mathematical functions
pub mod distributions {
    /// Normal distribution utilities
    pub mod normal {
        use std::f64::consts::SQRT_2;

        const A1: f64 = 0.254829592;
        const A2: f64 = -0.284496736;
        const A3: f64 = 1.421413741;
        const A4: f64 = -1.453152027;
        const A5: f64 = 1.061405429;
        const P: f64 = 0.3275911;

        /// Cumulative distribution function of the standard normal distribution
        pub fn cdf(z: f64) -> f64 {
            let sign = if z < 0.0 { -1.0 } else { 1.0 };
            0.5 * (1.0 + sign * erf(z.abs() / SQRT_2))
        }

        /// Cumulative distribution function of `N(mean, stdev²)` evaluated at `x`
        ///
        /// A zero standard deviation degenerates to a step at the mean.
        pub fn cdf_with(x: f64, mean: f64, stdev: f64) -> f64 {
            if stdev <= 0.0 || !stdev.is_finite() {
                return if x < mean {
                    0.0
                } else if x > mean {
                    1.0
                } else {
                    0.5
                };
            }
            cdf((x - mean) / stdev)
        }

        /// Error function approximation for non-negative arguments
        ///
        /// A&S formula 7.1.26.
        pub fn erf(x: f64) -> f64 {
            let t = 1.0 / (1.0 + P * x);
            1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp()
        }

    }
}
