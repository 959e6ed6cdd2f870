//! Core types shared by the profile histogram crates
//!
//! This crate holds the pieces every other crate in the workspace leans on:
//!
//! - [`Error`] / [`Result`]: the unified error type
//! - [`tolerance`]: floating-point tolerances used when comparing weights
//! - [`math`]: normal-distribution helpers used for parametric reference shapes
//!
//! # Example
//!
//! ```rust
//! use profile_core::{math::distributions::normal, tolerance::FP_FUDGE_EPS};
//!
//! let p = normal::cdf_with(12.0, 10.0, 2.0);
//! assert!((p - 0.8413).abs() < 1e-3);
//! assert!(FP_FUDGE_EPS > 0.0);
//! ```

pub mod error;
pub mod math;
pub mod tolerance;

// Re-export core types
pub use error::{Error, Result};
pub use tolerance::{snap_to_zero, FP_FUDGE_EPS};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::math::distributions::normal;
    pub use crate::tolerance::{snap_to_zero, FP_FUDGE_EPS};
}
