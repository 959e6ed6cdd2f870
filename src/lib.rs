//! Weighted histograms for profile-guided analysis
//!
//! Facade over the workspace crates:
//!
//! - [`profile_core`]: error type, tolerances, normal-distribution helpers
//! - [`profile_histogram`]: the weighted histogram, its builders, queries and codec
//!
//! # Example
//!
//! ```rust
//! use profile_stats::prelude::*;
//!
//! let h = build_histogram(&[1.0, 2.0, 2.0, 3.0], 4).unwrap();
//! assert_eq!(h.total_weight(), 4.0);
//! assert_eq!(h.quantile(0.0), 1.0);
//! ```

pub use profile_core;
pub use profile_histogram;

pub use profile_core::{Error, Result};
pub use profile_histogram::{Histogram, HistogramOps, Stats, WeightedValue};

/// Prelude module for convenient imports
pub mod prelude {
    pub use profile_core::prelude::*;
    pub use profile_histogram::{
        build_histogram, merge_histograms, FixedBinBuilder, Histogram, HistogramBuilder,
        HistogramConfig, HistogramOps, HistogramReader, HistogramSummary, HistogramWriter,
        MergeBuilder, Stats, WeightedValue, ZeroMassVariance,
    };
}
