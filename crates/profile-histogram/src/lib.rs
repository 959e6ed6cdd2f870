//! Weighted histograms for profile-guided analysis
//!
//! This crate represents approximate distributions gathered while profiling a
//! program (execution counts, path weights, timing samples) as weighted
//! histograms. Weight observed at value `0` is kept apart from the binned
//! weight, so a histogram answers both "how often was this zero" and "what did
//! it look like otherwise".
//!
//! # Key Features
//!
//! - **Two-step construction**: stage `(value, weight)` pairs, then commit
//! - **Merging onto a shared grid**: sources with different ranges and bin
//!   counts combine by weight-proportional rebinning
//! - **Queries**: range weight, quantiles, probabilities, folds over ranges
//! - **Reference shapes**: uniform and truncated-normal synthesis
//! - **Comparison**: earth mover's distance, overlap, product distributions
//! - **Persistence**: a compact sparse binary record
//!
//! # Examples
//!
//! ## Building and querying
//!
//! ```rust
//! use profile_histogram::Histogram;
//!
//! let mut h = Histogram::new();
//! h.add_to_list(2.0, 3.0);
//! h.add_to_list(6.0, 1.0);
//! h.build_from_list_fit(2, 4.0);
//!
//! assert_eq!(h.bins(), &[3.0, 1.0]);
//! assert_eq!(h.mean(false), 3.0);
//! assert!((h.quantile(0.5) - 10.0 / 3.0).abs() < 1e-12);
//! ```
//!
//! ## Merging and comparing
//!
//! ```rust
//! use profile_histogram::{FixedBinBuilder, HistogramBuilder, HistogramOps, MergeBuilder};
//!
//! let builder = FixedBinBuilder::new(8);
//! let run_a = builder.build_unweighted(&[1.0, 2.0, 2.0, 3.0, 0.0]).unwrap();
//! let run_b = builder.build_unweighted(&[2.0, 4.0, 5.0]).unwrap();
//!
//! let merged = MergeBuilder::new(8, 8.0).merge(&[&run_a, &run_b]).unwrap();
//! assert_eq!(merged.total_weight(), 8.0);
//! assert_eq!(merged.zero_weight(), 1.0);
//!
//! let emd = merged.earth_mover(&merged.as_uniform());
//! assert!(emd > 0.0);
//! ```
//!
//! ## Persisting
//!
//! ```rust
//! use profile_histogram::{Histogram, HistogramConfig, HistogramReader, HistogramWriter};
//! use std::io::Cursor;
//!
//! let mut h = Histogram::new();
//! h.add_to_list(1.0, 2.0);
//! h.add_to_list(9.0, 1.0);
//! h.build_from_list_fit(20, 3.0);
//!
//! let config = HistogramConfig::default();
//! let mut writer = HistogramWriter::new(Vec::new(), config.clone());
//! writer.write(42, &h).unwrap();
//!
//! let mut reader = HistogramReader::new(Cursor::new(writer.into_inner()), config);
//! let (id, back) = reader.read(3.0).unwrap();
//! assert_eq!(id, 42);
//! assert_eq!(back.bins(), h.bins());
//! ```

pub mod builders;
pub mod codec;
pub mod config;
pub mod display;
pub mod ops;
pub mod query;
pub mod stats;
pub mod synth;
pub mod traits;
pub mod types;

// Re-export main types
pub use builders::{FixedBinBuilder, MergeBuilder};
pub use codec::{HistogramHeader, HistogramReader, HistogramWriter, BIN_RECORD_LEN, HEADER_LEN};
pub use config::{HistogramConfig, DEFAULT_BIN_COUNT};
pub use display::HistogramSummary;
pub use ops::HistogramOps;
pub use stats::{Stats, ZeroMassVariance};
pub use traits::HistogramBuilder;
pub use types::{Histogram, WeightedValue};

use profile_core::Result;

/// Build a histogram with `bin_count` bins from unit-weight samples
pub fn build_histogram(values: &[f64], bin_count: usize) -> Result<Histogram> {
    FixedBinBuilder::new(bin_count).build_unweighted(values)
}

/// Merge histograms onto a shared grid of `bin_count` bins
///
/// Shortfall between the sources' weight and `total_weight` becomes
/// zero-valued mass.
pub fn merge_histograms(list: &[&Histogram], bin_count: usize, total_weight: f64) -> Result<Histogram> {
    MergeBuilder::new(bin_count, total_weight).merge(list)
}
