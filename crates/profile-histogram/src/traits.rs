//! Core traits for histogram building

use crate::types::{Histogram, WeightedValue};
use profile_core::Result;

/// Trait for building histograms from weighted samples
pub trait HistogramBuilder {
    /// Build a histogram from the given weighted values
    fn build(&self, values: &[WeightedValue]) -> Result<Histogram>;

    /// Build a histogram from unit-weight samples
    fn build_unweighted(&self, sample: &[f64]) -> Result<Histogram> {
        let values: Vec<WeightedValue> = sample
            .iter()
            .map(|&v| WeightedValue::new(v, 1.0))
            .collect();
        self.build(&values)
    }

    /// Get the target number of bins (if known)
    fn target_bins(&self) -> Option<usize> {
        None
    }
}
