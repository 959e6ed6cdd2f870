//! Histogram construction and merging
//!
//! Histograms are built in two steps: producers stage `(value, weight)` pairs
//! in the add list, then [`Histogram::build_from_list`] commits them into
//! statistics and bins. Already-built histograms are combined with
//! [`Histogram::merged`], which re-bins every source onto one shared grid.

use crate::config::HistogramConfig;
use crate::stats::Stats;
use crate::traits::HistogramBuilder;
use crate::types::{Histogram, WeightedValue};
use profile_core::tolerance::{FP_FUDGE_EPS, WEIGHT_CHECK_EPS};
use profile_core::{Error, Result};
use tracing::{debug, error, trace, warn};

impl Histogram {
    /// Stage a weighted value for the next [`build_from_list`](Self::build_from_list)
    pub fn add_to_list(&mut self, value: f64, weight: f64) {
        self.add_list.push(WeightedValue::new(value, weight));
    }

    /// Stage a weighted value, dropping pairs with a non-positive value or weight
    pub fn add_weighted(&mut self, wv: WeightedValue) {
        if wv.value > 0.0 && wv.weight > 0.0 {
            trace!("(#{}) add: {}, {}", self.id, wv.value, wv.weight);
            self.add_list.push(wv);
        }
    }

    /// Stage many weighted values
    pub fn extend_list<I: IntoIterator<Item = WeightedValue>>(&mut self, values: I) {
        self.add_list.extend(values);
    }

    /// Values staged but not yet committed
    pub fn pending(&self) -> &[WeightedValue] {
        &self.add_list
    }

    /// Drop all staged values
    pub fn clear_list(&mut self) {
        self.add_list.clear();
    }

    /// Commit the add list into a finalized histogram
    ///
    /// `min` and `max` seed the range: the data may widen it but never shrink
    /// it. Staged weight below `total_weight` is recorded as zero-valued mass.
    pub fn build_from_list(&mut self, bin_count: usize, total_weight: f64, min: f64, max: f64) {
        self.clear();
        let staged = std::mem::take(&mut self.add_list);

        debug!(
            "(#{}) build_from_list: {} staged, {} bins, [{}, {}] tw={}",
            self.id,
            staged.len(),
            bin_count,
            min,
            max,
            total_weight
        );

        let mut min_val = min;
        let mut max_val = max;
        let mut weight = 0.0;
        let mut vals = Vec::with_capacity(staged.len());

        for wv in staged.into_iter().filter(WeightedValue::is_significant) {
            weight += wv.weight;
            min_val = min_val.min(wv.value);
            max_val = max_val.max(wv.value);
            vals.push(wv);
        }

        // nothing but zeros: all weight is zero-valued mass
        if vals.is_empty() {
            self.stats.total_weight = total_weight;
            return;
        }

        self.stats = Stats::from_values(&vals);

        if (self.stats.sum_of_weights - weight).abs() > FP_FUDGE_EPS {
            warn!(
                "(#{}) build_from_list: sum of weights {} != staged weight {}",
                self.id, self.stats.sum_of_weights, weight
            );
        }

        if weight < total_weight {
            trace!("(#{}) adding {} zeros", self.id, total_weight - weight);
            self.stats.total_weight += total_weight - weight;
        }

        if self.stats.total_weight <= 0.0
            || (self.stats.total_weight - total_weight).abs() > WEIGHT_CHECK_EPS
        {
            warn!(
                "(#{}) build_from_list: total weight {} vs expected {} ({})",
                self.id,
                self.stats.total_weight,
                total_weight,
                self.stats.total_weight - total_weight
            );
        }

        self.set_range(min_val, max_val);

        // points don't have bins; everything is handled by range + stats
        if self.is_point() {
            return;
        }

        let bins = if bin_count == 0 {
            error!(
                "(#{}) build_from_list: non-point histogram requested with 0 bins, using 1",
                self.id
            );
            1
        } else {
            bin_count
        };
        self.set_bin_count(bins);

        for wv in &vals {
            let b = self.which_bin(wv.value);
            self.bins[b] += wv.weight;
        }
    }

    /// Commit the add list with a range that fits the data exactly
    pub fn build_from_list_fit(&mut self, bin_count: usize, total_weight: f64) {
        self.build_from_list(bin_count, total_weight, f64::MAX, 0.0);
    }

    /// Combine already-built histograms onto one shared grid
    ///
    /// Statistics are merged exactly; bin weight is redistributed by asking
    /// every source for the weight inside each target bin, so sources with
    /// different ranges and bin counts combine correctly. Point sources land
    /// whole in the bin containing their value. Zero histograms add
    /// nothing but their weight is still recovered as zero-valued mass when
    /// `total_weight` exceeds what the sources carry. The input slice is never
    /// modified.
    pub fn merged(bin_count: usize, total_weight: f64, list: &[&Histogram]) -> Histogram {
        let mut rc = Histogram::new();

        match list {
            [] => return rc,
            [only] => return (*only).clone(),
            _ => {}
        }

        debug!("(#{}) merging {} histograms", rc.id, list.len());

        let sources: Vec<&Histogram> = list.iter().copied().filter(|h| h.non_zero()).collect();
        for h in &sources {
            if h.min == 0.0 {
                warn!(
                    "(#{}) non-zero histogram #{} in merge list has 0 lower bound (max = {}, w = {})",
                    rc.id,
                    h.id,
                    h.max,
                    h.non_zero_weight()
                );
            }
        }

        let mut min_val = f64::MAX;
        let mut max_val = 0.0;
        let mut range_update = false;

        for h in &sources {
            rc.stats.combine(&h.stats);

            if h.min < min_val {
                trace!("(#{})   new min: {}", rc.id, h.min);
                min_val = h.min;
                range_update = true;
            }
            if h.max > max_val {
                trace!("(#{})   new max: {}", rc.id, h.max);
                max_val = h.max;
                range_update = true;
            }
        }

        // account for zero histograms that were dropped
        if rc.stats.total_weight < total_weight {
            trace!(
                "(#{})   adding {} zeros",
                rc.id,
                total_weight - rc.stats.total_weight
            );
            rc.stats
                .combine(&Stats::zero_mass(total_weight - rc.stats.total_weight));
        }

        if !range_update {
            warn!("(#{}) merge list did not update range", rc.id);
            min_val = 0.0;
            max_val = 0.0;
        }

        rc.set_range(min_val, max_val);

        if rc.is_point() {
            return rc;
        }

        let bins = if bin_count == 0 {
            error!("(#{}) merge: 0 bins requested for a non-point result, using 1", rc.id);
            1
        } else {
            bin_count
        };
        rc.set_bin_count(bins);

        let (points, spread): (Vec<&Histogram>, Vec<&Histogram>) =
            sources.iter().copied().partition(|h| h.is_point());

        for i in 0..bins {
            let lower = rc.bin_lower(i);
            let upper = rc.bin_upper(i);
            let w: f64 = spread.iter().map(|h| h.get_range_weight(lower, upper)).sum();
            rc.bins[i] += w;
        }

        // a point on a shared bin edge would match both neighbours
        for h in points {
            let b = rc.which_bin(h.min);
            rc.bins[b] += h.non_zero_weight();
        }

        rc
    }
}

fn check_total_weight(total_weight: f64) -> Result<()> {
    if !total_weight.is_finite() || total_weight < 0.0 {
        return Err(Error::invalid_weight(total_weight, "total weight"));
    }
    Ok(())
}

/// Fixed-bin histogram builder
///
/// Builds a histogram with `bin_count` equal-width bins from weighted values.
/// Without an explicit total weight, the total is the sum of all supplied
/// weights, so zero-valued samples become zero-valued mass.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedBinBuilder {
    bin_count: usize,
    total_weight: Option<f64>,
    range: Option<(f64, f64)>,
}

impl FixedBinBuilder {
    /// Builder for `bin_count` bins with the range fitted to the data
    pub fn new(bin_count: usize) -> Self {
        Self {
            bin_count,
            total_weight: None,
            range: None,
        }
    }

    /// Builder using the configured bin count
    pub fn from_config(config: &HistogramConfig) -> Self {
        Self::new(config.bin_count)
    }

    /// Use an explicit total weight instead of the sum of the samples
    pub fn total_weight(mut self, total_weight: f64) -> Self {
        self.total_weight = Some(total_weight);
        self
    }

    /// Seed the range; the data may widen it
    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }
}

impl HistogramBuilder for FixedBinBuilder {
    fn build(&self, values: &[WeightedValue]) -> Result<Histogram> {
        if self.bin_count == 0 {
            return Err(Error::invalid_bin_count(self.bin_count));
        }

        let total_weight = match self.total_weight {
            Some(tw) => tw,
            None => values.iter().map(|wv| wv.weight.max(0.0)).sum(),
        };
        check_total_weight(total_weight)?;

        let (min, max) = self.range.unwrap_or((f64::MAX, 0.0));

        let mut h = Histogram::new();
        h.extend_list(values.iter().copied());
        h.build_from_list(self.bin_count, total_weight, min, max);
        Ok(h)
    }

    fn target_bins(&self) -> Option<usize> {
        Some(self.bin_count)
    }
}

/// Builder for the combining construction over several histograms
#[derive(Debug, Clone, PartialEq)]
pub struct MergeBuilder {
    bin_count: usize,
    total_weight: f64,
}

impl MergeBuilder {
    /// Merge onto `bin_count` bins, attributing `total_weight` to the result
    pub fn new(bin_count: usize, total_weight: f64) -> Self {
        Self {
            bin_count,
            total_weight,
        }
    }

    /// Merge builder using the configured bin count
    pub fn from_config(config: &HistogramConfig, total_weight: f64) -> Self {
        Self::new(config.bin_count, total_weight)
    }

    /// Merge `list` onto a shared grid; the list itself is left untouched
    pub fn merge(&self, list: &[&Histogram]) -> Result<Histogram> {
        if self.bin_count == 0 {
            return Err(Error::invalid_bin_count(self.bin_count));
        }
        check_total_weight(self.total_weight)?;
        Ok(Histogram::merged(self.bin_count, self.total_weight, list))
    }
}
