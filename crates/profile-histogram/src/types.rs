//! Core types for weighted histogram representation

use crate::stats::{Stats, ZeroMassVariance};
use num_traits::ToPrimitive;
use profile_core::tolerance::{is_nonzero, snap_to_zero, FP_FUDGE_EPS};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{error, warn};

static NEXT_ID: AtomicU32 = AtomicU32::new(0);

fn next_id() -> u32 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// A single observation: `weight` worth of samples at `value`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WeightedValue {
    pub value: f64,
    pub weight: f64,
}

impl WeightedValue {
    pub fn new(value: f64, weight: f64) -> Self {
        Self { value, weight }
    }

    /// True when both value and weight are meaningfully positive
    pub fn is_significant(&self) -> bool {
        self.value > FP_FUDGE_EPS && self.weight > FP_FUDGE_EPS
    }
}

impl From<(f64, f64)> for WeightedValue {
    fn from((value, weight): (f64, f64)) -> Self {
        Self { value, weight }
    }
}

/// A weighted histogram over a non-negative value range
///
/// The histogram keeps `bin_count` equal-width bins over `[min, max)`. A
/// histogram with no meaningful weight, or whose range collapsed to a single
/// value, is a *point*: it has no bins and all its nonzero weight sits at
/// `min`. Weight attributed to value `0` never lands in a bin; it is only
/// visible through [`Histogram::zero_weight`].
#[derive(Debug)]
pub struct Histogram {
    pub(crate) id: u32,
    pub(crate) stats: Stats,
    pub(crate) min: f64,
    pub(crate) max: f64,
    pub(crate) bin_count: usize,
    pub(crate) bins: Vec<f64>,
    pub(crate) add_list: Vec<WeightedValue>,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Clones carry stats, range and bins but get their own diagnostic id. Values
/// still pending in the add list are not copied.
impl Clone for Histogram {
    fn clone(&self) -> Self {
        Self {
            id: next_id(),
            stats: self.stats,
            min: self.min,
            max: self.max,
            bin_count: self.bin_count,
            bins: self.bins.clone(),
            add_list: Vec::new(),
        }
    }
}

impl PartialEq for Histogram {
    fn eq(&self, other: &Self) -> bool {
        self.stats == other.stats
            && self.min == other.min
            && self.max == other.max
            && self.bin_count == other.bin_count
            && self.bins == other.bins
    }
}

impl Histogram {
    /// Create an empty point histogram at 0
    pub fn new() -> Self {
        Self {
            id: next_id(),
            stats: Stats::new(),
            min: 0.0,
            max: 0.0,
            bin_count: 0,
            bins: Vec::new(),
            add_list: Vec::new(),
        }
    }

    /// Create a point histogram holding `weight` at `value`
    ///
    /// `total_weight` may exceed `weight`; the difference is zero-valued mass.
    pub fn point(value: f64, weight: f64, total_weight: f64) -> Self {
        let mut h = Self::new();
        h.add_to_list(value, weight);
        h.build_from_list(0, total_weight, value, value);
        h
    }

    /// Process-wide diagnostic id
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The sufficient statistics backing this histogram
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Reset to a point histogram at 0 with no weight and no bins
    ///
    /// Values pending in the add list are kept.
    pub fn clear(&mut self) {
        self.set_bin_count(0);
        self.stats.clear();
        self.min = 0.0;
        self.max = 0.0;
    }

    /// Set the value range
    ///
    /// Reversed bounds are swapped and negative bounds clamp to 0.
    pub fn set_range(&mut self, min: f64, max: f64) {
        let (mut min, mut max) = (min, max);
        if min > max {
            warn!(
                "(#{}) set_range: minimum > maximum, reversing ({} > {})",
                self.id, min, max
            );
            std::mem::swap(&mut min, &mut max);
        }

        // histogram range is strictly non-negative
        min = min.max(0.0);
        max = max.max(0.0);

        if min == 0.0 && max != 0.0 {
            warn!("(#{}) setting lower bound to 0 (max = {})", self.id, max);
        }

        self.min = min;
        self.max = max;
    }

    /// Reallocate a zeroed bin array of `n` bins
    pub fn set_bin_count(&mut self, n: usize) {
        self.bin_count = n;
        self.bins = vec![0.0; n];
    }

    /// True when the histogram carries meaningful nonzero-valued weight
    pub fn non_zero(&self) -> bool {
        is_nonzero(self.stats.sum_of_weights)
    }

    /// True for histograms without bins: no weight, or a zero-width range
    pub fn is_point(&self) -> bool {
        if !self.non_zero() {
            return true;
        }
        self.min == self.max
    }

    /// Lower bound of the value range (0 for zero histograms)
    pub fn min(&self) -> f64 {
        if !self.non_zero() {
            return 0.0;
        }
        self.min
    }

    /// Upper bound of the value range (0 for zero histograms)
    pub fn max(&self) -> f64 {
        if !self.non_zero() {
            return 0.0;
        }
        self.max
    }

    /// Number of bins (0 for points)
    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    /// Bin weights; empty for points
    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    /// Width of each bin; 0 for points
    pub fn bin_width(&self) -> f64 {
        if self.is_point() || self.bin_count == 0 {
            return 0.0;
        }
        (self.max - self.min) / self.bin_count as f64
    }

    /// Lower edge of bin `b`
    pub fn bin_lower(&self, b: usize) -> f64 {
        if !self.non_zero() {
            return 0.0;
        }
        self.min + self.bin_width() * b as f64
    }

    /// Upper edge of bin `b`
    pub fn bin_upper(&self, b: usize) -> f64 {
        if !self.non_zero() {
            return 0.0;
        }
        self.min + self.bin_width() * (b + 1) as f64
    }

    /// Midpoint of bin `b`
    pub fn bin_center(&self, b: usize) -> f64 {
        if !self.non_zero() {
            return 0.0;
        }
        self.min + self.bin_width() * (b as f64 + 0.5)
    }

    /// Weight in bin `b`, or 0 when there is no such bin
    ///
    /// Points report 0 even though they carry weight.
    pub fn bin_weight(&self, b: usize) -> f64 {
        self.bins.get(b).copied().unwrap_or(0.0)
    }

    /// Index of the bin containing `v`
    ///
    /// Out-of-range values clamp to the first or last bin; points always
    /// answer bin 0.
    pub fn which_bin(&self, v: f64) -> usize {
        if !self.non_zero() {
            error!("(#{}) which_bin: empty histograms don't have bins", self.id);
            return 0;
        }

        // point distributions only use bin 0
        if self.is_point() {
            if v != self.min {
                warn!(
                    "(#{}) value {} is not at point distribution {}",
                    self.id, v, self.min
                );
            }
            return 0;
        }

        if self.bin_count == 0 {
            warn!("(#{}) which_bin: histogram has a range but no bins", self.id);
            return 0;
        }

        let raw = ((v - self.min) / self.bin_width()).floor();
        if raw.is_nan() || raw < 0.0 {
            if v - self.min < -FP_FUDGE_EPS {
                warn!(
                    "(#{}) value {} below range [{}, {}]",
                    self.id, v, self.min, self.max
                );
            }
            return 0;
        }

        match raw.to_usize() {
            Some(b) if b < self.bin_count => b,
            _ => {
                if v - self.max > FP_FUDGE_EPS {
                    warn!(
                        "(#{}) value {} above range [{}, {}]",
                        self.id, v, self.min, self.max
                    );
                }
                self.bin_count - 1
            }
        }
    }

    /// Overwrite the weight in bin `b`
    pub fn set_bin_weight(&mut self, b: usize, w: f64) {
        if self.is_point() {
            warn!("(#{}) setting bin weight on point histogram (ignored)", self.id);
            return;
        }
        match self.bins.get_mut(b) {
            Some(bin) => *bin = w,
            None => warn!("(#{})[{}]: bin out of range", self.id, b),
        }
    }

    /// Add `w` to bin `b`, returning the bin's new weight
    pub fn add_to_bin(&mut self, b: usize, w: f64) -> f64 {
        if self.is_point() {
            warn!("(#{}) adding bin weight on point histogram (ignored)", self.id);
            return 0.0;
        }
        match self.bins.get_mut(b) {
            Some(bin) => {
                *bin += w;
                *bin
            }
            None => {
                warn!("(#{})[{}]: bin out of range", self.id, b);
                0.0
            }
        }
    }

    /// Number of bins holding weight
    pub fn bins_used(&self) -> usize {
        self.bins.iter().filter(|&&w| w > FP_FUDGE_EPS).count()
    }

    /// All observed weight, including zero-valued mass
    pub fn total_weight(&self) -> f64 {
        snap_to_zero(self.stats.total_weight)
    }

    /// Weight attributable to nonzero values
    pub fn non_zero_weight(&self) -> f64 {
        snap_to_zero(self.stats.sum_of_weights)
    }

    /// Weight attributable to value 0
    pub fn zero_weight(&self) -> f64 {
        if self.stats.total_weight < FP_FUDGE_EPS {
            return 0.0;
        }
        self.stats.total_weight - self.stats.sum_of_weights
    }

    /// Largest single-bin weight; the whole nonzero weight for a point
    pub fn max_weight(&self) -> f64 {
        if !self.non_zero() {
            return 0.0;
        }
        if self.is_point() {
            return self.non_zero_weight();
        }
        self.bins.iter().copied().fold(0.0, f64::max)
    }

    /// Weighted mean, optionally counting zero-valued mass
    pub fn mean(&self, include_zeros: bool) -> f64 {
        self.stats.mean(include_zeros)
    }

    /// Weighted standard deviation with the default zero-mass policy
    pub fn stdev(&self, include_zeros: bool) -> f64 {
        self.stats.stdev(include_zeros)
    }

    /// Weighted standard deviation under an explicit zero-mass policy
    pub fn stdev_with(&self, include_zeros: bool, policy: ZeroMassVariance) -> f64 {
        self.stats.stdev_with(include_zeros, policy)
    }

    /// Fraction of total weight that is nonzero-valued
    pub fn coverage(&self) -> f64 {
        if self.stats.total_weight == 0.0 {
            return 0.0;
        }
        snap_to_zero(self.stats.sum_of_weights / self.stats.total_weight)
    }

    /// Fraction of bins holding weight
    ///
    /// When there is less weight than bins, the ratio is taken against the
    /// weight instead since not every bin could possibly be filled.
    pub fn occupancy(&self) -> f64 {
        let tw = self.stats.total_weight;
        if tw == 0.0 {
            0.0
        } else if tw < self.bin_count as f64 {
            self.bins_used() as f64 / tw
        } else {
            self.bins_used() as f64 / self.bin_count as f64
        }
    }

    /// Share of nonzero weight in the heaviest bin
    pub fn max_likelihood(&self) -> f64 {
        if self.stats.sum_of_weights == 0.0 {
            return 0.0;
        }
        snap_to_zero(self.max_weight() / self.stats.sum_of_weights)
    }

    /// Relative width of the value range, `(max - min) / max`
    pub fn span(&self) -> f64 {
        if self.is_point() {
            return 0.0;
        }
        (self.max - self.min) / self.max
    }
}
