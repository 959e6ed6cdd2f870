//! Running sufficient statistics over weighted samples
//!
//! A [`Stats`] summarises a weighted multiset of non-negative values by four
//! sums. Weight attached to value `0` is tracked separately from the weight of
//! positive values so that "how often was this zero" and "what was the
//! distribution when it was not zero" can both be answered from one record.

use crate::types::WeightedValue;
use profile_core::math::distributions::normal;
use profile_core::tolerance::WEIGHT_CHECK_EPS;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// How zero-valued mass enters the standard deviation when zeros are included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroMassVariance {
    /// Historical behaviour: the zero-mass deviation term is always zero, so
    /// including zeros only changes the divisor.
    #[default]
    Omitted,
    /// Zero-valued samples contribute `weight_of_zeros × mean²` to the sum of
    /// squared deviations.
    Folded,
}

/// Sufficient statistics over weighted, non-negative samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Weighted sum of squared deviations from the mean of nonzero values
    pub sum_of_squares: f64,
    /// Σ value × weight
    pub sum_of_values: f64,
    /// Weight of strictly positive samples
    pub sum_of_weights: f64,
    /// All weight, including weight attributed to value-0 samples
    pub total_weight: f64,
}

impl Stats {
    /// Empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics describing `weight` worth of zero-valued samples
    pub fn zero_mass(weight: f64) -> Self {
        Self {
            total_weight: weight,
            ..Self::default()
        }
    }

    /// Compute statistics from a collection of weighted values
    ///
    /// Zero-weight entries are skipped; zero-valued entries only count toward
    /// `total_weight`.
    pub fn from_values(values: &[WeightedValue]) -> Self {
        let mut stats = Self::default();
        if values.is_empty() {
            return stats;
        }

        for wv in values.iter().filter(|wv| wv.weight != 0.0) {
            stats.total_weight += wv.weight;
            if wv.value != 0.0 {
                stats.sum_of_weights += wv.weight;
                stats.sum_of_values += wv.value * wv.weight;
            }
        }

        if stats.sum_of_weights > 0.0 {
            let mean = stats.sum_of_values / stats.sum_of_weights;
            stats.sum_of_squares = values
                .iter()
                .filter(|wv| wv.weight != 0.0 && wv.value != 0.0)
                .map(|wv| {
                    let delta = wv.value - mean;
                    delta * delta * wv.weight
                })
                .sum();
        }

        if stats.sum_of_weights - stats.total_weight > WEIGHT_CHECK_EPS {
            warn!(
                "bad stats: weight {} exceeds total {} ({})",
                stats.sum_of_weights,
                stats.total_weight,
                stats.sum_of_weights - stats.total_weight
            );
        }
        stats
    }

    /// True when no weight at all has been recorded
    pub fn is_empty(&self) -> bool {
        self.total_weight == 0.0
    }

    /// Reset to empty
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Weight attributed to zero-valued samples
    pub fn zero_weight(&self) -> f64 {
        self.total_weight - self.sum_of_weights
    }

    /// Merge `other` into `self`
    ///
    /// Sums are added and the squared deviations are combined with the
    /// parallel-variance formula
    /// `SS = SSa + SSb + na·nb/(na+nb)·(Sa/na − Sb/nb)²`, where `n` counts only
    /// nonzero-valued weight. The operation is commutative and associative.
    pub fn combine(&mut self, other: &Stats) {
        if other.total_weight == 0.0 {
            return;
        }

        if self.total_weight == 0.0 {
            *self = *other;
            return;
        }

        let na = self.sum_of_weights;
        let nb = other.sum_of_weights;

        if na > 0.0 && nb > 0.0 {
            let delta = self.sum_of_values / na - other.sum_of_values / nb;
            self.sum_of_squares += other.sum_of_squares + na * nb / (na + nb) * delta * delta;
        } else {
            // one side carries only zero-valued mass
            self.sum_of_squares += other.sum_of_squares;
        }

        self.sum_of_values += other.sum_of_values;
        self.sum_of_weights += other.sum_of_weights;
        self.total_weight += other.total_weight;

        if self.sum_of_weights - self.total_weight > WEIGHT_CHECK_EPS {
            warn!(
                "combine: weight {} exceeds total {} (delta = {})",
                self.sum_of_weights,
                self.total_weight,
                self.sum_of_weights - self.total_weight
            );
        }
    }

    /// Weighted mean
    ///
    /// With `include_zeros` the zero-valued mass enlarges the divisor.
    pub fn mean(&self, include_zeros: bool) -> f64 {
        if self.sum_of_weights == 0.0 {
            return 0.0;
        }

        if include_zeros {
            self.sum_of_values / self.total_weight
        } else {
            self.sum_of_values / self.sum_of_weights
        }
    }

    /// Weighted standard deviation
    ///
    /// Zero-valued mass is treated per [`ZeroMassVariance::Omitted`].
    pub fn stdev(&self, include_zeros: bool) -> f64 {
        self.stdev_with(include_zeros, ZeroMassVariance::Omitted)
    }

    /// Weighted standard deviation with an explicit zero-mass policy
    pub fn stdev_with(&self, include_zeros: bool, policy: ZeroMassVariance) -> f64 {
        if self.sum_of_weights == 0.0 {
            return 0.0;
        }

        if !include_zeros {
            return (self.sum_of_squares / self.sum_of_weights).sqrt();
        }

        let zeros = match policy {
            ZeroMassVariance::Omitted => 0.0,
            ZeroMassVariance::Folded => self.zero_weight().max(0.0),
        };

        // 0 - mean == -mean
        let delta = self.sum_of_values / self.sum_of_weights;
        let ss0 = self.sum_of_squares + delta * delta * zeros;
        (ss0 / self.total_weight).sqrt()
    }

    /// Normal CDF at `x` using this record's own mean and standard deviation
    pub fn phi(&self, x: f64) -> f64 {
        if self.sum_of_weights == 0.0 {
            return 0.0;
        }
        normal::cdf_with(x, self.mean(false), self.stdev(false))
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "v={}, T={}, w={}, s={}",
            self.sum_of_values, self.total_weight, self.sum_of_weights, self.sum_of_squares
        )
    }
}
