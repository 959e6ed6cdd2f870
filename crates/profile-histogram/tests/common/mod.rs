//! Shared utilities for integration tests

#![allow(dead_code)]

use profile_histogram::Histogram;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal};

pub const EPSILON: f64 = 1e-9;

/// Build a histogram fitted to the given `(value, weight)` pairs
pub fn build(values: &[(f64, f64)], bins: usize, total_weight: f64) -> Histogram {
    let mut h = Histogram::new();
    for &(v, w) in values {
        h.add_to_list(v, w);
    }
    h.build_from_list_fit(bins, total_weight);
    h
}

/// Timing-like samples: log-normal values with a share of zeros mixed in
pub fn profile_samples(seed: u64, n: usize, zero_share: f64) -> Vec<(f64, f64)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = LogNormal::new(2.0, 0.5).unwrap();
    (0..n)
        .map(|_| {
            if rng.gen::<f64>() < zero_share {
                (0.0, 1.0)
            } else {
                (dist.sample(&mut rng), rng.gen_range(1.0..4.0))
            }
        })
        .collect()
}

pub fn total(values: &[(f64, f64)]) -> f64 {
    values.iter().map(|&(_, w)| w).sum()
}
