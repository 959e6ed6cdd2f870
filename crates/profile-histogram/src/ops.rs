//! Operations on histograms

use crate::types::{Histogram, WeightedValue};
use profile_core::tolerance::{snap_to_zero as snap, FP_FUDGE_EPS};
use tracing::{debug, error};

/// Operations that compare or combine histograms
pub trait HistogramOps {
    /// Earth mover's distance to a histogram with the same bin layout
    ///
    /// The running surplus of weight carried across each bin boundary is
    /// summed and normalized by this histogram's nonzero weight. Distances are
    /// in bins; scale by the bin width for value units.
    fn earth_mover(&self, other: &Self) -> f64;

    /// Shared weight fraction between two histograms with identical layout
    ///
    /// With `include_zero` the zero-valued mass is part of the comparison and
    /// the base is the total weight; otherwise only nonzero weight is
    /// compared.
    fn overlap(&self, other: &Self, include_zero: bool) -> f64;

    /// Distribution of the product of two independent variables
    fn cross(&self, other: &Self) -> Histogram;

    /// Distribution of the product of this and every histogram in `others`
    ///
    /// Cost grows with the product of the operands' occupied bin counts.
    fn cross_all(&self, others: &[&Histogram]) -> Histogram;
}

impl HistogramOps for Histogram {
    fn earth_mover(&self, other: &Self) -> f64 {
        if self.is_point() {
            return 0.0;
        }

        if self.bin_count != other.bin_count {
            error!(
                "(#{}) earth_mover: different numbers of bins! {} vs {} (#{})",
                self.id, self.bin_count, other.bin_count, other.id
            );
            return 0.0;
        }

        let mut moved = 0.0;
        let mut dirt = self.bins[0] - other.bins[0];
        for (a, b) in self.bins.iter().zip(&other.bins).skip(1) {
            moved += dirt.abs();
            dirt += a - b;
        }

        moved / self.non_zero_weight()
    }

    fn overlap(&self, other: &Self, include_zero: bool) -> f64 {
        // two zero histograms always fully overlap
        if !self.non_zero() && !other.non_zero() {
            return 1.0;
        }

        if self.bin_count != other.bin_count {
            error!(
                "(#{}) overlap: different numbers of bins! {} vs {} (#{})",
                self.id, self.bin_count, other.bin_count, other.id
            );
            return 0.0;
        }

        // also catches exactly one side being zero
        if self.min() != other.min() || self.max() != other.max() {
            error!(
                "(#{}) overlap: range mismatch: [{}, {}] vs [{}, {}] (#{})",
                self.id,
                self.min(),
                self.max(),
                other.min(),
                other.max(),
                other.id
            );
            return 0.0;
        }

        if self.total_weight() != other.total_weight() {
            error!(
                "(#{}) overlap: total weight differs! {} vs {} (#{})",
                self.id,
                self.total_weight(),
                other.total_weight(),
                other.id
            );
            return 0.0;
        }

        if self.non_zero_weight() != other.non_zero_weight() {
            error!(
                "(#{}) overlap: weight differs! {} vs {} (#{})",
                self.id,
                self.non_zero_weight(),
                other.non_zero_weight(),
                other.id
            );
            return 0.0;
        }

        let (base, mut shared) = if include_zero {
            (
                self.total_weight(),
                snap(self.zero_weight().min(other.zero_weight())),
            )
        } else {
            (self.non_zero_weight(), 0.0)
        };

        if base == 0.0 {
            return 0.0;
        }

        // points only overlap when they sit on the same value
        if self.is_point() || other.is_point() {
            if self.is_point() && other.is_point() && self.min() == other.min() {
                shared += snap(self.non_zero_weight().min(other.non_zero_weight()));
            }
            return shared / base;
        }

        shared += self
            .bins
            .iter()
            .zip(&other.bins)
            .map(|(&a, &b)| snap(a.min(b)))
            .sum::<f64>();

        let rc = shared / base;
        if rc > 1.0 + FP_FUDGE_EPS {
            error!("(#{}) overlap: result {} exceeds 1 (#{})", self.id, rc, other.id);
        }
        rc.min(1.0)
    }

    fn cross(&self, other: &Self) -> Histogram {
        let tw = self.stats.total_weight * other.stats.total_weight;
        let mut rc = Histogram::new();

        // no data on either side means no data in the product
        if !(self.non_zero() && other.non_zero()) {
            return rc;
        }

        let mut bin_count = self.bin_count;

        match (self.is_point(), other.is_point()) {
            (true, true) => {
                rc.add_to_list(
                    self.min * other.min,
                    self.stats.sum_of_weights * other.stats.sum_of_weights,
                );
            }
            (true, false) => {
                // points have no bins; take the other side's layout
                bin_count = other.bin_count;
                for (i, &w) in other.bins.iter().enumerate() {
                    rc.add_to_list(self.min * other.bin_center(i), self.stats.sum_of_weights * w);
                }
            }
            (false, true) => {
                for (i, &w) in self.bins.iter().enumerate() {
                    rc.add_to_list(self.bin_center(i) * other.min, w * other.stats.sum_of_weights);
                }
            }
            (false, false) => {
                for (i, &w) in self.bins.iter().enumerate() {
                    let v = self.bin_center(i);
                    for (j, &ow) in other.bins.iter().enumerate() {
                        rc.add_to_list(v * other.bin_center(j), w * ow);
                    }
                }
            }
        }

        debug!(
            "(#{}) cross #{} x #{}: {} products",
            rc.id,
            self.id,
            other.id,
            rc.pending().len()
        );

        // products were taken at bin centers; seed the true range
        rc.build_from_list(bin_count, tw, self.min * other.min, self.max * other.max);
        rc
    }

    fn cross_all(&self, others: &[&Histogram]) -> Histogram {
        // any zero operand nullifies the product
        if !self.non_zero() || others.iter().any(|h| !h.non_zero()) {
            return Histogram::new();
        }

        let mut tw = self.stats.total_weight;
        let mut min = self.min;
        let mut max = self.max;
        let mut bin_count = self.bin_count;

        let mut acc: Vec<WeightedValue> = if self.is_point() {
            vec![WeightedValue::new(self.min, self.stats.sum_of_weights)]
        } else {
            nonzero_impulses(self).collect()
        };

        for h in others {
            tw *= h.stats.total_weight;
            min *= h.min;
            max *= h.max;

            let factors: Vec<WeightedValue> = if h.is_point() {
                vec![WeightedValue::new(h.min, h.stats.sum_of_weights)]
            } else {
                if bin_count == 0 {
                    bin_count = h.bin_count;
                }
                nonzero_impulses(h).collect()
            };

            let mut next = Vec::with_capacity(acc.len() * factors.len());
            for f in &factors {
                next.extend(
                    acc.iter()
                        .map(|a| WeightedValue::new(a.value * f.value, a.weight * f.weight)),
                );
            }
            acc = next;
        }

        let mut rc = Histogram::new();
        debug!(
            "(#{}) cross_all from #{} over {} operands: {} products",
            rc.id,
            self.id,
            others.len(),
            acc.len()
        );

        rc.extend_list(acc);
        rc.build_from_list(bin_count, tw, min, max);
        rc
    }
}

/// `(center, weight)` for every bin that holds weight
fn nonzero_impulses(h: &Histogram) -> impl Iterator<Item = WeightedValue> + '_ {
    h.bins
        .iter()
        .enumerate()
        .filter(|(_, &w)| w != 0.0)
        .map(move |(i, &w)| WeightedValue::new(h.bin_center(i), w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn build(values: &[(f64, f64)], bins: usize, tw: f64, min: f64, max: f64) -> Histogram {
        let mut h = Histogram::new();
        for &(v, w) in values {
            h.add_to_list(v, w);
        }
        h.build_from_list(bins, tw, min, max);
        h
    }

    #[test]
    fn test_earth_mover_identical_is_zero() {
        let h = build(&[(1.5, 2.0), (3.5, 1.0)], 4, 3.0, 1.0, 5.0);
        assert_eq!(h.earth_mover(&h.clone()), 0.0);
    }

    #[test]
    fn test_earth_mover_shift() {
        // all weight moves one bin to the right
        let a = build(&[(1.5, 2.0), (4.5, 0.0)], 4, 2.0, 1.0, 5.0);
        let b = build(&[(2.5, 2.0)], 4, 2.0, 1.0, 5.0);
        assert_relative_eq!(a.earth_mover(&b), 1.0);

        // two bins away costs twice as much
        let c = build(&[(3.5, 2.0)], 4, 2.0, 1.0, 5.0);
        assert_relative_eq!(a.earth_mover(&c), 2.0);
    }

    #[test]
    fn test_earth_mover_degenerate() {
        let p = Histogram::point(3.0, 1.0, 1.0);
        let h = build(&[(1.5, 2.0), (3.5, 1.0)], 4, 3.0, 1.0, 5.0);
        assert_eq!(p.earth_mover(&h), 0.0);

        let other = build(&[(1.5, 2.0), (3.5, 1.0)], 8, 3.0, 1.0, 5.0);
        assert_eq!(h.earth_mover(&other), 0.0);
    }

    #[test]
    fn test_overlap_identical() {
        let h = build(&[(1.5, 2.0), (3.5, 1.0), (0.0, 1.0)], 4, 4.0, 1.0, 5.0);
        let copy = h.clone();
        assert_relative_eq!(h.overlap(&copy, true), 1.0);
        assert_relative_eq!(h.overlap(&copy, false), 1.0);
    }

    #[test]
    fn test_overlap_partial() {
        let a = build(&[(1.5, 3.0), (3.5, 1.0)], 4, 4.0, 1.0, 5.0);
        let b = build(&[(1.5, 1.0), (3.5, 3.0)], 4, 4.0, 1.0, 5.0);
        assert_relative_eq!(a.overlap(&b, false), 0.5);
    }

    #[test]
    fn test_overlap_with_zero_mass() {
        let a = build(&[(1.5, 2.0), (4.5, 2.0)], 4, 8.0, 1.0, 5.0);
        let b = build(&[(2.5, 2.0), (4.5, 2.0)], 4, 8.0, 1.0, 5.0);
        // 4 zero weight shared plus 2 in bin 3, over 8
        assert_relative_eq!(a.overlap(&b, true), 0.75);
        assert_relative_eq!(a.overlap(&b, false), 0.5);
    }

    #[test]
    fn test_overlap_preconditions() {
        let a = build(&[(1.5, 2.0), (3.5, 1.0)], 4, 3.0, 1.0, 5.0);
        let more_bins = build(&[(1.5, 2.0), (3.5, 1.0)], 8, 3.0, 1.0, 5.0);
        let wider = build(&[(1.5, 2.0), (3.5, 1.0)], 4, 3.0, 1.0, 6.0);
        let heavier = build(&[(1.5, 2.0), (3.5, 1.0)], 4, 5.0, 1.0, 5.0);

        assert_eq!(a.overlap(&more_bins, true), 0.0);
        assert_eq!(a.overlap(&wider, true), 0.0);
        assert_eq!(a.overlap(&heavier, true), 0.0);
        assert_eq!(a.overlap(&Histogram::new(), false), 0.0);
        assert_eq!(Histogram::new().overlap(&Histogram::new(), true), 1.0);
    }

    #[test]
    fn test_overlap_points() {
        let p = Histogram::point(3.0, 2.0, 2.0);
        assert_relative_eq!(p.overlap(&p.clone(), false), 1.0);

        let zeros = Histogram::point(3.0, 2.0, 4.0);
        assert_relative_eq!(zeros.overlap(&zeros.clone(), true), 1.0);
    }

    #[test]
    fn test_cross_points() {
        let a = Histogram::point(3.0, 2.0, 2.0);
        let b = Histogram::point(4.0, 5.0, 5.0);
        let c = a.cross(&b);
        assert!(c.is_point());
        assert_eq!(c.min(), 12.0);
        assert_eq!(c.non_zero_weight(), 10.0);
        assert_eq!(c.total_weight(), 10.0);
    }

    #[test]
    fn test_cross_point_scales_histogram() {
        let p = Histogram::point(2.0, 1.0, 1.0);
        let h = build(&[(1.5, 2.0), (3.5, 1.0)], 4, 3.0, 1.0, 5.0);

        let c = p.cross(&h);
        assert_eq!(c.bin_count(), 4);
        assert_eq!(c.min(), 2.0);
        assert_eq!(c.max(), 10.0);
        assert_relative_eq!(c.non_zero_weight(), 3.0);
        assert_eq!(c.bins(), &[2.0, 0.0, 1.0, 0.0]);

        let c = h.cross(&p);
        assert_eq!(c.bins(), &[2.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_cross_full_product() {
        let a = build(&[(1.5, 1.0), (2.5, 1.0)], 2, 2.0, 1.0, 3.0);
        let b = build(&[(1.5, 1.0), (2.5, 3.0)], 2, 4.0, 1.0, 3.0);
        let c = a.cross(&b);

        assert_eq!(c.min(), 1.0);
        assert_eq!(c.max(), 9.0);
        assert_relative_eq!(c.total_weight(), 8.0);
        assert_relative_eq!(c.non_zero_weight(), 8.0);
        // E[XY] = E[X]E[Y] for centers
        assert_relative_eq!(c.mean(false), 2.0 * 2.25, epsilon = 1e-12);
    }

    #[test]
    fn test_cross_with_zero_is_zero() {
        let h = build(&[(1.5, 2.0), (3.5, 1.0)], 4, 3.0, 1.0, 5.0);
        let c = h.cross(&Histogram::new());
        assert!(!c.non_zero());
        assert_eq!(c.total_weight(), 0.0);
    }

    #[test]
    fn test_cross_all_matches_pairwise() {
        let a = build(&[(1.5, 1.0), (2.5, 1.0)], 2, 2.0, 1.0, 3.0);
        let b = build(&[(1.5, 1.0), (2.5, 3.0)], 2, 4.0, 1.0, 3.0);

        let pair = a.cross(&b);
        let all = a.cross_all(&[&b]);
        assert_eq!(all, pair);
    }

    #[test]
    fn test_cross_all_three_operands() {
        let a = build(&[(1.5, 1.0), (2.5, 1.0)], 2, 2.0, 1.0, 3.0);
        let p = Histogram::point(2.0, 1.0, 3.0);
        let b = build(&[(1.5, 1.0), (2.5, 1.0)], 2, 2.0, 1.0, 3.0);

        let c = a.cross_all(&[&p, &b]);
        assert_eq!(c.min(), 2.0);
        assert_eq!(c.max(), 18.0);
        assert_relative_eq!(c.total_weight(), 12.0);
        assert_relative_eq!(c.non_zero_weight(), 4.0);
        assert_abs_diff_eq!(c.mean(false), 2.0 * 2.0 * 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cross_all_point_first_takes_operand_bins() {
        let p = Histogram::point(2.0, 1.0, 1.0);
        let h = build(&[(1.5, 2.0), (3.5, 1.0)], 4, 3.0, 1.0, 5.0);
        let c = p.cross_all(&[&h]);
        assert_eq!(c.bin_count(), 4);
        assert_eq!(c, p.cross(&h));
    }

    #[test]
    fn test_cross_all_zero_operand_short_circuits() {
        let h = build(&[(1.5, 2.0), (3.5, 1.0)], 4, 3.0, 1.0, 5.0);
        let zero = Histogram::new();
        assert!(!h.cross_all(&[&h, &zero]).non_zero());
        assert!(!zero.cross_all(&[&h]).non_zero());
    }
}
