//! Range-weight, quantile and fold queries over finalized histograms
//!
//! All queries treat bin weight as uniformly spread across its bin, so a query
//! boundary that cuts a bin takes the proportional share of that bin.

use crate::types::Histogram;
use profile_core::tolerance::{snap_to_zero, FP_FUDGE_EPS};
use tracing::{debug, error, warn};

impl Histogram {
    /// Weight between `lb` and `ub`
    ///
    /// Partially covered bins contribute proportionally. Bounds within
    /// [`FP_FUDGE_EPS`] of a bin boundary snap to it, so walking adjoining
    /// ranges neither double-counts nor drops weight.
    pub fn get_range_weight(&self, lb: f64, ub: f64) -> f64 {
        if !self.non_zero() {
            error!("(#{}) get_range_weight: empty histograms don't have weight", self.id);
            return 0.0;
        }

        if lb > ub || (ub - lb) < FP_FUDGE_EPS {
            return 0.0;
        }

        if self.is_point() {
            return if lb <= self.min && ub >= self.max {
                self.non_zero_weight()
            } else {
                0.0
            };
        }

        if self.bins.is_empty() {
            return 0.0;
        }

        if ub <= self.min || lb >= self.max {
            return 0.0;
        }

        let mut lb = lb.max(self.min);
        let mut ub = ub.min(self.max);

        let bw = self.bin_width();
        let mut lb_bin = self.which_bin(lb);
        let mut ub_bin = self.which_bin(ub);
        let mut lb_is_boundary = false;
        let mut ub_is_boundary = false;

        // snap up to the top of the upper bin, else down to its bottom
        let boundary = self.bin_upper(ub_bin);
        if ub > boundary - FP_FUDGE_EPS {
            ub_is_boundary = true;
            ub = boundary;
        } else {
            let boundary = self.bin_lower(ub_bin);
            if ub < boundary + FP_FUDGE_EPS {
                if ub_bin == 0 {
                    return 0.0;
                }
                ub_bin -= 1;
                ub = boundary;
                ub_is_boundary = true;
            }
        }

        // snap down to the bottom of the lower bin, else up to its top
        let boundary = self.bin_lower(lb_bin);
        if lb < boundary + FP_FUDGE_EPS {
            lb_is_boundary = true;
            lb = boundary;
        } else {
            let boundary = self.bin_upper(lb_bin);
            if lb > boundary - FP_FUDGE_EPS {
                if lb_bin + 1 >= self.bin_count {
                    return 0.0;
                }
                lb_bin += 1;
                lb = boundary;
                lb_is_boundary = true;
            }
        }

        // both bounds snapped onto the same boundary from opposite sides
        if lb_bin > ub_bin {
            return 0.0;
        }

        // subtracting nearly equal values can go slightly negative; clamp every piece
        if lb_bin == ub_bin {
            if lb_is_boundary && ub_is_boundary {
                return self.bins[lb_bin];
            }
            return ((ub - lb) / bw * self.bins[lb_bin]).max(0.0);
        }

        let lower_part = if lb_is_boundary {
            self.bins[lb_bin]
        } else {
            (self.bin_upper(lb_bin) - lb) / bw * self.bins[lb_bin]
        };

        let upper_part = if ub_is_boundary {
            self.bins[ub_bin]
        } else {
            (ub - self.bin_lower(ub_bin)) / bw * self.bins[ub_bin]
        };

        let interior: f64 = self.bins[lb_bin + 1..ub_bin].iter().sum();

        lower_part.max(0.0) + upper_part.max(0.0) + interior
    }

    /// Advance a bin scan until the next bin would reach `target` weight
    ///
    /// Returns the bin holding the target and the weight of all bins before it.
    fn scan_to(&self, target: f64, start_bin: usize, start_weight: f64) -> (usize, f64) {
        let last = self.bin_count.saturating_sub(1);
        let mut i = start_bin;
        let mut w = start_weight;
        while i < last && w + self.bins[i] < target {
            w += self.bins[i];
            i += 1;
        }
        (i, w)
    }

    /// Interpolated value at which `target` weight is reached inside bin `b`
    fn interpolate(&self, b: usize, target: f64, before: f64) -> f64 {
        let in_bin = self.bins[b];
        let p = if in_bin > 0.0 {
            ((target - before) / in_bin).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.bin_lower(b) + self.bin_width() * p
    }

    /// Value `v` such that a fraction `q` of the nonzero weight lies below it
    pub fn quantile(&self, q: f64) -> f64 {
        if !self.non_zero() {
            return 0.0;
        }

        if self.is_point() {
            debug!(
                "(#{}) quantile({:.2}) of a point is its value {:.2}",
                self.id, q, self.min
            );
            return self.min;
        }

        if !(0.0..=1.0).contains(&q) {
            warn!("(#{}) quantile out of range [0,1]: {}", self.id, q);
        }

        if q <= 0.0 {
            return self.min;
        }
        if q >= 1.0 {
            return self.max;
        }

        let target = q * self.non_zero_weight();
        let (b, before) = self.scan_to(target, 0, 0.0);
        self.interpolate(b, target, before)
    }

    /// Values at quantiles `qmin` and `qmax`, computed in one bin scan
    ///
    /// Returns `None` for zero histograms or a reversed window; a point
    /// answers `(min, min)`.
    pub fn quantile_range(&self, qmin: f64, qmax: f64) -> Option<(f64, f64)> {
        if !self.non_zero() {
            error!("(#{}) quantile_range: empty histograms don't have quantiles", self.id);
            return None;
        }

        if self.is_point() {
            warn!("(#{}) quantile_range: points don't have quantiles", self.id);
            return Some((self.min, self.min));
        }

        if qmin > qmax {
            error!("(#{}) quantile_range: min > max: ({}, {})", self.id, qmin, qmax);
            return None;
        }

        if !(0.0..=1.0).contains(&qmin) || !(0.0..=1.0).contains(&qmax) {
            warn!(
                "(#{}) quantile_range: truncating invalid range ({}, {})",
                self.id, qmin, qmax
            );
        }

        let nzw = self.non_zero_weight();
        let mut bin = 0;
        let mut before = 0.0;

        let vmin = if qmin <= 0.0 {
            self.min
        } else if qmin >= 1.0 {
            self.max
        } else {
            let target = qmin * nzw;
            (bin, before) = self.scan_to(target, bin, before);
            self.interpolate(bin, target, before)
        };

        // resume where the lower scan stopped
        let vmax = if qmax >= 1.0 {
            self.max
        } else if qmax <= 0.0 {
            self.min
        } else {
            let target = qmax * nzw;
            let (b, w) = self.scan_to(target, bin, before);
            self.interpolate(b, target, w)
        };

        Some((vmin, vmax))
    }

    /// `P(X < v)` over nonzero-valued weight
    pub fn prob_less_than(&self, v: f64) -> f64 {
        if !self.non_zero() {
            return 0.0;
        }
        snap_to_zero(self.get_range_weight(0.0, v) / self.stats.sum_of_weights)
    }

    /// `P(l < X < u)` over nonzero-valued weight
    pub fn prob_between(&self, l: f64, u: f64) -> f64 {
        if !self.non_zero() {
            return 0.0;
        }
        snap_to_zero(self.get_range_weight(l, u) / self.stats.sum_of_weights)
    }

    /// Estimate `P(self < Y)` treating `y`'s bins as impulses at their centers
    pub fn est_prob_less_than(&self, y: &Histogram) -> f64 {
        if !(self.non_zero() && y.non_zero()) {
            error!(
                "(#{}) est_prob_less_than: can't compare empty histograms (#{})",
                self.id, y.id
            );
            return 0.0;
        }

        // trivial without overlap
        if self.max < y.min {
            return 1.0;
        }
        if self.min > y.max {
            return 0.0;
        }

        if y.is_point() {
            return self.prob_less_than(y.min);
        }

        let p: f64 = y
            .bins
            .iter()
            .enumerate()
            .map(|(i, &w)| self.prob_less_than(y.bin_center(i)) * (w / y.stats.sum_of_weights))
            .sum();

        if !(-FP_FUDGE_EPS..=1.0 + FP_FUDGE_EPS).contains(&p) {
            warn!("(#{}) est_prob_less_than: probability {} outside [0,1]", self.id, p);
        }
        p.clamp(0.0, 1.0)
    }

    /// Fold `f(value, weight_proportion)` across the value window `[min, max]`
    ///
    /// Partial first and last bins are evaluated at the midpoint of their
    /// covered part with the proportional share of the bin's weight; interior
    /// bins at their centers with their full weight. Proportions are relative
    /// to the nonzero weight. The results are summed.
    pub fn apply_on_range<F>(&self, min: f64, max: f64, mut f: F) -> f64
    where
        F: FnMut(f64, f64) -> f64,
    {
        debug!("(#{}) apply_on_range [{:.2}, {:.2}]", self.id, min, max);

        if !self.non_zero() || min >= max {
            return 0.0;
        }

        // a point is all-or-nothing, in range or not
        if self.is_point() {
            let proportion = if min <= self.min && max >= self.min { 1.0 } else { 0.0 };
            return f(self.min, proportion);
        }

        let min = min.max(self.min);
        let max = max.min(self.max);
        if min >= max {
            return 0.0;
        }

        let bmin = self.which_bin(min);
        let bmax = self.which_bin(max);
        let bw = self.bin_width();
        let nzw = self.non_zero_weight();

        // window inside one bin: midpoint of the window, proportional weight
        if bmin == bmax {
            let p = (max - min) / bw;
            return f((max + min) / 2.0, self.bin_weight(bmin) * p / nzw);
        }

        let upper = self.bin_upper(bmin);
        let p = (upper - min) / bw;
        let mut rc = f((upper + min) / 2.0, self.bin_weight(bmin) * p / nzw);

        for b in bmin + 1..bmax {
            rc += f(self.bin_center(b), self.bin_weight(b) / nzw);
        }

        let lower = self.bin_lower(bmax);
        let p = (max - lower) / bw;
        rc += f((lower + max) / 2.0, self.bin_weight(bmax) * p / nzw);

        rc
    }

    /// Fold `f(value, weight_proportion)` across the quantile window `[qmin, qmax]`
    ///
    /// A point is folded once with the window width as its proportion, so
    /// successive disjoint windows never count its weight twice.
    pub fn apply_on_quantile<F>(&self, qmin: f64, qmax: f64, mut f: F) -> f64
    where
        F: FnMut(f64, f64) -> f64,
    {
        debug!("(#{}) apply_on_quantile [{:.2}, {:.2}]", self.id, qmin, qmax);

        if !self.non_zero() || qmin >= qmax {
            return 0.0;
        }

        let qmin = qmin.max(0.0);
        let qmax = qmax.min(1.0);

        if self.is_point() {
            return f(self.min, (qmax - qmin).max(0.0));
        }

        match self.quantile_range(qmin, qmax) {
            Some((lo, hi)) => self.apply_on_range(lo, hi, f),
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn build(values: &[(f64, f64)], bins: usize, tw: f64) -> Histogram {
        let mut h = Histogram::new();
        for &(v, w) in values {
            h.add_to_list(v, w);
        }
        h.build_from_list_fit(bins, tw);
        h
    }

    fn scenario_a() -> Histogram {
        build(&[(2.0, 3.0), (6.0, 1.0)], 2, 4.0)
    }

    /// 10 bins of width 1 over [1, 11], bin i holding weight i + 1
    fn ramp() -> Histogram {
        let mut h = Histogram::new();
        for i in 0..10 {
            h.add_to_list(1.5 + i as f64, (i + 1) as f64);
        }
        h.build_from_list(10, 55.0, 1.0, 11.0);
        h
    }

    #[test]
    fn test_range_weight_whole_and_partial() {
        let h = scenario_a();
        assert_relative_eq!(h.get_range_weight(h.min(), h.max()), 4.0);
        assert_relative_eq!(h.get_range_weight(0.0, 100.0), 4.0);
        assert_relative_eq!(h.get_range_weight(2.0, 4.0), 3.0);
        assert_relative_eq!(h.get_range_weight(4.0, 6.0), 1.0);
        assert_relative_eq!(h.get_range_weight(3.0, 4.0), 1.5);
        assert_relative_eq!(h.get_range_weight(3.0, 5.0), 2.0);
        assert_relative_eq!(h.get_range_weight(2.5, 3.0), 0.75);
    }

    #[test]
    fn test_range_weight_empty_ranges() {
        let h = scenario_a();
        assert_eq!(h.get_range_weight(5.0, 3.0), 0.0);
        assert_eq!(h.get_range_weight(3.0, 3.0), 0.0);
        assert_eq!(h.get_range_weight(0.0, 2.0), 0.0);
        assert_eq!(h.get_range_weight(6.0, 9.0), 0.0);
        assert_eq!(Histogram::new().get_range_weight(0.0, 1.0), 0.0);
    }

    #[test]
    fn test_range_weight_snaps_to_boundaries() {
        let h = scenario_a();
        let eps = FP_FUDGE_EPS / 10.0;
        assert_eq!(h.get_range_weight(2.0, 4.0 + eps), 3.0);
        assert_eq!(h.get_range_weight(2.0, 4.0 - eps), 3.0);
        assert_eq!(h.get_range_weight(4.0 - eps, 6.0), 1.0);
        assert_eq!(h.get_range_weight(4.0 + eps, 6.0), 1.0);
    }

    #[test]
    fn test_range_weight_walk_conserves_weight() {
        let h = ramp();
        let step = 0.37;
        let mut lb = 0.0;
        let mut total = 0.0;
        while lb < 12.0 {
            total += h.get_range_weight(lb, lb + step);
            lb += step;
        }
        assert_abs_diff_eq!(total, 55.0, epsilon = 1e-9);
    }

    #[test]
    fn test_range_weight_point() {
        let p = Histogram::point(3.0, 2.0, 2.0);
        assert_eq!(p.get_range_weight(1.0, 4.0), 2.0);
        assert_eq!(p.get_range_weight(3.0, 4.0), 2.0);
        assert_eq!(p.get_range_weight(3.5, 4.0), 0.0);
    }

    #[test]
    fn test_quantile_interpolates() {
        let h = scenario_a();
        assert_relative_eq!(h.quantile(0.5), 2.0 + 2.0 * (2.0 / 3.0));
        assert_eq!(h.quantile(0.0), 2.0);
        assert_eq!(h.quantile(1.0), 6.0);
        assert_eq!(h.quantile(-0.5), 2.0);
        assert_eq!(h.quantile(1.5), 6.0);
        // 3.5 of 4: bin 0 holds 3, half of bin 1's weight needed
        assert_relative_eq!(h.quantile(0.875), 5.0);
    }

    #[test]
    fn test_quantile_degenerate() {
        assert_eq!(Histogram::new().quantile(0.5), 0.0);
        assert_eq!(Histogram::point(7.0, 1.0, 1.0).quantile(0.3), 7.0);
    }

    #[test]
    fn test_quantile_range_matches_single_quantiles() {
        let h = ramp();
        let (lo, hi) = h.quantile_range(0.25, 0.75).unwrap();
        assert_relative_eq!(lo, h.quantile(0.25), epsilon = 1e-12);
        assert_relative_eq!(hi, h.quantile(0.75), epsilon = 1e-12);

        let (lo, hi) = h.quantile_range(0.0, 1.0).unwrap();
        assert_eq!((lo, hi), (h.min(), h.max()));
    }

    #[test]
    fn test_quantile_range_sentinels() {
        let h = ramp();
        assert!(h.quantile_range(0.8, 0.2).is_none());
        assert!(Histogram::new().quantile_range(0.1, 0.2).is_none());
        assert_eq!(
            Histogram::point(4.0, 1.0, 1.0).quantile_range(0.1, 0.9),
            Some((4.0, 4.0))
        );
    }

    #[test]
    fn test_probabilities() {
        let h = scenario_a();
        assert_relative_eq!(h.prob_less_than(4.0), 0.75);
        assert_relative_eq!(h.prob_less_than(100.0), 1.0);
        assert_eq!(h.prob_less_than(1.0), 0.0);
        assert_relative_eq!(h.prob_between(3.0, 5.0), 0.5);
        assert_eq!(Histogram::new().prob_between(0.0, 1.0), 0.0);
    }

    #[test]
    fn test_est_prob_less_than() {
        let low = build(&[(1.0, 1.0), (2.0, 1.0)], 4, 2.0);
        let high = build(&[(5.0, 1.0), (6.0, 1.0)], 4, 2.0);
        assert_eq!(low.est_prob_less_than(&high), 1.0);
        assert_eq!(high.est_prob_less_than(&low), 0.0);

        let h = ramp();
        let p = h.est_prob_less_than(&h);
        assert!(p > 0.3 && p < 0.7, "self-comparison should be near 0.5, got {p}");

        let pt = Histogram::point(6.0, 1.0, 1.0);
        assert_relative_eq!(h.est_prob_less_than(&pt), h.prob_less_than(6.0));
        assert_eq!(h.est_prob_less_than(&Histogram::new()), 0.0);
    }

    #[test]
    fn test_apply_on_range_sums_proportions() {
        let h = ramp();
        let total = h.apply_on_range(0.0, 100.0, |_, w| w);
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);

        let half_bin = h.apply_on_range(1.0, 1.5, |_, w| w);
        assert_abs_diff_eq!(half_bin, 0.5 / 55.0, epsilon = 1e-12);

        let mean = h.apply_on_range(h.min(), h.max(), |v, w| v * w);
        assert_abs_diff_eq!(mean, h.mean(false), epsilon = 1e-9);

        assert_eq!(h.apply_on_range(5.0, 5.0, |_, w| w), 0.0);
        assert_eq!(h.apply_on_range(20.0, 30.0, |_, w| w), 0.0);
    }

    #[test]
    fn test_apply_on_range_point() {
        let p = Histogram::point(3.0, 2.0, 2.0);
        assert_eq!(p.apply_on_range(1.0, 5.0, |v, w| v * w), 3.0);
        assert_eq!(p.apply_on_range(4.0, 5.0, |v, w| v * w), 0.0);
    }

    #[test]
    fn test_apply_on_quantile() {
        let h = ramp();
        let lower = h.apply_on_quantile(0.0, 0.5, |_, w| w);
        let upper = h.apply_on_quantile(0.5, 1.0, |_, w| w);
        assert_abs_diff_eq!(lower, 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(upper, 0.5, epsilon = 1e-9);
        assert_eq!(h.apply_on_quantile(0.6, 0.4, |_, w| w), 0.0);
    }

    #[test]
    fn test_apply_on_quantile_point_weighs_by_window() {
        let p = Histogram::point(3.0, 2.0, 2.0);
        let first = p.apply_on_quantile(0.0, 0.25, |_, w| w);
        let rest = p.apply_on_quantile(0.25, 1.0, |_, w| w);
        assert_abs_diff_eq!(first, 0.25);
        assert_abs_diff_eq!(first + rest, 1.0);
    }
}
