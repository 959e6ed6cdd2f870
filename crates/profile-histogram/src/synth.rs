//! Reference shapes synthesized from a histogram's own moments
//!
//! Both shapes keep the source's bin layout, range and total weight so they
//! can be compared bin-for-bin against the source.

use crate::types::Histogram;
use tracing::warn;

const SYNTH_WEIGHT_EPS: f64 = 1.0e-10;

impl Histogram {
    /// A histogram with the same layout and weight spread evenly over the bins
    pub fn as_uniform(&self) -> Histogram {
        // a point is already a zero-width uniform
        if self.is_point() {
            return self.clone();
        }

        let mut rc = Histogram::new();
        let nzw = self.non_zero_weight();
        let wpb = nzw / self.bin_count as f64;

        let mut deposited = 0.0;
        for i in 0..self.bin_count {
            rc.add_to_list(self.bin_center(i), wpb);
            deposited += wpb;
        }

        if (deposited - nzw).abs() > SYNTH_WEIGHT_EPS {
            warn!(
                "(#{}) as_uniform: wrong weight: {} vs {}",
                self.id, deposited, nzw
            );
        }

        rc.build_from_list(self.bin_count, self.total_weight(), self.min, self.max);
        rc
    }

    /// A histogram with the same layout holding a normal curve with this
    /// histogram's mean and standard deviation, truncated to its range
    ///
    /// The mass of the curve outside `[min, max]` is folded back in by scaling,
    /// so the nonzero weight is preserved.
    pub fn as_normal(&self) -> Histogram {
        // a point is already a zero-stdev normal
        if self.is_point() {
            return self.clone();
        }

        let nzw = self.non_zero_weight();
        let mut phi_lb = self.stats.phi(self.min);
        let truncated = phi_lb + (1.0 - self.stats.phi(self.max));

        // nothing of the curve left inside the range to scale up
        if 1.0 - truncated < SYNTH_WEIGHT_EPS {
            warn!(
                "(#{}) as_normal: curve truncated entirely ({}), using uniform",
                self.id, truncated
            );
            return self.as_uniform();
        }

        let adjusted = nzw / (1.0 - truncated);
        let mut rc = Histogram::new();
        let mut deposited = 0.0;

        // carry the upper CDF into the next bin's lower
        for i in 0..self.bin_count {
            let phi_ub = self.stats.phi(self.bin_upper(i));
            let weight = (phi_ub - phi_lb) * adjusted;
            deposited += weight;
            rc.add_to_list(self.bin_center(i), weight);
            phi_lb = phi_ub;
        }

        if (deposited - nzw).abs() > SYNTH_WEIGHT_EPS {
            warn!(
                "(#{}) as_normal: wrong weight: {} vs {}",
                self.id, deposited, nzw
            );
        }

        rc.build_from_list(self.bin_count, self.total_weight(), self.min, self.max);
        rc
    }
}
