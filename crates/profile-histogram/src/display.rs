//! Human-readable dumps and one-line shape summaries

use crate::ops::HistogramOps;
use crate::types::Histogram;
use serde::Serialize;
use std::fmt;

impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Sums (Val / W:!0+0 / Sq): {:.3} / {:.3}:{:.3}+{:.3} / {:.3}",
            self.stats.sum_of_values,
            self.stats.total_weight,
            self.stats.sum_of_weights,
            self.zero_weight(),
            self.stats.sum_of_squares
        )?;
        writeln!(
            f,
            "Range [{:.5}, {:.5}] by {} ({}/{})",
            self.min,
            self.max,
            self.bin_width(),
            self.bins_used(),
            self.bin_count
        )?;

        if self.is_point() {
            if self.non_zero() {
                return writeln!(f, "point[{}] {}", self.min, self.non_zero_weight());
            }
            return writeln!(f, "zero");
        }

        // empty bins are left out
        for (b, &w) in self.bins.iter().enumerate().filter(|(_, &w)| w != 0.0) {
            writeln!(
                f,
                "b{} [{:.5}, {:.5}) {}",
                b,
                self.bin_lower(b),
                self.bin_upper(b),
                w
            )?;
        }
        Ok(())
    }
}

/// Shape descriptors of one histogram
///
/// Displays as one tab-separated line, `P` or `H` followed by the value
/// (points only), occupancy, coverage, max likelihood, span and the earth
/// mover's distances to the uniform and normal reference shapes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramSummary {
    /// `Some(value)` for points
    pub point: Option<f64>,
    pub occupancy: f64,
    pub coverage: f64,
    pub max_likelihood: f64,
    /// Relative range width; points report a fixed 1 here even though
    /// [`Histogram::span`] answers 0 for them
    pub span: f64,
    pub emd_uniform: f64,
    pub emd_normal: f64,
}

impl Histogram {
    /// Summarize the shape, comparing against synthesized uniform and normal
    pub fn summary(&self) -> HistogramSummary {
        if self.is_point() {
            return HistogramSummary {
                point: Some(self.min),
                occupancy: 0.0,
                coverage: self.coverage(),
                max_likelihood: 1.0,
                span: 1.0,
                emd_uniform: 0.0,
                emd_normal: 0.0,
            };
        }

        HistogramSummary {
            point: None,
            occupancy: self.occupancy(),
            coverage: self.coverage(),
            max_likelihood: self.max_likelihood(),
            span: self.span(),
            emd_uniform: self.earth_mover(&self.as_uniform()),
            emd_normal: self.earth_mover(&self.as_normal()),
        }
    }
}

impl fmt::Display for HistogramSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.point {
            Some(value) => write!(
                f,
                "P\t{}\t0.0\t{}\t1.0\t1\t0\t0",
                value, self.coverage
            ),
            None => write!(
                f,
                "H\t*\t{}\t{}\t{}\t{}\t{:.4}\t{:.4}",
                self.occupancy,
                self.coverage,
                self.max_likelihood,
                self.span,
                self.emd_uniform,
                self.emd_normal
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Histogram {
        let mut h = Histogram::new();
        for (v, w) in [(1.5, 2.0), (3.5, 1.0), (0.0, 1.0)] {
            h.add_to_list(v, w);
        }
        h.build_from_list(4, 4.0, 1.0, 5.0);
        h
    }

    #[test]
    fn test_display_histogram() {
        let text = sample().to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Sums (Val / W:!0+0 / Sq): 6.500 / 4.000:3.000+1.000 / 2.667");
        assert_eq!(lines[1], "Range [1.00000, 5.00000] by 1 (2/4)");
        assert_eq!(lines[2], "b0 [1.00000, 2.00000) 2");
        assert_eq!(lines[3], "b2 [3.00000, 4.00000) 1");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_display_point_and_zero() {
        let p = Histogram::point(3.0, 2.0, 2.0).to_string();
        assert!(p.ends_with("point[3] 2\n"));

        let z = Histogram::new().to_string();
        assert!(z.ends_with("zero\n"));
    }

    #[test]
    fn test_summary_point() {
        let p = Histogram::point(3.0, 2.0, 4.0);
        let s = p.summary();
        assert_eq!(s.point, Some(3.0));
        assert_eq!(s.span, 1.0);
        assert_eq!(p.span(), 0.0);
        assert_eq!(s.to_string(), "P\t3\t0.0\t0.5\t1.0\t1\t0\t0");
    }

    #[test]
    fn test_summary_histogram() {
        let h = sample();
        let s = h.summary();
        assert!(s.point.is_none());
        assert_eq!(s.occupancy, 0.5);
        assert_eq!(s.coverage, 0.75);
        assert!(s.emd_uniform > 0.0);

        let line = s.to_string();
        assert!(line.starts_with("H\t*\t0.5\t0.75\t"));
        assert_eq!(line.split('\t').count(), 8);
    }
}
