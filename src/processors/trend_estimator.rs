use crate::config::MissingValuePolicy;
use crate::error::{ProcessingError, Result};
use crate::models::{TrendFit, TrendResult};
use crate::utils::distribution::student_t_two_sided_p;

/// Ordinary least-squares trend of a response series against year.
pub struct TrendEstimator {
    policy: MissingValuePolicy,
}

impl TrendEstimator {
    pub fn new() -> Self {
        Self {
            policy: MissingValuePolicy::default(),
        }
    }

    pub fn with_policy(policy: MissingValuePolicy) -> Self {
        Self { policy }
    }

    /// Fit `values` against `years`.
    ///
    /// An all-missing series yields `None` without fitting. Partially missing
    /// series follow the configured [`MissingValuePolicy`]. A length mismatch
    /// between the axis and the values is an error.
    pub fn estimate(&self, years: &[i32], values: &[Option<f64>]) -> Result<TrendResult> {
        if years.len() != values.len() {
            return Err(ProcessingError::DimensionMismatch {
                axis: years.len(),
                values: values.len(),
            });
        }

        if values.iter().all(|v| v.is_none()) {
            return Ok(None);
        }

        if self.policy == MissingValuePolicy::Propagate && values.iter().any(|v| v.is_none()) {
            return Ok(None);
        }

        let points: Vec<(f64, f64)> = years
            .iter()
            .zip(values)
            .filter_map(|(year, value)| value.map(|v| (f64::from(*year), v)))
            .collect();

        Ok(fit_line(&points))
    }

    /// Slope only, as written to the `<response>_slope` column
    pub fn slope(&self, years: &[i32], values: &[Option<f64>]) -> Result<Option<f64>> {
        Ok(self.estimate(years, values)?.map(|fit| fit.slope))
    }
}

impl Default for TrendEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Least-squares line through (x, y) points with slope significance.
fn fit_line(points: &[(f64, f64)]) -> Option<TrendFit> {
    let n = points.len();
    if n < 2 {
        return None;
    }

    let nf = n as f64;
    let x_mean = points.iter().map(|(x, _)| x).sum::<f64>() / nf;
    let y_mean = points.iter().map(|(_, y)| y).sum::<f64>() / nf;

    let (mut ss_x, mut ss_y, mut ss_xy) = (0.0, 0.0, 0.0);
    for (x, y) in points {
        let dx = x - x_mean;
        let dy = y - y_mean;
        ss_x += dx * dx;
        ss_y += dy * dy;
        ss_xy += dx * dy;
    }

    // Years are distinct, so this only trips on a malformed axis
    if ss_x <= 0.0 {
        return None;
    }

    let slope = ss_xy / ss_x;
    let intercept = y_mean - slope * x_mean;

    let r_value = if ss_y > 0.0 {
        (ss_xy / (ss_x * ss_y).sqrt()).clamp(-1.0, 1.0)
    } else {
        0.0
    };

    let (p_value, std_err) = if n == 2 {
        let p = if points[0].1 == points[1].1 { 1.0 } else { 0.0 };
        (p, 0.0)
    } else {
        let dof = nf - 2.0;
        let one_minus_r2 = (1.0 - r_value) * (1.0 + r_value);
        let std_err = (one_minus_r2 * ss_y / ss_x / dof).max(0.0).sqrt();
        let p = if one_minus_r2 <= 0.0 {
            0.0
        } else {
            let t = r_value * (dof / one_minus_r2).sqrt();
            student_t_two_sided_p(t, dof)
        };
        (p, std_err)
    };

    Some(TrendFit {
        slope,
        intercept,
        r_value,
        p_value,
        std_err,
        observations: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn present(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_linear_series_slope_is_exact() {
        let estimator = TrendEstimator::new();
        let years = [2000, 2001, 2002, 2003, 2004];
        let values = present(&[10.0, 12.0, 14.0, 16.0, 18.0]);

        let fit = estimator.estimate(&years, &values).unwrap().unwrap();

        assert_eq!(fit.slope, 2.0);
        assert_eq!(fit.r_value, 1.0);
        assert_eq!(fit.p_value, 0.0);
        assert_eq!(fit.std_err, 0.0);
        assert!((fit.intercept - (14.0 - 2.0 * 2002.0)).abs() < 1e-9);
    }

    #[test]
    fn test_noisy_series_matches_least_squares() {
        let estimator = TrendEstimator::new();
        let years = [2000, 2001, 2002, 2003, 2004];
        let values = present(&[3.0, 5.0, 4.0, 8.0, 9.0]);

        let fit = estimator.estimate(&years, &values).unwrap().unwrap();

        assert!((fit.slope - 1.5).abs() < 1e-12);
        assert!((fit.intercept - (5.8 - 1.5 * 2002.0)).abs() < 1e-8);
        assert!((fit.r_value - 0.916_270_832_672_289_1).abs() < 1e-12);
        assert!((fit.p_value - 0.028_715_608_406_809).abs() < 1e-8);
        assert!((fit.std_err - 0.378_593_889_720_018_3).abs() < 1e-10);
        assert_eq!(fit.observations, 5);
    }

    #[test]
    fn test_all_missing_is_missing() {
        for policy in [MissingValuePolicy::PairwiseDrop, MissingValuePolicy::Propagate] {
            let estimator = TrendEstimator::with_policy(policy);
            let result = estimator.estimate(&[2000, 2001, 2002], &[None, None, None]);
            assert_eq!(result.unwrap(), None);
        }
    }

    #[test]
    fn test_single_present_value_is_missing_under_both_policies() {
        let years = [2000, 2001, 2002];
        let values = [None, Some(4.0), None];

        for policy in [MissingValuePolicy::PairwiseDrop, MissingValuePolicy::Propagate] {
            let estimator = TrendEstimator::with_policy(policy);
            assert_eq!(estimator.slope(&years, &values).unwrap(), None);
        }
    }

    #[test]
    fn test_partial_missing_pairwise_drop_fits_remaining_years() {
        let estimator = TrendEstimator::with_policy(MissingValuePolicy::PairwiseDrop);
        let years = [2000, 2001, 2002, 2003];
        let values = [Some(1.0), None, Some(5.0), Some(7.0)];

        let fit = estimator.estimate(&years, &values).unwrap().unwrap();

        assert!((fit.slope - 2.0).abs() < 1e-9);
        assert_eq!(fit.observations, 3);
    }

    #[test]
    fn test_partial_missing_propagate_is_missing() {
        let estimator = TrendEstimator::with_policy(MissingValuePolicy::Propagate);
        let years = [2000, 2001, 2002, 2003];
        let values = [Some(1.0), None, Some(5.0), Some(7.0)];

        assert_eq!(estimator.estimate(&years, &values).unwrap(), None);
    }

    #[test]
    fn test_two_points() {
        let estimator = TrendEstimator::new();

        let fit = estimator
            .estimate(&[2000, 2002], &present(&[1.0, 5.0]))
            .unwrap()
            .unwrap();
        assert_eq!(fit.slope, 2.0);
        assert_eq!(fit.p_value, 0.0);

        let flat = estimator
            .estimate(&[2000, 2002], &present(&[3.0, 3.0]))
            .unwrap()
            .unwrap();
        assert_eq!(flat.slope, 0.0);
        assert_eq!(flat.p_value, 1.0);
    }

    #[test]
    fn test_constant_series_has_zero_slope() {
        let estimator = TrendEstimator::new();
        let fit = estimator
            .estimate(&[2000, 2001, 2002, 2003], &present(&[4.0, 4.0, 4.0, 4.0]))
            .unwrap()
            .unwrap();

        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.r_value, 0.0);
        assert!((fit.p_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_dimension_mismatch() {
        let estimator = TrendEstimator::new();
        let err = estimator
            .estimate(&[2000, 2001, 2002], &present(&[1.0, 2.0]))
            .unwrap_err();

        assert!(matches!(
            err,
            ProcessingError::DimensionMismatch { axis: 3, values: 2 }
        ));
    }

    #[test]
    fn test_repeated_estimates_are_bit_identical() {
        let estimator = TrendEstimator::new();
        let years = [2000, 2001, 2002, 2003, 2004, 2005];
        let values = present(&[0.3, 1.7, 0.2, 2.9, 0.0, 4.1]);

        let first = estimator.slope(&years, &values).unwrap().unwrap();
        let second = estimator.slope(&years, &values).unwrap().unwrap();

        assert_eq!(first.to_bits(), second.to_bits());
    }
}
