use crate::error::{ProcessingError, Result};
use crate::models::CorrelationResult;
use crate::utils::distribution::correlation_p_value;

/// Pearson correlation between the response and one covariate, over the
/// years where both are present and non-zero.
pub struct CorrelationAnalyzer {
    min_pairs: usize,
}

impl CorrelationAnalyzer {
    pub fn new() -> Self {
        Self { min_pairs: 2 }
    }

    /// Positions kept for correlation: both values present and non-zero
    pub fn retained_mask(response: &[Option<f64>], covariate: &[Option<f64>]) -> Vec<bool> {
        response
            .iter()
            .zip(covariate)
            .map(|(r, c)| matches!((r, c), (Some(r), Some(c)) if *r != 0.0 && *c != 0.0))
            .collect()
    }

    pub fn analyze(
        &self,
        response: &[Option<f64>],
        covariate: &[Option<f64>],
    ) -> Result<CorrelationResult> {
        if response.len() != covariate.len() {
            return Err(ProcessingError::DimensionMismatch {
                axis: response.len(),
                values: covariate.len(),
            });
        }

        let mask = Self::retained_mask(response, covariate);
        let (xs, ys): (Vec<f64>, Vec<f64>) = response
            .iter()
            .zip(covariate)
            .zip(&mask)
            .filter(|(_, keep)| **keep)
            .filter_map(|((r, c), _)| Some(((*r)?, (*c)?)))
            .unzip();

        let retained = xs.len();
        if retained < self.min_pairs {
            return Ok(CorrelationResult::missing(retained));
        }

        match pearson(&xs, &ys) {
            Some(r) => Ok(CorrelationResult {
                correlation: Some(r),
                p_value: Some(correlation_p_value(r, retained)),
                retained,
            }),
            None => Ok(CorrelationResult::missing(retained)),
        }
    }
}

impl Default for CorrelationAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Pearson's r, or `None` when either side has no variance
fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if is_constant(xs) || is_constant(ys) {
        return None;
    }

    let n = xs.len() as f64;
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = ys.iter().sum::<f64>() / n;

    let (mut ss_x, mut ss_y, mut ss_xy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - x_mean;
        let dy = y - y_mean;
        ss_x += dx * dx;
        ss_y += dy * dy;
        ss_xy += dx * dy;
    }

    let denominator = (ss_x * ss_y).sqrt();
    if denominator <= 0.0 || !denominator.is_finite() {
        return None;
    }

    Some((ss_xy / denominator).clamp(-1.0, 1.0))
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}
