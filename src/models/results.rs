use serde::{Deserialize, Serialize};

/// Least-squares fit of a response series against year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_value: f64,
    pub p_value: f64,
    pub std_err: f64,
    pub observations: usize,
}

/// Per-row trend outcome; `None` when no fit could be made.
pub type TrendResult = Option<TrendFit>;

/// Pearson correlation of the response against one covariate for one row.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub correlation: Option<f64>,
    pub p_value: Option<f64>,
    /// Pairs left after dropping missing and zero observations.
    pub retained: usize,
}

impl CorrelationResult {
    pub fn missing(retained: usize) -> Self {
        Self {
            correlation: None,
            p_value: None,
            retained,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.correlation.is_none()
    }

    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value.is_some_and(|p| p < alpha)
    }
}

/// Everything computed for a single spatial unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowAnalysis {
    pub trend: Option<TrendResult>,
    pub correlations: Vec<CorrelationResult>,
    pub response_present: usize,
}
