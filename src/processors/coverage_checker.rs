use crate::models::RowAnalysis;
use crate::processors::parallel_processor::AnalysisOutcome;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CoverageReport {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub total_rows: usize,
    pub response_columns: usize,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    pub rows_without_response: usize,
    pub rows_with_partial_response: usize,
    pub trend: Option<TrendCoverage>,
    pub covariates: Vec<CovariateCoverage>,
    pub significance_level: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrendCoverage {
    pub column: String,
    pub rows_with_slope: usize,
    pub positive_slopes: usize,
    pub negative_slopes: usize,
    pub significant_slopes: usize,
    pub mean_slope: Option<f64>,
    pub min_slope: Option<f64>,
    pub max_slope: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CovariateCoverage {
    pub covariate: String,
    pub correlation_column: String,
    pub overlapping_years: usize,
    pub rows_with_correlation: usize,
    pub significant_rows: usize,
    pub positive_correlations: usize,
    pub negative_correlations: usize,
    pub mean_correlation: Option<f64>,
}

/// Summarises how much of the table produced usable statistics
pub struct CoverageChecker {
    significance_level: f64,
}

impl CoverageChecker {
    pub fn new(significance_level: f64) -> Self {
        Self { significance_level }
    }

    pub fn check(&self, outcome: &AnalysisOutcome) -> CoverageReport {
        let rows = &outcome.rows;
        let response_columns = outcome.plan.response.len();

        let rows_without_response = rows.iter().filter(|r| r.response_present == 0).count();
        let rows_with_partial_response = rows
            .iter()
            .filter(|r| r.response_present > 0 && r.response_present < response_columns)
            .count();

        let trend = outcome
            .columns
            .slope
            .as_ref()
            .map(|column| self.trend_coverage(column, rows));

        let covariates = outcome
            .plan
            .covariates
            .iter()
            .zip(&outcome.columns.correlations)
            .enumerate()
            .map(|(index, (plan, (corr_column, _)))| {
                let mut coverage = CovariateCoverage {
                    covariate: plan.prefix.clone(),
                    correlation_column: corr_column.clone(),
                    overlapping_years: plan.overlap(),
                    ..Default::default()
                };

                let mut sum = 0.0;
                for result in rows.iter().filter_map(|r| r.correlations.get(index)) {
                    if let Some(r) = result.correlation {
                        coverage.rows_with_correlation += 1;
                        sum += r;
                        if r > 0.0 {
                            coverage.positive_correlations += 1;
                        } else if r < 0.0 {
                            coverage.negative_correlations += 1;
                        }
                    }
                    if result.is_significant(self.significance_level) {
                        coverage.significant_rows += 1;
                    }
                }
                coverage.mean_correlation = (coverage.rows_with_correlation > 0)
                    .then(|| sum / coverage.rows_with_correlation as f64);
                coverage
            })
            .collect();

        CoverageReport {
            generated_at: chrono::Utc::now(),
            total_rows: rows.len(),
            response_columns,
            first_year: outcome.plan.years.first().copied(),
            last_year: outcome.plan.years.last().copied(),
            rows_without_response,
            rows_with_partial_response,
            trend,
            covariates,
            significance_level: self.significance_level,
        }
    }

    fn trend_coverage(&self, column: &str, rows: &[RowAnalysis]) -> TrendCoverage {
        let mut coverage = TrendCoverage {
            column: column.to_string(),
            ..Default::default()
        };

        let mut sum = 0.0;
        for fit in rows.iter().filter_map(|r| r.trend.flatten()) {
            coverage.rows_with_slope += 1;
            sum += fit.slope;

            if fit.slope > 0.0 {
                coverage.positive_slopes += 1;
            } else if fit.slope < 0.0 {
                coverage.negative_slopes += 1;
            }
            if fit.p_value < self.significance_level {
                coverage.significant_slopes += 1;
            }

            coverage.min_slope = Some(coverage.min_slope.map_or(fit.slope, |m| m.min(fit.slope)));
            coverage.max_slope = Some(coverage.max_slope.map_or(fit.slope, |m| m.max(fit.slope)));
        }

        coverage.mean_slope =
            (coverage.rows_with_slope > 0).then(|| sum / coverage.rows_with_slope as f64);
        coverage
    }

    /// Generate a summary report
    pub fn generate_summary(&self, report: &CoverageReport) -> String {
        let mut summary = String::new();
        let pct = |count: usize| {
            if report.total_rows == 0 {
                0.0
            } else {
                100.0 * count as f64 / report.total_rows as f64
            }
        };

        summary.push_str("=== Coverage Report ===\n");
        summary.push_str(&format!("Spatial units: {}\n", report.total_rows));
        match (report.first_year, report.last_year) {
            (Some(first), Some(last)) => summary.push_str(&format!(
                "Response columns: {} ({}-{})\n",
                report.response_columns, first, last
            )),
            _ => summary.push_str(&format!("Response columns: {}\n", report.response_columns)),
        }
        summary.push_str(&format!(
            "Units without response data: {} ({:.1}%)\n",
            report.rows_without_response,
            pct(report.rows_without_response)
        ));
        summary.push_str(&format!(
            "Units with gaps: {} ({:.1}%)\n",
            report.rows_with_partial_response,
            pct(report.rows_with_partial_response)
        ));

        if let Some(ref trend) = report.trend {
            summary.push_str(&format!("\nTrend ({}):\n", trend.column));
            summary.push_str(&format!(
                "  Units with slope: {} ({:.1}%)\n",
                trend.rows_with_slope,
                pct(trend.rows_with_slope)
            ));
            summary.push_str(&format!(
                "  Increasing: {}, decreasing: {}\n",
                trend.positive_slopes, trend.negative_slopes
            ));
            summary.push_str(&format!(
                "  Significant at p < {}: {}\n",
                report.significance_level, trend.significant_slopes
            ));
            if let (Some(mean), Some(min), Some(max)) =
                (trend.mean_slope, trend.min_slope, trend.max_slope)
            {
                summary.push_str(&format!(
                    "  Slope mean {:.4}, range [{:.4}, {:.4}]\n",
                    mean, min, max
                ));
            }
        }

        for covariate in &report.covariates {
            summary.push_str(&format!(
                "\nCorrelation with {} ({}):\n",
                covariate.covariate, covariate.correlation_column
            ));
            summary.push_str(&format!(
                "  Overlapping years: {}\n",
                covariate.overlapping_years
            ));
            summary.push_str(&format!(
                "  Units with correlation: {} ({:.1}%)\n",
                covariate.rows_with_correlation,
                pct(covariate.rows_with_correlation)
            ));
            summary.push_str(&format!(
                "  Positive: {}, negative: {}\n",
                covariate.positive_correlations, covariate.negative_correlations
            ));
            summary.push_str(&format!(
                "  Significant at p < {}: {}\n",
                report.significance_level, covariate.significant_rows
            ));
            if let Some(mean) = covariate.mean_correlation {
                summary.push_str(&format!("  Mean r: {:.3}\n", mean));
            }
        }

        summary
    }
}
