use crate::config::{AnalysisConfig, MissingValuePolicy};
use crate::error::{ProcessingError, Result};
use crate::models::{AttributeTable, RowAnalysis, YearSeries};
use crate::processors::{ColumnResolver, CorrelationAnalyzer, ResolvedColumns, TrendEstimator};
use crate::utils::constants::{
    ANALYSIS_OUTPUT_SUFFIX, CORRELATION_OUTPUT_SUFFIX, CORR_SUFFIX, INTERCEPT_SUFFIX, PVAL_SUFFIX,
    SLOPE_PVAL_SUFFIX, SLOPE_R_SUFFIX, SLOPE_STDERR_SUFFIX, SLOPE_SUFFIX, TREND_OUTPUT_SUFFIX,
};
use crate::utils::progress::ProgressReporter;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Which statistics a run computes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    Trend,
    Correlation,
    Full,
}

impl AnalysisKind {
    pub fn includes_trend(&self) -> bool {
        matches!(self, AnalysisKind::Trend | AnalysisKind::Full)
    }

    pub fn includes_correlation(&self) -> bool {
        matches!(self, AnalysisKind::Correlation | AnalysisKind::Full)
    }

    /// Suffix appended to the input file stem for the default output path
    pub fn output_suffix(&self) -> &'static str {
        match self {
            AnalysisKind::Trend => TREND_OUTPUT_SUFFIX,
            AnalysisKind::Correlation => CORRELATION_OUTPUT_SUFFIX,
            AnalysisKind::Full => ANALYSIS_OUTPUT_SUFFIX,
        }
    }
}

/// A covariate's columns lined up with the response year axis
#[derive(Debug, Clone, PartialEq)]
pub struct CovariatePlan {
    pub prefix: String,
    pub resolved: ResolvedColumns,
    pub aligned: Vec<Option<String>>,
}

impl CovariatePlan {
    pub fn overlap(&self) -> usize {
        self.aligned.iter().filter(|c| c.is_some()).count()
    }
}

/// Column resolution for a run, fixed before any row is read
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisPlan {
    pub years: Vec<i32>,
    pub response: ResolvedColumns,
    pub covariates: Vec<CovariatePlan>,
}

/// Names of the columns a run appends to the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputColumns {
    pub slope: Option<String>,
    pub diagnostics: Option<TrendDiagnosticColumns>,
    pub correlations: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendDiagnosticColumns {
    pub intercept: String,
    pub p_value: String,
    pub r_value: String,
    pub std_err: String,
}

impl OutputColumns {
    pub fn all(&self) -> Vec<&str> {
        let mut names = Vec::new();
        if let Some(ref slope) = self.slope {
            names.push(slope.as_str());
        }
        if let Some(ref d) = self.diagnostics {
            names.extend([
                d.intercept.as_str(),
                d.p_value.as_str(),
                d.r_value.as_str(),
                d.std_err.as_str(),
            ]);
        }
        for (corr, pval) in &self.correlations {
            names.push(corr.as_str());
            names.push(pval.as_str());
        }
        names
    }
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub plan: AnalysisPlan,
    pub columns: OutputColumns,
    pub rows: Vec<RowAnalysis>,
}

pub struct ParallelProcessor {
    max_workers: usize,
    kind: AnalysisKind,
    policy: MissingValuePolicy,
    trend_diagnostics: bool,
}

impl ParallelProcessor {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            kind: AnalysisKind::Full,
            policy: MissingValuePolicy::default(),
            trend_diagnostics: false,
        }
    }

    pub fn with_analysis(mut self, kind: AnalysisKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_missing_policy(mut self, policy: MissingValuePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_trend_diagnostics(mut self, enabled: bool) -> Self {
        self.trend_diagnostics = enabled;
        self
    }

    /// Resolve every column group the run needs; empty groups abort the run
    pub fn plan<T: AttributeTable + ?Sized>(
        &self,
        table: &T,
        config: &AnalysisConfig,
    ) -> Result<AnalysisPlan> {
        let resolver = ColumnResolver::with_separator(&config.column_separator);

        let response =
            resolver.resolve_required(table, &config.response_prefix, config.year_range)?;
        let years = response.years();
        info!(
            variable = %response.variable,
            columns = response.len(),
            first_year = years.first().copied(),
            last_year = years.last().copied(),
            "Resolved response columns"
        );

        let mut covariates = Vec::new();
        if self.kind.includes_correlation() {
            for prefix in config.covariate_prefixes.as_slice() {
                let resolved = resolver.resolve_required(table, prefix, config.year_range)?;
                let aligned = resolved.align_to(&years);
                let plan = CovariatePlan {
                    prefix: prefix.to_string(),
                    resolved,
                    aligned,
                };

                if plan.overlap() == 0 {
                    warn!(
                        covariate = prefix,
                        "Covariate shares no years with the response; its correlations will be missing"
                    );
                } else {
                    info!(
                        covariate = prefix,
                        columns = plan.resolved.len(),
                        overlap = plan.overlap(),
                        "Resolved covariate columns"
                    );
                }
                covariates.push(plan);
            }
        }

        Ok(AnalysisPlan {
            years,
            response,
            covariates,
        })
    }

    pub fn output_columns(&self, plan: &AnalysisPlan, response_prefix: &str) -> OutputColumns {
        let name = |suffix: &str| format!("{}_{}", response_prefix, suffix);

        let slope = self.kind.includes_trend().then(|| name(SLOPE_SUFFIX));
        let diagnostics = (self.kind.includes_trend() && self.trend_diagnostics).then(|| {
            TrendDiagnosticColumns {
                intercept: name(INTERCEPT_SUFFIX),
                p_value: name(SLOPE_PVAL_SUFFIX),
                r_value: name(SLOPE_R_SUFFIX),
                std_err: name(SLOPE_STDERR_SUFFIX),
            }
        });
        let correlations = plan
            .covariates
            .iter()
            .map(|c| {
                (
                    format!("{}_{}_{}", response_prefix, c.prefix, CORR_SUFFIX),
                    format!("{}_{}_{}", response_prefix, c.prefix, PVAL_SUFFIX),
                )
            })
            .collect();

        OutputColumns {
            slope,
            diagnostics,
            correlations,
        }
    }

    /// Compute one row. Reads only that row's cells and the shared plan.
    pub fn analyze_row<T: AttributeTable + ?Sized>(
        &self,
        table: &T,
        plan: &AnalysisPlan,
        row: usize,
    ) -> Result<RowAnalysis> {
        let response = YearSeries::new(
            plan.response
                .column_names()
                .into_iter()
                .map(|column| table.row_value(row, column))
                .collect(),
        );

        let trend = if self.kind.includes_trend() {
            let estimator = TrendEstimator::with_policy(self.policy);
            Some(estimator.estimate(&plan.years, &response.values)?)
        } else {
            None
        };

        let analyzer = CorrelationAnalyzer::new();
        let correlations = plan
            .covariates
            .iter()
            .map(|covariate| {
                let values: Vec<Option<f64>> = covariate
                    .aligned
                    .iter()
                    .map(|column| column.as_deref().and_then(|c| table.row_value(row, c)))
                    .collect();
                analyzer.analyze(&response.values, &values)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RowAnalysis {
            trend,
            correlations,
            response_present: response.present_count(),
        })
    }

    /// Evaluate every row on the worker pool; output order matches row order
    pub fn compute<T: AttributeTable + Sync + ?Sized>(
        &self,
        table: &T,
        plan: &AnalysisPlan,
        progress: Option<&ProgressReporter>,
    ) -> Result<Vec<RowAnalysis>> {
        let total_rows = table.row_count();
        let processed_count = AtomicUsize::new(0);

        if let Some(p) = progress {
            p.set_length(total_rows as u64);
            p.set_message(&format!("Analysing {} spatial units...", total_rows));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        let rows = pool.install(|| {
            (0..total_rows)
                .into_par_iter()
                .map(|row| {
                    let result = self.analyze_row(table, plan, row);

                    let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(p) = progress {
                        p.update(count as u64);
                    }

                    result
                })
                .collect::<Result<Vec<_>>>()
        })?;

        debug!(rows = rows.len(), workers = self.max_workers, "Row analysis finished");
        Ok(rows)
    }

    /// Append the computed scalars to the table, one cell at a time
    pub fn write_results<T: AttributeTable + ?Sized>(
        &self,
        table: &mut T,
        columns: &OutputColumns,
        rows: &[RowAnalysis],
    ) -> Result<()> {
        for name in columns.all() {
            if table.has_column(name) {
                warn!(column = name, "Overwriting existing column with new results");
            }
        }

        for (row, analysis) in rows.iter().enumerate() {
            let fit = analysis.trend.flatten();

            if let Some(ref slope) = columns.slope {
                table.set_row_value(row, slope, fit.map(|f| f.slope))?;
            }
            if let Some(ref d) = columns.diagnostics {
                table.set_row_value(row, &d.intercept, fit.map(|f| f.intercept))?;
                table.set_row_value(row, &d.p_value, fit.map(|f| f.p_value))?;
                table.set_row_value(row, &d.r_value, fit.map(|f| f.r_value))?;
                table.set_row_value(row, &d.std_err, fit.map(|f| f.std_err))?;
            }
            for ((corr, pval), result) in columns.correlations.iter().zip(&analysis.correlations) {
                table.set_row_value(row, corr, result.correlation)?;
                table.set_row_value(row, pval, result.p_value)?;
            }
        }

        Ok(())
    }

    /// Resolve, compute and write back. Nothing is written if resolution fails.
    pub fn run<T: AttributeTable + Sync + ?Sized>(
        &self,
        table: &mut T,
        config: &AnalysisConfig,
        progress: Option<&ProgressReporter>,
    ) -> Result<AnalysisOutcome> {
        let plan = self.plan(table, config)?;
        let columns = self.output_columns(&plan, &config.response_prefix);

        let rows = self.compute(table, &plan, progress)?;
        self.write_results(table, &columns, &rows)?;

        if let Some(p) = progress {
            p.finish_with_message(&format!("Analysed {} spatial units", rows.len()));
        }

        Ok(AnalysisOutcome {
            plan,
            columns,
            rows,
        })
    }
}

impl Default for ParallelProcessor {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigOverrides, CovariatePrefixes};
    use crate::models::{Column, ColumnValues, SpatialUnitTable, YearRange};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn config(start: i32, end: i32) -> AnalysisConfig {
        AnalysisConfig::load(
            None,
            &ConfigOverrides {
                input_path: Some(PathBuf::from("in.csv")),
                output_path: Some(PathBuf::from("out.csv")),
                start_year: Some(start),
                end_year: Some(end),
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn numeric(name: &str, values: &[Option<f64>]) -> Column {
        Column::new(name, ColumnValues::Numeric(values.to_vec()))
    }

    /// Three cells over 2000-2004: a clean trend, an all-missing cell, a cell with zeros
    fn grid() -> SpatialUnitTable {
        SpatialUnitTable::from_columns(vec![
            Column::new(
                "geometry",
                ColumnValues::Text(vec![
                    Some("POLYGON((0 0,1 0,1 1,0 0))".into()),
                    Some("POLYGON((1 0,2 0,2 1,1 0))".into()),
                    Some("POLYGON((2 0,3 0,3 1,2 0))".into()),
                ]),
            ),
            numeric("BA_2000", &[Some(10.0), None, Some(1.0)]),
            numeric("BA_2001", &[Some(12.0), None, Some(2.0)]),
            numeric("BA_2002", &[Some(14.0), None, Some(0.0)]),
            numeric("BA_2003", &[Some(16.0), None, Some(4.0)]),
            numeric("BA_2004", &[Some(18.0), None, None]),
            numeric("Tem_2000", &[Some(20.0), Some(21.0), Some(1.0)]),
            numeric("Tem_2001", &[Some(21.0), Some(22.0), Some(0.0)]),
            numeric("Tem_2002", &[Some(22.0), Some(23.0), Some(3.0)]),
            numeric("Tem_2003", &[Some(23.0), Some(24.0), Some(4.0)]),
            numeric("Tem_2004", &[Some(24.0), Some(25.0), Some(5.0)]),
            numeric("Pre_2000", &[Some(5.0), Some(5.0), Some(5.0)]),
            numeric("Pre_2001", &[Some(5.0), Some(5.0), Some(5.0)]),
            numeric("Pre_2002", &[Some(5.0), Some(5.0), Some(5.0)]),
            numeric("Pre_2003", &[Some(5.0), Some(5.0), Some(5.0)]),
            numeric("Pre_2004", &[Some(5.0), Some(5.0), Some(5.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_full_run_appends_result_columns() {
        let mut table = grid();
        let processor = ParallelProcessor::new(2);

        let outcome = processor.run(&mut table, &config(2000, 2004), None).unwrap();

        assert_eq!(
            outcome.columns.all(),
            vec!["BA_slope", "BA_Tem_corr", "BA_Tem_pval", "BA_Pre_corr", "BA_Pre_pval"]
        );
        assert_eq!(table.row_count(), 3);

        // Row 0: exact linear trend, perfectly correlated temperature, constant precipitation
        assert_eq!(table.row_value(0, "BA_slope"), Some(2.0));
        assert_eq!(table.row_value(0, "BA_Tem_corr"), Some(1.0));
        assert_eq!(table.row_value(0, "BA_Pre_corr"), None);
        assert_eq!(table.row_value(0, "BA_Pre_pval"), None);

        // Row 1: no response data at all
        assert_eq!(table.row_value(1, "BA_slope"), None);
        assert_eq!(table.row_value(1, "BA_Tem_corr"), None);

        // Row 2: zeros and gaps leave pairs (1,1), (4,4)
        assert_eq!(outcome.rows[2].correlations[0].retained, 2);
        assert_eq!(table.row_value(2, "BA_Tem_corr"), Some(1.0));
        assert_eq!(table.row_value(2, "BA_Tem_pval"), Some(1.0));
    }

    #[test]
    fn test_trend_only_does_not_require_covariates() {
        let mut table = SpatialUnitTable::from_columns(vec![
            numeric("BA_2000", &[Some(1.0)]),
            numeric("BA_2001", &[Some(3.0)]),
        ])
        .unwrap();

        let processor = ParallelProcessor::new(1).with_analysis(AnalysisKind::Trend);
        let outcome = processor.run(&mut table, &config(2000, 2024), None).unwrap();

        assert_eq!(outcome.columns.all(), vec!["BA_slope"]);
        assert_eq!(table.row_value(0, "BA_slope"), Some(2.0));
    }

    #[test]
    fn test_missing_response_columns_abort_without_writing() {
        let mut table = grid();
        let before = table.column_count();

        let err = ParallelProcessor::new(1)
            .run(&mut table, &config(1990, 1995), None)
            .unwrap_err();

        assert!(matches!(err, ProcessingError::MissingColumns { ref variable, .. } if variable == "BA"));
        assert_eq!(table.column_count(), before);
    }

    #[test]
    fn test_missing_covariate_group_is_fatal_for_correlation() {
        let mut table = SpatialUnitTable::from_columns(vec![
            numeric("BA_2000", &[Some(1.0)]),
            numeric("Tem_2000", &[Some(3.0)]),
        ])
        .unwrap();

        let err = ParallelProcessor::new(1)
            .with_analysis(AnalysisKind::Correlation)
            .run(&mut table, &config(2000, 2001), None)
            .unwrap_err();

        assert!(matches!(err, ProcessingError::MissingColumns { ref variable, .. } if variable == "Pre"));
    }

    #[test]
    fn test_diagnostic_columns() {
        let mut table = grid();
        let processor = ParallelProcessor::new(2)
            .with_analysis(AnalysisKind::Trend)
            .with_trend_diagnostics(true);

        processor.run(&mut table, &config(2000, 2004), None).unwrap();

        assert_eq!(table.row_value(0, "BA_slope_pval"), Some(0.0));
        assert_eq!(table.row_value(0, "BA_slope_r"), Some(1.0));
        assert!(table.has_column("BA_intercept"));
        assert!(table.has_column("BA_slope_stderr"));
    }

    #[test]
    fn test_covariates_align_by_year() {
        // Temperature starts a year later than burned area
        let table = SpatialUnitTable::from_columns(vec![
            numeric("BA_2000", &[Some(1.0)]),
            numeric("BA_2001", &[Some(2.0)]),
            numeric("BA_2002", &[Some(3.0)]),
            numeric("Tem_2001", &[Some(4.0)]),
            numeric("Tem_2002", &[Some(9.0)]),
            numeric("Pre_2000", &[Some(1.0)]),
        ])
        .unwrap();

        let processor = ParallelProcessor::new(1);
        let plan = processor.plan(&table, &config(2000, 2002)).unwrap();

        assert_eq!(plan.years, vec![2000, 2001, 2002]);
        assert_eq!(plan.covariates[0].aligned[0], None);
        assert_eq!(plan.covariates[1].overlap(), 1);

        let row = processor.analyze_row(&table, &plan, 0).unwrap();
        assert_eq!(row.correlations[0].retained, 2);
        assert_eq!(row.correlations[1], crate::models::CorrelationResult::missing(1));
    }

    #[test]
    fn test_row_results_independent_of_worker_count() {
        let table = grid();
        let cfg = config(2000, 2004);

        let serial = ParallelProcessor::new(1);
        let parallel = ParallelProcessor::new(4);
        let plan = serial.plan(&table, &cfg).unwrap();

        let a = serial.compute(&table, &plan, None).unwrap();
        let b = parallel.compute(&table, &plan, None).unwrap();
        assert_eq!(a, b);

        // Evaluating a single row alone gives the same answer as in the full scan
        assert_eq!(serial.analyze_row(&table, &plan, 2).unwrap(), a[2]);
    }

    #[test]
    fn test_custom_prefixes_name_output_columns() {
        let mut cfg = config(2000, 2004);
        cfg.response_prefix = "burn".to_string();
        cfg.covariate_prefixes = CovariatePrefixes {
            a: "t2m".to_string(),
            b: "tp".to_string(),
        };
        cfg.year_range = YearRange::new(2000, 2001);

        let mut table = SpatialUnitTable::from_columns(vec![
            numeric("burn_2000", &[Some(1.0)]),
            numeric("burn_2001", &[Some(2.0)]),
            numeric("t2m_2000", &[Some(1.0)]),
            numeric("tp_2001", &[Some(1.0)]),
        ])
        .unwrap();

        let outcome = ParallelProcessor::new(1).run(&mut table, &cfg, None).unwrap();
        assert_eq!(
            outcome.columns.all(),
            vec!["burn_slope", "burn_t2m_corr", "burn_t2m_pval", "burn_tp_corr", "burn_tp_pval"]
        );
    }
}
