use crate::error::{ProcessingError, Result};
use crate::models::{AttributeTable, SpatialUnitTable};
use crate::readers::ReadOptions;
use crate::utils::constants::{
    CORR_SUFFIX, DEFAULT_SIGNIFICANCE, PVAL_SUFFIX, SLOPE_PVAL_SUFFIX, SLOPE_SUFFIX,
};
use std::fmt::Write as _;
use std::path::Path;

/// What a result column holds, judged from its suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Slope,
    Correlation,
    PValue,
}

impl ResultKind {
    pub fn from_column(name: &str) -> Option<Self> {
        let suffix = |s: &str| name.ends_with(&format!("_{}", s));

        if suffix(SLOPE_PVAL_SUFFIX) || suffix(PVAL_SUFFIX) {
            Some(ResultKind::PValue)
        } else if suffix(SLOPE_SUFFIX) {
            Some(ResultKind::Slope)
        } else if suffix(CORR_SUFFIX) {
            Some(ResultKind::Correlation)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColumnSummary {
    pub name: String,
    pub kind: ResultKind,
    pub present: usize,
    pub missing: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub positive: usize,
    pub negative: usize,
    /// Only meaningful for p-value columns
    pub significant: usize,
}

impl ColumnSummary {
    pub fn significant_percentage(&self) -> f64 {
        if self.present == 0 {
            0.0
        } else {
            (self.significant as f64 / self.present as f64) * 100.0
        }
    }

    fn line(&self) -> String {
        if self.present == 0 {
            return format!("- {}: no values ({} missing)", self.name, self.missing);
        }

        match self.kind {
            ResultKind::PValue => format!(
                "- {}: {} values, {} missing, {:.1}% significant, range {:.4} to {:.4}",
                self.name,
                self.present,
                self.missing,
                self.significant_percentage(),
                self.min,
                self.max
            ),
            ResultKind::Slope | ResultKind::Correlation => format!(
                "- {}: {} values, {} missing, mean {:.4}, range {:.4} to {:.4}, {} positive / {} negative",
                self.name,
                self.present,
                self.missing,
                self.mean,
                self.min,
                self.max,
                self.positive,
                self.negative
            ),
        }
    }
}

#[derive(Debug)]
pub struct TrendStatistics {
    pub total_rows: usize,
    pub total_columns: usize,
    pub significance_level: f64,
    pub columns: Vec<ColumnSummary>,
    pub sample: Vec<Vec<(String, String)>>,
}

/// Summarises the result columns of an analysed table
pub struct TrendAnalyzer {
    significance_level: f64,
}

impl TrendAnalyzer {
    pub fn new() -> Self {
        Self {
            significance_level: DEFAULT_SIGNIFICANCE,
        }
    }

    pub fn with_significance_level(mut self, alpha: f64) -> Self {
        self.significance_level = alpha;
        self
    }

    pub fn analyze_file(
        &self,
        path: &Path,
        options: &ReadOptions,
        sample_rows: usize,
    ) -> Result<TrendStatistics> {
        let table = crate::readers::read_table(path, options)?;
        self.analyze_table(&table, sample_rows)
    }

    pub fn analyze_table(
        &self,
        table: &SpatialUnitTable,
        sample_rows: usize,
    ) -> Result<TrendStatistics> {
        let columns: Vec<ColumnSummary> = table
            .column_names()
            .into_iter()
            .filter_map(|name| ResultKind::from_column(name).map(|kind| (name, kind)))
            .map(|(name, kind)| self.summarise_column(table, name, kind))
            .collect();

        if columns.is_empty() {
            return Err(ProcessingError::InvalidFormat(
                "No result columns (*_slope, *_corr, *_pval) found".to_string(),
            ));
        }

        let result_names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        let sample = (0..sample_rows.min(table.row_count()))
            .map(|row| {
                result_names
                    .iter()
                    .filter_map(|name| table.column(name))
                    .map(|c| (c.name.clone(), c.values.display_at(row)))
                    .collect()
            })
            .collect();

        Ok(TrendStatistics {
            total_rows: table.row_count(),
            total_columns: table.column_count(),
            significance_level: self.significance_level,
            columns,
            sample,
        })
    }

    fn summarise_column(
        &self,
        table: &SpatialUnitTable,
        name: &str,
        kind: ResultKind,
    ) -> ColumnSummary {
        let mut summary = ColumnSummary {
            name: name.to_string(),
            kind,
            present: 0,
            missing: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            mean: f64::NAN,
            positive: 0,
            negative: 0,
            significant: 0,
        };
        let mut sum = 0.0;

        for row in 0..table.row_count() {
            let Some(value) = table.row_value(row, name) else {
                summary.missing += 1;
                continue;
            };

            summary.present += 1;
            sum += value;
            summary.min = summary.min.min(value);
            summary.max = summary.max.max(value);

            if value > 0.0 {
                summary.positive += 1;
            } else if value < 0.0 {
                summary.negative += 1;
            }
            if kind == ResultKind::PValue && value < self.significance_level {
                summary.significant += 1;
            }
        }

        if summary.present > 0 {
            summary.mean = sum / summary.present as f64;
        } else {
            summary.min = f64::NAN;
            summary.max = f64::NAN;
        }
        summary
    }
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl TrendStatistics {
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Spatial units: {}\n\
            Columns: {} ({} result columns)\n\
            Significance level: {}\n\
            Result columns:",
            self.total_rows,
            self.total_columns,
            self.columns.len(),
            self.significance_level
        );
        for column in &self.columns {
            let _ = write!(out, "\n{}", column.line());
        }
        out
    }

    pub fn detailed_summary(&self) -> String {
        let mut out = self.summary();
        if self.sample.is_empty() {
            return out;
        }

        out.push_str("\n\nSample rows:");
        for (i, row) in self.sample.iter().enumerate() {
            let cells: Vec<String> = row
                .iter()
                .map(|(name, value)| {
                    if value.is_empty() {
                        format!("{}=<missing>", name)
                    } else {
                        format!("{}={}", name, value)
                    }
                })
                .collect();
            let _ = write!(out, "\n  [{}] {}", i, cells.join(", "));
        }
        out
    }
}
