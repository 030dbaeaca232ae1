pub mod column_resolver;
pub mod correlation_analyzer;
pub mod coverage_checker;
pub mod parallel_processor;
pub mod trend_estimator;

pub use column_resolver::{ColumnResolver, ResolvedColumns};
pub use correlation_analyzer::CorrelationAnalyzer;
pub use coverage_checker::{CoverageChecker, CoverageReport, CovariateCoverage, TrendCoverage};
pub use parallel_processor::{
    AnalysisKind, AnalysisOutcome, AnalysisPlan, CovariatePlan, OutputColumns, ParallelProcessor,
};
pub use trend_estimator::TrendEstimator;
