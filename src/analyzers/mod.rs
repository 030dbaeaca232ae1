pub mod trend_analyzer;

pub use trend_analyzer::{ColumnSummary, ResultKind, TrendAnalyzer, TrendStatistics};
