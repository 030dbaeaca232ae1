pub mod results;
pub mod series;
pub mod table;

pub use results::{CorrelationResult, RowAnalysis, TrendFit, TrendResult};
pub use series::{YearRange, YearSeries};
pub use table::{AttributeTable, Column, ColumnValues, SpatialUnitTable};
