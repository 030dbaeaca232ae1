use serde::{Deserialize, Serialize};

/// Inclusive range of years requested for an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }
}

/// One variable's values for a single row, aligned with the run's year axis.
#[derive(Debug, Clone, PartialEq)]
pub struct YearSeries {
    pub values: Vec<Option<f64>>,
}

impl YearSeries {
    pub fn new(values: Vec<Option<f64>>) -> Self {
        Self { values }
    }

    pub fn present_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}
