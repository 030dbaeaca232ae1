use crate::error::{ProcessingError, Result};
use std::collections::HashMap;

/// Read/write view of a spatial-unit attribute table.
///
/// Rows are spatial units; columns are addressed by name. Only numeric access
/// is exposed, everything else in the table (geometry, identifiers) is opaque.
pub trait AttributeTable {
    fn column_names(&self) -> Vec<&str>;

    fn has_column(&self, name: &str) -> bool;

    fn row_count(&self) -> usize;

    /// Numeric value of a cell. Empty, unparseable and non-finite cells are `None`.
    fn row_value(&self, row: usize, column: &str) -> Option<f64>;

    /// Write a numeric cell, creating the column (all missing) on first use.
    fn set_row_value(&mut self, row: usize, column: &str, value: Option<f64>) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    Binary(Vec<Option<Vec<u8>>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
            ColumnValues::Binary(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnValues::Numeric(_))
    }

    /// Coerce a cell to a finite f64.
    pub fn numeric_at(&self, row: usize) -> Option<f64> {
        let value = match self {
            ColumnValues::Numeric(v) => v.get(row).copied().flatten(),
            ColumnValues::Text(v) => v
                .get(row)
                .and_then(|cell| cell.as_deref())
                .and_then(parse_numeric),
            ColumnValues::Binary(_) => None,
        };
        value.filter(|v| v.is_finite())
    }

    /// Render a cell as text for delimited output.
    pub fn display_at(&self, row: usize) -> String {
        match self {
            ColumnValues::Numeric(v) => match v.get(row).copied().flatten() {
                Some(x) if x.is_finite() => x.to_string(),
                _ => String::new(),
            },
            ColumnValues::Text(v) => v.get(row).cloned().flatten().unwrap_or_default(),
            ColumnValues::Binary(v) => v
                .get(row)
                .and_then(|cell| cell.as_ref())
                .map(|bytes| bytes.iter().map(|b| format!("{:02x}", b)).collect())
                .unwrap_or_default(),
        }
    }
}

/// Parse a cell the way attribute tables spell numbers; NaN and sentinels are not filtered here.
pub fn parse_numeric(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

impl Column {
    pub fn new(name: impl Into<String>, values: ColumnValues) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// In-memory table of spatial units, loaded once and enriched in place.
#[derive(Debug, Clone, Default)]
pub struct SpatialUnitTable {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    rows: usize,
}

impl SpatialUnitTable {
    pub fn new(row_count: usize) -> Self {
        Self {
            columns: Vec::new(),
            index: HashMap::new(),
            rows: row_count,
        }
    }

    /// Build a table from columns, which must all have the same length.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let rows = columns.first().map_or(0, |c| c.values.len());
        let mut table = Self::new(rows);
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    /// Append a column, or replace one with the same name in place.
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if column.values.len() != self.rows {
            return Err(ProcessingError::InvalidFormat(format!(
                "Column '{}' has {} rows, table has {}",
                column.name,
                column.values.len(),
                self.rows
            )));
        }

        match self.index.get(&column.name) {
            Some(&pos) => self.columns[pos] = column,
            None => {
                self.index.insert(column.name.clone(), self.columns.len());
                self.columns.push(column);
            }
        }
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&pos| &self.columns[pos])
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

impl AttributeTable for SpatialUnitTable {
    fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    fn row_count(&self) -> usize {
        self.rows
    }

    fn row_value(&self, row: usize, column: &str) -> Option<f64> {
        self.column(column)
            .and_then(|c| c.values.numeric_at(row))
    }

    fn set_row_value(&mut self, row: usize, column: &str, value: Option<f64>) -> Result<()> {
        if row >= self.rows {
            return Err(ProcessingError::InvalidFormat(format!(
                "Row {} out of range for table with {} rows",
                row, self.rows
            )));
        }

        if !self.index.contains_key(column) {
            self.push_column(Column::new(
                column,
                ColumnValues::Numeric(vec![None; self.rows]),
            ))?;
        }

        let pos = self.index[column];
        let target = &mut self.columns[pos].values;
        if !target.is_numeric() {
            // Result columns read back from a previous run arrive as text
            let coerced = (0..self.rows).map(|r| target.numeric_at(r)).collect();
            *target = ColumnValues::Numeric(coerced);
        }

        if let ColumnValues::Numeric(values) = target {
            values[row] = value;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> SpatialUnitTable {
        SpatialUnitTable::from_columns(vec![
            Column::new(
                "id",
                ColumnValues::Text(vec![Some("a".into()), Some("b".into())]),
            ),
            Column::new("BA_2000", ColumnValues::Numeric(vec![Some(1.5), None])),
            Column::new(
                "BA_2001",
                ColumnValues::Text(vec![Some(" 2.5 ".into()), Some("n/a".into())]),
            ),
            Column::new(
                "BA_2002",
                ColumnValues::Numeric(vec![Some(f64::NAN), Some(f64::INFINITY)]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_numeric_coercion() {
        let table = sample_table();

        assert_eq!(table.row_value(0, "BA_2000"), Some(1.5));
        assert_eq!(table.row_value(1, "BA_2000"), None);
        assert_eq!(table.row_value(0, "BA_2001"), Some(2.5));
        assert_eq!(table.row_value(1, "BA_2001"), None);
        assert_eq!(table.row_value(0, "BA_2002"), None);
        assert_eq!(table.row_value(1, "BA_2002"), None);
        assert_eq!(table.row_value(0, "id"), None);
        assert_eq!(table.row_value(0, "missing"), None);
    }

    #[test]
    fn test_set_row_value_creates_column() {
        let mut table = sample_table();
        table.set_row_value(1, "BA_slope", Some(2.0)).unwrap();

        assert!(table.has_column("BA_slope"));
        assert_eq!(table.row_value(0, "BA_slope"), None);
        assert_eq!(table.row_value(1, "BA_slope"), Some(2.0));
        assert_eq!(table.column_names().last(), Some(&"BA_slope"));
    }

    #[test]
    fn test_set_row_value_out_of_range() {
        let mut table = sample_table();
        assert!(table.set_row_value(5, "BA_slope", Some(1.0)).is_err());
        assert!(!table.has_column("BA_slope"));
    }

    #[test]
    fn test_set_row_value_coerces_text_column() {
        let mut table = sample_table();
        table.set_row_value(1, "BA_2001", Some(9.0)).unwrap();

        let column = table.column("BA_2001").unwrap();
        assert_eq!(column.values, ColumnValues::Numeric(vec![Some(2.5), Some(9.0)]));
    }

    #[test]
    fn test_push_column_length_mismatch() {
        let mut table = sample_table();
        let result = table.push_column(Column::new("x", ColumnValues::Numeric(vec![None])));
        assert!(result.is_err());
    }

    #[test]
    fn test_binary_display_is_hex() {
        let values = ColumnValues::Binary(vec![Some(vec![0x01, 0xab]), None]);
        assert_eq!(values.display_at(0), "01ab");
        assert_eq!(values.display_at(1), "");
    }
}
