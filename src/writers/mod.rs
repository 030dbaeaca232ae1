pub mod csv_writer;
pub mod parquet_writer;

pub use csv_writer::CsvTableWriter;
pub use parquet_writer::{ParquetFileInfo, ParquetWriter};

use crate::error::Result;
use crate::models::SpatialUnitTable;
use crate::utils::constants::{COMPRESSION_SNAPPY, DEFAULT_BATCH_SIZE, DEFAULT_ROW_GROUP_SIZE};
use crate::utils::filename::TableFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub compression: String,
    pub row_group_size: usize,
    /// Rows per record batch handed to the Parquet writer
    pub batch_size: usize,
    /// Field delimiter for CSV output
    pub delimiter: u8,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            compression: COMPRESSION_SNAPPY.to_string(),
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            delimiter: b',',
        }
    }
}

/// Persist a table in the format implied by the extension of `path`.
///
/// The table is written next to the target and renamed into place, so a
/// failed write never leaves a truncated output behind.
pub fn write_table(table: &SpatialUnitTable, path: &Path, options: &WriteOptions) -> Result<()> {
    let format = TableFormat::from_path(path)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let partial = partial_path(path);
    let result = match format {
        TableFormat::Csv => CsvTableWriter::new()
            .with_delimiter(options.delimiter)
            .write_table(table, &partial),
        TableFormat::Parquet => ParquetWriter::new()
            .with_compression(&options.compression)
            .map(|w| {
                w.with_row_group_size(options.row_group_size)
                    .with_batch_size(options.batch_size)
            })
            .and_then(|w| w.write_table(table, &partial)),
    };

    if let Err(e) = result {
        if partial.exists() {
            if let Err(cleanup) = std::fs::remove_file(&partial) {
                warn!("Failed to remove partial output {}: {}", partial.display(), cleanup);
            }
        }
        return Err(e);
    }

    std::fs::rename(&partial, path)?;
    debug!("Wrote {:?} table to {}", format, path.display());
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttributeTable, Column, ColumnValues};
    use tempfile::TempDir;

    fn table() -> SpatialUnitTable {
        SpatialUnitTable::from_columns(vec![Column::new(
            "BA_slope",
            ColumnValues::Numeric(vec![Some(1.0), None]),
        )])
        .unwrap()
    }

    #[test]
    fn test_write_creates_parent_dirs() -> Result<()> {
        let dir = TempDir::new()?;
        let target = dir.path().join("nested").join("out.parquet");

        write_table(&table(), &target, &WriteOptions::default())?;

        assert!(target.exists());
        assert!(!partial_path(&target).exists());
        let read_back = crate::readers::read_table(&target, &Default::default())?;
        assert_eq!(read_back.row_value(0, "BA_slope"), Some(1.0));
        Ok(())
    }

    #[test]
    fn test_small_batches_and_row_groups() -> Result<()> {
        let dir = TempDir::new()?;
        let target = dir.path().join("out.parquet");
        let table = SpatialUnitTable::from_columns(vec![Column::new(
            "BA_slope",
            ColumnValues::Numeric(vec![Some(1.0), None, Some(3.0), Some(4.0), None]),
        )])
        .unwrap();
        let options = WriteOptions {
            row_group_size: 2,
            batch_size: 2,
            ..WriteOptions::default()
        };

        write_table(&table, &target, &options)?;

        let info = ParquetWriter::new().get_file_info(&target)?;
        assert_eq!(info.total_rows, 5);
        assert_eq!(info.row_groups, 3);
        let read_back = crate::readers::read_table(&target, &Default::default())?;
        assert_eq!(read_back.row_value(2, "BA_slope"), Some(3.0));
        assert_eq!(read_back.row_value(4, "BA_slope"), None);
        Ok(())
    }

    #[test]
    fn test_csv_output_uses_delimiter() -> Result<()> {
        let dir = TempDir::new()?;
        let target = dir.path().join("out.csv");
        let options = WriteOptions {
            delimiter: b'\t',
            ..WriteOptions::default()
        };

        let table = SpatialUnitTable::from_columns(vec![
            Column::new("id", ColumnValues::Text(vec![Some("a".into()), Some("b".into())])),
            Column::new("BA_slope", ColumnValues::Numeric(vec![Some(1.0), None])),
        ])
        .unwrap();

        write_table(&table, &target, &options)?;

        assert_eq!(std::fs::read_to_string(&target)?, "id\tBA_slope\na\t1\nb\t\n");
        Ok(())
    }

    #[test]
    fn test_failed_write_leaves_nothing() -> Result<()> {
        let dir = TempDir::new()?;
        let target = dir.path().join("out.parquet");
        let options = WriteOptions {
            compression: "bogus".to_string(),
            ..WriteOptions::default()
        };

        assert!(write_table(&table(), &target, &options).is_err());
        assert!(!target.exists());
        assert!(!partial_path(&target).exists());
        Ok(())
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let result = write_table(&table(), &dir.path().join("out.xlsx"), &WriteOptions::default());
        assert!(result.is_err());
    }
}
