pub mod csv_reader;
pub mod parquet_reader;

pub use csv_reader::CsvTableReader;
pub use parquet_reader::ParquetTableReader;

use crate::error::Result;
use crate::models::SpatialUnitTable;
use crate::utils::filename::TableFormat;
use std::path::Path;

/// CSV-only settings; Parquet input ignores them
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    pub use_mmap: bool,
    pub delimiter: u8,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            use_mmap: false,
            delimiter: b',',
        }
    }
}

/// Load an attribute table, choosing the reader from the file extension
pub fn read_table(path: &Path, options: &ReadOptions) -> Result<SpatialUnitTable> {
    match TableFormat::from_path(path)? {
        TableFormat::Csv => CsvTableReader::new()
            .with_mmap(options.use_mmap)
            .with_delimiter(options.delimiter)
            .read_table(path),
        TableFormat::Parquet => ParquetTableReader::new().read_table(path),
    }
}
