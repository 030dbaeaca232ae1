use crate::error::{ProcessingError, Result};
use crate::models::{AttributeTable, ColumnValues, SpatialUnitTable};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_BATCH_SIZE, DEFAULT_ROW_GROUP_SIZE,
};
use arrow::array::{ArrayRef, BinaryArray, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
    batch_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Write the whole table; numeric columns become nullable Float64
    pub fn write_table(&self, table: &SpatialUnitTable, path: &Path) -> Result<()> {
        let schema = self.create_schema(table);
        let batch = self.table_to_batch(table, schema.clone())?;

        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;

        // Write in batches
        let mut offset = 0;
        while offset < batch.num_rows() {
            let len = self.batch_size.min(batch.num_rows() - offset);
            writer.write(&batch.slice(offset, len))?;
            offset += len;
        }

        writer.close()?;
        Ok(())
    }

    fn create_schema(&self, table: &SpatialUnitTable) -> Arc<Schema> {
        let fields: Vec<Field> = table
            .columns()
            .iter()
            .map(|column| {
                let data_type = match column.values {
                    ColumnValues::Numeric(_) => DataType::Float64,
                    ColumnValues::Text(_) => DataType::Utf8,
                    ColumnValues::Binary(_) => DataType::Binary,
                };
                Field::new(column.name.as_str(), data_type, true)
            })
            .collect();

        Arc::new(Schema::new(fields))
    }

    fn table_to_batch(&self, table: &SpatialUnitTable, schema: Arc<Schema>) -> Result<RecordBatch> {
        let arrays: Vec<ArrayRef> = table
            .columns()
            .iter()
            .map(|column| -> ArrayRef {
                match &column.values {
                    ColumnValues::Numeric(values) => Arc::new(Float64Array::from(
                        values
                            .iter()
                            .map(|v| v.filter(|x| x.is_finite()))
                            .collect::<Vec<_>>(),
                    )),
                    ColumnValues::Text(values) => Arc::new(StringArray::from(
                        values.iter().map(|v| v.as_deref()).collect::<Vec<_>>(),
                    )),
                    ColumnValues::Binary(values) => Arc::new(BinaryArray::from(
                        values.iter().map(|v| v.as_deref()).collect::<Vec<_>>(),
                    )),
                }
            })
            .collect();

        if arrays.is_empty() {
            return Err(ProcessingError::InvalidFormat(format!(
                "Cannot write a table with no columns ({} rows)",
                table.row_count()
            )));
        }

        Ok(RecordBatch::try_new(schema, arrays)?)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let file_metadata = metadata.file_metadata();
        let row_groups = metadata.num_row_groups();
        let total_rows = file_metadata.num_rows();
        let file_size = std::fs::metadata(path)?.len();
        let columns = file_metadata.schema_descr().num_columns();

        let compression = if row_groups > 0 && metadata.row_group(0).num_columns() > 0 {
            Some(metadata.row_group(0).column(0).compression())
        } else {
            None
        };

        Ok(ParquetFileInfo {
            total_rows,
            columns,
            row_groups: row_groups as i32,
            file_size,
            compression,
        })
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub columns: usize,
    pub row_groups: i32,
    pub file_size: u64,
    pub compression: Option<Compression>,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        let avg_rows = if self.row_groups > 0 {
            self.total_rows as f64 / self.row_groups as f64
        } else {
            0.0
        };

        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Columns: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {}\n\
            - Avg rows per group: {:.0}",
            self.total_rows,
            self.columns,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0, // Convert to MB
            self.compression
                .map(|c| format!("{:?}", c))
                .unwrap_or_else(|| "n/a".to_string()),
            avg_rows
        )
    }
}
