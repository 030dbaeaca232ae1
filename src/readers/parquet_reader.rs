use crate::error::{ProcessingError, Result};
use crate::models::{Column, ColumnValues, SpatialUnitTable};
use crate::utils::constants::DEFAULT_BATCH_SIZE;
use arrow::array::{Array, Float64Array, LargeBinaryArray, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::debug;

pub struct ParquetTableReader {
    batch_size: usize,
}

impl ParquetTableReader {
    pub fn new() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Numeric arrow columns become f64, binary columns (e.g. WKB geometry)
    /// stay binary, anything else is carried as text.
    pub fn read_table(&self, path: &Path) -> Result<SpatialUnitTable> {
        let file = File::open(path)?;
        let builder =
            ParquetRecordBatchReaderBuilder::try_new(file)?.with_batch_size(self.batch_size);
        let schema = builder.schema().clone();
        let reader = builder.build()?;

        let mut columns: Vec<ColumnValues> = schema
            .fields()
            .iter()
            .map(|field| empty_values(field.data_type()))
            .collect();

        let mut batches = 0;
        for batch_result in reader {
            let batch = batch_result?;
            for (values, array) in columns.iter_mut().zip(batch.columns()) {
                append_array(values, array.as_ref())?;
            }
            batches += 1;
        }

        let rows = columns.first().map_or(0, ColumnValues::len);
        debug!(columns = columns.len(), rows, batches, "Read Parquet table");

        let mut table = SpatialUnitTable::new(rows);
        for (field, values) in schema.fields().iter().zip(columns) {
            table.push_column(Column::new(field.name().clone(), values))?;
        }
        Ok(table)
    }
}

impl Default for ParquetTableReader {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_values(data_type: &DataType) -> ColumnValues {
    if data_type.is_numeric() {
        ColumnValues::Numeric(Vec::new())
    } else if matches!(data_type, DataType::Binary | DataType::LargeBinary) {
        ColumnValues::Binary(Vec::new())
    } else {
        ColumnValues::Text(Vec::new())
    }
}

fn append_array(values: &mut ColumnValues, array: &dyn Array) -> Result<()> {
    match values {
        ColumnValues::Numeric(out) => {
            let cast_array = cast(array, &DataType::Float64)?;
            let floats = cast_array
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| invalid_cast("Float64"))?;
            out.extend(floats.iter());
        }
        ColumnValues::Text(out) => {
            let cast_array = cast(array, &DataType::Utf8)?;
            let strings = cast_array
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| invalid_cast("Utf8"))?;
            out.extend(strings.iter().map(|s| s.map(str::to_string)));
        }
        ColumnValues::Binary(out) => {
            let cast_array = cast(array, &DataType::LargeBinary)?;
            let bytes = cast_array
                .as_any()
                .downcast_ref::<LargeBinaryArray>()
                .ok_or_else(|| invalid_cast("LargeBinary"))?;
            out.extend(bytes.iter().map(|b| b.map(<[u8]>::to_vec)));
        }
    }
    Ok(())
}

fn invalid_cast(target: &str) -> ProcessingError {
    ProcessingError::InvalidFormat(format!("Column could not be read as {}", target))
}
