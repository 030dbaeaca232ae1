use crate::error::Result;
use crate::models::{AttributeTable, SpatialUnitTable};
use crate::utils::constants::DEFAULT_BUFFER_SIZE;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Writes a table as delimited text; missing cells are left empty.
pub struct CsvTableWriter {
    delimiter: u8,
}

impl CsvTableWriter {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn write_table(&self, table: &SpatialUnitTable, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));

        writer.write_record(table.column_names())?;

        let mut record = Vec::with_capacity(table.column_count());
        for row in 0..table.row_count() {
            record.clear();
            record.extend(table.columns().iter().map(|c| c.values.display_at(row)));
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }
}

impl Default for CsvTableWriter {
    fn default() -> Self {
        Self::new()
    }
}
