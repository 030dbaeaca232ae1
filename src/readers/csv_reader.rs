use crate::error::{ProcessingError, Result};
use crate::models::{Column, ColumnValues, SpatialUnitTable};
use crate::utils::constants::DEFAULT_BUFFER_SIZE;
use memmap2::Mmap;
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

/// Reads a delimited attribute table. Cells are kept as text so untouched
/// columns are written back byte for byte; numbers are parsed on access.
pub struct CsvTableReader {
    delimiter: u8,
    use_mmap: bool,
}

impl CsvTableReader {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            use_mmap: false,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn read_table(&self, path: &Path) -> Result<SpatialUnitTable> {
        if self.use_mmap {
            let file = File::open(path)?;
            let mmap = unsafe { Mmap::map(&file)? };
            self.parse_bytes(&mmap)
        } else {
            let file = File::open(path)?;
            let mut reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file);
            let mut bytes = Vec::new();
            reader.read_to_end(&mut bytes)?;
            self.parse_bytes(&bytes)
        }
    }

    fn parse_bytes(&self, bytes: &[u8]) -> Result<SpatialUnitTable> {
        let text = decode_text(bytes);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut seen = HashSet::new();
        for header in &headers {
            if !seen.insert(header.as_str()) {
                return Err(ProcessingError::InvalidFormat(format!(
                    "Duplicate column name: '{}'",
                    header
                )));
            }
        }

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = record?;
            for (column, cell) in cells.iter_mut().zip(record.iter()) {
                column.push(if cell.is_empty() {
                    None
                } else {
                    Some(cell.to_string())
                });
            }
        }

        let rows = cells.first().map_or(0, Vec::len);
        debug!(columns = headers.len(), rows, "Parsed delimited table");

        let mut table = SpatialUnitTable::new(rows);
        for (name, values) in headers.into_iter().zip(cells) {
            table.push_column(Column::new(name, ColumnValues::Text(values)))?;
        }
        Ok(table)
    }
}

impl Default for CsvTableReader {
    fn default() -> Self {
        Self::new()
    }
}

/// UTF-8 (BOM stripped) when valid, otherwise Windows-1252 as written by
/// desktop GIS attribute exports.
fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let (text, _, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if !had_errors {
        return text;
    }

    warn!("Input is not valid UTF-8, decoding as Windows-1252");
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    text
}
