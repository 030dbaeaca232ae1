use crate::error::{ProcessingError, Result};
use std::path::{Path, PathBuf};

/// Persistence formats for attribute tables, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Parquet,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" | "txt" => Ok(TableFormat::Csv),
            "parquet" | "pq" => Ok(TableFormat::Parquet),
            _ => Err(ProcessingError::UnsupportedFormat(format!(
                "{} (expected .csv or .parquet)",
                path.display()
            ))),
        }
    }
}

/// Default output path next to the input: grid5_Sta.csv -> grid5_Sta_slope.csv
pub fn default_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());

    let filename = match input.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };

    input.with_file_name(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        let output = default_output_path(Path::new("data/grid5_Sta.csv"), "_slope");
        assert_eq!(output, PathBuf::from("data/grid5_Sta_slope.csv"));

        let output = default_output_path(Path::new("grid.parquet"), "_trends");
        assert_eq!(output, PathBuf::from("grid_trends.parquet"));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            TableFormat::from_path(Path::new("a/b.CSV")).unwrap(),
            TableFormat::Csv
        );
        assert_eq!(
            TableFormat::from_path(Path::new("b.parquet")).unwrap(),
            TableFormat::Parquet
        );
        assert!(TableFormat::from_path(Path::new("grid.shp")).is_err());
        assert!(TableFormat::from_path(Path::new("grid")).is_err());
    }
}
