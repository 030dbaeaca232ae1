use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("No '{variable}' columns found for years {start}..={end}")]
    MissingColumns {
        variable: String,
        start: i32,
        end: i32,
    },

    #[error("Year axis has {axis} entries but the value series has {values}")]
    DimensionMismatch { axis: usize, values: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration load error: {0}")]
    ConfigLoad(#[from] ::config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported table format: {0}")]
    UnsupportedFormat(String),

    #[error("Report serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
