/// Default variable prefixes (burned area, temperature, precipitation)
pub const DEFAULT_RESPONSE: &str = "BA";
pub const DEFAULT_COVARIATE_A: &str = "Tem";
pub const DEFAULT_COVARIATE_B: &str = "Pre";

/// Default analysis period (MODIS burned-area record)
pub const DEFAULT_START_YEAR: i32 = 2000;
pub const DEFAULT_END_YEAR: i32 = 2024;

/// Separator between variable prefix and year in column names
pub const DEFAULT_SEPARATOR: &str = "_";

/// Significance threshold used when summarising p-values
pub const DEFAULT_SIGNIFICANCE: f64 = 0.05;

/// Environment variable prefix for configuration
pub const ENV_PREFIX: &str = "BA_TRENDS";

/// Result column suffixes
pub const SLOPE_SUFFIX: &str = "slope";
pub const INTERCEPT_SUFFIX: &str = "intercept";
pub const SLOPE_PVAL_SUFFIX: &str = "slope_pval";
pub const SLOPE_R_SUFFIX: &str = "slope_r";
pub const SLOPE_STDERR_SUFFIX: &str = "slope_stderr";
pub const CORR_SUFFIX: &str = "corr";
pub const PVAL_SUFFIX: &str = "pval";

/// Output file stem suffixes per command
pub const TREND_OUTPUT_SUFFIX: &str = "_slope";
pub const CORRELATION_OUTPUT_SUFFIX: &str = "_corr";
pub const ANALYSIS_OUTPUT_SUFFIX: &str = "_trends";

/// Processing defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_BATCH_SIZE: usize = 8192;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
