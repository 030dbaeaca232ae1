use crate::config::{ConfigOverrides, MissingValuePolicy};
use crate::processors::AnalysisKind;
use crate::readers::ReadOptions;
use crate::utils::constants::COMPRESSION_SNAPPY;
use crate::writers::WriteOptions;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ba-trends")]
#[command(about = "Burned-area trend and climate correlation analysis for gridded attribute tables")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Hide progress output")]
    pub quiet: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fit the per-unit linear trend of the response against year
    Trend {
        #[command(flatten)]
        args: AnalysisArgs,
    },

    /// Correlate the response with both climate covariates
    Correlate {
        #[command(flatten)]
        args: AnalysisArgs,
    },

    /// Run trend and correlation analysis in one pass
    Analyze {
        #[command(flatten)]
        args: AnalysisArgs,
    },

    /// Summarise the result columns of an analysed table
    Info {
        #[arg(short, long, help = "Result table (.csv or .parquet)")]
        file: PathBuf,

        #[arg(short, long, default_value = "5", help = "Number of sample rows to show")]
        sample: usize,

        #[arg(long, default_value = "0.05", help = "Significance level for p-value columns")]
        significance: f64,

        #[arg(
            long,
            default_value = ",",
            value_parser = parse_delimiter,
            help = "Field delimiter for CSV input"
        )]
        delimiter: u8,
    },
}

fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ if value == "\\t" => Ok(b'\t'),
        _ => Err(format!("delimiter must be a single ASCII character, got '{}'", value)),
    }
}

#[derive(Args, Debug, Clone)]
pub struct AnalysisArgs {
    #[arg(short, long, help = "Configuration file (TOML, YAML or JSON)")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Input attribute table (.csv or .parquet)")]
    pub input: Option<PathBuf>,

    #[arg(
        short,
        long,
        help = "Output table path [default: <input stem>_slope|_corr|_trends.<ext>]"
    )]
    pub output: Option<PathBuf>,

    #[arg(long, help = "First year of the analysis period [default: 2000]")]
    pub start_year: Option<i32>,

    #[arg(long, help = "Last year of the analysis period [default: 2024]")]
    pub end_year: Option<i32>,

    #[arg(long, help = "Response variable prefix [default: BA]")]
    pub response: Option<String>,

    #[arg(long, help = "First covariate prefix [default: Tem]")]
    pub covariate_a: Option<String>,

    #[arg(long, help = "Second covariate prefix [default: Pre]")]
    pub covariate_b: Option<String>,

    #[arg(long, help = "Separator between prefix and year in column names [default: _]")]
    pub separator: Option<String>,

    #[arg(long, help = "Missing-year handling for the trend: pairwise_drop or propagate")]
    pub missing_policy: Option<MissingValuePolicy>,

    #[arg(long, help = "Also write intercept, p-value, r and standard error of the slope")]
    pub trend_diagnostics: bool,

    #[arg(
        long,
        default_value_t = num_cpus::get(),
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..),
        help = "Worker threads for row evaluation"
    )]
    pub max_workers: usize,

    #[arg(long, default_value = COMPRESSION_SNAPPY, help = "Parquet compression")]
    pub compression: String,

    #[arg(long, help = "Write the coverage report as JSON")]
    pub report: Option<PathBuf>,

    #[arg(long, help = "Memory-map CSV input instead of buffered reads")]
    pub mmap: bool,

    #[arg(
        long,
        default_value = ",",
        value_parser = parse_delimiter,
        help = "Field delimiter for CSV input and output"
    )]
    pub delimiter: u8,
}

impl AnalysisArgs {
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            use_mmap: self.mmap,
            delimiter: self.delimiter,
        }
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            compression: self.compression.clone(),
            delimiter: self.delimiter,
            ..WriteOptions::default()
        }
    }

    pub fn overrides(&self, kind: AnalysisKind) -> ConfigOverrides {
        ConfigOverrides {
            input_path: self.input.clone(),
            output_path: self.output.clone(),
            start_year: self.start_year,
            end_year: self.end_year,
            response_prefix: self.response.clone(),
            covariate_a: self.covariate_a.clone(),
            covariate_b: self.covariate_b.clone(),
            column_separator: self.separator.clone(),
            missing_policy: self.missing_policy,
            trend_diagnostics: self.trend_diagnostics.then_some(true),
            output_suffix: Some(kind.output_suffix().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze_overrides() {
        let cli = Cli::try_parse_from([
            "ba-trends",
            "analyze",
            "--input",
            "grid.csv",
            "--start-year",
            "2001",
            "--missing-policy",
            "propagate",
            "--trend-diagnostics",
            "--quiet",
        ])
        .unwrap();

        assert!(cli.quiet);
        let Commands::Analyze { args } = cli.command else {
            panic!("expected analyze");
        };
        let overrides = args.overrides(AnalysisKind::Full);
        assert_eq!(overrides.input_path, Some(PathBuf::from("grid.csv")));
        assert_eq!(overrides.start_year, Some(2001));
        assert_eq!(overrides.end_year, None);
        assert_eq!(overrides.missing_policy, Some(MissingValuePolicy::Propagate));
        assert_eq!(overrides.trend_diagnostics, Some(true));
        assert_eq!(overrides.output_suffix.as_deref(), Some("_trends"));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = Cli::try_parse_from(["ba-trends", "analyze", "--max-workers", "0"]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from(["ba-trends", "analyze", "--max-workers", "3"]).unwrap();
        let Commands::Analyze { args } = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.max_workers, 3);
    }

    #[test]
    fn test_delimiter_feeds_read_and_write_options() {
        let cli = Cli::try_parse_from(["ba-trends", "trend", "--delimiter", ";", "--mmap"]).unwrap();
        let Commands::Trend { args } = cli.command else {
            panic!("expected trend");
        };
        assert_eq!(args.read_options().delimiter, b';');
        assert!(args.read_options().use_mmap);
        assert_eq!(args.write_options().delimiter, b';');
        assert_eq!(args.write_options().compression, COMPRESSION_SNAPPY);

        assert_eq!(parse_delimiter("\\t"), Ok(b'\t'));
        assert!(parse_delimiter(";;").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let result = Cli::try_parse_from([
            "ba-trends",
            "trend",
            "--missing-policy",
            "sometimes",
        ]);
        assert!(result.is_err());
    }
}
