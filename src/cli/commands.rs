use crate::analyzers::TrendAnalyzer;
use crate::cli::args::{AnalysisArgs, Cli, Commands};
use crate::config::AnalysisConfig;
use crate::error::{ProcessingError, Result};
use crate::models::AttributeTable;
use crate::processors::{AnalysisKind, CoverageChecker, ParallelProcessor};
use crate::readers::{self, ReadOptions};
use crate::utils::filename::TableFormat;
use crate::utils::progress::ProgressReporter;
use crate::writers::{self, ParquetWriter};
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, Level};

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Trend { args } => run_analysis(AnalysisKind::Trend, args, cli.quiet).await,
        Commands::Correlate { args } => {
            run_analysis(AnalysisKind::Correlation, args, cli.quiet).await
        }
        Commands::Analyze { args } => run_analysis(AnalysisKind::Full, args, cli.quiet).await,
        Commands::Info {
            file,
            sample,
            significance,
            delimiter,
        } => {
            println!("Analyzing result table: {}", file.display());

            let analyzer = TrendAnalyzer::new().with_significance_level(significance);
            let stats = analyzer.analyze_file(
                &file,
                &ReadOptions {
                    delimiter,
                    ..ReadOptions::default()
                },
                sample,
            )?;
            println!("\n{}", stats.detailed_summary());

            if TableFormat::from_path(&file)? == TableFormat::Parquet {
                let file_info = ParquetWriter::new().get_file_info(&file)?;
                println!("\nFile Details:");
                println!("{}", file_info.summary());
            }
            Ok(())
        }
    }
}

async fn run_analysis(kind: AnalysisKind, args: AnalysisArgs, quiet: bool) -> Result<()> {
    let config = AnalysisConfig::load(args.config.as_deref(), &args.overrides(kind))?;

    println!("Input file: {}", config.input_path.display());
    println!("Output file: {}", config.output_path.display());
    println!(
        "Years: {}-{}, Response: {}, Covariates: {}, {}",
        config.year_range.start,
        config.year_range.end,
        config.response_prefix,
        config.covariate_prefixes.a,
        config.covariate_prefixes.b
    );
    println!("Workers: {}", args.max_workers);

    let input = config.input_path.clone();
    let read_options = args.read_options();
    let mut table =
        tokio::task::spawn_blocking(move || readers::read_table(&input, &read_options)).await??;
    info!(
        rows = table.row_count(),
        columns = table.column_count(),
        "Loaded attribute table"
    );

    let processor = ParallelProcessor::new(args.max_workers)
        .with_analysis(kind)
        .with_missing_policy(config.missing_policy)
        .with_trend_diagnostics(config.trend_diagnostics);

    let run_config = config.clone();
    let (table, outcome) = tokio::task::spawn_blocking(move || {
        let progress = ProgressReporter::new(0, "Analysing spatial units...", quiet);
        let outcome = processor.run(&mut table, &run_config, Some(&progress))?;
        Ok::<_, ProcessingError>((table, outcome))
    })
    .await??;

    let checker = CoverageChecker::new(config.significance_level);
    let report = checker.check(&outcome);
    println!("\n{}", checker.generate_summary(&report));

    let options = args.write_options();
    let output = config.output_path.clone();
    tokio::task::spawn_blocking(move || writers::write_table(&table, &output, &options)).await??;
    info!(path = %config.output_path.display(), "Wrote result table");

    if let Some(report_path) = &args.report {
        write_report(&report, report_path)?;
        println!("Coverage report written to {}", report_path.display());
    }

    println!("Analysis complete!");
    Ok(())
}

fn write_report<T: serde::Serialize>(report: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    // A subscriber may already be installed when running inside tests
    let _ = match log_file {
        Some(path) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(File::create(path)?))
            .try_init(),
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    if verbose {
        info!("Verbose logging enabled");
    }
    Ok(())
}
