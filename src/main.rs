//! Case Chart - daily case CSV analysis & chart export
//!
//! Command line entry point: load, filter, smooth, detect peaks, render.

use anyhow::{Context, Result};
use case_chart::charts::{
    timestamped_file_name, ChartRenderer, ChartStyle, DEFAULT_OUTPUT_DIR, MAX_DIMENSION,
};
use case_chart::data::{DataLoader, DataProcessor, LoaderError, DEFAULT_WINDOW};
use case_chart::stats::{StatsCalculator, DEFAULT_THRESHOLD};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

const FILE_PREFIX: &str = "covid_cases";

/// Generate daily case charts with a moving average and peak markers.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to input CSV file
    #[arg(long, default_value = "covid_cases.csv")]
    input: PathBuf,

    /// Start date in YYYY-MM-DD format (inclusive)
    #[arg(long)]
    start_date: Option<String>,

    /// End date in YYYY-MM-DD format (inclusive)
    #[arg(long)]
    end_date: Option<String>,

    /// Output directory for charts
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Output file name (defaults to a timestamped name)
    #[arg(long)]
    output_name: Option<String>,

    /// Moving average window in days
    #[arg(long, default_value_t = DEFAULT_WINDOW)]
    window: usize,

    /// Peak threshold in standard deviations above the mean
    #[arg(long, default_value_t = DEFAULT_THRESHOLD, allow_negative_numbers = true)]
    threshold: f64,

    /// Chart title
    #[arg(long)]
    title: Option<String>,

    /// Image width in pixels
    #[arg(
        long,
        default_value_t = ChartStyle::default().width,
        value_parser = clap::value_parser!(u32).range(1..=MAX_DIMENSION as i64)
    )]
    width: u32,

    /// Image height in pixels
    #[arg(
        long,
        default_value_t = ChartStyle::default().height,
        value_parser = clap::value_parser!(u32).range(1..=MAX_DIMENSION as i64)
    )]
    height: u32,
}

fn main() -> ExitCode {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Stdout)
        .init();

    let args = Cli::parse();
    log::debug!("{args:#?}");

    match run(args) {
        Ok(path) => {
            println!("Chart successfully generated: {}", path.display());
            ExitCode::SUCCESS
        }
        Err(error) if is_missing_input(&error) => {
            println!("Error: {error:#}. Please check if the input file exists.");
            ExitCode::FAILURE
        }
        Err(error) => {
            println!("An error occurred: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn is_missing_input(error: &anyhow::Error) -> bool {
    error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<LoaderError>())
        .any(LoaderError::is_not_found)
}

fn run(args: Cli) -> Result<PathBuf> {
    log::info!("Loading data from {}...", args.input.display());
    let mut table = DataLoader::load_csv(&args.input)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    log::info!("Loaded {} record(s)", table.len());

    if args.start_date.is_some() || args.end_date.is_some() {
        log::info!(
            "Filtering data from {} to {}",
            args.start_date.as_deref().unwrap_or("start"),
            args.end_date.as_deref().unwrap_or("end")
        );
        DataProcessor::filter_by_date_range(
            &mut table,
            args.start_date.as_deref(),
            args.end_date.as_deref(),
        )
        .context("failed to filter by date range")?;
        log::info!("{} record(s) in range", table.len());
    }

    log::info!("Computing {}-day moving average...", args.window);
    DataProcessor::compute_moving_average(&mut table, args.window)
        .context("failed to compute moving average")?;

    log::info!("Detecting significant peaks...");
    let peaks = StatsCalculator::detect_peaks(&mut table, args.threshold)
        .context("failed to detect peaks")?;
    if !peaks.is_empty() {
        log::info!("Found {} significant peak(s) in the data", peaks.len());
    }
    for peak in &peaks {
        log::debug!(
            "peak on {}: {} cases (z = {:.2})",
            peak.date,
            peak.cases,
            peak.z_score
        );
    }

    log::info!("Generating chart...");
    let title = args.title.unwrap_or_else(|| {
        format!(
            "COVID-19 Daily Cases with {}-Day Moving Average",
            args.window
        )
    });
    let file_name = args
        .output_name
        .unwrap_or_else(|| timestamped_file_name(FILE_PREFIX, &chrono::Local::now()));

    let renderer = ChartRenderer::new(&args.output_dir).with_style(ChartStyle {
        width: args.width,
        height: args.height,
    });
    let path = renderer
        .render(&table, &peaks, &title, &file_name)
        .with_context(|| format!("failed to render chart to {}", args.output_dir.display()))?;

    Ok(path)
}
