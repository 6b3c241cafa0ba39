use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{ArgAction, Parser, ValueHint};
use gpx_tour_tools::merge::{run_merge, MergeReport, SUMMARY_TIME_FORMAT};
use gpx_tour_tools::options::{MergeOptions, DEFAULT_TOURS_DIR};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Merge downloaded tour GPX files recorded within a date range",
    after_help = "Example: merge-by-date --connect 2025-08-15 2025-08-25 merged_rides.gpx"
)]
struct Cli {
    /// First day of the range (YYYY-MM-DD)
    start: NaiveDate,

    /// Last day of the range, inclusive (YYYY-MM-DD)
    end: NaiveDate,

    /// Merged GPX output path
    #[arg(value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Connect gaps between rides with marked connector points
    #[arg(long, action = ArgAction::SetTrue)]
    connect: bool,

    /// Directory holding downloaded tours
    #[arg(long, default_value = DEFAULT_TOURS_DIR, value_hint = ValueHint::DirPath)]
    tours_dir: PathBuf,

    /// Print the summary as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let opts = MergeOptions {
        tours_dir: cli.tours_dir,
        connect_gaps: cli.connect,
        ..MergeOptions::new(cli.start, cli.end, cli.output)
    };
    let report = run_merge(&opts).with_context(|| {
        format!(
            "merging rides from {} into {}",
            opts.tours_dir.display(),
            opts.output.display()
        )
    })?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &MergeReport) {
    if report.rides.is_empty() {
        println!("No rides found between {} and {}", report.start, report.end);
        return;
    }

    for ride in &report.rides {
        println!("Found ride: {} ({})", ride.name, ride.start.format(SUMMARY_TIME_FORMAT));
    }
    println!(
        "\nMerged {} rides into {}:",
        report.rides.len(),
        report.output.display()
    );
    for ride in &report.rides {
        println!("  - {} ({})", ride.name, ride.start.format(SUMMARY_TIME_FORMAT));
    }
}
