use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueHint};
use gpx_tour_tools::converter::{run_convert, ConversionReport};
use gpx_tour_tools::options::{
    ConvertOptions, DEFAULT_GAP_COLOR, DEFAULT_LINE_COLOR, DEFAULT_LINE_WIDTH,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert a GPX track to styled KML")]
struct Cli {
    /// GPX file to convert
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// KML output path
    #[arg(value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Line color in KML format (aabbggrr)
    #[arg(long, default_value = DEFAULT_LINE_COLOR)]
    color: String,

    /// Gap connection color in KML format (aabbggrr)
    #[arg(long, default_value = DEFAULT_GAP_COLOR)]
    gap_color: String,

    /// Line width
    #[arg(long, default_value_t = DEFAULT_LINE_WIDTH)]
    width: f64,

    /// Show waypoints for gap connections
    #[arg(long, action = ArgAction::SetTrue)]
    waypoints: bool,

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

    let opts = ConvertOptions {
        line_color: cli.color,
        gap_color: cli.gap_color,
        line_width: cli.width,
        show_waypoints: cli.waypoints,
    };
    let report = run_convert(&cli.input, &cli.output, &opts)
        .with_context(|| format!("converting {}", cli.input.display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &ConversionReport) {
    println!(
        "Converted {} to {}",
        report.input.display(),
        report.output.display()
    );
    println!(
        "Found {} track(s) with {} total segment(s)",
        report.tracks, report.segments
    );
}
