use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Deserialize;

/// Options for merging downloaded tours by date.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOptions {
    /// Directory scanned recursively for `.gpx` files (default: `tours`)
    #[serde(default = "default_tours_dir")]
    pub tours_dir: PathBuf,

    /// First calendar day of the window
    pub start: NaiveDate,

    /// Last calendar day of the window, inclusive
    pub end: NaiveDate,

    /// Where the merged GPX is written
    pub output: PathBuf,

    /// Join all rides into one segment with synthesized connectors (default: false)
    #[serde(default)]
    pub connect_gaps: bool,
}

impl MergeOptions {
    pub fn new(start: NaiveDate, end: NaiveDate, output: impl Into<PathBuf>) -> Self {
        Self {
            tours_dir: default_tours_dir(),
            start,
            end,
            output: output.into(),
            connect_gaps: false,
        }
    }
}

/// Options for GPX to KML conversion.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertOptions {
    /// Line color in KML `aabbggrr` notation (default: red)
    #[serde(default = "default_line_color")]
    pub line_color: String,

    /// Color of gap connection lines (default: translucent yellow)
    #[serde(default = "default_gap_color")]
    pub gap_color: String,

    /// Line width; gap lines are drawn at 0.75 of this (default: 4.0)
    #[serde(default = "default_line_width")]
    pub line_width: f64,

    /// Emit a point placemark for every gap connection point (default: false)
    #[serde(default)]
    pub show_waypoints: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            line_color: default_line_color(),
            gap_color: default_gap_color(),
            line_width: default_line_width(),
            show_waypoints: false,
        }
    }
}

pub const DEFAULT_TOURS_DIR: &str = "tours";
pub const DEFAULT_LINE_COLOR: &str = "ff0000ff";
pub const DEFAULT_GAP_COLOR: &str = "7f00ffff";
pub const DEFAULT_LINE_WIDTH: f64 = 4.0;

fn default_tours_dir() -> PathBuf {
    PathBuf::from(DEFAULT_TOURS_DIR)
}

fn default_line_color() -> String {
    DEFAULT_LINE_COLOR.to_string()
}

fn default_gap_color() -> String {
    DEFAULT_GAP_COLOR.to_string()
}

fn default_line_width() -> f64 {
    DEFAULT_LINE_WIDTH
}
