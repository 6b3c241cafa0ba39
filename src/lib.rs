//! Offline tools for tours downloaded as GPX: merge rides by date range and
//! convert tracks to styled KML.

pub mod converter;
pub mod error;
pub mod gpx_types;
pub mod kml;
pub mod merge;
pub mod options;
pub mod parser;
pub mod writer;

pub use converter::{is_gap_segment, run_convert, to_kml_document, ConversionReport};
pub use error::{Result, TourToolsError};
pub use gpx_types::{GpxData, GpxPoint, GpxSegment, GpxTrack};
pub use merge::{merge_rides, run_merge, DateWindow, MergeReport, Ride};
pub use options::{ConvertOptions, MergeOptions};
pub use parser::{parse_gpx, read_gpx_file};
pub use writer::{to_gpx_string, write_gpx_file};
