use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::gpx_types::*;
use crate::kml::{write_kml_file, Geometry, KmlDocument, LineStyle, Placemark};
use crate::options::ConvertOptions;
use crate::parser::read_gpx_file;

pub const NORMAL_STYLE: &str = "normal";
pub const GAP_STYLE: &str = "gap";
pub const GAP_SEGMENT_DESCRIPTION: &str = "Gap connection";

/// Gap lines are drawn slightly thinner than real tracks.
const GAP_WIDTH_FACTOR: f64 = 0.75;

/// Decide whether a segment bridges two rides rather than recording one.
///
/// A segment is a gap if it carries an explicit `Gap Connection` point, or if
/// it has at most two points and sits strictly between the first and last
/// segment of its track. The second rule is a heuristic and will also catch
/// genuinely short recordings.
pub fn is_gap_segment(segment: &GpxSegment, index: usize, segment_count: usize) -> bool {
    let marked = segment.points.iter().any(GpxPoint::is_gap_connection);
    let short_bridge = segment.points.len() <= 2 && index > 0 && index + 1 < segment_count;
    marked || short_bridge
}

/// Convert parsed GPX data to a styled KML document named `name`.
pub fn to_kml_document(data: &GpxData, name: String, opts: &ConvertOptions) -> KmlDocument {
    let styles = vec![
        LineStyle {
            id: NORMAL_STYLE.to_string(),
            color: opts.line_color.clone(),
            width: opts.line_width,
        },
        LineStyle {
            id: GAP_STYLE.to_string(),
            color: opts.gap_color.clone(),
            width: opts.line_width * GAP_WIDTH_FACTOR,
        },
    ];

    let mut placemarks = Vec::new();
    let mut unnamed_tracks = 0;
    for trk in &data.tracks {
        let track_name = match trk.display_name() {
            Some(name) => name.to_string(),
            None => {
                unnamed_tracks += 1;
                format!("Track {unnamed_tracks}")
            }
        };
        placemarks.extend(track_to_placemarks(trk, &track_name, opts));
    }

    KmlDocument {
        name,
        styles,
        placemarks,
    }
}

fn track_to_placemarks(trk: &GpxTrack, track_name: &str, opts: &ConvertOptions) -> Vec<Placemark> {
    let segment_count = trk.segments.len();
    let mut placemarks = Vec::new();

    for (index, seg) in trk.segments.iter().enumerate() {
        if seg.points.is_empty() {
            continue;
        }

        if opts.show_waypoints {
            placemarks.extend(
                seg.points
                    .iter()
                    .filter(|pt| pt.is_gap_connection())
                    .map(gap_waypoint),
            );
        }

        let name = if segment_count > 1 {
            format!("{track_name} - Segment {}", index + 1)
        } else {
            track_name.to_string()
        };

        let gap = is_gap_segment(seg, index, segment_count);
        if gap {
            debug!("{name}: classified as gap segment");
        }
        placemarks.push(Placemark {
            name,
            description: gap.then(|| GAP_SEGMENT_DESCRIPTION.to_string()),
            style: Some((if gap { GAP_STYLE } else { NORMAL_STYLE }).to_string()),
            geometry: Geometry::LineString(seg.points.iter().map(line_coordinate).collect()),
        });
    }

    placemarks
}

fn gap_waypoint(pt: &GpxPoint) -> Placemark {
    Placemark {
        name: GAP_CONNECTION.to_string(),
        description: pt.desc.clone(),
        style: None,
        geometry: Geometry::Point(point_coordinate(pt)),
    }
}

/// `lon,lat[,ele]` for a line vertex; elevation is left out when absent or
/// exactly zero.
fn line_coordinate(pt: &GpxPoint) -> String {
    match pt.ele {
        Some(ele) if ele != 0.0 => format!("{:.6},{:.6},{:.6}", pt.lon, pt.lat, ele),
        _ => format!("{:.6},{:.6}", pt.lon, pt.lat),
    }
}

/// `lon,lat,ele` for a point placemark; elevation is always written.
fn point_coordinate(pt: &GpxPoint) -> String {
    format!(
        "{:.6},{:.6},{:.6}",
        pt.lon,
        pt.lat,
        pt.ele.unwrap_or_default()
    )
}

/// Document name for a converted file: the input path minus a `.gpx` suffix.
pub fn document_name(input: &Path) -> String {
    let path = input.to_string_lossy();
    path.strip_suffix(".gpx").unwrap_or(&path).to_string()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub tracks: usize,
    pub segments: usize,
    pub placemarks: usize,
    pub gap_segments: usize,
}

/// Read `input`, convert it and write the KML to `output`. Any failure aborts.
pub fn run_convert(input: &Path, output: &Path, opts: &ConvertOptions) -> Result<ConversionReport> {
    let data = read_gpx_file(input)?;
    let doc = to_kml_document(&data, document_name(input), opts);
    write_kml_file(output, &doc)?;

    let gap_segments = doc
        .placemarks
        .iter()
        .filter(|p| p.is_line() && p.style.as_deref() == Some(GAP_STYLE))
        .count();
    info!(
        "Wrote {} placemark(s) to {}",
        doc.placemarks.len(),
        output.display()
    );

    Ok(ConversionReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        tracks: data.tracks.len(),
        segments: data.segment_count(),
        placemarks: doc.placemarks.len(),
        gap_segments,
    })
}
