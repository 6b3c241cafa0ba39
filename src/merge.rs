use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Result, TourToolsError};
use crate::gpx_types::*;
use crate::options::MergeOptions;
use crate::parser::read_gpx_file;
use crate::writer::write_gpx_file;

/// Timestamp layout used by the tour service, e.g. `2025-08-16T07:12:45.000Z`.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.%3fZ";

/// Layout for ride timestamps in human summaries.
pub const SUMMARY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub const MERGER_CREATOR: &str = "Date Range GPX Merger";
pub const GAP_DESCRIPTION: &str = "Connected gap between rides";

/// One downloaded tour, ready to be merged.
#[derive(Debug, Clone)]
pub struct Ride {
    pub path: PathBuf,
    /// Name of the directory holding the track file.
    pub name: String,
    /// First timestamp found in the document.
    pub start: DateTime<Utc>,
    pub gpx: GpxData,
}

impl Ride {
    /// Build a ride from an already parsed document.
    pub fn from_gpx(path: &Path, gpx: GpxData) -> Result<Self> {
        let time = gpx
            .first_time()
            .ok_or_else(|| TourToolsError::NoTimestamp(path.to_path_buf()))?;
        let start = parse_timestamp(time)?;
        Ok(Self {
            path: path.to_path_buf(),
            name: ride_name(path),
            start,
            gpx,
        })
    }

    /// Read, parse and date a track file.
    pub fn load(path: &Path) -> Result<Self> {
        let gpx = read_gpx_file(path)?;
        Self::from_gpx(path, gpx)
    }
}

/// Half-open UTC window covering whole calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: DateTime<Utc>,
    end_exclusive: DateTime<Utc>,
}

impl DateWindow {
    /// `end` is inclusive: the window closes at midnight of the following day.
    ///
    /// Fails when `end` is the last date chrono can represent.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let day_after = end.succ_opt().ok_or(TourToolsError::DateOutOfRange(end))?;
        Ok(Self {
            start: start.and_time(NaiveTime::MIN).and_utc(),
            end_exclusive: day_after.and_time(NaiveTime::MIN).and_utc(),
        })
    }

    /// Strictly after the start instant and strictly before the end.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts > self.start && ts < self.end_exclusive
    }
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, TIME_FORMAT)
        .map(|dt| dt.and_utc())
        .map_err(|source| TourToolsError::Timestamp {
            value: value.to_string(),
            source,
        })
}

/// Base name of the directory containing `path`.
pub fn ride_name(path: &Path) -> String {
    path.parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Recursively collect every `*.gpx` file under `root`, in file name order.
pub fn discover_gpx_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| TourToolsError::Scan {
            root: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "gpx")
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Load every file, keeping rides that start inside `window`.
///
/// Files that fail to parse or carry no usable timestamp are logged and skipped.
pub fn collect_rides(files: &[PathBuf], window: &DateWindow) -> Vec<Ride> {
    let mut rides = Vec::new();
    for path in files {
        let ride = match Ride::load(path) {
            Ok(ride) => ride,
            Err(e) => {
                warn!("skipping {}: {e}", path.display());
                continue;
            }
        };
        if window.contains(ride.start) {
            debug!(
                "Found ride: {} ({})",
                ride.name,
                ride.start.format(SUMMARY_TIME_FORMAT)
            );
            rides.push(ride);
        }
    }
    rides.sort_by_key(|ride| ride.start);
    rides
}

/// Merge rides (already in chronological order) into a single-track document.
pub fn merge_rides(rides: &[Ride], track_name: String, connect_gaps: bool) -> GpxData {
    let segments = if connect_gaps {
        vec![connected_segment(rides)]
    } else {
        rides
            .iter()
            .flat_map(|ride| ride.gpx.tracks.iter())
            .flat_map(|trk| trk.segments.iter().cloned())
            .collect()
    };

    GpxData {
        version: Some("1.1".to_string()),
        creator: Some(MERGER_CREATOR.to_string()),
        xmlns: Some(GPX_NAMESPACE.to_string()),
        tracks: vec![GpxTrack {
            name: Some(track_name),
            segments,
        }],
    }
}

fn connected_segment(rides: &[Ride]) -> GpxSegment {
    let mut points: Vec<GpxPoint> = Vec::new();
    for (i, ride) in rides.iter().enumerate() {
        if i > 0 {
            let gap = match (points.last(), ride.gpx.points().next()) {
                (Some(last), Some(first)) => gap_connection(last, first),
                _ => None,
            };
            points.extend(gap);
        }
        points.extend(ride.gpx.points().cloned());
    }
    GpxSegment { points }
}

/// Midpoint marker between two rides.
///
/// Returns `None` when either side sits at latitude 0.0, which is treated as
/// "no position" (this also drops real equator crossings).
pub fn gap_connection(last: &GpxPoint, first: &GpxPoint) -> Option<GpxPoint> {
    if last.lat == 0.0 || first.lat == 0.0 {
        return None;
    }
    let mut gap = GpxPoint::new((last.lat + first.lat) / 2.0, (last.lon + first.lon) / 2.0);
    gap.name = Some(GAP_CONNECTION.to_string());
    gap.desc = Some(GAP_DESCRIPTION.to_string());
    Some(gap)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RideSummary {
    pub name: String,
    pub path: PathBuf,
    pub start: DateTime<Utc>,
}

/// Outcome of a merge run. `rides` is empty when nothing fell in range, in
/// which case no output file was written.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub output: PathBuf,
    pub connected: bool,
    pub rides: Vec<RideSummary>,
}

/// Scan, filter, merge and write. Scan and write failures are fatal.
pub fn run_merge(opts: &MergeOptions) -> Result<MergeReport> {
    let window = DateWindow::new(opts.start, opts.end)?;
    let files = discover_gpx_files(&opts.tours_dir)?;
    info!(
        "Scanned {}: {} GPX file(s)",
        opts.tours_dir.display(),
        files.len()
    );

    let rides = collect_rides(&files, &window);

    let mut report = MergeReport {
        start: opts.start,
        end: opts.end,
        output: opts.output.clone(),
        connected: opts.connect_gaps,
        rides: Vec::new(),
    };
    if rides.is_empty() {
        return Ok(report);
    }

    let track_name = format!("Merged rides {} to {}", opts.start, opts.end);
    let merged = merge_rides(&rides, track_name, opts.connect_gaps);
    write_gpx_file(&opts.output, &merged)?;

    report.rides = rides
        .into_iter()
        .map(|ride| RideSummary {
            name: ride.name,
            path: ride.path,
            start: ride.start,
        })
        .collect();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_gpx;

    fn ride(name: &str, start: &str, coords: &[&[(f64, f64)]]) -> Ride {
        let segments = coords
            .iter()
            .map(|seg| GpxSegment {
                points: seg.iter().map(|&(lat, lon)| GpxPoint::new(lat, lon)).collect(),
            })
            .collect();
        Ride {
            path: PathBuf::from(format!("tours/{name}/{name}.gpx")),
            name: name.to_string(),
            start: parse_timestamp(start).unwrap(),
            gpx: GpxData {
                tracks: vec![GpxTrack {
                    name: Some(name.to_string()),
                    segments,
                }],
                ..Default::default()
            },
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("2025-08-16T07:12:45.123Z").unwrap();
        assert_eq!(ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string(), "2025-08-16 07:12:45.123");
        assert!(parse_timestamp("2025-08-16 07:12").is_err());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_window_end_is_inclusive_by_day() {
        let window = DateWindow::new(date("2025-08-15"), date("2025-08-25")).unwrap();
        assert!(window.contains(parse_timestamp("2025-08-25T23:59:59.000Z").unwrap()));
        assert!(!window.contains(parse_timestamp("2025-08-26T00:00:00.000Z").unwrap()));
        assert!(window.contains(parse_timestamp("2025-08-15T00:00:00.001Z").unwrap()));
        assert!(!window.contains(parse_timestamp("2025-08-15T00:00:00.000Z").unwrap()));
    }

    #[test]
    fn test_window_rejects_last_representable_day() {
        let err = DateWindow::new(date("2025-01-01"), NaiveDate::MAX).unwrap_err();
        assert!(matches!(err, TourToolsError::DateOutOfRange(d) if d == NaiveDate::MAX));

        let window = DateWindow::new(NaiveDate::MIN, NaiveDate::MAX.pred_opt().unwrap()).unwrap();
        assert!(window.contains(parse_timestamp("2025-08-16T07:00:00.000Z").unwrap()));
    }

    #[test]
    fn test_ride_name_from_parent_dir() {
        assert_eq!(ride_name(Path::new("tours/12345 Alpine Loop/tour.gpx")), "12345 Alpine Loop");
    }

    #[test]
    fn test_ride_without_timestamp_rejected() {
        let gpx = parse_gpx(r#"<gpx><trk><trkseg><trkpt lat="1" lon="2"/></trkseg></trk></gpx>"#)
            .unwrap();
        let err = Ride::from_gpx(Path::new("tours/1/1.gpx"), gpx).unwrap_err();
        assert!(matches!(err, TourToolsError::NoTimestamp(_)));
    }

    #[test]
    fn test_first_timestamp_must_parse() {
        let gpx = parse_gpx(
            r#"<gpx><trk><trkseg>
                <trkpt lat="1" lon="2"><time>garbage</time></trkpt>
                <trkpt lat="1" lon="2"><time>2025-08-16T07:00:00.000Z</time></trkpt>
            </trkseg></trk></gpx>"#,
        )
        .unwrap();
        let err = Ride::from_gpx(Path::new("tours/1/1.gpx"), gpx).unwrap_err();
        assert!(matches!(err, TourToolsError::Timestamp { .. }));
    }

    #[test]
    fn test_disconnected_keeps_every_segment() {
        let rides = vec![
            ride("100", "2025-08-16T07:00:00.000Z", &[&[(48.0, 11.0), (48.1, 11.1)], &[(48.2, 11.2)]]),
            ride("200", "2025-08-20T07:00:00.000Z", &[&[(47.0, 10.0), (47.1, 10.1)]]),
        ];
        let merged = merge_rides(&rides, "Merged".to_string(), false);
        assert_eq!(merged.tracks.len(), 1);
        assert_eq!(merged.tracks[0].segments.len(), 3);
        assert_eq!(merged.points().count(), 5);
        assert_eq!(merged.creator.as_deref(), Some(MERGER_CREATOR));
    }

    #[test]
    fn test_connected_inserts_midpoint_between_rides_only() {
        let rides = vec![
            ride("100", "2025-08-16T07:00:00.000Z", &[&[(48.0, 11.0)], &[(48.2, 11.2)]]),
            ride("200", "2025-08-20T07:00:00.000Z", &[&[(47.0, 10.0), (47.1, 10.1)]]),
            ride("300", "2025-08-22T07:00:00.000Z", &[&[(46.0, 9.0)]]),
        ];
        let merged = merge_rides(&rides, "Merged".to_string(), true);
        let segments = &merged.tracks[0].segments;
        assert_eq!(segments.len(), 1);

        let points = &segments[0].points;
        assert_eq!(points.len(), 5 + 2);
        let gaps: Vec<&GpxPoint> = points.iter().filter(|p| p.is_gap_connection()).collect();
        assert_eq!(gaps.len(), 2);

        assert!(points[2].is_gap_connection());
        assert!((points[2].lat - 47.6).abs() < 1e-9);
        assert!((points[2].lon - 10.6).abs() < 1e-9);
        assert_eq!(points[2].desc.as_deref(), Some(GAP_DESCRIPTION));
        assert_eq!(points[2].ele, None);
        assert!((points[5].lat - 46.55).abs() < 1e-9);
    }

    #[test]
    fn test_connected_skips_equator_boundary() {
        let rides = vec![
            ride("100", "2025-08-16T07:00:00.000Z", &[&[(1.0, 30.0), (0.0, 30.5)]]),
            ride("200", "2025-08-20T07:00:00.000Z", &[&[(-1.0, 31.0)]]),
        ];
        let merged = merge_rides(&rides, "Merged".to_string(), true);
        let points = &merged.tracks[0].segments[0].points;
        assert_eq!(points.len(), 3);
        assert!(!points.iter().any(GpxPoint::is_gap_connection));
    }
}
