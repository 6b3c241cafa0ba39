use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::error::{Result, TourToolsError};
use crate::gpx_types::*;

/// Read and parse a GPX file from disk.
pub fn read_gpx_file(path: &Path) -> Result<GpxData> {
    let xml = std::fs::read_to_string(path).map_err(|e| TourToolsError::io(path, e))?;
    parse_gpx(&xml)
}

/// Parse a GPX XML string into GpxData.
///
/// Only track content is kept; waypoints, routes, metadata and extensions
/// are skipped. The document must have a `<gpx>` root.
pub fn parse_gpx(xml: &str) -> Result<GpxData> {
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let mut data = parse_root_attributes(&e)?;
                parse_gpx_body(&mut reader, &mut data)?;
                return Ok(data);
            }
            Event::Empty(e) => return parse_root_attributes(&e),
            Event::Eof => return Err(TourToolsError::MissingRoot),
            _ => {}
        }
    }
}

/// Validate the root element and pick up its version/creator/xmlns.
fn parse_root_attributes(e: &BytesStart<'_>) -> Result<GpxData> {
    if e.local_name().as_ref() != b"gpx" {
        let found = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        return Err(TourToolsError::UnexpectedRoot(found));
    }

    let mut data = GpxData::default();
    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| TourToolsError::XmlParse(e.into()))?;
        let val = String::from_utf8_lossy(&attr.value).into_owned();
        match attr.key.as_ref() {
            b"version" => data.version = Some(val),
            b"creator" => data.creator = Some(val),
            b"xmlns" => data.xmlns = Some(val),
            _ => {}
        }
    }
    Ok(data)
}

/// Parse the children of <gpx> up to its end tag.
fn parse_gpx_body<'a>(reader: &mut Reader<&'a [u8]>, data: &mut GpxData) -> Result<()> {
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"trk" => data.tracks.push(parse_track(reader)?),
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Event::Empty(e) if e.local_name().as_ref() == b"trk" => {
                data.tracks.push(GpxTrack::default());
            }
            Event::End(e) if e.local_name().as_ref() == b"gpx" => return Ok(()),
            Event::Eof => return Err(TourToolsError::UnexpectedEof("gpx")),
            _ => {}
        }
    }
}

/// Parse lat/lon attributes from a point element's start tag.
fn parse_lat_lon(e: &BytesStart<'_>) -> Result<(f64, f64)> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| TourToolsError::XmlParse(e.into()))?;
        let key = attr.key.local_name();
        let val = std::str::from_utf8(&attr.value).unwrap_or_default().trim();
        match key.as_ref() {
            b"lat" => {
                lat = Some(val.parse::<f64>().map_err(|_| {
                    TourToolsError::InvalidAttribute {
                        element: "trkpt",
                        attribute: "lat",
                        value: val.to_string(),
                    }
                })?);
            }
            b"lon" => {
                lon = Some(val.parse::<f64>().map_err(|_| {
                    TourToolsError::InvalidAttribute {
                        element: "trkpt",
                        attribute: "lon",
                        value: val.to_string(),
                    }
                })?);
            }
            _ => {}
        }
    }

    let lat = lat.ok_or(TourToolsError::MissingAttribute {
        element: "trkpt",
        attribute: "lat",
    })?;
    let lon = lon.ok_or(TourToolsError::MissingAttribute {
        element: "trkpt",
        attribute: "lon",
    })?;

    Ok((lat, lon))
}

/// Parse a <trkpt> element and its children.
/// Called after receiving Event::Start for the point element.
fn parse_point<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
) -> Result<Option<GpxPoint>> {
    let (lat, lon) = match parse_lat_lon(start) {
        Ok(coords) => coords,
        Err(e) => {
            debug!("skipping track point: {e}");
            reader.read_to_end(start.name())?;
            return Ok(None);
        }
    };

    let mut point = GpxPoint::new(lat, lon);
    let end_name = start.name().0.to_vec();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"ele" => {
                    let text = reader.read_text(e.name())?;
                    point.ele = text.trim().parse::<f64>().ok();
                    if point.ele.is_none() {
                        debug!("ignoring unparseable elevation '{}'", text.trim());
                    }
                }
                b"time" => point.time = Some(read_text_owned(reader, &e)?),
                b"name" => point.name = Some(read_text_owned(reader, &e)?),
                b"desc" => point.desc = Some(read_text_owned(reader, &e)?),
                _ => {
                    // extensions, hr/cadence, etc.
                    reader.read_to_end(e.name())?;
                }
            },
            Event::End(e) if e.name().0 == end_name.as_slice() => break,
            Event::Eof => return Err(TourToolsError::UnexpectedEof("trkpt")),
            _ => {}
        }
    }

    Ok(Some(point))
}

/// Parse a <trk> element.
fn parse_track<'a>(reader: &mut Reader<&'a [u8]>) -> Result<GpxTrack> {
    let mut track = GpxTrack::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"name" => track.name = Some(read_text_owned(reader, &e)?),
                // Empty segments are kept: segment position matters downstream.
                b"trkseg" => track.segments.push(parse_segment(reader)?),
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"name" => track.name = Some(String::new()),
                b"trkseg" => track.segments.push(GpxSegment::default()),
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"trk" => break,
            Event::Eof => return Err(TourToolsError::UnexpectedEof("trk")),
            _ => {}
        }
    }

    Ok(track)
}

/// Parse a <trkseg> element.
fn parse_segment<'a>(reader: &mut Reader<&'a [u8]>) -> Result<GpxSegment> {
    let mut segment = GpxSegment::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"trkpt" => {
                    if let Some(pt) = parse_point(&e, reader)? {
                        segment.points.push(pt);
                    }
                }
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"trkpt" {
                    match parse_lat_lon(&e) {
                        Ok((lat, lon)) => segment.points.push(GpxPoint::new(lat, lon)),
                        Err(err) => debug!("skipping track point: {err}"),
                    }
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"trkseg" => break,
            Event::Eof => return Err(TourToolsError::UnexpectedEof("trkseg")),
            _ => {}
        }
    }

    Ok(segment)
}

/// Read text content of an element as an owned String.
/// Handles regular text, CDATA sections, and entity references (Event::GeneralRef).
fn read_text_owned<'a>(reader: &mut Reader<&'a [u8]>, start: &BytesStart<'_>) -> Result<String> {
    let end_name = start.name().0.to_vec();
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                let raw = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                text.push_str(raw);
            }
            Event::CData(e) => {
                let s = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                text.push_str(s);
            }
            Event::GeneralRef(e) => {
                if let Ok(Some(ch)) = e.resolve_char_ref() {
                    text.push(ch);
                } else {
                    let name = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                    match name {
                        "amp" => text.push('&'),
                        "lt" => text.push('<'),
                        "gt" => text.push('>'),
                        "quot" => text.push('"'),
                        "apos" => text.push('\''),
                        _ => {}
                    }
                }
            }
            Event::End(e) if e.name().0 == end_name.as_slice() => break,
            Event::Eof => return Err(TourToolsError::UnexpectedEof("text")),
            _ => {}
        }
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_metadata() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="komoot" xmlns="http://www.topografix.com/GPX/1/1"></gpx>"#;
        let data = parse_gpx(xml).unwrap();
        assert_eq!(data.version.as_deref(), Some("1.1"));
        assert_eq!(data.creator.as_deref(), Some("komoot"));
        assert_eq!(data.xmlns.as_deref(), Some(GPX_NAMESPACE));
        assert!(data.tracks.is_empty());
    }

    #[test]
    fn test_simple_track() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <name>Morning Ride</name>
    <trkseg>
      <trkpt lat="48.1" lon="11.5"><ele>520.0</ele><time>2025-08-16T07:00:00.000Z</time></trkpt>
      <trkpt lat="48.101" lon="11.501"><ele>521.0</ele></trkpt>
      <trkpt lat="48.102" lon="11.502"/>
    </trkseg>
  </trk>
</gpx>"#;
        let data = parse_gpx(xml).unwrap();
        assert_eq!(data.tracks.len(), 1);
        assert_eq!(data.tracks[0].name.as_deref(), Some("Morning Ride"));
        let points = &data.tracks[0].segments[0].points;
        assert_eq!(points.len(), 3);
        assert!((points[0].ele.unwrap() - 520.0).abs() < 1e-10);
        assert_eq!(points[0].time.as_deref(), Some("2025-08-16T07:00:00.000Z"));
        assert_eq!(points[2].ele, None);
        assert_eq!(data.first_time(), Some("2025-08-16T07:00:00.000Z"));
    }

    #[test]
    fn test_zero_elevation_is_present() {
        let xml = r#"<gpx><trk><trkseg>
      <trkpt lat="0.5" lon="1.5"><ele>0</ele></trkpt>
    </trkseg></trk></gpx>"#;
        let data = parse_gpx(xml).unwrap();
        assert_eq!(data.tracks[0].segments[0].points[0].ele, Some(0.0));
    }

    #[test]
    fn test_self_closing_track_kept() {
        let data = parse_gpx("<gpx><trk/><trk><name>x</name></trk></gpx>").unwrap();
        assert_eq!(data.tracks.len(), 2);
        assert_eq!(data.tracks[0], GpxTrack::default());
        assert_eq!(data.tracks[1].name.as_deref(), Some("x"));
    }

    #[test]
    fn test_empty_segments_kept() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <trkseg></trkseg>
    <trkseg>
      <trkpt lat="35.0" lon="139.0"/>
    </trkseg>
    <trkseg/>
  </trk>
</gpx>"#;
        let data = parse_gpx(xml).unwrap();
        assert_eq!(data.tracks[0].segments.len(), 3);
        assert!(data.tracks[0].segments[0].points.is_empty());
        assert_eq!(data.tracks[0].segments[1].points.len(), 1);
        assert_eq!(data.segment_count(), 3);
    }

    #[test]
    fn test_gap_marker_fields() {
        let xml = r#"<gpx><trk><trkseg>
      <trkpt lat="1.0" lon="2.0"><name>Gap Connection</name><desc>Connected gap between rides</desc></trkpt>
    </trkseg></trk></gpx>"#;
        let data = parse_gpx(xml).unwrap();
        let pt = &data.tracks[0].segments[0].points[0];
        assert!(pt.is_gap_connection());
        assert_eq!(pt.desc.as_deref(), Some("Connected gap between rides"));
    }

    #[test]
    fn test_waypoints_and_routes_ignored() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <metadata><name>Not a track</name></metadata>
  <wpt lat="35.0" lon="139.0"><name>Tokyo</name></wpt>
  <rte><rtept lat="35.0" lon="139.0"/></rte>
  <trk><trkseg><trkpt lat="35.0" lon="139.0"/></trkseg></trk>
</gpx>"#;
        let data = parse_gpx(xml).unwrap();
        assert_eq!(data.tracks.len(), 1);
        assert_eq!(data.points().count(), 1);
    }

    #[test]
    fn test_extensions_skipped() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <trkseg>
      <trkpt lat="35.0" lon="139.0">
        <extensions>
          <gpxtpx:TrackPointExtension xmlns:gpxtpx="http://www.garmin.com/xmlschemas/TrackPointExtension/v1">
            <gpxtpx:hr>150</gpxtpx:hr>
          </gpxtpx:TrackPointExtension>
        </extensions>
      </trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        let data = parse_gpx(xml).unwrap();
        assert_eq!(data.tracks[0].segments[0].points.len(), 1);
    }

    #[test]
    fn test_cdata_and_entities() {
        let xml = r#"<gpx><trk><name><![CDATA[Hill & Dale]]></name><trkseg>
      <trkpt lat="1" lon="2"><desc>Fish &amp; Chips</desc></trkpt>
    </trkseg></trk></gpx>"#;
        let data = parse_gpx(xml).unwrap();
        assert_eq!(data.tracks[0].name.as_deref(), Some("Hill & Dale"));
        assert_eq!(
            data.tracks[0].segments[0].points[0].desc.as_deref(),
            Some("Fish & Chips")
        );
    }

    #[test]
    fn test_missing_lat_lon_skipped() {
        let xml = r#"<gpx><trk><trkseg>
      <trkpt lat="35.0" lon="139.0"/>
      <trkpt lon="139.5"><name>no lat</name></trkpt>
      <trkpt lat="36.0" lon="140.0"/>
    </trkseg></trk></gpx>"#;
        let data = parse_gpx(xml).unwrap();
        assert_eq!(data.tracks[0].segments[0].points.len(), 2);
    }

    #[test]
    fn test_wrong_root_rejected() {
        let xml = r#"<kml xmlns="http://www.opengis.net/kml/2.2"><Document/></kml>"#;
        assert!(matches!(
            parse_gpx(xml),
            Err(TourToolsError::UnexpectedRoot(name)) if name == "kml"
        ));
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(parse_gpx(""), Err(TourToolsError::MissingRoot)));
    }

    #[test]
    fn test_truncated_document_rejected() {
        let xml = r#"<gpx><trk><trkseg><trkpt lat="1" lon="2"/>"#;
        assert!(parse_gpx(xml).is_err());
    }

    #[test]
    fn test_mismatched_tags_rejected() {
        let xml = r#"<gpx><trk><trkseg></trk></trkseg></gpx>"#;
        assert!(parse_gpx(xml).is_err());
    }
}
