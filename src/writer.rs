use std::io::Write;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{Result, TourToolsError};
use crate::gpx_types::*;

/// Serialize a document as indented GPX, prefixed with the XML declaration.
pub fn to_gpx_string(data: &GpxData) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_declaration(&mut writer)?;

    let mut root = BytesStart::new("gpx");
    if let Some(version) = &data.version {
        root.push_attribute(("version", version.as_str()));
    }
    if let Some(creator) = &data.creator {
        root.push_attribute(("creator", creator.as_str()));
    }
    if let Some(xmlns) = &data.xmlns {
        root.push_attribute(("xmlns", xmlns.as_str()));
    }
    writer.write_event(Event::Start(root))?;

    for trk in &data.tracks {
        write_track(&mut writer, trk)?;
    }

    writer.write_event(Event::End(BytesEnd::new("gpx")))?;
    into_string(writer)
}

/// Serialize and write a GPX document, replacing any existing file.
pub fn write_gpx_file(path: &Path, data: &GpxData) -> Result<()> {
    let xml = to_gpx_string(data)?;
    std::fs::write(path, xml).map_err(|e| TourToolsError::io(path, e))
}

fn write_track<W: Write>(writer: &mut Writer<W>, trk: &GpxTrack) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("trk")))?;
    if let Some(name) = &trk.name {
        write_text_element(writer, "name", name)?;
    }
    for seg in &trk.segments {
        if seg.points.is_empty() {
            writer.write_event(Event::Empty(BytesStart::new("trkseg")))?;
            continue;
        }
        writer.write_event(Event::Start(BytesStart::new("trkseg")))?;
        for pt in &seg.points {
            write_point(writer, pt)?;
        }
        writer.write_event(Event::End(BytesEnd::new("trkseg")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("trk")))?;
    Ok(())
}

fn write_point<W: Write>(writer: &mut Writer<W>, pt: &GpxPoint) -> Result<()> {
    let lat = pt.lat.to_string();
    let lon = pt.lon.to_string();
    let mut start = BytesStart::new("trkpt");
    start.push_attribute(("lat", lat.as_str()));
    start.push_attribute(("lon", lon.as_str()));

    let has_children =
        pt.ele.is_some() || pt.time.is_some() || pt.name.is_some() || pt.desc.is_some();
    if !has_children {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if let Some(ele) = pt.ele {
        write_text_element(writer, "ele", &ele.to_string())?;
    }
    if let Some(time) = &pt.time {
        write_text_element(writer, "time", time)?;
    }
    if let Some(name) = &pt.name {
        write_text_element(writer, "name", name)?;
    }
    if let Some(desc) = &pt.desc {
        write_text_element(writer, "desc", desc)?;
    }
    writer.write_event(Event::End(BytesEnd::new("trkpt")))?;
    Ok(())
}

pub(crate) fn write_declaration<W: Write>(writer: &mut Writer<W>) -> Result<()> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    Ok(())
}

/// Write `<name>text</name>` with the text escaped.
pub(crate) fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

pub(crate) fn into_string(writer: Writer<Vec<u8>>) -> Result<String> {
    String::from_utf8(writer.into_inner()).map_err(|e| {
        TourToolsError::XmlWrite(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}
