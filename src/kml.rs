//! Minimal KML 2.2 model: one document of line styles and placemarks.

use std::io::Write;
use std::path::Path;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use crate::error::{Result, TourToolsError};
use crate::writer::{into_string, write_declaration, write_text_element};

pub const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KmlDocument {
    pub name: String,
    pub styles: Vec<LineStyle>,
    pub placemarks: Vec<Placemark>,
}

/// A shared `<Style>` holding only a `<LineStyle>`.
#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub id: String,
    /// `aabbggrr` hex
    pub color: String,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placemark {
    pub name: String,
    pub description: Option<String>,
    /// Style id without the leading `#`.
    pub style: Option<String>,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Tessellated line; each entry is a `lon,lat[,ele]` tuple.
    LineString(Vec<String>),
    /// Single `lon,lat,ele` tuple.
    Point(String),
}

impl Placemark {
    pub fn is_line(&self) -> bool {
        matches!(self.geometry, Geometry::LineString(_))
    }
}

pub fn to_kml_string(doc: &KmlDocument) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_declaration(&mut writer)?;

    let mut root = BytesStart::new("kml");
    root.push_attribute(("xmlns", KML_NAMESPACE));
    writer.write_event(Event::Start(root))?;
    writer.write_event(Event::Start(BytesStart::new("Document")))?;

    write_text_element(&mut writer, "name", &doc.name)?;
    for style in &doc.styles {
        write_style(&mut writer, style)?;
    }
    for placemark in &doc.placemarks {
        write_placemark(&mut writer, placemark)?;
    }

    writer.write_event(Event::End(BytesEnd::new("Document")))?;
    writer.write_event(Event::End(BytesEnd::new("kml")))?;
    into_string(writer)
}

/// Serialize and write a KML document, replacing any existing file.
pub fn write_kml_file(path: &Path, doc: &KmlDocument) -> Result<()> {
    let xml = to_kml_string(doc)?;
    std::fs::write(path, xml).map_err(|e| TourToolsError::io(path, e))
}

fn write_style<W: Write>(writer: &mut Writer<W>, style: &LineStyle) -> Result<()> {
    let mut start = BytesStart::new("Style");
    start.push_attribute(("id", style.id.as_str()));
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Start(BytesStart::new("LineStyle")))?;
    write_text_element(writer, "color", &style.color)?;
    write_text_element(writer, "width", &style.width.to_string())?;
    writer.write_event(Event::End(BytesEnd::new("LineStyle")))?;
    writer.write_event(Event::End(BytesEnd::new("Style")))?;
    Ok(())
}

fn write_placemark<W: Write>(writer: &mut Writer<W>, placemark: &Placemark) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("Placemark")))?;
    write_text_element(writer, "name", &placemark.name)?;
    if let Some(description) = &placemark.description {
        write_text_element(writer, "description", description)?;
    }
    if let Some(style) = &placemark.style {
        write_text_element(writer, "styleUrl", &format!("#{style}"))?;
    }

    match &placemark.geometry {
        Geometry::LineString(coords) => {
            writer.write_event(Event::Start(BytesStart::new("LineString")))?;
            write_text_element(writer, "tessellate", "1")?;
            write_text_element(writer, "coordinates", &coords.join(" "))?;
            writer.write_event(Event::End(BytesEnd::new("LineString")))?;
        }
        Geometry::Point(coord) => {
            writer.write_event(Event::Start(BytesStart::new("Point")))?;
            write_text_element(writer, "coordinates", coord)?;
            writer.write_event(Event::End(BytesEnd::new("Point")))?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("Placemark")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_layout() {
        let doc = KmlDocument {
            name: "ride".to_string(),
            styles: vec![LineStyle {
                id: "normal".to_string(),
                color: "ff0000ff".to_string(),
                width: 4.0,
            }],
            placemarks: vec![
                Placemark {
                    name: "Gap Connection".to_string(),
                    description: Some("Connected gap between rides".to_string()),
                    style: None,
                    geometry: Geometry::Point("11.000000,48.000000,0.000000".to_string()),
                },
                Placemark {
                    name: "Morning Ride".to_string(),
                    description: None,
                    style: Some("normal".to_string()),
                    geometry: Geometry::LineString(vec![
                        "11.000000,48.000000".to_string(),
                        "11.100000,48.100000,520.000000".to_string(),
                    ]),
                },
            ],
        };

        let xml = to_kml_string(&doc).unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(r#"<kml xmlns="http://www.opengis.net/kml/2.2">"#));
        assert!(xml.contains(r#"<Style id="normal">"#));
        assert!(xml.contains("<color>ff0000ff</color>"));
        assert!(xml.contains("<width>4</width>"));
        assert!(xml.contains("<styleUrl>#normal</styleUrl>"));
        assert!(xml.contains("<tessellate>1</tessellate>"));
        assert!(xml.contains(
            "<coordinates>11.000000,48.000000 11.100000,48.100000,520.000000</coordinates>"
        ));
        assert!(xml.contains("<coordinates>11.000000,48.000000,0.000000</coordinates>"));
        assert_eq!(xml.matches("<Placemark>").count(), 2);
        assert_eq!(xml.matches("<description>").count(), 1);
        assert!(xml.find("Gap Connection").unwrap() < xml.find("Morning Ride").unwrap());
    }
}
