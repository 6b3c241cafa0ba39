use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TourToolsError {
    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("XML write error: {0}")]
    XmlWrite(#[from] std::io::Error),

    #[error("Missing attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("Invalid value '{value}' for attribute '{attribute}' on <{element}>")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },

    #[error("Expected <gpx> root element, found <{0}>")]
    UnexpectedRoot(String),

    #[error("Document has no <gpx> root element")]
    MissingRoot,

    #[error("Unexpected end of document inside <{0}>")]
    UnexpectedEof(&'static str),

    #[error("Invalid timestamp '{value}': {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("End date {0} is the last representable day")]
    DateOutOfRange(chrono::NaiveDate),

    #[error("No timestamp found in {}", .0.display())]
    NoTimestamp(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to scan {}: {source}", .root.display())]
    Scan {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl TourToolsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TourToolsError>;
