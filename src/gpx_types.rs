/// GPX 1.1 namespace written on every document we produce.
pub const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";

/// Marker name carried by points synthesized to bridge two rides.
pub const GAP_CONNECTION: &str = "Gap Connection";

/// Parsed GPX document: root metadata plus its tracks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpxData {
    pub version: Option<String>,
    pub creator: Option<String>,
    pub xmlns: Option<String>,
    pub tracks: Vec<GpxTrack>,
}

impl GpxData {
    /// Iterate every point of every segment of every track, in document order.
    pub fn points(&self) -> impl Iterator<Item = &GpxPoint> {
        self.tracks
            .iter()
            .flat_map(|trk| trk.segments.iter())
            .flat_map(|seg| seg.points.iter())
    }

    pub fn segment_count(&self) -> usize {
        self.tracks.iter().map(|trk| trk.segments.len()).sum()
    }

    /// First non-empty timestamp string in document order.
    pub fn first_time(&self) -> Option<&str> {
        self.points()
            .filter_map(|pt| pt.time.as_deref())
            .find(|t| !t.is_empty())
    }
}

/// A single track point (<trkpt>).
#[derive(Debug, Clone, PartialEq)]
pub struct GpxPoint {
    pub lat: f64,
    pub lon: f64,
    pub ele: Option<f64>,
    pub time: Option<String>,
    pub name: Option<String>,
    pub desc: Option<String>,
}

impl GpxPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            ele: None,
            time: None,
            name: None,
            desc: None,
        }
    }

    pub fn is_gap_connection(&self) -> bool {
        self.name.as_deref() == Some(GAP_CONNECTION)
    }
}

/// A GPX track (<trk>).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpxTrack {
    pub name: Option<String>,
    pub segments: Vec<GpxSegment>,
}

impl GpxTrack {
    /// Track name, treating an empty `<name/>` as unnamed.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }
}

/// A GPX track segment (<trkseg>).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpxSegment {
    pub points: Vec<GpxPoint>,
}
