//! VAST ad document
//!
//! Builds the single inline linear ad the service serves. The document is
//! fixed apart from the session id, which is threaded into the six
//! tracking URLs so every beacon a player fires can be tied back to the
//! ad render that produced it.
//!
//! The tracking URLs carry three player macros (`[PAGEURL]`,
//! `[CACHEBUSTING]`, `[GDPRCONSENT]`) that are left for the player to
//! substitute. They are written inside CDATA sections so the brackets and
//! ampersands reach the player unescaped.

use crate::{Error, Result};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use uuid::Uuid;

/// `version` attribute of the `<VAST>` root
pub const VAST_VERSION: &str = "3.0";

/// Duration of the linear creative
pub const AD_DURATION: &str = "00:00:30";

/// Source of the single media file
pub const MEDIA_FILE_URL: &str =
    "http://commondatastorage.googleapis.com/gtv-videos-bucket/sample/ForBiggerJoyrides.mp4";

/// Default tracking endpoint written into the document
pub const DEFAULT_TRACKING_URL: &str = "http://trackingendpointdummy.com/track";

/// Player macros appended to every tracking URL, verbatim
const PLAYER_MACROS: &str = "&page_url=[PAGEURL]&cb=[CACHEBUSTING]&gdpr=[GDPRCONSENT]";

/// Playback events reported through `<Tracking>` entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingEventKind {
    Start,
    FirstQuartile,
    Midpoint,
    ThirdQuartile,
    Complete,
    Pause,
}

impl TrackingEventKind {
    /// Every kind, in document order
    pub const ALL: [TrackingEventKind; 6] = [
        TrackingEventKind::Start,
        TrackingEventKind::FirstQuartile,
        TrackingEventKind::Midpoint,
        TrackingEventKind::ThirdQuartile,
        TrackingEventKind::Complete,
        TrackingEventKind::Pause,
    ];

    /// VAST event name
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingEventKind::Start => "start",
            TrackingEventKind::FirstQuartile => "firstQuartile",
            TrackingEventKind::Midpoint => "midpoint",
            TrackingEventKind::ThirdQuartile => "thirdQuartile",
            TrackingEventKind::Complete => "complete",
            TrackingEventKind::Pause => "pause",
        }
    }
}

impl std::fmt::Display for TrackingEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracking URL for one event of one session
pub fn tracking_url(tracking_base: &str, event: TrackingEventKind, session_id: &Uuid) -> String {
    format!(
        "{}?event={}&session_id={}{}",
        tracking_base, event, session_id, PLAYER_MACROS
    )
}

fn xml_err(e: impl std::fmt::Display) -> Error {
    Error::Xml(e.to_string())
}

struct DocumentWriter {
    writer: Writer<Vec<u8>>,
}

impl DocumentWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(xml_err)
    }

    fn open(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let start = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.event(Event::Start(start))
    }

    fn close(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn text_element(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) -> Result<()> {
        self.open(name, attributes)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.close(name)
    }

    fn cdata_element(&mut self, name: &str, attributes: &[(&str, &str)], data: &str) -> Result<()> {
        self.open(name, attributes)?;
        self.event(Event::CData(BytesCData::new(data)))?;
        self.close(name)
    }

    fn finish(self) -> Result<String> {
        String::from_utf8(self.writer.into_inner()).map_err(xml_err)
    }
}

/// Serialize the VAST document for `session_id`
///
/// Pure: the same inputs always produce the same bytes.
pub fn build_document(session_id: &Uuid, tracking_base: &str) -> Result<String> {
    let mut doc = DocumentWriter::new();

    doc.event(Event::Decl(BytesDecl::new("1.0", None, None)))?;
    doc.open("VAST", &[("version", VAST_VERSION)])?;
    doc.open("Ad", &[])?;
    doc.open("InLine", &[])?;
    doc.open("Creatives", &[])?;
    doc.open("Creative", &[])?;
    doc.open("Linear", &[])?;

    doc.text_element("Duration", &[], AD_DURATION)?;

    doc.open("MediaFiles", &[])?;
    doc.text_element(
        "MediaFile",
        &[
            ("delivery", "progressive"),
            ("type", "video/mp4"),
            ("width", "640"),
            ("height", "360"),
        ],
        MEDIA_FILE_URL,
    )?;
    doc.close("MediaFiles")?;

    doc.open("TrackingEvents", &[])?;
    for kind in TrackingEventKind::ALL {
        let url = tracking_url(tracking_base, kind, session_id);
        doc.cdata_element("Tracking", &[("event", kind.as_str())], &url)?;
    }
    doc.close("TrackingEvents")?;

    doc.close("Linear")?;
    doc.close("Creative")?;
    doc.close("Creatives")?;
    doc.close("InLine")?;
    doc.close("Ad")?;
    doc.close("VAST")?;

    doc.finish()
}
