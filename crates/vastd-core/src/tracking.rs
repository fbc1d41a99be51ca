//! Tracking beacons
//!
//! A beacon is a `GET /track?event=..&session_id=..&page_url=..` fired by
//! the player. Each one becomes a single append-only row; the caller always
//! gets the same transparent pixel back, whatever happened to the write.

use crate::store::TrackingStore;
use crate::{Request, Result};

/// 1x1 transparent GIF served for every beacon
pub const PIXEL_GIF: [u8; 43] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0xf0, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

/// One beacon, as stored
///
/// `event_type` is kept verbatim: names outside the six VAST events are
/// accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingEvent {
    pub session_id: Option<String>,
    pub event_type: Option<String>,
    /// Percent-decoded page URL, empty when absent
    pub page_url: String,
}

impl TrackingEvent {
    /// Read `event`, `session_id` and `page_url` from the query string
    pub fn from_request(req: &Request) -> Self {
        let mut params = req.query_params();
        Self {
            session_id: params.remove("session_id"),
            event_type: params.remove("event"),
            page_url: params.remove("page_url").unwrap_or_default(),
        }
    }
}

/// Persist one beacon
///
/// A single attempt, no retry. The error is handed back for the caller to
/// log.
pub async fn record(store: &dyn TrackingStore, event: &TrackingEvent) -> Result<()> {
    store.insert(event).await
}
