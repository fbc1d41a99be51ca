//! `GET /track`

use crate::server::AppState;
use crate::tracking::{record, TrackingEvent, PIXEL_GIF};
use crate::{Request, Response};
use bytes::Bytes;

/// Record the beacon, then answer with the pixel
///
/// A failed write is logged and otherwise ignored: players only look for
/// a fast 200.
pub async fn track(state: &AppState, req: &Request) -> Response {
    let event = TrackingEvent::from_request(req);

    if let Err(e) = record(state.store.as_ref(), &event).await {
        tracing::error!(
            session_id = event.session_id.as_deref().unwrap_or("-"),
            event = event.event_type.as_deref().unwrap_or("-"),
            page_url = %event.page_url,
            error = %e,
            "tracking insert failed"
        );
    }

    Response::gif(Bytes::from_static(&PIXEL_GIF))
}
