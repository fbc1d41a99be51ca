//! `GET /vast`

use crate::server::AppState;
use crate::vast::build_document;
use crate::Response;
use uuid::Uuid;

/// Serve a fresh VAST document under a new session id
pub fn serve_document(state: &AppState) -> Response {
    let session_id = Uuid::new_v4();
    match build_document(&session_id, &state.tracking_base) {
        Ok(xml) => {
            tracing::debug!(%session_id, "VAST document served");
            Response::xml(xml)
        }
        Err(e) => {
            tracing::error!(%session_id, error = %e, "VAST document serialization failed");
            Response::internal_error()
        }
    }
}
