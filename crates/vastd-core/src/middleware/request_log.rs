//! Request logging middleware
//!
//! Tags every request with an id and emits one `tracing` event per
//! response.

use super::Middleware;
use crate::{Request, Response};
use uuid::Uuid;

/// Header carrying the request id, in and out
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request id + access log
#[derive(Debug, Clone, Default)]
pub struct RequestLog;

impl RequestLog {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for RequestLog {
    fn before(&self, req: &mut Request) -> Option<Response> {
        if req.header(REQUEST_ID_HEADER).is_none() {
            req.headers
                .push((REQUEST_ID_HEADER.to_string(), Uuid::new_v4().to_string()));
        }
        None
    }

    fn after(&self, req: &Request, res: &mut Response) {
        let request_id = req.header(REQUEST_ID_HEADER).unwrap_or("-");
        res.headers
            .push((REQUEST_ID_HEADER.to_string(), request_id.to_string()));

        let elapsed = req.received_at.elapsed();
        tracing::info!(
            request_id,
            method = req.method.as_str(),
            path = %req.path,
            status = res.status.as_u16(),
            elapsed_us = elapsed.as_micros() as u64,
            "request"
        );
    }
}
