//! Health probes
//!
//! Liveness only says the process answers. Readiness also pings the store,
//! so an orchestrator can hold traffic while the database is unreachable.
//! `/track` keeps answering either way.

use crate::server::AppState;
use crate::{Response, StatusCode};
use std::time::{Duration, Instant};

/// Health status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Result of one dependency check
#[derive(Debug, Clone)]
pub struct HealthCheckResult {
    pub name: &'static str,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub duration: Duration,
}

/// Ping the tracking store
pub async fn check_store(state: &AppState) -> HealthCheckResult {
    let start = Instant::now();
    let outcome = state.store.ping().await;
    let duration = start.elapsed();

    match outcome {
        Ok(()) => HealthCheckResult {
            name: "store",
            status: HealthStatus::Healthy,
            message: None,
            duration,
        },
        Err(e) => HealthCheckResult {
            name: "store",
            status: HealthStatus::Unhealthy,
            message: Some(e.to_string()),
            duration,
        },
    }
}

/// Liveness probe - is the server alive?
pub fn liveness() -> Response {
    Response::json(StatusCode::OK, r#"{"status":"alive"}"#)
}

/// Readiness probe - can the store take writes?
pub async fn readiness(state: &AppState) -> Response {
    let check = check_store(state).await;
    if check.status == HealthStatus::Unhealthy {
        tracing::warn!(
            check = check.name,
            duration_ms = check.duration.as_millis() as u64,
            message = check.message.as_deref().unwrap_or(""),
            "readiness check failed"
        );
        return Response::json(check.status.status_code(), r#"{"status":"not_ready"}"#);
    }
    Response::json(StatusCode::OK, r#"{"status":"ready"}"#)
}
