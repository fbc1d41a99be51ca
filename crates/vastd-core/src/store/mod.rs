//! Tracking event storage
//!
//! The serving path only ever appends. `events_for_session` exists for
//! verification and tests.

mod memory;
mod mysql;

pub use memory::MemoryStore;
pub use mysql::{MySqlStore, MySqlStoreConfig};

use crate::tracking::TrackingEvent;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A persisted beacon with its server-assigned timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEvent {
    pub event: TrackingEvent,
    pub created_at: DateTime<Utc>,
}

/// Append-only store for tracking events
#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Insert one row; `created_at` is assigned by the store
    async fn insert(&self, event: &TrackingEvent) -> Result<()>;

    /// Check the store is reachable
    async fn ping(&self) -> Result<()>;

    /// Rows recorded for `session_id`, oldest first
    async fn events_for_session(&self, session_id: &str) -> Result<Vec<StoredEvent>>;
}
