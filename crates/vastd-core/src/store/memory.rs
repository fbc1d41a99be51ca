//! In-process store

use super::{StoredEvent, TrackingStore};
use crate::tracking::TrackingEvent;
use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;

/// Vec-backed store, cloned handles share the same rows
#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<RwLock<Vec<StoredEvent>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

#[async_trait]
impl TrackingStore for MemoryStore {
    async fn insert(&self, event: &TrackingEvent) -> Result<()> {
        self.rows.write().push(StoredEvent {
            event: event.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn events_for_session(&self, session_id: &str) -> Result<Vec<StoredEvent>> {
        Ok(self
            .rows
            .read()
            .iter()
            .filter(|row| row.event.session_id.as_deref() == Some(session_id))
            .cloned()
            .collect())
    }
}
