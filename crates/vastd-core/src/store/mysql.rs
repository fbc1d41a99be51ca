//! MySQL-backed store
//!
//! The `tracking_events` table is provisioned outside this service.
//! `ensure_table` exists for local setups and is never run implicitly.

use super::{StoredEvent, TrackingStore};
use crate::tracking::TrackingEvent;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use std::time::Duration;

const INSERT_EVENT: &str = "INSERT INTO tracking_events \
     (session_id, event_type, page_url, created_at) \
     VALUES (?, ?, ?, NOW())";

const SELECT_SESSION: &str = "SELECT session_id, event_type, page_url, created_at \
     FROM tracking_events WHERE session_id = ? ORDER BY created_at";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS tracking_events (
    id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
    session_id VARCHAR(255) NULL,
    event_type VARCHAR(255) NULL,
    page_url TEXT NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    KEY idx_tracking_events_session (session_id)
)";

/// Connection settings for [`MySqlStore`]
#[derive(Clone)]
pub struct MySqlStoreConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Maximum pooled connections; acquisition queues beyond this
    pub pool_size: u32,
    /// How long a query waits for a connection before failing
    pub acquire_timeout: Duration,
}

impl Default for MySqlStoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: String::new(),
            database: "vast_dev".to_string(),
            pool_size: 10,
            acquire_timeout: Duration::from_millis(1000),
        }
    }
}

impl std::fmt::Debug for MySqlStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlStoreConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("database", &self.database)
            .field("pool_size", &self.pool_size)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish_non_exhaustive()
    }
}

impl MySqlStoreConfig {
    pub fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }
}

/// Store writing to the `tracking_events` table
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl std::fmt::Debug for MySqlStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlStore").finish()
    }
}

impl MySqlStore {
    /// Build the pool without opening a connection
    ///
    /// Connections are made on first use, so the service starts even when
    /// the database is down. Beacons recorded meanwhile fail after
    /// `acquire_timeout` and are logged.
    pub fn connect_lazy(config: &MySqlStoreConfig) -> Self {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(config.acquire_timeout)
            .connect_lazy_with(config.connect_options());
        Self { pool }
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Create `tracking_events` if it does not exist
    pub async fn ensure_table(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl TrackingStore for MySqlStore {
    async fn insert(&self, event: &TrackingEvent) -> Result<()> {
        sqlx::query(INSERT_EVENT)
            .bind(event.session_id.as_deref())
            .bind(event.event_type.as_deref())
            .bind(event.page_url.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn events_for_session(&self, session_id: &str) -> Result<Vec<StoredEvent>> {
        let rows: Vec<(Option<String>, Option<String>, Option<String>, DateTime<Utc>)> =
            sqlx::query_as(SELECT_SESSION)
                .bind(session_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(session_id, event_type, page_url, created_at)| StoredEvent {
                event: TrackingEvent {
                    session_id,
                    event_type,
                    page_url: page_url.unwrap_or_default(),
                },
                created_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::time::Instant;

    /// Pool pointing at a port nothing listens on
    fn unreachable_store() -> MySqlStore {
        MySqlStore::connect_lazy(&MySqlStoreConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..MySqlStoreConfig::default()
        })
    }

    #[test]
    fn test_config_defaults() {
        let config = MySqlStoreConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 3306);
        assert_eq!(config.user, "root");
        assert_eq!(config.password, "");
        assert_eq!(config.database, "vast_dev");
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.acquire_timeout, Duration::from_millis(1000));
    }

    #[test]
    fn test_debug_hides_password() {
        let config = MySqlStoreConfig {
            password: "hunter2".to_string(),
            ..MySqlStoreConfig::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("vast_dev"));
    }

    #[tokio::test]
    async fn test_insert_fails_when_unreachable() {
        let store = unreachable_store();
        let event = TrackingEvent {
            session_id: Some("abc".to_string()),
            event_type: Some("start".to_string()),
            page_url: String::new(),
        };

        let started = Instant::now();
        let err = store.insert(&event).await.unwrap_err();
        assert!(matches!(err, Error::Database(_)));
        assert!(store.ping().await.is_err());

        // Both calls give up after the default acquire timeout
        assert!(
            started.elapsed() < Duration::from_secs(5),
            "unreachable database blocked for {:?}",
            started.elapsed()
        );
    }
}
