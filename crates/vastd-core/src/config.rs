//! Configuration for vastd
//!
//! CLI arguments with environment fallbacks, parsed by clap. The binary
//! loads a `.env` file first, so every setting can live there too.

use crate::server::ServerConfig;
use crate::store::MySqlStoreConfig;
use crate::vast::DEFAULT_TRACKING_URL;
use crate::{Error, Result};
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// vastd - VAST ad tag server and tracking beacon recorder
#[derive(Parser, Debug, Clone)]
#[command(name = "vastd")]
#[command(about = "Serves a VAST ad document and records tracking beacons")]
pub struct Args {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Runtime worker threads
    #[arg(long, env = "WORKERS", default_value_t = num_cpus::get())]
    pub workers: usize,

    /// Database connection settings
    #[command(flatten)]
    pub db: DbArgs,

    /// Tracking endpoint written into every VAST document
    #[arg(long, env = "TRACKING_URL", default_value = DEFAULT_TRACKING_URL)]
    pub tracking_url: String,

    /// How long shutdown waits for open connections, in milliseconds
    #[arg(long, env = "SHUTDOWN_TIMEOUT_MS", default_value_t = 10_000)]
    pub shutdown_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// MySQL connection configuration
#[derive(clap::Args, Debug, Clone)]
pub struct DbArgs {
    /// Database host
    #[arg(long = "db-host", env = "DB_HOST", default_value = "localhost")]
    pub db_host: String,

    /// Database port
    #[arg(long = "db-port", env = "DB_PORT", default_value_t = 3306)]
    pub db_port: u16,

    /// Database user
    #[arg(long = "db-user", env = "DB_USER", default_value = "root")]
    pub db_user: String,

    /// Database password
    #[arg(long = "db-pass", env = "DB_PASS", default_value = "", hide_env_values = true)]
    pub db_pass: String,

    /// Database name
    #[arg(long = "db-name", env = "DB_NAME", default_value = "vast_dev")]
    pub db_name: String,

    /// Maximum pooled connections
    #[arg(long = "db-pool-size", env = "DB_POOL_SIZE", default_value_t = 10)]
    pub db_pool_size: u32,

    /// How long a query waits for a pooled connection, in milliseconds
    #[arg(long = "db-acquire-timeout-ms", env = "DB_ACQUIRE_TIMEOUT_MS", default_value_t = 1000)]
    pub db_acquire_timeout_ms: u64,

    /// Create the tracking table at startup if it is missing
    #[arg(long = "db-init-schema", env = "DB_INIT_SCHEMA", default_value_t = false)]
    pub db_init_schema: bool,
}

impl Args {
    /// Socket address to bind
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Server settings derived from the arguments
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            addr: self.listen_addr(),
            shutdown_timeout: Duration::from_millis(self.shutdown_timeout_ms),
        }
    }

    /// Store settings derived from the arguments
    pub fn store_config(&self) -> MySqlStoreConfig {
        MySqlStoreConfig {
            host: self.db.db_host.clone(),
            port: self.db.db_port,
            user: self.db.db_user.clone(),
            password: self.db.db_pass.clone(),
            database: self.db.db_name.clone(),
            pool_size: self.db.db_pool_size,
            acquire_timeout: Duration::from_millis(self.db.db_acquire_timeout_ms),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("WORKERS must be at least 1".to_string()));
        }
        if self.db.db_pool_size == 0 {
            return Err(Error::Config("DB_POOL_SIZE must be at least 1".to_string()));
        }
        if self.db.db_acquire_timeout_ms == 0 {
            return Err(Error::Config(
                "DB_ACQUIRE_TIMEOUT_MS must be at least 1".to_string(),
            ));
        }
        if !(self.tracking_url.starts_with("http://") || self.tracking_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "TRACKING_URL must be an http(s) URL, got {:?}",
                self.tracking_url
            )));
        }
        if self.tracking_url.contains("]]>") {
            return Err(Error::Config("TRACKING_URL must not contain \"]]>\"".to_string()));
        }
        Ok(())
    }
}
