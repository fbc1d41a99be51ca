//! vastd-core: VAST ad tag server and tracking beacon recorder
//!
//! Two endpoints share one database pool and nothing else:
//! - `GET /vast` renders a fixed VAST document whose tracking URLs carry a
//!   fresh session id
//! - `GET /track` appends one row per beacon and always answers with a
//!   1x1 GIF
//!
//! The binary in `crates/vastd` wires configuration, logging and the pool
//! into [`server::serve`].

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;
pub mod store;
pub mod tracking;
pub mod vast;

// Re-exports
pub use config::Args;
pub use error::{Error, Result};
pub use request::{Method, Request, RequestBuilder};
pub use response::{Response, ResponseBuilder, StatusCode};
pub use server::{AppState, ServerConfig};
pub use store::{MemoryStore, MySqlStore, MySqlStoreConfig, StoredEvent, TrackingStore};
pub use tracking::{TrackingEvent, PIXEL_GIF};
pub use vast::{build_document, TrackingEventKind};
