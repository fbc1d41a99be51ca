//! Request handlers
//!
//! One module per endpoint. Every handler takes the shared [`AppState`]
//! and returns a complete [`Response`](crate::Response); none of them fail.
//!
//! [`AppState`]: crate::server::AppState

pub mod health;
pub mod track;
pub mod vast;
