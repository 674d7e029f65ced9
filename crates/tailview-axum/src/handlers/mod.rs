//! HTTP and WebSocket request handlers.

pub mod auth;
pub mod sources;
pub mod stream;
