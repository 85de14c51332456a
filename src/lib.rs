//! Lazyhls - on-demand HLS for local media files
//!
//! This library crate exposes the server, registry and configuration for
//! integration testing.

pub mod config;
pub mod server;
pub mod streaming;
