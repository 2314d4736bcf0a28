//! offlinechatbot - a Twitch chat bot built from dependency-resolved
//! components.
//!
//! The binary in `main.rs` wires configuration, storage and the component
//! set together; everything it uses is exported here so integration tests
//! can assemble the same bot around a fake server.

pub mod bots;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod network;
pub mod runtime;
pub mod sender;
pub mod telemetry;
pub mod util;
