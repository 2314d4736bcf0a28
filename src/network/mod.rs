//! Network layer: the chat server connection and the local control listener.

mod backoff;
mod connection;
mod control;

pub use backoff::{ReconnectPolicy, STABLE_SESSION};
pub use connection::ConnectionManager;
pub use control::ControlListener;
