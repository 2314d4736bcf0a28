//! Runtime lifecycle state.
//!
//! `Init -> Connecting -> Connected -> Running -> (Reconnect -> Connecting | Stopped)`

use std::fmt;

use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    Init,
    Connecting,
    Connected,
    Running,
    Reconnect,
    Stopped,
}

impl RuntimeState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Running => "RUNNING",
            Self::Reconnect => "RECONNECT",
            Self::Stopped => "STOPPED",
        }
    }

    /// Whether the read loop should keep going.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Connected | Self::Running)
    }
}

impl fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, observable runtime state.
#[derive(Debug, Clone)]
pub struct StateHandle {
    tx: watch::Sender<RuntimeState>,
}

impl Default for StateHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StateHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RuntimeState::Init);
        Self { tx }
    }

    pub fn get(&self) -> RuntimeState {
        *self.tx.borrow()
    }

    /// Move to `next`. `Stopped` is final.
    pub fn set(&self, next: RuntimeState) {
        self.tx.send_if_modified(|current| {
            if *current == next || *current == RuntimeState::Stopped {
                return false;
            }
            info!(from = %current, to = %next, "Runtime state");
            *current = next;
            true
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<RuntimeState> {
        self.tx.subscribe()
    }
}
