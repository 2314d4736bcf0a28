//! Deferred tasks with cancellation, plus round generations.
//!
//! A [`TaskHandle`] settles exactly once: either the timer fires or
//! `cancel` wins, decided by one atomic transition. Bodies that act on shared
//! state should still check a [`Generation`] captured at schedule time,
//! because the state may have moved on through another path.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::trace;

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Spawns deferred tasks tied to one shutdown token.
#[derive(Clone, Default)]
pub struct Scheduler {
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay` unless cancelled first.
    pub fn call_later<F>(&self, delay: Duration, task: F) -> TaskHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = TaskHandle {
            token: self.shutdown.child_token(),
            state: Arc::new(AtomicU8::new(PENDING)),
        };

        let token = handle.token.clone();
        let state = Arc::clone(&handle.state);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    let _ = state.compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire);
                }
                _ = tokio::time::sleep(delay) => {
                    if state
                        .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        task.await;
                    } else {
                        trace!("Deferred task cancelled at fire time");
                    }
                }
            }
        });

        handle
    }

    /// Cancel every task scheduled through this scheduler.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// Handle to one deferred task.
#[derive(Clone, Debug)]
pub struct TaskHandle {
    token: CancellationToken,
    state: Arc<AtomicU8>,
}

impl TaskHandle {
    /// Cancel the task. Returns whether it was still pending; repeated calls
    /// and calls after firing return `false`.
    pub fn cancel(&self) -> bool {
        let won = self
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        self.token.cancel();
        won
    }

    pub fn is_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) == PENDING
    }

    pub fn has_fired(&self) -> bool {
        self.state.load(Ordering::Acquire) == FIRED
    }
}

/// Per-key round counter.
#[derive(Debug, Default)]
pub struct Generation {
    rounds: Mutex<HashMap<String, u64>>,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self, key: &str) -> u64 {
        self.rounds.lock().get(key).copied().unwrap_or(0)
    }

    /// Start a new round for `key`, invalidating captured generations.
    pub fn advance(&self, key: &str) -> u64 {
        let mut rounds = self.rounds.lock();
        let round = rounds.entry(key.to_owned()).or_insert(0);
        *round += 1;
        *round
    }

    pub fn is_current(&self, key: &str, generation: u64) -> bool {
        self.current(key) == generation
    }
}
