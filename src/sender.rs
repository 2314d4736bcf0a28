//! Rate-limited outbound chat pipeline.
//!
//! Every channel has a send lane: an exclusive lock around the last text
//! sent there, plus the bot's cached privilege in that channel. A send holds
//! the lane lock for its whole chunk sequence, including the pause after each
//! chunk, so sends to one channel are strictly serialized while different
//! channels proceed concurrently.
//!
//! Above the lanes sits one account-wide token bucket (`governor`) matching
//! Twitch's global message budget.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use parking_lot::RwLock;
use tmi_proto::outbound;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, trace, warn};

use crate::config::RateLimitConfig;
use crate::error::SendError;

/// Timeout for handing a line to the socket writer.
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Slot holding the live connection's line writer.
///
/// The connection manager attaches a fresh writer on every connect and
/// detaches it on close; everything else only clones the handle.
#[derive(Clone, Default)]
pub struct Outbound {
    tx: Arc<RwLock<Option<mpsc::Sender<String>>>>,
}

impl Outbound {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route subsequent lines to `tx`.
    pub fn attach(&self, tx: mpsc::Sender<String>) {
        *self.tx.write() = Some(tx);
    }

    /// Drop the writer; sends fail with [`SendError::Disconnected`] until the
    /// next attach.
    pub fn detach(&self) {
        self.tx.write().take();
    }

    /// Queue one raw line (without CRLF) for the socket.
    pub async fn send_line(&self, line: String) -> Result<(), SendError> {
        let tx = self.tx.read().clone().ok_or(SendError::Disconnected)?;
        match tokio::time::timeout(SEND_TIMEOUT, tx.send(line)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_closed)) => Err(SendError::Disconnected),
            Err(_timeout) => {
                warn!(timeout = ?SEND_TIMEOUT, "Socket writer not draining");
                Err(SendError::Disconnected)
            }
        }
    }
}

/// Per-channel send state.
#[derive(Debug, Default)]
struct Lane {
    /// Last chunk sent; the lock is the channel's exclusive send lock.
    last_sent: Mutex<Option<String>>,
    /// Cached moderator/broadcaster status, refreshed on USERSTATE.
    privileged: AtomicBool,
}

/// Paced, chunking, duplicate-aware chat sender.
pub struct MessageSender {
    outbound: Outbound,
    lanes: DashMap<String, Arc<Lane>>,
    /// The bot's own channel always gets the short delay.
    own_channel: String,
    limits: RateLimitConfig,
    budget: DefaultDirectRateLimiter,
}

impl MessageSender {
    pub fn new(outbound: Outbound, own_username: &str, limits: RateLimitConfig) -> Self {
        let per_window = NonZeroU32::new(limits.messages_per_30s).unwrap_or(NonZeroU32::MIN);
        let period = Duration::from_secs(30) / per_window.get();
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(per_window))
            .allow_burst(per_window);

        Self {
            outbound,
            lanes: DashMap::new(),
            own_channel: own_username.to_lowercase(),
            limits,
            budget: RateLimiter::direct(quota),
        }
    }

    /// Create the lane for a joined channel. Idempotent.
    pub fn open(&self, channel: &str) {
        let channel = channel.to_lowercase();
        if !self.lanes.contains_key(&channel) {
            debug!(channel = %channel, "Opened send lane");
            self.lanes.entry(channel).or_default();
        }
    }

    /// Drop the lane for a parted channel. Sends already holding the lane
    /// finish; new sends fail with [`SendError::NotJoined`].
    pub fn close(&self, channel: &str) {
        if self.lanes.remove(&channel.to_lowercase()).is_some() {
            debug!(channel = %channel, "Closed send lane");
        }
    }

    pub fn is_open(&self, channel: &str) -> bool {
        self.lanes.contains_key(&channel.to_lowercase())
    }

    /// Record whether the bot is moderator or broadcaster in `channel`.
    pub fn set_privileged(&self, channel: &str, privileged: bool) {
        if let Some(lane) = self.lanes.get(&channel.to_lowercase()) {
            lane.privileged.store(privileged, Ordering::Relaxed);
        }
    }

    /// Pause after each chunk in `channel`.
    pub fn delay_for(&self, channel: &str) -> Duration {
        let channel = channel.to_lowercase();
        let privileged = channel == self.own_channel
            || self
                .lanes
                .get(&channel)
                .is_some_and(|lane| lane.privileged.load(Ordering::Relaxed));
        if privileged {
            self.limits.moderator_delay()
        } else {
            self.limits.default_delay()
        }
    }

    /// Send `text` to `channel`, returning the chunks actually written.
    ///
    /// Whitespace is collapsed and the text split into chunks of at most
    /// `max_message_len` bytes. A chunk identical to the previous one sent in
    /// the channel carries the duplicate marker. Wire errors propagate
    /// without retry.
    pub async fn send(&self, channel: &str, text: &str) -> Result<Vec<String>, SendError> {
        let channel = channel.to_lowercase();
        let lane = self
            .lanes
            .get(&channel)
            .map(|lane| Arc::clone(&lane))
            .ok_or_else(|| SendError::NotJoined(channel.clone()))?;

        let text = outbound::collapse_whitespace(text);
        let chunks = outbound::split_message(&text, self.limits.max_message_len);
        if chunks.is_empty() {
            return Ok(chunks);
        }

        let mut last_sent = lane.last_sent.lock().await;
        for chunk in &chunks {
            self.budget.until_ready().await;

            let duplicate = last_sent.as_deref() == Some(chunk.as_str());
            let line = outbound::privmsg(&channel, chunk, duplicate);
            trace!(channel = %channel, duplicate, "Sending chunk");
            self.outbound.send_line(line).await?;
            *last_sent = Some(chunk.clone());

            tokio::time::sleep(self.delay_for(&channel)).await;
        }

        Ok(chunks)
    }
}
