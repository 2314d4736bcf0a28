//! Chat server connection manager.
//!
//! ```text
//!   TcpStream ── Framed<LineCodec> ──┬── reader: PING -> PONG inline
//!                                    │           RECONNECT -> Context::Reconnect
//!                                    │           other -> parse_line -> queue
//!                                    └── writer task <── mpsc <── Outbound slot
//!   tick task ── Context::Update ──> queue
//! ```
//!
//! A session ends when the socket closes, a frame fails to decode, or the
//! runtime state leaves CONNECTED/RUNNING (a RECONNECT was handled). The
//! manager then reconnects after the [`ReconnectPolicy`] delay until the
//! shutdown token fires.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tmi_proto::{ConnectionControl, Context, LineCodec, connection_control, outbound, parse_line};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, trace, warn};

use super::backoff::ReconnectPolicy;
use crate::bots::Core;
use crate::error::ConnectionError;
use crate::runtime::RuntimeState;
use crate::telemetry::spans;

/// Bound of the socket writer queue.
const WRITER_QUEUE: usize = 256;

/// How a session ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// The runtime asked for a reconnect.
    Requested,
    /// The server closed the socket.
    Closed,
}

/// Background tasks of one session, torn down on drop.
struct SessionGuard {
    core: Arc<Core>,
    writer: JoinHandle<()>,
    ticker: Option<JoinHandle<()>>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.core.outbound().detach();
        self.writer.abort();
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

/// Owns the server connection for the life of the process.
pub struct ConnectionManager {
    core: Arc<Core>,
    queue: mpsc::Sender<Context>,
    policy: ReconnectPolicy,
}

impl ConnectionManager {
    pub fn new(core: Arc<Core>, queue: mpsc::Sender<Context>) -> Self {
        let conn = &core.config().connection;
        let policy = ReconnectPolicy::new(
            Duration::from_secs(conn.backoff_base_secs),
            Duration::from_secs(conn.backoff_max_secs),
        );
        Self {
            core,
            queue,
            policy,
        }
    }

    /// Connect and reconnect until `shutdown` fires.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let address = self.core.config().connection.address.clone();
        let mut attempt: u32 = 0;

        while !shutdown.is_cancelled() {
            attempt += 1;
            self.core.state().set(RuntimeState::Connecting);
            let started = Instant::now();

            let outcome = tokio::select! {
                outcome = self.session(&address).instrument(spans::connection(&address, attempt)) => outcome,
                _ = shutdown.cancelled() => break,
            };

            let delay = match outcome {
                Ok(SessionEnd::Requested) => {
                    info!("Reconnecting on request");
                    self.policy.requested()
                }
                Ok(SessionEnd::Closed) => {
                    warn!("Server closed the connection");
                    self.policy.record_failure("closed", started.elapsed())
                }
                Err(e) => {
                    warn!(error = %e, "Connection failed");
                    self.policy.record_failure(&e.to_string(), started.elapsed())
                }
            };

            if self.core.state().get() == RuntimeState::Stopped {
                break;
            }
            self.core.state().set(RuntimeState::Reconnect);
            if !delay.is_zero() {
                info!(delay = ?delay, failures = self.policy.consecutive_failures(), "Waiting before reconnect");
            }

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.cancelled() => break,
            }
        }

        self.core.state().set(RuntimeState::Stopped);
        info!("Connection manager stopped");
    }

    async fn session(&self, address: &str) -> Result<SessionEnd, ConnectionError> {
        let stream = TcpStream::connect(address).await?;
        stream.set_nodelay(true)?;
        info!("Connected to chat server");

        let (mut sink, mut lines) = Framed::new(stream, LineCodec::new()).split();
        let (tx, mut rx) = mpsc::channel::<String>(WRITER_QUEUE);

        let writer = tokio::spawn(
            async move {
                while let Some(line) = rx.recv().await {
                    trace!(line = %redact(&line), "Write");
                    if let Err(e) = sink.send(line).await {
                        warn!(error = %e, "Write error");
                        break;
                    }
                }
            }
            .in_current_span(),
        );

        let mut guard = SessionGuard {
            core: Arc::clone(&self.core),
            writer,
            ticker: None,
        };

        let slot = self.core.outbound();
        slot.attach(tx.clone());

        let identity = &self.core.config().identity;
        slot.send_line(outbound::pass(&identity.oauth)).await?;
        slot.send_line(outbound::nick(&identity.username)).await?;
        self.core.state().set(RuntimeState::Connected);

        guard.ticker = Some(self.spawn_ticker());
        self.core.state().set(RuntimeState::Running);
        let mut state_rx = self.core.state().subscribe();

        let end = loop {
            tokio::select! {
                line = lines.next() => match line {
                    Some(Ok(line)) => self.handle_line(&line, &tx).await?,
                    Some(Err(e)) => return Err(e.into()),
                    None => break SessionEnd::Closed,
                },
                changed = state_rx.changed() => {
                    if changed.is_err() || !state_rx.borrow().is_live() {
                        break SessionEnd::Requested;
                    }
                }
            }
        };

        drop(guard);
        Ok(end)
    }

    async fn handle_line(&self, line: &str, tx: &mpsc::Sender<String>) -> Result<(), ConnectionError> {
        trace!(line = %line, "Read");
        match connection_control(line) {
            Some(ConnectionControl::Ping(host)) => {
                // answered here so a busy dispatcher never delays it
                tx.send(outbound::pong(&host))
                    .await
                    .map_err(|_| ConnectionError::QueueClosed)?;
            }
            Some(ConnectionControl::Reconnect) => {
                info!("Server requested reconnect");
                self.enqueue(Context::Reconnect).await?;
            }
            None => match parse_line(line) {
                Some(ctx) => self.enqueue(ctx).await?,
                None => debug!(line = %line, "Skipped line"),
            },
        }
        Ok(())
    }

    async fn enqueue(&self, ctx: Context) -> Result<(), ConnectionError> {
        self.queue
            .send(ctx)
            .await
            .map_err(|_| ConnectionError::QueueClosed)
    }

    fn spawn_ticker(&self) -> JoinHandle<()> {
        let period = self.core.config().connection.tick_interval();
        let queue = self.queue.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if queue.send(Context::Update).await.is_err() {
                    break;
                }
            }
        })
    }
}

/// Keep tokens out of trace logs.
fn redact(line: &str) -> &str {
    if line.starts_with("PASS ") { "PASS ***" } else { line }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact() {
        assert_eq!(redact("PASS oauth:secret"), "PASS ***");
        assert_eq!(redact("NICK bot"), "NICK bot");
    }
}
