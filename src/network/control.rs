//! Local control listener.
//!
//! Accepts one frame per connection from a sibling process (the admin panel),
//! injects it as a `ServerControl` context and acknowledges it. There is no
//! authentication: bind to loopback only.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tmi_proto::{ControlCommand, ControlRequest, Context, LineCodec, ProtocolError};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// A client gets this long to send its frame.
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Control frames are short; anything longer is rejected.
const MAX_FRAME_LEN: usize = 4096;

pub struct ControlListener {
    listener: TcpListener,
    queue: mpsc::Sender<Context>,
}

impl ControlListener {
    pub async fn bind(addr: &str, queue: mpsc::Sender<Context>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(address = %listener.local_addr()?, "Control listener bound");
        Ok(Self { listener, queue })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept until `shutdown` fires. Each client is served in its own task.
    #[instrument(skip_all, name = "control")]
    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let queue = self.queue.clone();
                        tokio::spawn(async move {
                            if let Err(e) = serve(stream, queue).await {
                                warn!(%peer, error = %e, "Control client failed");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "Control accept failed"),
                },
                _ = shutdown.cancelled() => break,
            }
        }
        info!("Control listener stopped");
    }
}

async fn serve(stream: TcpStream, queue: mpsc::Sender<Context>) -> Result<(), ProtocolError> {
    let mut framed = Framed::new(stream, LineCodec::with_max_len(MAX_FRAME_LEN));

    let frame = match tokio::time::timeout(READ_TIMEOUT, framed.next()).await {
        Ok(Some(frame)) => frame?,
        Ok(None) => return Ok(()),
        Err(_) => {
            debug!("Control client sent nothing");
            return Ok(());
        }
    };

    let request: ControlRequest = frame.parse()?;
    debug!(client = %request.client_id, command = %request.command, "Control frame");

    let reply = match request.command {
        ControlCommand::Other(_) => request.error_reply("unknown command"),
        _ => {
            let reply = request.ok_reply();
            if queue.send(Context::ServerControl(request)).await.is_err() {
                return Ok(());
            }
            reply
        }
    };

    framed.send(reply).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn roundtrip(frame: &str) -> (String, Option<Context>) {
        let (tx, mut rx) = mpsc::channel(4);
        let listener = ControlListener::bind("127.0.0.1:0", tx).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        tokio::spawn(listener.run(shutdown.clone()));

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(frame.as_bytes()).await.unwrap();
        client.shutdown().await.unwrap();
        let mut reply = String::new();
        client.read_to_string(&mut reply).await.unwrap();

        shutdown.cancel();
        (reply, rx.try_recv().ok())
    }

    #[tokio::test]
    async fn test_refresh_channel_acknowledged() {
        let (reply, ctx) = roundtrip("web REFRESH_CHANNEL {\"channel_id\": 3}\n").await;
        assert_eq!(reply, "web REFRESH_CHANNEL OK\r\n");
        let Some(Context::ServerControl(req)) = ctx else {
            panic!("no control context");
        };
        assert_eq!(req.int_param("channel_id"), Some(3));
    }

    #[tokio::test]
    async fn test_frame_closed_by_eof() {
        let (reply, ctx) = roundtrip("web REFRESH_DATA").await;
        assert_eq!(reply, "web REFRESH_DATA OK\r\n");
        assert!(ctx.is_some());
    }

    #[tokio::test]
    async fn test_unknown_command_rejected() {
        let (reply, ctx) = roundtrip("web PURGE\n").await;
        assert_eq!(reply, "web PURGE ERR unknown command\r\n");
        assert!(ctx.is_none());
    }

    #[tokio::test]
    async fn test_bad_json_closes_silently() {
        let (reply, ctx) = roundtrip("web REFRESH_CHANNEL {oops\n").await;
        assert!(reply.is_empty());
        assert!(ctx.is_none());
    }
}
