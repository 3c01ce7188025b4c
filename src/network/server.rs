use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;

use super::inbox::InboundMessage;
use super::message::Message;
use super::router::{self, Disposition};
use crate::node::NodeState;

/// Back-off after an accept error so a persistent failure (e.g. EMFILE)
/// does not spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub struct NetworkServer {
    listener: TcpListener,
    state: Arc<NodeState>,
    shutdown: CancellationToken,
}

impl NetworkServer {
    pub fn new(listener: TcpListener, state: Arc<NodeState>, shutdown: CancellationToken) -> Self {
        Self {
            listener,
            state,
            shutdown,
        }
    }

    /// Accept until shutdown. Each connection runs in its own task.
    pub async fn run(self) {
        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let state = self.state.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, addr, state).await;
                        });
                    }
                    Err(e) => {
                        if self.shutdown.is_cancelled() {
                            break;
                        }
                        tracing::warn!("❌ Accept failed: {}", e);
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                }
            }
        }

        tracing::info!(
            "🔌 Listener for node {} closed",
            self.state.identity.node_id
        );
    }
}

/// Read one message (until EOF or the size limit), dispatch it, then close.
async fn handle_connection(mut stream: TcpStream, remote: SocketAddr, state: Arc<NodeState>) {
    let limit = state.settings.max_message_size;
    let mut buf = Vec::new();

    match read_payload(&mut stream, &mut buf, limit, state.settings.read_timeout()).await {
        Ok(ReadEnd::Eof) => {}
        // Peer wrote a full message but kept the socket open
        Ok(ReadEnd::TimedOut) if !buf.is_empty() => {
            tracing::debug!("⏱️  {} did not close after {} bytes, decoding anyway", remote, buf.len());
        }
        Ok(ReadEnd::TimedOut) => {
            tracing::warn!("⏱️  Read from {} timed out", remote);
            return;
        }
        Err(e) => {
            tracing::warn!("❌ Read error from {}: {}", remote, e);
            return;
        }
    }

    if buf.is_empty() {
        tracing::debug!("🔌 {} closed without sending data", remote);
        return;
    }

    tracing::debug!("📥 Received {} bytes from {}", buf.len(), remote);

    let message = match Message::decode(&buf) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!("❌ Dropping message from {}: {}", remote, e);
            return;
        }
    };

    match router::dispatch(&state, &message).await {
        Disposition::Deliver { plaintext } => state.inbox.push(InboundMessage {
            message,
            plaintext,
            remote,
            received_at: chrono::Utc::now(),
        }),
        Disposition::Drop => {}
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ReadEnd {
    /// Peer closed its side, or the size limit was reached
    Eof,
    TimedOut,
}

/// Read into `buf` until EOF, `limit` bytes or `wait` elapses. Bytes read
/// before the deadline stay in `buf`.
async fn read_payload<R: AsyncRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    limit: usize,
    wait: Duration,
) -> std::io::Result<ReadEnd> {
    let deadline = Instant::now() + wait;
    let mut chunk = [0u8; 4096];

    while buf.len() < limit {
        let want = chunk.len().min(limit - buf.len());
        match timeout_at(deadline, reader.read(&mut chunk[..want])).await {
            Ok(Ok(0)) => return Ok(ReadEnd::Eof),
            Ok(Ok(n)) => buf.extend_from_slice(&chunk[..n]),
            Ok(Err(e)) => return Err(e),
            Err(_) => return Ok(ReadEnd::TimedOut),
        }
    }
    Ok(ReadEnd::Eof)
}
