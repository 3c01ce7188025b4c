//! Outbound delivery: one short-lived connection per message.

use futures_util::future::join_all;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::message::Message;
use super::peer::PeerAddress;
use crate::error::NodeError;

#[derive(Debug, Clone)]
pub struct NetworkClient {
    connect_timeout: Duration,
}

impl NetworkClient {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Connect, write one encoded message, close.
    pub async fn send_to(&self, target: &PeerAddress, message: &Message) -> Result<(), NodeError> {
        let frame = message.encode()?;
        self.send_frame(target, &frame).await
    }

    async fn send_frame(&self, target: &PeerAddress, frame: &[u8]) -> Result<(), NodeError> {
        let send_err = |reason: String| NodeError::Send {
            target: target.clone(),
            reason,
        };

        let mut stream = timeout(
            self.connect_timeout,
            TcpStream::connect(target.socket_string()),
        )
        .await
        .map_err(|_| send_err(format!("connect timed out after {:?}", self.connect_timeout)))?
        .map_err(|e| send_err(e.to_string()))?;

        stream
            .write_all(frame)
            .await
            .map_err(|e| send_err(format!("write failed: {}", e)))?;
        stream
            .shutdown()
            .await
            .map_err(|e| send_err(format!("shutdown failed: {}", e)))?;

        tracing::debug!(peer = %target, bytes = frame.len(), "📤 Sent message");
        Ok(())
    }

    /// Send `message` to every target concurrently. Failures are logged per
    /// target and never stop the others. Returns the number delivered.
    pub async fn fan_out(&self, targets: &[PeerAddress], message: &Message) -> usize {
        if targets.is_empty() {
            return 0;
        }

        let frame = match message.encode() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("❌ Failed to encode {} for fan-out: {}", message.command(), e);
                return 0;
            }
        };

        let results = join_all(targets.iter().map(|t| self.send_frame(t, &frame))).await;

        let mut delivered = 0;
        for result in results {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!("⚠️  {}", e),
            }
        }

        tracing::debug!(
            command = message.command(),
            delivered,
            targets = targets.len(),
            "Fan-out complete"
        );
        delivered
    }
}
