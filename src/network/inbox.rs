use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::net::SocketAddr;

use super::message::Message;

/// A decoded message as handed to the application.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub message: Message,
    /// Decrypted content for SEND/BROADCAST; `None` if absent or undecryptable
    pub plaintext: Option<String>,
    /// Socket the message arrived on (ephemeral port, not the peer's listener)
    pub remote: SocketAddr,
    pub received_at: DateTime<Utc>,
}

/// Unbounded FIFO filled by connection tasks and drained by the application.
#[derive(Default)]
pub struct Inbox {
    queue: Mutex<VecDeque<InboundMessage>>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: InboundMessage) {
        self.queue.lock().push_back(entry);
    }

    /// Remove and return everything received since the last drain.
    pub fn drain(&self) -> Vec<InboundMessage> {
        self.queue.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
