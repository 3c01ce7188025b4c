//! Command dispatch for inbound messages.

use super::message::Message;
use super::peer::PeerAddress;
use super::{flood, gossip};
use crate::node::NodeState;

/// What the connection task should do with a message after dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Append to the inbox, with decrypted content if there was any
    Deliver { plaintext: Option<String> },
    /// Already seen; do not surface again
    Drop,
}

impl Disposition {
    fn deliver() -> Self {
        Disposition::Deliver { plaintext: None }
    }
}

pub async fn dispatch(state: &NodeState, message: &Message) -> Disposition {
    match message {
        Message::Send { source, content } => {
            let plaintext = state.open(content);
            if let Some(text) = &plaintext {
                tracing::info!("✉️  Node {} received message from {}: {}", state.identity.node_id, source, text);
            }
            Disposition::Deliver { plaintext }
        }
        Message::Broadcast {
            source,
            content,
            message_id,
            ttl,
            sender,
        } => {
            flood::handle_broadcast(
                state,
                source,
                content,
                message_id.as_deref(),
                *ttl,
                sender.as_ref(),
            )
            .await
        }
        Message::Status => {
            state.status();
            Disposition::deliver()
        }
        Message::Discover => {
            state.discover();
            Disposition::deliver()
        }
        Message::NewNode { node_id, ip, port } => {
            gossip::handle_new_node(state, node_id, PeerAddress::new(ip.as_str(), *port)).await;
            Disposition::deliver()
        }
        Message::UpdateNeighbors { neighbors } => {
            gossip::handle_update_neighbors(state, neighbors);
            Disposition::deliver()
        }
        Message::Unknown { command, .. } => {
            tracing::warn!("❓ Unknown command received: {}", command);
            Disposition::deliver()
        }
    }
}
