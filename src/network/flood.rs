//! BROADCAST flooding.
//!
//! Originated broadcasts carry a random `message_id`, a hop budget and the
//! sending hop's address. Receivers remember ids in the dedup filter, so a
//! broadcast reaches the inbox at most once per node. Relaying is opt-in
//! (`network.relay_broadcasts`); a relay never goes back to the hop it came
//! from and stops when the budget runs out.

use super::message::Message;
use super::peer::PeerAddress;
use super::router::Disposition;
use crate::error::NodeError;
use crate::node::NodeState;

fn new_message_id() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

/// Encrypt once and send to every current neighbor. Returns deliveries.
pub async fn broadcast(state: &NodeState, plaintext: &str) -> Result<usize, NodeError> {
    let content = state.cipher.encrypt(plaintext)?;
    let message_id = new_message_id();
    // Our own broadcast echoing back through a cycle is a duplicate
    state.seen.check_and_insert(&message_id);

    let message = Message::Broadcast {
        source: state.identity.node_id.clone(),
        content,
        message_id: Some(message_id),
        ttl: Some(state.settings.broadcast_ttl),
        sender: Some(state.identity.address.clone()),
    };

    let targets = state.neighbors.snapshot();
    tracing::info!(
        "📢 Node {} broadcasting to neighbors: {:?}",
        state.identity.node_id,
        targets
    );
    Ok(state.client.fan_out(&targets, &message).await)
}

pub async fn handle_broadcast(
    state: &NodeState,
    source: &str,
    content: &str,
    message_id: Option<&str>,
    ttl: Option<u8>,
    sender: Option<&PeerAddress>,
) -> Disposition {
    if let Some(id) = message_id {
        if state.seen.check_and_insert(id) {
            tracing::debug!("Dropping duplicate broadcast {} from {}", id, source);
            return Disposition::Drop;
        }
    }

    let plaintext = state.open(content);
    if let Some(text) = &plaintext {
        tracing::info!(
            "📣 Node {} received broadcast from {}: {}",
            state.identity.node_id,
            source,
            text
        );
    }

    if let (true, Some(id), Some(ttl)) = (state.settings.relay_broadcasts, message_id, ttl) {
        if ttl > 1 {
            relay(state, source, content, id, ttl - 1, sender).await;
        }
    }

    Disposition::Deliver { plaintext }
}

async fn relay(
    state: &NodeState,
    source: &str,
    content: &str,
    message_id: &str,
    ttl: u8,
    came_from: Option<&PeerAddress>,
) {
    let targets: Vec<PeerAddress> = state
        .neighbors
        .snapshot()
        .into_iter()
        .filter(|p| Some(p) != came_from)
        .collect();
    if targets.is_empty() {
        return;
    }

    let forward = Message::Broadcast {
        source: source.to_string(),
        content: content.to_string(),
        message_id: Some(message_id.to_string()),
        ttl: Some(ttl),
        sender: Some(state.identity.address.clone()),
    };
    let relayed = state.client.fan_out(&targets, &forward).await;
    tracing::debug!(
        "🔁 Relayed broadcast {} to {}/{} neighbor(s), ttl {}",
        message_id,
        relayed,
        targets.len(),
        ttl
    );
}
