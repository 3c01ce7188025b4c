//! Membership gossip over the neighbor table.
//!
//! Join: a new node sends NEW_NODE to one bootstrap peer. The bootstrap adds
//! it and pushes a full UPDATE_NEIGHBORS snapshot (its table plus itself) to
//! every neighbor, the newcomer included. Receivers overwrite their table
//! with the snapshot minus themselves, so everyone converges on the same
//! membership without contacting the newcomer directly.
//!
//! Leave: the departing node pushes a snapshot without itself. Last update
//! wins; a stale snapshot can drop peers the receiver knew about.

use super::message::Message;
use super::peer::PeerAddress;
use crate::error::NodeError;
use crate::node::NodeState;

/// Announce ourselves to a bootstrap peer.
pub async fn join(state: &NodeState, bootstrap: &PeerAddress) -> Result<(), NodeError> {
    tracing::info!(
        "🤝 Node {} joining network via bootstrap node at {}",
        state.identity.node_id,
        bootstrap
    );
    let announce = Message::NewNode {
        node_id: state.identity.node_id.clone(),
        ip: state.identity.address.ip.clone(),
        port: state.identity.address.port,
    };
    state.client.send_to(bootstrap, &announce).await
}

pub async fn handle_new_node(state: &NodeState, node_id: &str, addr: PeerAddress) {
    if &addr == state.neighbors.self_addr() {
        tracing::debug!("Ignoring NEW_NODE announcing our own address");
        return;
    }

    if state.neighbors.insert(addr.clone()) {
        tracing::info!(
            "🆕 Node {} detected new node: {} at {}",
            state.identity.node_id,
            node_id,
            addr
        );
    } else {
        tracing::debug!("Node {} at {} already known, resending snapshot", node_id, addr);
    }

    let update = Message::UpdateNeighbors {
        neighbors: state.neighbors.snapshot_with_self(),
    };
    let targets = state.neighbors.snapshot();
    state.client.fan_out(&targets, &update).await;
}

pub fn handle_update_neighbors(state: &NodeState, neighbors: &[PeerAddress]) {
    let count = state.neighbors.replace(neighbors.iter().cloned());
    tracing::info!(
        "🔄 Node {} updated neighbors ({}): {:?}",
        state.identity.node_id,
        count,
        state.neighbors.snapshot()
    );
}

/// Tell current neighbors we are leaving. Returns how many were reached.
pub async fn announce_leave(state: &NodeState) -> usize {
    let targets = state.neighbors.snapshot();
    if targets.is_empty() {
        return 0;
    }
    let update = Message::UpdateNeighbors {
        neighbors: targets.clone(),
    };
    let reached = state.client.fan_out(&targets, &update).await;
    tracing::info!(
        "👋 Node {} notified {}/{} neighbor(s) of departure",
        state.identity.node_id,
        reached,
        targets.len()
    );
    reached
}
