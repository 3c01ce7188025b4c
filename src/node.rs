//! The overlay node: owns the listener, neighbor table and inbox, and is the
//! only API the surrounding application talks to.

use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, NetworkConfig};
use crate::constants::crypto::DEFAULT_SHARED_SECRET;
use crate::crypto::Cipher;
use crate::error::NodeError;
use crate::network::client::NetworkClient;
use crate::network::dedup_filter::DeduplicationFilter;
use crate::network::inbox::{InboundMessage, Inbox};
use crate::network::message::Message;
use crate::network::neighbors::NeighborTable;
use crate::network::peer::{NodeIdentity, PeerAddress};
use crate::network::server::NetworkServer;
use crate::network::{flood, gossip};

/// State shared between the node handle and its connection tasks.
pub struct NodeState {
    pub identity: NodeIdentity,
    pub neighbors: NeighborTable,
    pub inbox: Inbox,
    pub cipher: Cipher,
    pub client: NetworkClient,
    pub seen: DeduplicationFilter,
    pub settings: NetworkConfig,
}

impl NodeState {
    pub fn new(identity: NodeIdentity, config: &Config) -> Self {
        let cipher = if config.crypto.shared_secret == DEFAULT_SHARED_SECRET {
            Cipher::shared().clone()
        } else {
            Cipher::from_secret(config.crypto.shared_secret.as_bytes())
        };

        Self {
            neighbors: NeighborTable::new(identity.address.clone()),
            identity,
            inbox: Inbox::new(),
            cipher,
            client: NetworkClient::new(config.network.connect_timeout()),
            seen: DeduplicationFilter::new(
                config.network.dedup_window(),
                config.network.dedup_capacity,
            ),
            settings: config.network.clone(),
        }
    }

    /// Decrypt message content, logging rather than failing on bad tokens.
    pub fn open(&self, content: &str) -> Option<String> {
        match self.cipher.decrypt(content) {
            Ok(plaintext) => Some(plaintext),
            Err(e) => {
                tracing::warn!("🔒 Could not decrypt content: {}", e);
                None
            }
        }
    }

    pub fn status(&self) -> StatusReport {
        let report = StatusReport {
            identity: self.identity.clone(),
            neighbors: self.neighbors.snapshot(),
        };
        tracing::info!("📊 {}", report);
        report
    }

    pub fn discover(&self) -> Vec<PeerAddress> {
        let neighbors = self.neighbors.snapshot();
        tracing::info!(
            "🔍 Node {} discovered neighbors: {:?}",
            self.identity.node_id,
            neighbors
        );
        neighbors
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub identity: NodeIdentity,
    pub neighbors: Vec<PeerAddress>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node {} running on {}, neighbors: [", self.identity.node_id, self.identity.address)?;
        for (i, peer) in self.neighbors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", peer)?;
        }
        f.write_str("]")
    }
}

pub struct Node {
    state: Arc<NodeState>,
    shutdown: CancellationToken,
    listener_task: Mutex<Option<JoinHandle<()>>>,
}

impl Node {
    /// Bind the listener, start accepting, and join through the configured
    /// bootstrap peer if there is one. Only a bind failure is fatal.
    pub async fn start(config: Config) -> Result<Node, NodeError> {
        config.validate()?;

        let bind_addr = config.network.bind_address();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|source| NodeError::Bind {
                addr: bind_addr.clone(),
                source,
            })?;
        let port = listener.local_addr()?.port();

        let identity = NodeIdentity::new(
            config.node.node_id.clone(),
            PeerAddress::new(config.node.advertise_ip.clone(), port),
        );
        let state = Arc::new(NodeState::new(identity, &config));
        let shutdown = CancellationToken::new();

        let server = NetworkServer::new(listener, state.clone(), shutdown.clone());
        let listener_task = tokio::spawn(server.run());

        tracing::info!(
            "🚀 Node {} started on {} (bind {})",
            state.identity.node_id,
            state.identity.address,
            bind_addr
        );

        let node = Node {
            state,
            shutdown,
            listener_task: Mutex::new(Some(listener_task)),
        };

        if let Some(bootstrap) = config.network.bootstrap_peer()? {
            if let Err(e) = node.join(&bootstrap).await {
                tracing::warn!("⚠️  Could not reach bootstrap node: {}", e);
            }
        }

        Ok(node)
    }

    /// Send NEW_NODE to `bootstrap`.
    pub async fn join(&self, bootstrap: &PeerAddress) -> Result<(), NodeError> {
        gossip::join(&self.state, bootstrap).await
    }

    /// Encrypt `plaintext` and deliver it to one node as a SEND.
    pub async fn send_message(&self, target: &PeerAddress, plaintext: &str) -> Result<(), NodeError> {
        let message = Message::Send {
            source: self.state.identity.node_id.clone(),
            content: self.state.cipher.encrypt(plaintext)?,
        };
        self.state.client.send_to(target, &message).await
    }

    /// Flood `plaintext` to all current neighbors. Returns how many received it.
    pub async fn broadcast(&self, plaintext: &str) -> Result<usize, NodeError> {
        flood::broadcast(&self.state, plaintext).await
    }

    /// Drain the inbox.
    pub fn received_messages(&self) -> Vec<InboundMessage> {
        self.state.inbox.drain()
    }

    pub fn status(&self) -> StatusReport {
        self.state.status()
    }

    pub fn discover(&self) -> Vec<PeerAddress> {
        self.state.discover()
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.state.identity
    }

    pub fn neighbors(&self) -> Vec<PeerAddress> {
        self.state.neighbors.snapshot()
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled()
    }

    /// Notify neighbors of our departure, then close the listener. The
    /// listening socket is closed by the time this returns.
    pub async fn stop(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        tracing::info!("🛑 Node {} stopping...", self.state.identity.node_id);

        gossip::announce_leave(&self.state).await;
        self.shutdown.cancel();

        let handle = self.listener_task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!("Listener task ended abnormally: {}", e);
            }
        }
        tracing::info!("✓ Node {} stopped", self.state.identity.node_id);
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
