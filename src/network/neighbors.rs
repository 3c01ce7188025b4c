//! The node's view of network membership.
//!
//! A deduplicated, insertion-ordered set of peer addresses that never
//! contains the owning node. All access goes through one table-wide lock;
//! callers iterate over copies returned by [`NeighborTable::snapshot`].

use parking_lot::RwLock;

use super::peer::PeerAddress;

pub struct NeighborTable {
    self_addr: PeerAddress,
    peers: RwLock<Vec<PeerAddress>>,
}

impl NeighborTable {
    pub fn new(self_addr: PeerAddress) -> Self {
        Self {
            self_addr,
            peers: RwLock::new(Vec::new()),
        }
    }

    /// Add a peer. Returns false for self or an address already present.
    pub fn insert(&self, addr: PeerAddress) -> bool {
        if addr == self.self_addr {
            return false;
        }
        let mut peers = self.peers.write();
        if peers.contains(&addr) {
            return false;
        }
        peers.push(addr);
        true
    }

    /// Replace the whole table, dropping self and duplicates.
    pub fn replace<I>(&self, addrs: I) -> usize
    where
        I: IntoIterator<Item = PeerAddress>,
    {
        let mut fresh: Vec<PeerAddress> = Vec::new();
        for addr in addrs {
            if addr != self.self_addr && !fresh.contains(&addr) {
                fresh.push(addr);
            }
        }
        let count = fresh.len();
        *self.peers.write() = fresh;
        count
    }

    pub fn snapshot(&self) -> Vec<PeerAddress> {
        self.peers.read().clone()
    }

    /// Snapshot with the owning node appended, as sent to a joining node.
    pub fn snapshot_with_self(&self) -> Vec<PeerAddress> {
        let mut peers = self.snapshot();
        peers.push(self.self_addr.clone());
        peers
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    pub fn self_addr(&self) -> &PeerAddress {
        &self.self_addr
    }
}
