#![allow(dead_code)]

use gossipd::{Config, Message, Node, PeerAddress};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

pub const DEADLINE: Duration = Duration::from_secs(5);

pub fn loopback_config(node_id: &str) -> Config {
    let mut config = Config::default();
    config.node.node_id = node_id.to_string();
    config.node.advertise_ip = "127.0.0.1".to_string();
    config.network.listen_address = "127.0.0.1".to_string();
    config.network.port = 0;
    config.network.connect_timeout_ms = 1_000;
    config
}

pub async fn start_node(node_id: &str, bootstrap: Option<&Node>, relay: bool) -> Node {
    let mut config = loopback_config(node_id);
    config.network.relay_broadcasts = relay;
    config.network.bootstrap = bootstrap.map(|b| b.identity().address.to_string());
    Node::start(config).await.expect("node should start")
}

/// Poll `cond` until it holds or the deadline passes.
pub async fn wait_until<F: FnMut() -> bool>(mut cond: F) -> bool {
    let give_up = tokio::time::Instant::now() + DEADLINE;
    loop {
        if cond() {
            return true;
        }
        if tokio::time::Instant::now() >= give_up {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

pub fn sorted(mut peers: Vec<PeerAddress>) -> Vec<PeerAddress> {
    peers.sort();
    peers
}

pub fn addr(node: &Node) -> PeerAddress {
    node.identity().address.clone()
}

/// Write raw bytes as one connection's payload.
pub async fn send_raw(target: &PeerAddress, payload: &[u8]) {
    let mut stream = TcpStream::connect(target.socket_string()).await.unwrap();
    stream.write_all(payload).await.unwrap();
    stream.shutdown().await.unwrap();
}

pub async fn send_message(target: &PeerAddress, message: &Message) {
    send_raw(target, &message.encode().unwrap()).await;
}
