//! Configuration management for the gossip node.
//!
//! A single TOML file with `[node]`, `[network]`, `[crypto]` and `[logging]`
//! sections. Every field has a default, so a partial file (or none at all)
//! is valid; the binary layers its command-line arguments on top.

use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::constants;
use crate::error::NodeError;
use crate::network::peer::PeerAddress;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub node: NodeConfig,
    pub network: NetworkConfig,
    pub crypto: CryptoConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub node_id: String,
    /// IP other nodes use to reach us; also the IP half of our identity
    pub advertise_ip: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: "node".to_string(),
            advertise_ip: "127.0.0.1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub listen_address: String,
    /// 0 picks a free port at bind time
    pub port: u16,
    /// Bootstrap peer as `ip:port`
    pub bootstrap: Option<String>,
    pub max_message_size: usize,
    pub read_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    /// Re-flood first-seen broadcasts to our own neighbors
    pub relay_broadcasts: bool,
    pub broadcast_ttl: u8,
    pub dedup_window_secs: u64,
    pub dedup_capacity: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0".to_string(),
            port: constants::protocol::DEFAULT_PORT,
            bootstrap: None,
            max_message_size: constants::protocol::MAX_MESSAGE_SIZE,
            read_timeout_ms: constants::protocol::READ_TIMEOUT_MS,
            connect_timeout_ms: constants::protocol::CONNECT_TIMEOUT_MS,
            relay_broadcasts: false,
            broadcast_ttl: constants::protocol::DEFAULT_BROADCAST_TTL,
            dedup_window_secs: constants::dedup::WINDOW_SECS,
            dedup_capacity: constants::dedup::WINDOW_CAPACITY,
        }
    }
}

impl NetworkConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen_address, self.port)
    }

    pub fn bootstrap_peer(&self) -> Result<Option<PeerAddress>, NodeError> {
        match self.bootstrap.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some),
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_secs(self.dedup_window_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    pub shared_secret: String,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            shared_secret: constants::crypto::DEFAULT_SHARED_SECRET.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "text" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &str) -> Result<Self, NodeError> {
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| NodeError::Config(format!("{}: {}", path, e)))
    }

    pub fn save_to_file(&self, path: &str) -> Result<(), NodeError> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| NodeError::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject settings the node cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.node.node_id.trim().is_empty() {
            return Err(NodeError::Config("node.node_id must not be empty".into()));
        }
        if self.node.advertise_ip.parse::<std::net::IpAddr>().is_err() {
            return Err(NodeError::Config(format!(
                "node.advertise_ip is not an IP address: {}",
                self.node.advertise_ip
            )));
        }
        if self.network.max_message_size == 0 {
            return Err(NodeError::Config(
                "network.max_message_size must be positive".into(),
            ));
        }
        if self.network.dedup_capacity == 0 {
            return Err(NodeError::Config(
                "network.dedup_capacity must be positive".into(),
            ));
        }
        self.network.bootstrap_peer()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(!config.network.relay_broadcasts);
        assert_eq!(config.network.bind_address(), "0.0.0.0:9000");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [node]
            node_id = "alpha"

            [network]
            port = 7000
            bootstrap = "10.0.0.5:9000"
            "#,
        )
        .unwrap();

        assert_eq!(config.node.node_id, "alpha");
        assert_eq!(config.node.advertise_ip, "127.0.0.1");
        assert_eq!(config.network.port, 7000);
        assert_eq!(
            config.network.max_message_size,
            constants::protocol::MAX_MESSAGE_SIZE
        );
        assert_eq!(
            config.network.bootstrap_peer().unwrap(),
            Some(PeerAddress::new("10.0.0.5", 9000))
        );
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gossipd.toml");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.node.node_id = "beta".to_string();
        config.network.relay_broadcasts = true;
        config.save_to_file(path).unwrap();

        let loaded = Config::load_from_file(path).unwrap();
        assert_eq!(loaded.node.node_id, "beta");
        assert!(loaded.network.relay_broadcasts);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.node.advertise_ip = "not-an-ip".to_string();
        assert!(matches!(config.validate(), Err(NodeError::Config(_))));

        let mut config = Config::default();
        config.network.bootstrap = Some("missing-port".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.network.bootstrap = Some("  ".to_string());
        assert!(config.validate().is_ok());
    }
}
