use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::NodeError;

/// A peer's listening address. Serialized as the pair `[ip, port]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(String, u16)", into = "(String, u16)")]
pub struct PeerAddress {
    pub ip: String,
    pub port: u16,
}

impl PeerAddress {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
        }
    }

    /// `host:port` form accepted by `TcpStream::connect`; brackets IPv6.
    pub fn socket_string(&self) -> String {
        if self.ip.contains(':') {
            format!("[{}]:{}", self.ip, self.port)
        } else {
            format!("{}:{}", self.ip, self.port)
        }
    }
}

impl From<(String, u16)> for PeerAddress {
    fn from((ip, port): (String, u16)) -> Self {
        Self { ip, port }
    }
}

impl From<PeerAddress> for (String, u16) {
    fn from(addr: PeerAddress) -> Self {
        (addr.ip, addr.port)
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

impl FromStr for PeerAddress {
    type Err = NodeError;

    /// Parses `ip:port`, splitting on the last colon.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (ip, port) = s
            .rsplit_once(':')
            .ok_or_else(|| NodeError::Config(format!("peer address needs ip:port: {}", s)))?;
        let ip = ip.trim_start_matches('[').trim_end_matches(']');
        if ip.is_empty() {
            return Err(NodeError::Config(format!("peer address has no ip: {}", s)));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| NodeError::Config(format!("invalid port in peer address: {}", s)))?;
        Ok(Self::new(ip, port))
    }
}

/// Who this node is. Fixed once the listener is bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeIdentity {
    pub node_id: String,
    pub address: PeerAddress,
}

impl NodeIdentity {
    pub fn new(node_id: impl Into<String>, address: PeerAddress) -> Self {
        Self {
            node_id: node_id.into(),
            address,
        }
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.node_id, self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_form_is_pair() {
        let addr = PeerAddress::new("10.0.0.5", 9000);
        assert_eq!(serde_json::to_string(&addr).unwrap(), r#"["10.0.0.5",9000]"#);

        let back: PeerAddress = serde_json::from_str(r#"["10.0.0.5", 9000]"#).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            "127.0.0.1:5000".parse::<PeerAddress>().unwrap(),
            PeerAddress::new("127.0.0.1", 5000)
        );
        assert_eq!(
            "[::1]:5000".parse::<PeerAddress>().unwrap(),
            PeerAddress::new("::1", 5000)
        );
        assert!("127.0.0.1".parse::<PeerAddress>().is_err());
        assert!("127.0.0.1:99999".parse::<PeerAddress>().is_err());
        assert!(":5000".parse::<PeerAddress>().is_err());
    }

    #[test]
    fn test_socket_string_brackets_ipv6() {
        assert_eq!(PeerAddress::new("::1", 80).socket_string(), "[::1]:80");
        assert_eq!(PeerAddress::new("1.2.3.4", 80).socket_string(), "1.2.3.4:80");
    }
}
