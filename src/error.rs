use thiserror::Error;

use crate::crypto::CryptoError;
use crate::network::peer::PeerAddress;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Protocol decode error: {0}")]
    ProtocolDecode(String),

    #[error("Failed to send to {target}: {reason}")]
    Send { target: PeerAddress, reason: String },

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NodeError>;
