//! A minimal peer-to-peer overlay node.
//!
//! Nodes accept one JSON message per TCP connection, keep a gossiped
//! neighbor table, and exchange encrypted direct and broadcast messages.
//! [`Node`] is the entry point; everything received lands in its inbox.

pub mod config;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod network;
pub mod node;

pub use config::Config;
pub use error::NodeError;
pub use network::inbox::InboundMessage;
pub use network::message::Message;
pub use network::peer::{NodeIdentity, PeerAddress};
pub use node::{Node, StatusReport};
