pub mod client;
pub mod dedup_filter;
pub mod flood;
pub mod gossip;
pub mod inbox;
pub mod message;
pub mod neighbors;
pub mod peer;
pub mod router;
pub mod server;
