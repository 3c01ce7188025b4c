//! Global constants for the gossip overlay
//!
//! Centralizes protocol limits and defaults so the config layer and the
//! network code agree on them.

/// Wire protocol constants
pub mod protocol {
    /// Default listening port for a node
    pub const DEFAULT_PORT: u16 = 9000;

    /// Maximum size of a single inbound message (one message per connection)
    pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

    /// How long a connection may take to deliver its message and close
    pub const READ_TIMEOUT_MS: u64 = 5_000;

    /// Outbound connect timeout
    pub const CONNECT_TIMEOUT_MS: u64 = 3_000;

    /// Default hop budget for relayed broadcasts
    pub const DEFAULT_BROADCAST_TTL: u8 = 4;
}

/// Duplicate broadcast suppression
pub mod dedup {
    /// Seen-message window rotation interval (5 minutes)
    pub const WINDOW_SECS: u64 = 300;

    /// Entries per window before an early rotation
    pub const WINDOW_CAPACITY: usize = 10_000;
}

/// Payload encryption
pub mod crypto {
    /// Pre-shared secret used when no other secret is configured
    pub const DEFAULT_SHARED_SECRET: &str = "some_shared_secret_key_for_demo";

    /// AES-GCM nonce length in bytes
    pub const NONCE_LEN: usize = 12;

    /// AES-GCM authentication tag length in bytes
    pub const TAG_LEN: usize = 16;
}
