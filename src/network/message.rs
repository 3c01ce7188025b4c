//! Wire envelope: one JSON object per TCP connection, tagged by `command`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::peer::PeerAddress;
use crate::error::NodeError;

/// Command tags this node understands.
pub const KNOWN_COMMANDS: [&str; 6] = [
    "SEND",
    "BROADCAST",
    "STATUS",
    "DISCOVER",
    "NEW_NODE",
    "UPDATE_NEIGHBORS",
];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "command", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Direct message; never forwarded
    Send { source: String, content: String },
    Broadcast {
        source: String,
        content: String,
        /// Absent on broadcasts from nodes that do not relay
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
        /// Remaining hops
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ttl: Option<u8>,
        /// Listening address of the node that sent this hop
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender: Option<PeerAddress>,
    },
    Status,
    Discover,
    NewNode {
        node_id: String,
        ip: String,
        port: u16,
    },
    UpdateNeighbors {
        #[serde(default)]
        neighbors: Vec<PeerAddress>,
    },
    /// A well-formed envelope with a command we do not handle
    #[serde(skip)]
    Unknown { command: String, raw: Value },
}

impl Message {
    pub fn command(&self) -> &str {
        match self {
            Message::Send { .. } => "SEND",
            Message::Broadcast { .. } => "BROADCAST",
            Message::Status => "STATUS",
            Message::Discover => "DISCOVER",
            Message::NewNode { .. } => "NEW_NODE",
            Message::UpdateNeighbors { .. } => "UPDATE_NEIGHBORS",
            Message::Unknown { command, .. } => command.as_str(),
        }
    }

    /// Encrypted content carried by SEND and BROADCAST.
    pub fn content(&self) -> Option<&str> {
        match self {
            Message::Send { content, .. } | Message::Broadcast { content, .. } => Some(content),
            _ => None,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, NodeError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a complete connection payload.
    pub fn decode(bytes: &[u8]) -> Result<Message, NodeError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| NodeError::ProtocolDecode(format!("invalid JSON: {}", e)))?;

        let command = value
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| NodeError::ProtocolDecode("missing \"command\" field".into()))?
            .to_string();

        if !KNOWN_COMMANDS.contains(&command.as_str()) {
            return Ok(Message::Unknown {
                command,
                raw: value,
            });
        }

        serde_json::from_value(value)
            .map_err(|e| NodeError::ProtocolDecode(format!("bad {} message: {}", command, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn to_value(msg: &Message) -> Value {
        serde_json::from_slice(&msg.encode().unwrap()).unwrap()
    }

    #[test]
    fn test_wire_shapes() {
        let send = Message::Send {
            source: "1".into(),
            content: "tok".into(),
        };
        assert_eq!(
            to_value(&send),
            json!({"command": "SEND", "source": "1", "content": "tok"})
        );

        assert_eq!(to_value(&Message::Status), json!({"command": "STATUS"}));

        let new_node = Message::NewNode {
            node_id: "2".into(),
            ip: "10.0.0.2".into(),
            port: 9001,
        };
        assert_eq!(
            to_value(&new_node),
            json!({"command": "NEW_NODE", "node_id": "2", "ip": "10.0.0.2", "port": 9001})
        );

        let update = Message::UpdateNeighbors {
            neighbors: vec![PeerAddress::new("10.0.0.5", 9000)],
        };
        assert_eq!(
            to_value(&update),
            json!({"command": "UPDATE_NEIGHBORS", "neighbors": [["10.0.0.5", 9000]]})
        );
    }

    #[test]
    fn test_plain_broadcast_omits_relay_fields() {
        let msg = Message::Broadcast {
            source: "1".into(),
            content: "tok".into(),
            message_id: None,
            ttl: None,
            sender: None,
        };
        assert_eq!(
            to_value(&msg),
            json!({"command": "BROADCAST", "source": "1", "content": "tok"})
        );
    }

    #[test]
    fn test_decode_broadcast_without_relay_fields() {
        let msg =
            Message::decode(br#"{"command":"BROADCAST","source":"a","content":"c"}"#).unwrap();
        assert_eq!(
            msg,
            Message::Broadcast {
                source: "a".into(),
                content: "c".into(),
                message_id: None,
                ttl: None,
                sender: None,
            }
        );
    }

    #[test]
    fn test_decode_unknown_command() {
        let msg = Message::decode(br#"{"command":"PING","nonce":7}"#).unwrap();
        match msg {
            Message::Unknown { command, raw } => {
                assert_eq!(command, "PING");
                assert_eq!(raw["nonce"], 7);
            }
            other => panic!("expected Unknown, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_errors() {
        let payloads: [&[u8]; 7] = [
            b"",
            b"{not json",
            br#"{"command":"SEND""#,
            br#"[1,2,3]"#,
            br#"{"source":"x"}"#,
            br#"{"command":"NEW_NODE","node_id":"x","ip":"1.2.3.4"}"#,
            br#"{"command":"NEW_NODE","node_id":"x","ip":"1.2.3.4","port":70000}"#,
        ];
        for payload in payloads {
            assert!(
                matches!(Message::decode(payload), Err(NodeError::ProtocolDecode(_))),
                "payload should be rejected: {}",
                String::from_utf8_lossy(payload)
            );
        }
    }

    #[test]
    fn test_unknown_is_not_encodable() {
        let msg = Message::Unknown {
            command: "PING".into(),
            raw: json!({"command": "PING"}),
        };
        assert!(msg.encode().is_err());
        assert_eq!(msg.command(), "PING");
    }
}
