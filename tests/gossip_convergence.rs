//! Membership gossip across real loopback nodes.
//!
//! Covers join propagation, multi-node convergence, destructive
//! UPDATE_NEIGHBORS handling and the departure notice sent on stop.

mod common;

#[cfg(test)]
mod tests {
    use super::common::*;
    use gossipd::{Message, PeerAddress};
    use std::time::Duration;
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn test_new_node_is_added_by_bootstrap() {
        let b = start_node("B", None, false).await;
        let a = start_node("A", Some(&b), false).await;

        assert!(wait_until(|| b.neighbors() == vec![addr(&a)]).await);
        // The newcomer gets the bootstrap's snapshot back and learns its contact
        assert!(wait_until(|| a.neighbors() == vec![addr(&b)]).await);

        let mut at_b = Vec::new();
        assert!(wait_until(|| {
            at_b.extend(b.received_messages());
            !at_b.is_empty()
        })
        .await);
        match &at_b[0].message {
            Message::NewNode { node_id, ip, port } => {
                assert_eq!(node_id, "A");
                assert_eq!(PeerAddress::new(ip.as_str(), *port), addr(&a));
            }
            other => panic!("expected NEW_NODE, got {:?}", other),
        }

        // Exactly one snapshot went out, and it went to the newcomer
        tokio::time::sleep(Duration::from_millis(200)).await;
        let at_a = a.received_messages();
        assert_eq!(at_a.len(), 1);
        assert!(matches!(at_a[0].message, Message::UpdateNeighbors { .. }));
    }

    #[tokio::test]
    async fn test_three_node_convergence() {
        let a = start_node("A", None, false).await;

        let b = start_node("B", Some(&a), false).await;
        assert!(wait_until(|| a.neighbors().len() == 1 && b.neighbors().len() == 1).await);

        let c = start_node("C", Some(&a), false).await;
        let converged = wait_until(|| {
            sorted(a.neighbors()) == sorted(vec![addr(&b), addr(&c)])
                && sorted(b.neighbors()) == sorted(vec![addr(&a), addr(&c)])
                && sorted(c.neighbors()) == sorted(vec![addr(&a), addr(&b)])
        })
        .await;
        assert!(
            converged,
            "tables did not converge: A={:?} B={:?} C={:?}",
            a.neighbors(),
            b.neighbors(),
            c.neighbors()
        );

        for node in [&a, &b, &c] {
            assert!(!node.neighbors().contains(&addr(node)));
        }
    }

    #[tokio::test]
    async fn test_update_neighbors_replaces_table() {
        let node = start_node("N", None, false).await;
        let me = addr(&node);

        send_message(
            &me,
            &Message::UpdateNeighbors {
                neighbors: vec![
                    PeerAddress::new("10.0.0.1", 9000),
                    PeerAddress::new("10.0.0.2", 9000),
                ],
            },
        )
        .await;
        assert!(wait_until(|| node.neighbors().len() == 2).await);

        send_message(
            &me,
            &Message::UpdateNeighbors {
                neighbors: vec![PeerAddress::new("10.0.0.3", 9000), me.clone()],
            },
        )
        .await;
        assert!(wait_until(|| node.neighbors() == vec![PeerAddress::new("10.0.0.3", 9000)]).await);
    }

    #[tokio::test]
    async fn test_update_neighbors_listing_only_self_empties_table() {
        let node = start_node("N", None, false).await;
        let me = addr(&node);

        send_message(
            &me,
            &Message::UpdateNeighbors {
                neighbors: vec![PeerAddress::new("10.0.0.7", 9000)],
            },
        )
        .await;
        assert!(wait_until(|| node.neighbors().len() == 1).await);

        send_message(
            &me,
            &Message::UpdateNeighbors {
                neighbors: vec![me.clone()],
            },
        )
        .await;
        assert!(wait_until(|| node.neighbors().is_empty()).await);
    }

    #[tokio::test]
    async fn test_new_node_announcing_self_is_ignored() {
        let node = start_node("N", None, false).await;
        let me = addr(&node);

        send_message(
            &me,
            &Message::NewNode {
                node_id: "imposter".into(),
                ip: me.ip.clone(),
                port: me.port,
            },
        )
        .await;

        let mut got = Vec::new();
        assert!(wait_until(|| {
            got.extend(node.received_messages());
            !got.is_empty()
        })
        .await);
        assert!(node.neighbors().is_empty());
    }

    #[tokio::test]
    async fn test_stop_notifies_neighbors_before_closing() {
        let p1 = start_node("P1", None, false).await;
        let departing = start_node("D", Some(&p1), false).await;
        assert!(wait_until(|| departing.neighbors() == vec![addr(&p1)]).await);
        assert!(wait_until(|| p1.neighbors() == vec![addr(&departing)]).await);

        // Clear the join traffic
        tokio::time::sleep(Duration::from_millis(100)).await;
        p1.received_messages();

        let departed = addr(&departing);
        departing.stop().await;

        // Listener is closed once stop returns
        assert!(TcpStream::connect(departed.socket_string()).await.is_err());

        let mut got = Vec::new();
        assert!(wait_until(|| {
            got.extend(p1.received_messages());
            !got.is_empty()
        })
        .await);
        tokio::time::sleep(Duration::from_millis(200)).await;
        got.extend(p1.received_messages());

        let updates: Vec<&Vec<PeerAddress>> = got
            .iter()
            .filter_map(|m| match &m.message {
                Message::UpdateNeighbors { neighbors } => Some(neighbors),
                _ => None,
            })
            .collect();
        assert_eq!(updates.len(), 1);
        assert!(!updates[0].contains(&departed));
        assert!(p1.neighbors().is_empty());
    }
}
