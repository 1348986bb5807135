//! # Gossip Integration Flows
//!
//! Rumor convergence and hop-by-hop routing across in-memory clusters.
//!
//! ## Topologies
//!
//! ```text
//! line:   A ── B ── C      (A and C start without knowing each other)
//! ```

#[cfg(test)]
mod tests {
    use crate::integration::network::{node_config, TestCluster};
    use node_runtime::ControlSurface;
    use std::time::Duration;

    const CONVERGENCE_LIMIT: Duration = Duration::from_secs(10);

    fn rumor_set(cluster: &TestCluster, index: usize) -> Vec<(String, u32, String)> {
        let mut rumors: Vec<_> = cluster
            .node(index)
            .control()
            .messages()
            .into_iter()
            .map(|m| (m.origin, m.id, m.text))
            .collect();
        rumors.sort();
        rumors
    }

    fn line() -> TestCluster {
        TestCluster::start(vec![
            node_config("A", 7001, &[7002]),
            node_config("B", 7002, &[7003]),
            node_config("C", 7003, &[7002]),
        ])
    }

    #[tokio::test]
    async fn test_rumors_converge_across_line() {
        let cluster = line();

        cluster.node(0).control().publish("from A".into()).await.unwrap();
        cluster.node(1).control().publish("from B".into()).await.unwrap();
        cluster.node(2).control().publish("from C 1".into()).await.unwrap();
        cluster.node(2).control().publish("from C 2".into()).await.unwrap();

        let converged = cluster
            .wait_until(CONVERGENCE_LIMIT, |c| {
                (0..3).all(|i| c.node(i).control().messages().len() == 4)
            })
            .await;
        assert!(converged, "message logs did not converge");

        let reference = rumor_set(&cluster, 0);
        assert_eq!(rumor_set(&cluster, 1), reference);
        assert_eq!(rumor_set(&cluster, 2), reference);
        assert!(reference.contains(&("C".to_string(), 2, "from C 2".to_string())));

        // Every node's clock expects the next id from each origin.
        for node in cluster.nodes() {
            assert_eq!(node.gossip().next_id("A"), 2);
            assert_eq!(node.gossip().next_id("B"), 2);
            assert_eq!(node.gossip().next_id("C"), 3);
        }

        cluster.stop().await;
    }

    #[tokio::test]
    async fn test_peers_learned_from_traffic() {
        let cluster = line();
        cluster.node(0).control().publish("hello".into()).await.unwrap();

        // B knows C from config and learns A from its packets.
        let learned = cluster
            .wait_until(CONVERGENCE_LIMIT, |c| {
                c.node(1).control().peers().len() == 2
            })
            .await;
        assert!(learned);

        cluster.stop().await;
    }

    #[tokio::test]
    async fn test_unreachable_peer_does_not_block_convergence() {
        let cluster = TestCluster::start(vec![
            node_config("A", 7101, &[7102, 7199]),
            node_config("B", 7102, &[7101, 7199]),
        ]);

        cluster.node(0).control().publish("one".into()).await.unwrap();
        cluster.node(0).control().publish("two".into()).await.unwrap();

        let converged = cluster
            .wait_until(CONVERGENCE_LIMIT, |c| c.node(1).control().messages().len() == 2)
            .await;
        assert!(converged);

        cluster.stop().await;
    }

    #[tokio::test]
    async fn test_private_message_routed_through_relay() {
        let mut configs = vec![
            node_config("A", 7201, &[7202]),
            node_config("B", 7202, &[7203]),
            node_config("C", 7203, &[7202]),
        ];
        for config in &mut configs {
            config.gossip.route_rumor_period = Duration::from_secs(1);
        }
        let cluster = TestCluster::start(configs);

        let routed = cluster
            .wait_until(CONVERGENCE_LIMIT, |c| {
                c.node(0).control().origins().contains(&"C".to_string())
            })
            .await;
        assert!(routed, "A never learned a route to C");

        // Route rumors are not chat.
        assert!(cluster.node(0).control().messages().is_empty());

        cluster
            .node(0)
            .control()
            .publish_private("psst".into(), "C".into())
            .await
            .unwrap();

        let delivered = cluster
            .wait_until(CONVERGENCE_LIMIT, |c| {
                !c.node(2).control().private_messages().is_empty()
            })
            .await;
        assert!(delivered);

        let inbox = cluster.node(2).control().private_messages();
        assert_eq!(inbox[0].origin, "A");
        assert_eq!(inbox[0].text, "psst");
        assert!(cluster.node(1).control().private_messages().is_empty());

        cluster.stop().await;
    }
}
