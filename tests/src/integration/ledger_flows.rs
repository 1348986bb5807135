//! # Ledger Integration Flows
//!
//! Fork choice between competing miners, asset conservation and
//! double-spend rejection, both on bare ledgers and on full clusters where
//! transactions and blocks travel through gossip.

#[cfg(test)]
mod tests {
    use crate::integration::network::{node_config, TestCluster};
    use async_trait::async_trait;
    use node_runtime::ControlSurface;
    use rc_02_ledger::{
        pow, AcceptAllVerifier, BlockOutcome, LedgerApi, LedgerError, LedgerService,
        LedgerSettings, PeerBroadcaster,
    };
    use shared_types::{
        Block, BlockPublish, FileClaim, GossipPacket, Hash, Identity, ShareTx, Transaction,
        TxPayload, VoteAnswer, VoteStatement, ZERO_HASH,
    };
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    const DIFFICULTY: u32 = 1;
    const CLUSTER_LIMIT: Duration = Duration::from_secs(20);

    // ==========================================================================
    // BARE LEDGER FIXTURES
    // ==========================================================================

    struct NullBroadcaster;

    #[async_trait]
    impl PeerBroadcaster for NullBroadcaster {
        async fn broadcast(&self, _packet: GossipPacket, _except: Option<SocketAddr>) -> usize {
            0
        }
    }

    fn ledger() -> LedgerService<NullBroadcaster, AcceptAllVerifier> {
        let settings = LedgerSettings {
            difficulty: DIFFICULTY,
            ..LedgerSettings::default()
        };
        LedgerService::new(settings, Arc::new(NullBroadcaster))
    }

    fn file(name: &str) -> Transaction {
        Transaction::new(TxPayload::File(FileClaim {
            name: name.into(),
            size: 1,
            metafile_hash: name.as_bytes().to_vec(),
        }))
    }

    fn identity(name: &str) -> Transaction {
        Transaction::new(TxPayload::Identity(Identity {
            name: name.into(),
            public_key: vec![0; 32],
        }))
    }

    fn share(share: ShareTx) -> Transaction {
        let signer = share.expected_signer().to_string();
        Transaction::new(TxPayload::Share(share)).with_signature(signer, vec![1])
    }

    fn mine(prev: Hash, txs: Vec<Transaction>) -> Block {
        pow::search(prev, txs, DIFFICULTY, || false).unwrap()
    }

    async fn deliver(
        ledger: &LedgerService<NullBroadcaster, AcceptAllVerifier>,
        block: &Block,
    ) -> Result<BlockOutcome, LedgerError> {
        let packet = BlockPublish {
            block: block.clone(),
            hop_limit: 20,
        };
        ledger.handle_block_publish(packet, None).await
    }

    fn assert_longest_is_max(ledger: &LedgerService<NullBroadcaster, AcceptAllVerifier>) {
        let snapshot = ledger.snapshot();
        let max = snapshot.forks.iter().map(|f| f.length).max().unwrap_or(0);
        assert_eq!(snapshot.chain_length, max);
        assert_eq!(snapshot.forks.first().map(|f| f.length), Some(max));
    }

    // ==========================================================================
    // FORK CHOICE
    // ==========================================================================

    #[tokio::test]
    async fn test_competing_genesis_blocks_first_wins_until_outgrown() {
        let observer = ledger();
        let from_a = mine(ZERO_HASH, vec![file("a.txt")]);
        let from_b = mine(ZERO_HASH, vec![file("b.txt")]);

        assert_eq!(
            deliver(&observer, &from_a).await,
            Ok(BlockOutcome::Extended { length: 1 })
        );
        assert_eq!(
            deliver(&observer, &from_b).await,
            Ok(BlockOutcome::Forked { length: 1 })
        );
        assert_eq!(observer.longest_tip(), Some(from_a.hash()));
        assert_eq!(observer.snapshot().forks.len(), 2);
        assert_longest_is_max(&observer);

        // B's branch grows and takes over; A's claim is rolled back.
        let b2 = mine(from_b.hash(), vec![file("c.txt")]);
        assert_eq!(
            deliver(&observer, &b2).await,
            Ok(BlockOutcome::Reorganized {
                length: 2,
                rewound: 1
            })
        );
        assert_longest_is_max(&observer);

        let snapshot = observer.snapshot();
        assert_eq!(snapshot.filenames, vec!["b.txt".to_string(), "c.txt".to_string()]);
        assert_eq!(observer.longest_chain(), vec![b2.hash(), from_b.hash()]);
    }

    #[tokio::test]
    async fn test_arrival_order_decides_equal_forks() {
        let first = ledger();
        let second = ledger();
        let from_a = mine(ZERO_HASH, vec![file("a.txt")]);
        let from_b = mine(ZERO_HASH, vec![file("b.txt")]);

        deliver(&first, &from_a).await.unwrap();
        deliver(&first, &from_b).await.unwrap();
        deliver(&second, &from_b).await.unwrap();
        deliver(&second, &from_a).await.unwrap();

        assert_eq!(first.longest_tip(), Some(from_a.hash()));
        assert_eq!(second.longest_tip(), Some(from_b.hash()));

        // One more block on either side settles both.
        let a2 = mine(from_a.hash(), vec![]);
        deliver(&first, &a2).await.unwrap();
        deliver(&second, &a2).await.unwrap();
        assert_eq!(first.longest_tip(), Some(a2.hash()));
        assert_eq!(second.longest_tip(), Some(a2.hash()));
        assert_eq!(first.snapshot().filenames, second.snapshot().filenames);
    }

    // ==========================================================================
    // CONSERVATION & DOUBLE-SPEND
    // ==========================================================================

    #[tokio::test]
    async fn test_transfers_conserve_supply() {
        let ledger = ledger();
        let g = mine(ZERO_HASH, vec![identity("A"), identity("B"), identity("C")]);
        deliver(&ledger, &g).await.unwrap();
        let mint = mine(g.hash(), vec![share(ShareTx::mint("X", 100, "A"))]);
        deliver(&ledger, &mint).await.unwrap();

        let transfers = mine(
            mint.hash(),
            vec![
                share(ShareTx::transfer("X", 40, "A", "B")),
                share(ShareTx::transfer("X", 15, "B", "C")),
                share(ShareTx::transfer("X", 5, "C", "A")),
            ],
        );
        deliver(&ledger, &transfers).await.unwrap();

        assert_eq!(ledger.balance("X", "A"), 65);
        assert_eq!(ledger.balance("X", "B"), 25);
        assert_eq!(ledger.balance("X", "C"), 10);
        let total: u64 = ledger.snapshot().assets["X"].values().sum();
        assert_eq!(total, 100);
    }

    #[tokio::test]
    async fn test_double_spend_in_one_block_rejected_in_full() {
        let ledger = ledger();
        let g = mine(ZERO_HASH, vec![identity("A"), identity("B"), identity("C")]);
        deliver(&ledger, &g).await.unwrap();
        let mint = mine(g.hash(), vec![share(ShareTx::mint("X", 60, "A"))]);
        deliver(&ledger, &mint).await.unwrap();

        let double_spend = mine(
            mint.hash(),
            vec![
                share(ShareTx::transfer("X", 40, "A", "B")),
                share(ShareTx::transfer("X", 30, "A", "C")),
            ],
        );
        let result = deliver(&ledger, &double_spend).await;

        assert!(matches!(result, Err(LedgerError::InsufficientBalance { .. })));
        assert_eq!(ledger.balance("X", "A"), 60);
        assert_eq!(ledger.balance("X", "B"), 0);
        assert_eq!(ledger.balance("X", "C"), 0);
        assert_eq!(ledger.longest_tip(), Some(mint.hash()));
    }

    #[tokio::test]
    async fn test_repeated_vote_answer_rejects_whole_block() {
        let ledger = ledger();
        let g = mine(ZERO_HASH, vec![identity("A"), identity("B")]);
        deliver(&ledger, &g).await.unwrap();
        let statement = VoteStatement {
            question: "burn?".into(),
            origin: "A".into(),
            asset: "X".into(),
        };
        let question_id = statement.question_id();
        let opened = mine(
            g.hash(),
            vec![
                share(ShareTx::mint("X", 10, "A")),
                Transaction::new(TxPayload::VoteStatement(statement)),
            ],
        );
        deliver(&ledger, &opened).await.unwrap();

        let answer = |bytes: &[u8]| {
            Transaction::new(TxPayload::VoteAnswer(VoteAnswer {
                question_id: question_id.clone(),
                replier: "A".into(),
                answer: bytes.to_vec(),
            }))
        };
        let twice = mine(opened.hash(), vec![answer(b"yes"), answer(b"no")]);
        let result = deliver(&ledger, &twice).await;

        assert!(matches!(result, Err(LedgerError::AlreadyAnswered { .. })));
        assert_eq!(ledger.longest_tip(), Some(opened.hash()));
        assert!(ledger.snapshot().votes[&question_id].answers.is_empty());
    }

    // ==========================================================================
    // FULL CLUSTERS
    // ==========================================================================

    /// A mines, B and C only relay.
    fn cluster() -> TestCluster {
        let mut miner = node_config("A", 7301, &[7302]);
        miner.ledger.mining_enabled = true;
        TestCluster::start(vec![
            miner,
            node_config("B", 7302, &[7301, 7303]),
            node_config("C", 7303, &[7302]),
        ])
    }

    fn same_tip_everywhere(cluster: &TestCluster) -> bool {
        let tip = cluster.node(0).ledger().longest_tip();
        tip.is_some()
            && cluster
                .nodes()
                .iter()
                .all(|n| n.ledger().longest_tip() == tip && n.ledger().pool_len() == 0)
    }

    #[tokio::test]
    async fn test_transaction_from_relay_is_mined_everywhere() {
        let cluster = cluster();

        cluster.node(2).control().submit_transaction(file("song.mp3")).await.unwrap();

        let mined = cluster
            .wait_until(CLUSTER_LIMIT, |c| {
                same_tip_everywhere(c)
                    && c.nodes()
                        .iter()
                        .all(|n| n.control().ledger_snapshot().filenames == vec!["song.mp3".to_string()])
            })
            .await;
        assert!(mined, "claim was not mined and replicated");

        cluster.stop().await;
    }

    #[tokio::test]
    async fn test_signed_share_scenario_across_cluster() {
        let cluster = cluster();
        let alice = cluster.node(0).control();
        let bob = cluster.node(1).control();

        alice.register_identity().await.unwrap();
        bob.register_identity().await.unwrap();
        let registered = cluster
            .wait_until(CLUSTER_LIMIT, |c| {
                c.nodes()
                    .iter()
                    .all(|n| n.control().ledger_snapshot().identities.len() == 2)
            })
            .await;
        assert!(registered);

        alice
            .submit_transaction(Transaction::new(TxPayload::Share(ShareTx::mint("X", 100, "A"))))
            .await
            .unwrap();
        let minted = cluster
            .wait_until(CLUSTER_LIMIT, |c| {
                c.nodes().iter().all(|n| n.ledger().balance("X", "A") == 100)
            })
            .await;
        assert!(minted);

        alice
            .submit_transaction(Transaction::new(TxPayload::Share(ShareTx::transfer(
                "X", 40, "A", "B",
            ))))
            .await
            .unwrap();
        let transferred = cluster
            .wait_until(CLUSTER_LIMIT, |c| {
                c.nodes()
                    .iter()
                    .all(|n| n.ledger().balance("X", "A") == 60 && n.ledger().balance("X", "B") == 40)
            })
            .await;
        assert!(transferred);

        // The overdraw is pooled but never makes it into a block.
        alice
            .submit_transaction(Transaction::new(TxPayload::Share(ShareTx::transfer(
                "X", 70, "A", "B",
            ))))
            .await
            .unwrap();
        cluster.node(2).control().submit_transaction(file("later.txt")).await.unwrap();
        let later = cluster
            .wait_until(CLUSTER_LIMIT, |c| {
                c.nodes()
                    .iter()
                    .all(|n| n.control().ledger_snapshot().filenames.contains(&"later.txt".to_string()))
            })
            .await;
        assert!(later);

        for node in cluster.nodes() {
            assert_eq!(node.ledger().balance("X", "A"), 60);
            assert_eq!(node.ledger().balance("X", "B"), 40);
            let total: u64 = node.control().ledger_snapshot().assets["X"].values().sum();
            assert_eq!(total, 100);
        }
        assert_eq!(alice.ledger_snapshot().pending_transactions, 1);

        cluster.stop().await;
    }

    #[tokio::test]
    async fn test_forged_signature_never_pooled() {
        let cluster = cluster();
        let alice = cluster.node(0).control();
        alice.register_identity().await.unwrap();
        cluster.node(1).control().register_identity().await.unwrap();
        let registered = cluster
            .wait_until(CLUSTER_LIMIT, |c| {
                c.nodes()
                    .iter()
                    .all(|n| n.control().ledger_snapshot().identities.len() == 2)
            })
            .await;
        assert!(registered);

        // B claims to mint to A; the signature bytes are not A's.
        let forged = Transaction::new(TxPayload::Share(ShareTx::mint("Y", 5, "A")))
            .with_signature("A", vec![0u8; 64]);
        let result = cluster.node(1).control().submit_transaction(forged).await;
        assert!(result.is_err());
        assert_eq!(cluster.node(1).ledger().pool_len(), 0);

        cluster.stop().await;
    }
}
