//! # Quantum Finality Flows
//!
//! Two validators with Quasar enabled and a Ringtail threshold of 2, so a
//! block can only be certified once both have contributed a share.
//!
//! ## Flows Tested
//!
//! 1. **Certified block**: proposer share gossiped, peer endorses, the
//!    certificate is aggregated and attached, both nodes reach quantum
//!    finality after polling
//! 2. **Missing endorsement**: the certificate wait times out and the
//!    proposer is reported on the slash channel
//! 3. **Uncertified block**: a peer refuses to issue a block without dual
//!    certificates

#[cfg(test)]
mod tests {
    use crate::harness::{Network, BLS_KEY, GROUP_KEY, NOW};
    use crate::init_tracing;
    use qc_02_topological::Parameters;
    use qc_03_quasar::QuasarConfig;
    use qc_04_beam::{EngineConfig, EngineError, Message, SlashReason};
    use shared_types::{Block, NodeId, Status};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const A: NodeId = NodeId([0xA1; 20]);
    const B: NodeId = NodeId([0xB2; 20]);

    fn config(timeout: Duration) -> EngineConfig {
        EngineConfig {
            params: Parameters {
                k: 2,
                alpha_preference: 2,
                alpha_confidence: 2,
                beta: 1,
                concurrent_repolls: 1,
                ..Parameters::local()
            },
            quasar_enabled: true,
            quasar: QuasarConfig {
                threshold: 2,
                timeout,
                pool_capacity: 8,
                precompute_interval: Duration::from_millis(20),
                prefill: true,
            },
            ..Default::default()
        }
    }

    async fn create_network(timeout: Duration) -> Network {
        init_tracing();
        let network = Network::new(&[A, B], config(timeout)).unwrap();
        network.start().await.unwrap();
        network
    }

    // =============================================================================
    // CERTIFICATION
    // =============================================================================

    #[tokio::test]
    async fn test_certified_block_reaches_quantum_on_both_nodes() {
        let net = create_network(Duration::from_secs(2)).await;
        let a = net.node(A).unwrap();
        let b = net.node(B).unwrap();
        let cancel = CancellationToken::new();

        let (built, endorsed) = tokio::join!(a.engine.build_block(&cancel), async {
            if !net.run_until(|n| !n.gossip().is_empty()).await {
                return false;
            }
            let gossip = net.gossip()[0].clone();
            net.endorse(B, &gossip).is_ok()
        });
        assert!(endorsed);
        let block = built.unwrap();
        assert!(block.has_dual_cert());
        a.engine
            .quasar()
            .unwrap()
            .verify_dual_certificates(&block, BLS_KEY, GROUP_KEY)
            .unwrap();

        a.engine.push_poll(&block).unwrap();
        assert!(net.run_until(|_| a.engine.stats().blocks_quantum == 1).await);
        assert_eq!(a.engine.last_accepted(), block.id());
        assert!(
            net.run_until(|_| a.vm.block(&block.id()).map(|b| b.status()) == Some(Status::Quantum))
                .await
        );

        b.engine.issue_poll(block.id()).unwrap();
        assert!(net.run_until(|_| b.engine.stats().blocks_quantum == 1).await);
        assert_eq!(b.engine.last_accepted(), block.id());

        net.stop().await;
    }

    #[tokio::test]
    async fn test_missing_endorsement_slashes_proposer() {
        let net = create_network(Duration::from_millis(100)).await;
        let a = net.node(A).unwrap();
        let mut slashes = a.engine.slash_events().unwrap();

        let err = a
            .engine
            .build_block(&CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::Timeout { height: 1 });

        let event = slashes.try_recv().unwrap();
        assert_eq!(event.proposer_id, A);
        assert_eq!(event.height, 1);
        assert_eq!(event.reason, SlashReason::QuasarTimeout);
        assert_eq!(
            event.reason.to_string(),
            "Quasar timeout: missing Ringtail certificate"
        );
        assert_eq!(a.engine.stats().blocks_built, 0);
        assert!(!a.engine.is_building());

        net.stop().await;
    }

    #[tokio::test]
    async fn test_uncertified_block_not_issued() {
        let net = create_network(Duration::from_secs(1)).await;
        let b = net.node(B).unwrap();

        let block = Block::new(net.genesis(), 1, NOW, A, vec![b"tx".to_vec()]);
        b.engine
            .submit(Message::PushQuery {
                node_id: A,
                request_id: 1,
                container: block.encode(),
            })
            .unwrap();

        assert!(net.run_until(|_| b.engine.stats().handler_errors == 1).await);
        assert!(!b.engine.is_processing(&block.id()));
        assert_eq!(b.engine.preference(), net.genesis());

        net.stop().await;
    }
}
