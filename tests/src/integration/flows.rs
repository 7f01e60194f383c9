//! # Consensus Flows
//!
//! Two validators, K = 2, α = 2, β = 1, without Quasar.
//!
//! ## Flows Tested
//!
//! 1. **Push query → chits → accept**: a built block is accepted by its
//!    proposer after one poll, then by the peer after its own poll
//! 2. **Conflict**: accepting one block rejects its sibling
//! 3. **Ancestor sync**: an orphan triggers `GetAncestors`, the reply fills
//!    the gap, and a later poll accepts the whole chain

#[cfg(test)]
mod tests {
    use crate::harness::{Network, NOW};
    use crate::init_tracing;
    use qc_02_topological::Parameters;
    use qc_04_beam::{EngineConfig, Message, Vm};
    use shared_types::{Block, NodeId, Status};
    use tokio_util::sync::CancellationToken;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const A: NodeId = NodeId([0xA1; 20]);
    const B: NodeId = NodeId([0xB2; 20]);

    fn config() -> EngineConfig {
        EngineConfig {
            params: Parameters {
                k: 2,
                alpha_preference: 2,
                alpha_confidence: 2,
                beta: 1,
                concurrent_repolls: 1,
                ..Parameters::local()
            },
            ..Default::default()
        }
    }

    async fn create_network() -> Network {
        init_tracing();
        let network = Network::new(&[A, B], config()).unwrap();
        network.start().await.unwrap();
        network
    }

    // =============================================================================
    // POLLING
    // =============================================================================

    #[tokio::test]
    async fn test_push_query_chits_accept() {
        let net = create_network().await;
        let a = net.node(A).unwrap();
        let b = net.node(B).unwrap();

        a.vm.submit_transaction(b"transfer".to_vec());
        let block = a.engine.build_block(&CancellationToken::new()).await.unwrap();
        a.engine.push_poll(&block).unwrap();

        assert!(net.run_until(|_| a.engine.last_accepted() == block.id()).await);
        assert!(b.engine.is_processing(&block.id()));
        assert_eq!(a.engine.stats().blocks_accepted, 1);

        b.engine.issue_poll(block.id()).unwrap();
        assert!(net.run_until(|_| b.engine.last_accepted() == block.id()).await);
        assert!(net.run_until(|_| b.vm.last_accepted_id() == block.id()).await);
        assert_eq!(
            b.vm.block(&block.id()).unwrap().transactions(),
            &[b"transfer".to_vec()]
        );

        net.stop().await;
    }

    #[tokio::test]
    async fn test_conflicting_sibling_rejected() {
        let net = create_network().await;
        let a = net.node(A).unwrap();
        let b = net.node(B).unwrap();

        let ours = a.engine.build_block(&CancellationToken::new()).await.unwrap();
        let theirs = Block::new(net.genesis(), 1, NOW, B, vec![b"other".to_vec()]);
        a.engine
            .submit(Message::PushQuery {
                node_id: B,
                request_id: 99,
                container: theirs.encode(),
            })
            .unwrap();
        assert!(net.run_until(|_| a.engine.is_processing(&theirs.id())).await);
        assert_eq!(a.engine.preference(), ours.id());

        a.engine.push_poll(&ours).unwrap();
        assert!(net.run_until(|_| a.engine.last_accepted() == ours.id()).await);
        assert!(b.engine.is_processing(&ours.id()));
        assert!(!a.engine.is_processing(&theirs.id()));
        assert!(
            net.run_until(|_| a.vm.block(&theirs.id()).map(|b| b.status()) == Some(Status::Rejected))
                .await
        );
        assert_eq!(a.engine.stats().blocks_rejected, 1);

        net.stop().await;
    }

    // =============================================================================
    // ANCESTOR SYNC
    // =============================================================================

    #[tokio::test]
    async fn test_orphan_synced_through_ancestors() {
        let net = create_network().await;
        let a = net.node(A).unwrap();
        let b = net.node(B).unwrap();

        let b1 = a.engine.build_block(&CancellationToken::new()).await.unwrap();
        a.vm.set_preference(b1.id()).await.unwrap();
        let b2 = a.engine.build_block(&CancellationToken::new()).await.unwrap();
        assert_eq!(b2.parent_id(), b1.id());

        // Only b2 is shipped; B must fetch b1 itself.
        a.engine.push_poll(&b2).unwrap();
        assert!(net.run_until(|_| b.engine.is_processing(&b2.id())).await);
        assert!(b.engine.is_processing(&b1.id()));
        assert_eq!(b.engine.preference(), b2.id());

        a.engine.issue_poll(b2.id()).unwrap();
        assert!(net.run_until(|_| a.engine.last_accepted() == b2.id()).await);
        assert_eq!(a.engine.stats().blocks_accepted, 2);

        net.stop().await;
    }
}
