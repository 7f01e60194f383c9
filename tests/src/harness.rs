//! In-process network of Beam engines.
//!
//! Every node records its outbound traffic in a `RecordingSender`;
//! [`Network::relay`] moves those messages into the addressed engines'
//! inbound queues, rewriting the node id to the sender's.

use parking_lot::Mutex;
use qc_03_quasar::adapters::{MockCertificateVerifier, MockThresholdSigner};
use qc_04_beam::adapters::{InMemoryVm, MockBlsSigner, RecordingSender};
use qc_04_beam::{
    BeamDependencies, BeamEngine, EngineConfig, EngineError, EngineResult, Message,
    NodeIdentity, OutboundMessage, ShareGossip, ThresholdCrypto,
};
use shared_types::{Block, BlockId, FixedTimeSource, NodeId, StaticValidatorSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const GROUP_KEY: &[u8] = b"ringtail-group-key";
pub const BLS_KEY: &[u8] = b"bls-aggregate-key";
pub const NOW: i64 = 1_700_000_000;

/// One validator: its engine plus the adapters it was wired with.
pub struct TestNode {
    pub id: NodeId,
    pub engine: BeamEngine,
    pub vm: Arc<InMemoryVm>,
    pub sender: Arc<RecordingSender>,
}

pub struct Network {
    nodes: Vec<TestNode>,
    genesis: BlockId,
    gossip: Mutex<Vec<ShareGossip>>,
}

impl Network {
    /// Equal-weight validator set of `ids`, all sharing one genesis and one
    /// set of group keys.
    pub fn new(ids: &[NodeId], config: EngineConfig) -> EngineResult<Self> {
        let genesis = Block::genesis(0);
        let genesis_id = genesis.id();
        let validators = Arc::new(StaticValidatorSet::uniform(ids.iter().copied()));
        let time = Arc::new(FixedTimeSource(NOW));

        let mut nodes = Vec::with_capacity(ids.len());
        for id in ids {
            let vm = Arc::new(InMemoryVm::new(*id, genesis.clone(), time.clone()));
            let sender = Arc::new(RecordingSender::new());
            let deps = BeamDependencies {
                identity: NodeIdentity {
                    node_id: *id,
                    ringtail_secret: id.as_bytes().to_vec(),
                    bls_public_key: BLS_KEY.to_vec(),
                    ringtail_public_key: GROUP_KEY.to_vec(),
                },
                vm: vm.clone(),
                sender: sender.clone(),
                validators: validators.clone(),
                bls: Arc::new(MockBlsSigner::new(BLS_KEY.to_vec())),
                time: time.clone(),
                threshold_crypto: Some(ThresholdCrypto {
                    signer: Arc::new(MockThresholdSigner::new(GROUP_KEY.to_vec())),
                    verifier: Arc::new(MockCertificateVerifier),
                }),
            };
            nodes.push(TestNode {
                id: *id,
                engine: BeamEngine::new(config.clone(), deps)?,
                vm,
                sender,
            });
        }

        Ok(Self {
            nodes,
            genesis: genesis_id,
            gossip: Mutex::new(Vec::new()),
        })
    }

    pub fn genesis(&self) -> BlockId {
        self.genesis
    }

    pub fn nodes(&self) -> &[TestNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&TestNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub async fn start(&self) -> EngineResult<()> {
        for node in &self.nodes {
            node.engine.start().await?;
        }
        Ok(())
    }

    pub async fn stop(&self) {
        for node in &self.nodes {
            node.engine.stop().await;
        }
    }

    /// Share gossip seen so far, in relay order.
    pub fn gossip(&self) -> Vec<ShareGossip> {
        self.gossip.lock().clone()
    }

    /// Deliver every recorded outbound message. Returns how many inbound
    /// messages were queued.
    pub fn relay(&self) -> usize {
        let mut delivered = 0;
        for from in &self.nodes {
            for message in from.sender.take() {
                for (to, inbound) in self.route(from.id, message) {
                    let Some(target) = self.node(to) else {
                        debug!(to = %to, "Relay target not in network");
                        continue;
                    };
                    match target.engine.submit(inbound) {
                        Ok(()) => delivered += 1,
                        Err(e) => debug!(to = %to, error = %e, "Relay submit failed"),
                    }
                }
            }
        }
        delivered
    }

    /// Relay until `condition` holds or about two seconds pass.
    pub async fn run_until(&self, mut condition: impl FnMut(&Self) -> bool) -> bool {
        for _ in 0..400 {
            self.relay();
            if condition(self) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    /// Have `signer` contribute its Ringtail share for `gossip` and deliver
    /// it to every other node.
    pub fn endorse(&self, signer: NodeId, gossip: &ShareGossip) -> EngineResult<()> {
        let node = self
            .node(signer)
            .ok_or_else(|| EngineError::InvalidConfig(format!("{signer} not in network")))?;
        let quasar = node.engine.quasar().ok_or(EngineError::QuasarDisabled)?;
        let share = quasar.quick_sign(&gossip.message)?;
        for target in self.nodes.iter().filter(|n| n.id != signer) {
            target.engine.submit(Message::Share {
                node_id: signer,
                height: gossip.height,
                share: share.clone(),
            })?;
        }
        Ok(())
    }

    fn route(&self, from: NodeId, message: OutboundMessage) -> Vec<(NodeId, Message)> {
        match message {
            OutboundMessage::PullQuery {
                node_ids,
                request_id,
                block_id,
            } => node_ids
                .into_iter()
                .map(|to| {
                    (
                        to,
                        Message::PullQuery {
                            node_id: from,
                            request_id,
                            block_id,
                        },
                    )
                })
                .collect(),
            OutboundMessage::PushQuery {
                node_ids,
                request_id,
                container,
            } => node_ids
                .into_iter()
                .map(|to| {
                    (
                        to,
                        Message::PushQuery {
                            node_id: from,
                            request_id,
                            container: container.clone(),
                        },
                    )
                })
                .collect(),
            OutboundMessage::Chits {
                node_id,
                request_id,
                preferred_id,
                accepted_id,
            } => vec![(
                node_id,
                Message::Chits {
                    node_id: from,
                    request_id,
                    preferred_id,
                    accepted_id,
                },
            )],
            OutboundMessage::GetAncestors {
                node_id,
                request_id,
                block_id,
            } => vec![(
                node_id,
                Message::GetAncestors {
                    node_id: from,
                    request_id,
                    block_id,
                },
            )],
            OutboundMessage::Get {
                node_id,
                request_id,
                block_id,
            } => vec![(
                node_id,
                Message::Get {
                    node_id: from,
                    request_id,
                    block_id,
                },
            )],
            OutboundMessage::Put {
                node_id,
                request_id,
                container,
            } => vec![(
                node_id,
                Message::Put {
                    node_id: from,
                    request_id,
                    container,
                },
            )],
            OutboundMessage::Ancestors {
                node_id,
                request_id,
                containers,
            } => vec![(
                node_id,
                Message::Ancestors {
                    node_id: from,
                    request_id,
                    containers,
                },
            )],
            OutboundMessage::AppGossip { payload } => {
                let Ok(gossip) = ShareGossip::decode(&payload) else {
                    debug!(from = %from, "Undecodable gossip dropped");
                    return Vec::new();
                };
                let share = Message::Share {
                    node_id: gossip.node_id,
                    height: gossip.height,
                    share: gossip.share.clone(),
                };
                self.gossip.lock().push(gossip);
                self.nodes
                    .iter()
                    .filter(|n| n.id != from)
                    .map(|n| (n.id, share.clone()))
                    .collect()
            }
        }
    }
}
