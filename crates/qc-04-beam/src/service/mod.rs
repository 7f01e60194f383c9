//! # Beam Engine
//!
//! Drives topological consensus from network messages and, in quantum mode,
//! gates block production on a Ringtail certificate.
//!
//! ## Tasks
//!
//! ```text
//! submit() ──→ [inbound queue] ──→ message loop ──→ handlers
//!                                                     │
//!                               Topological ←─────────┤
//!                               PollSet     ←─────────┤
//!                               Quasar      ←─────────┘
//!                                                     │
//!              Sender port ←── sender task ←── [outbound queue]
//! ```
//!
//! The consensus store sits behind one mutex that is never held across an
//! `.await`. A full outbound queue drops the message and counts it.
//!
//! ## Block Production
//!
//! ```text
//! Idle ──build_block──→ Building ──(vm build, verify, certify)──→ Idle
//!                          │
//!                          └── concurrent build_block → AlreadyBuilding
//! ```

mod handlers;

use crate::config::EngineConfig;
use crate::domain::{Message, NodeIdentity, OutboundMessage, ShareGossip};
use crate::error::{EngineError, EngineResult};
use crate::events::SlashEvent;
use crate::ports::{BlsSigner, Sender, Vm};
use parking_lot::Mutex;
use qc_01_poll::{PollSet, SimplePoll};
use qc_02_topological::{ConsensusStats, HealthReport, Topological};
use qc_03_quasar::{
    CertificateVerifier, Quasar, QuasarDependencies, QuasarError, ThresholdSigner,
};
use shared_types::{Block, BlockId, NodeId, TimeSource, Validators, BLS_AGGREGATE_LEN};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};


/// Ringtail signer and certificate verifier for quantum mode.
#[derive(Clone)]
pub struct ThresholdCrypto {
    pub signer: Arc<dyn ThresholdSigner>,
    pub verifier: Arc<dyn CertificateVerifier>,
}

/// External capabilities the engine is wired to.
#[derive(Clone)]
pub struct BeamDependencies {
    pub identity: NodeIdentity,
    pub vm: Arc<dyn Vm>,
    pub sender: Arc<dyn Sender>,
    pub validators: Arc<dyn Validators>,
    pub bls: Arc<dyn BlsSigner>,
    pub time: Arc<dyn TimeSource>,
    /// Required when Quasar is enabled.
    pub threshold_crypto: Option<ThresholdCrypto>,
}

/// Counter snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub messages_handled: u64,
    pub handler_errors: u64,
    pub outbound_sent: u64,
    pub outbound_dropped: u64,
    pub send_failures: u64,
    pub polls_issued: u64,
    pub polls_applied: u64,
    pub polls_below_alpha: u64,
    pub blocks_built: u64,
    pub blocks_accepted: u64,
    pub blocks_rejected: u64,
    pub blocks_quantum: u64,
    pub slash_events: u64,
    pub slash_dropped: u64,
}

#[derive(Default)]
struct Counters {
    messages_handled: AtomicU64,
    handler_errors: AtomicU64,
    outbound_sent: AtomicU64,
    outbound_dropped: AtomicU64,
    send_failures: AtomicU64,
    polls_issued: AtomicU64,
    polls_applied: AtomicU64,
    polls_below_alpha: AtomicU64,
    blocks_built: AtomicU64,
    blocks_accepted: AtomicU64,
    blocks_rejected: AtomicU64,
    blocks_quantum: AtomicU64,
    slash_events: AtomicU64,
    slash_dropped: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl Counters {
    fn snapshot(&self) -> EngineStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        EngineStats {
            messages_handled: load(&self.messages_handled),
            handler_errors: load(&self.handler_errors),
            outbound_sent: load(&self.outbound_sent),
            outbound_dropped: load(&self.outbound_dropped),
            send_failures: load(&self.send_failures),
            polls_issued: load(&self.polls_issued),
            polls_applied: load(&self.polls_applied),
            polls_below_alpha: load(&self.polls_below_alpha),
            blocks_built: load(&self.blocks_built),
            blocks_accepted: load(&self.blocks_accepted),
            blocks_rejected: load(&self.blocks_rejected),
            blocks_quantum: load(&self.blocks_quantum),
            slash_events: load(&self.slash_events),
            slash_dropped: load(&self.slash_dropped),
        }
    }
}

/// Resets the building flag when dropped.
struct BuildGuard<'a>(&'a AtomicBool);

impl<'a> BuildGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> EngineResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| EngineError::AlreadyBuilding)?;
        Ok(Self(flag))
    }
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct EngineInner {
    config: EngineConfig,
    identity: NodeIdentity,
    vm: Arc<dyn Vm>,
    sender: Arc<dyn Sender>,
    validators: Arc<dyn Validators>,
    bls: Arc<dyn BlsSigner>,
    time: Arc<dyn TimeSource>,
    quasar: Option<Quasar>,

    store: Mutex<Topological<Block>>,
    polls: PollSet,
    /// Orphans keyed by the parent they wait for.
    pending: Mutex<HashMap<BlockId, Vec<BlockId>>>,
    next_request_id: AtomicU32,
    building: AtomicBool,
    started: AtomicBool,

    inbound_tx: mpsc::Sender<Message>,
    outbound_tx: mpsc::Sender<OutboundMessage>,
    slash_tx: mpsc::Sender<SlashEvent>,
    counters: Counters,
}

impl EngineInner {
    fn next_request_id(&self) -> u32 {
        self.next_request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Queue a message for the sender task. Never blocks.
    fn enqueue(&self, message: OutboundMessage) {
        match self.outbound_tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                bump(&self.counters.outbound_dropped);
                warn!(kind = message.kind(), "Outbound queue full, dropping message");
            }
            Err(TrySendError::Closed(message)) => {
                bump(&self.counters.outbound_dropped);
                debug!(kind = message.kind(), "Outbound queue closed, dropping message");
            }
        }
    }

    fn report_slash(&self, event: SlashEvent) {
        warn!(
            proposer = %event.proposer_id,
            height = event.height,
            reason = %event.reason,
            "Reporting proposer for slashing"
        );
        match self.slash_tx.try_send(event) {
            Ok(()) => bump(&self.counters.slash_events),
            Err(TrySendError::Full(event)) => {
                bump(&self.counters.slash_dropped);
                warn!(height = event.height, "Slash channel full, dropping event");
            }
            Err(TrySendError::Closed(event)) => {
                bump(&self.counters.slash_dropped);
                debug!(height = event.height, "Slash receiver gone, dropping event");
            }
        }
    }

    fn open_poll(&self) -> EngineResult<(u32, Vec<NodeId>)> {
        let voters = self.validators.sample(self.config.params.k);
        if voters.is_empty() {
            return Err(EngineError::NoValidators);
        }
        let request_id = self.next_request_id();
        self.polls.add(
            request_id,
            Box::new(SimplePoll::new(request_id, voters.iter().copied())),
        )?;
        bump(&self.counters.polls_issued);
        debug!(request_id, voters = voters.len(), "Poll issued");
        Ok((request_id, voters))
    }

    // =========================================================================
    // BLOCK PRODUCTION
    // =========================================================================

    async fn build_block(&self, cancel: &CancellationToken) -> EngineResult<Block> {
        let mut block = self.vm.build_block().await.map_err(EngineError::Vm)?;
        block.verify(self.time.now())?;
        self.vm
            .verify_with_context(&block)
            .await
            .map_err(EngineError::Vm)?;

        if let Some(quasar) = &self.quasar {
            self.certify(quasar, &mut block, cancel).await?;
            // Certificates change the id; the VM must serve the certified container.
            self.vm
                .parse_block(&block.encode())
                .await
                .map_err(EngineError::Vm)?;
        }

        self.store.lock().add(block.clone())?;
        bump(&self.counters.blocks_built);
        info!(
            block = %block.id(),
            height = block.height(),
            txs = block.transactions().len(),
            dual_cert = block.has_dual_cert(),
            "Block built"
        );
        Ok(block)
    }

    /// Contribute our share, then wait for the aggregated certificate.
    async fn certify(
        &self,
        quasar: &Quasar,
        block: &mut Block,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        let height = block.height();
        let message = block.signing_digest();
        let waiter = quasar.subscribe(height);
        let waiter_id = waiter.id();

        let bls_aggregate = match self.sign_for_certificate(quasar, height, &message) {
            Ok(signature) => signature,
            Err(e) => {
                quasar.cancel_registration(height, waiter_id);
                return Err(e);
            }
        };

        match quasar.wait(waiter, self.config.quasar.timeout, cancel).await {
            Ok(certificate) => {
                block.attach_certificates(bls_aggregate, certificate)?;
                Ok(())
            }
            Err(QuasarError::Timeout { height }) => {
                self.report_slash(SlashEvent::quasar_timeout(
                    self.identity.node_id,
                    height,
                    self.time.now(),
                ));
                Err(EngineError::Timeout { height })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn sign_for_certificate(
        &self,
        quasar: &Quasar,
        height: u64,
        message: &[u8; 32],
    ) -> EngineResult<[u8; BLS_AGGREGATE_LEN]> {
        let node_id = self.identity.node_id;
        let share = quasar.quick_sign(message)?;
        quasar.on_share(height, node_id, share.clone())?;
        self.enqueue(OutboundMessage::AppGossip {
            payload: ShareGossip {
                height,
                node_id,
                message: *message,
                share,
            }
            .encode(),
        });
        self.bls.sign(message).map_err(EngineError::Bls)
    }

    // =========================================================================
    // TASK BODIES
    // =========================================================================

    async fn dispatch(&self, message: Message) {
        let kind = message.kind();
        let node = message.node_id();
        bump(&self.counters.messages_handled);
        if let Err(e) = self.handle_message(message).await {
            bump(&self.counters.handler_errors);
            debug!(kind, node = %node, error = %e, "Failed to handle message");
        }
    }

    async fn deliver(&self, message: OutboundMessage) {
        let kind = message.kind();
        let result = match message {
            OutboundMessage::GetAncestors {
                node_id,
                request_id,
                block_id,
            } => {
                self.sender
                    .send_get_ancestors(node_id, request_id, block_id)
                    .await
            }
            OutboundMessage::PullQuery {
                node_ids,
                request_id,
                block_id,
            } => {
                self.sender
                    .send_pull_query(&node_ids, request_id, block_id)
                    .await
            }
            OutboundMessage::PushQuery {
                node_ids,
                request_id,
                container,
            } => {
                self.sender
                    .send_push_query(&node_ids, request_id, &container)
                    .await
            }
            OutboundMessage::Chits {
                node_id,
                request_id,
                preferred_id,
                accepted_id,
            } => {
                self.sender
                    .send_chits(node_id, request_id, preferred_id, accepted_id)
                    .await
            }
            OutboundMessage::Get {
                node_id,
                request_id,
                block_id,
            } => self.sender.send_get(node_id, request_id, block_id).await,
            OutboundMessage::Put {
                node_id,
                request_id,
                container,
            } => self.sender.send_put(node_id, request_id, &container).await,
            OutboundMessage::Ancestors {
                node_id,
                request_id,
                containers,
            } => {
                self.sender
                    .send_ancestors(node_id, request_id, &containers)
                    .await
            }
            OutboundMessage::AppGossip { payload } => self.sender.send_app_gossip(&payload).await,
        };
        match result {
            Ok(()) => bump(&self.counters.outbound_sent),
            Err(e) => {
                bump(&self.counters.send_failures);
                warn!(kind, error = %e, "Outbound send failed");
            }
        }
    }
}

async fn run_message_loop(
    inner: Arc<EngineInner>,
    mut rx: mpsc::Receiver<Message>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Some(message) => inner.dispatch(message).await,
                None => break,
            },
            _ = cancel.cancelled() => {
                rx.close();
                while let Some(message) = rx.recv().await {
                    inner.dispatch(message).await;
                }
                break;
            }
        }
    }
    debug!("Message loop exited");
}

async fn run_sender(
    inner: Arc<EngineInner>,
    mut rx: mpsc::Receiver<OutboundMessage>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Some(message) => inner.deliver(message).await,
                None => break,
            },
            _ = cancel.cancelled() => {
                rx.close();
                while let Some(message) = rx.recv().await {
                    inner.deliver(message).await;
                }
                break;
            }
        }
    }
    debug!("Sender task exited");
}

/// Beam consensus engine.
pub struct BeamEngine {
    inner: Arc<EngineInner>,
    inbound_rx: Mutex<Option<mpsc::Receiver<Message>>>,
    outbound_rx: Mutex<Option<mpsc::Receiver<OutboundMessage>>>,
    slash_rx: Mutex<Option<mpsc::Receiver<SlashEvent>>>,
    loop_cancel: CancellationToken,
    sender_cancel: CancellationToken,
    message_loop: Mutex<Option<JoinHandle<()>>>,
    sender_task: Mutex<Option<JoinHandle<()>>>,
}

impl BeamEngine {
    /// Validate the configuration and wire the engine.
    ///
    /// With Quasar enabled this must run inside a tokio runtime.
    pub fn new(config: EngineConfig, deps: BeamDependencies) -> EngineResult<Self> {
        config.validate()?;

        let quasar = if config.quasar_enabled {
            let crypto = deps.threshold_crypto.clone().ok_or_else(|| {
                EngineError::InvalidConfig("quasar enabled without threshold crypto".into())
            })?;
            Some(Quasar::new(
                deps.identity.node_id,
                deps.identity.ringtail_secret.clone(),
                config.quasar.clone(),
                QuasarDependencies {
                    signer: crypto.signer,
                    verifier: crypto.verifier,
                    validators: Some(Arc::clone(&deps.validators)),
                },
            )?)
        } else {
            None
        };

        let (inbound_tx, inbound_rx) = mpsc::channel(config.inbound_capacity);
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_capacity);
        let (slash_tx, slash_rx) = mpsc::channel(config.slash_capacity);

        let inner = Arc::new(EngineInner {
            store: Mutex::new(Topological::with_time_source(Arc::clone(&deps.time))),
            config,
            identity: deps.identity,
            vm: deps.vm,
            sender: deps.sender,
            validators: deps.validators,
            bls: deps.bls,
            time: deps.time,
            quasar,
            polls: PollSet::new(),
            pending: Mutex::new(HashMap::new()),
            next_request_id: AtomicU32::new(1),
            building: AtomicBool::new(false),
            started: AtomicBool::new(false),
            inbound_tx,
            outbound_tx,
            slash_tx,
            counters: Counters::default(),
        });

        Ok(Self {
            inner,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            outbound_rx: Mutex::new(Some(outbound_rx)),
            slash_rx: Mutex::new(Some(slash_rx)),
            loop_cancel: CancellationToken::new(),
            sender_cancel: CancellationToken::new(),
            message_loop: Mutex::new(None),
            sender_task: Mutex::new(None),
        })
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Anchor consensus at the VM's last accepted block and spawn the tasks.
    pub async fn start(&self) -> EngineResult<()> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(EngineError::AlreadyStarted);
        }
        if let Err(e) = self.initialize_store().await {
            self.inner.started.store(false, Ordering::SeqCst);
            return Err(e);
        }

        let inbound = self.inbound_rx.lock().take();
        let outbound = self.outbound_rx.lock().take();
        let (Some(inbound), Some(outbound)) = (inbound, outbound) else {
            return Err(EngineError::AlreadyStarted);
        };

        let message_loop = tokio::spawn(run_message_loop(
            Arc::clone(&self.inner),
            inbound,
            self.loop_cancel.clone(),
        ));
        let sender_task = tokio::spawn(run_sender(
            Arc::clone(&self.inner),
            outbound,
            self.sender_cancel.clone(),
        ));
        *self.message_loop.lock() = Some(message_loop);
        *self.sender_task.lock() = Some(sender_task);

        info!(
            node = %self.inner.identity.node_id,
            quasar_enabled = self.inner.config.quasar_enabled,
            anchor = %self.last_accepted(),
            "Beam engine started"
        );
        Ok(())
    }

    async fn initialize_store(&self) -> EngineResult<()> {
        let anchor_id = self
            .inner
            .vm
            .last_accepted()
            .await
            .map_err(EngineError::Vm)?;
        let anchor = self
            .inner
            .vm
            .get_block(anchor_id)
            .await
            .map_err(EngineError::Vm)?;
        self.inner.store.lock().initialize(
            self.inner.config.params,
            anchor_id,
            anchor.height(),
            anchor.timestamp(),
        )?;
        Ok(())
    }

    /// Close the inbound queue, drain it, then drain outbound and join.
    pub async fn stop(&self) {
        self.loop_cancel.cancel();
        let message_loop = self.message_loop.lock().take();
        if let Some(handle) = message_loop {
            if let Err(e) = handle.await {
                warn!(error = %e, "Message loop ended abnormally");
            }
        }

        self.sender_cancel.cancel();
        let sender_task = self.sender_task.lock().take();
        if let Some(handle) = sender_task {
            if let Err(e) = handle.await {
                warn!(error = %e, "Sender task ended abnormally");
            }
        }

        if let Some(quasar) = &self.inner.quasar {
            quasar.shutdown().await;
        }
        info!(node = %self.inner.identity.node_id, "Beam engine stopped");
    }

    // =========================================================================
    // INPUT
    // =========================================================================

    /// Queue an inbound message without waiting.
    pub fn submit(&self, message: Message) -> EngineResult<()> {
        self.inner
            .inbound_tx
            .try_send(message)
            .map_err(|e| match e {
                TrySendError::Full(_) => EngineError::InboundFull,
                TrySendError::Closed(_) => EngineError::Stopped,
            })
    }

    /// Handle for producers that prefer to await queue space.
    pub fn inbound(&self) -> mpsc::Sender<Message> {
        self.inner.inbound_tx.clone()
    }

    /// Receiving end of the slash channel. Available once.
    pub fn slash_events(&self) -> Option<mpsc::Receiver<SlashEvent>> {
        self.slash_rx.lock().take()
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Build, certify (in quantum mode) and issue a block.
    pub async fn build_block(&self, cancel: &CancellationToken) -> EngineResult<Block> {
        let _guard = BuildGuard::acquire(&self.inner.building)?;
        self.inner.build_block(cancel).await
    }

    pub fn is_building(&self) -> bool {
        self.inner.building.load(Ordering::Acquire)
    }

    /// Sample K validators and ask for their preference on `block_id`.
    pub fn issue_poll(&self, block_id: BlockId) -> EngineResult<u32> {
        let (request_id, node_ids) = self.inner.open_poll()?;
        self.inner.enqueue(OutboundMessage::PullQuery {
            node_ids,
            request_id,
            block_id,
        });
        Ok(request_id)
    }

    /// Like `issue_poll`, shipping the block with the query.
    pub fn push_poll(&self, block: &Block) -> EngineResult<u32> {
        let (request_id, node_ids) = self.inner.open_poll()?;
        self.inner.enqueue(OutboundMessage::PushQuery {
            node_ids,
            request_id,
            container: block.encode(),
        });
        Ok(request_id)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn node_id(&self) -> NodeId {
        self.inner.identity.node_id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn preference(&self) -> BlockId {
        self.inner.store.lock().preference()
    }

    pub fn last_accepted(&self) -> BlockId {
        self.inner.store.lock().last_accepted()
    }

    pub fn is_processing(&self, id: &BlockId) -> bool {
        self.inner.store.lock().processing(id)
    }

    pub fn health_check(&self) -> HealthReport {
        self.inner.store.lock().health_check()
    }

    pub fn consensus_stats(&self) -> ConsensusStats {
        self.inner.store.lock().stats()
    }

    pub fn open_polls(&self) -> usize {
        self.inner.polls.len()
    }

    /// Orphans waiting for an ancestor to arrive.
    pub fn pending_orphans(&self) -> usize {
        self.inner.pending.lock().values().map(Vec::len).sum()
    }

    pub fn quasar(&self) -> Option<&Quasar> {
        self.inner.quasar.as_ref()
    }

    pub fn stats(&self) -> EngineStats {
        self.inner.counters.snapshot()
    }
}
