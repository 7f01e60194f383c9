//! # Quasar Service
//!
//! Collects Ringtail shares per height, aggregates them once the threshold
//! is reached and hands the certificate to every registered waiter.
//!
//! ## Share Flow
//!
//! ```text
//! on_share(h, node, share)
//!     └── shares[h][node] = share      (last write wins)
//!         └── count ≥ threshold and no aggregation running for h
//!             └── spawn aggregate(h) on the captured runtime
//!                 ├── ok:  clear shares[h], waiters[h]; deliver certificate
//!                 └── err: keep shares[h]; next share retries
//! ```
//!
//! ## Precompute Pool
//!
//! A background task adds one precomputed item per tick while the pool is
//! below capacity. `quick_sign` consumes items FIFO and falls back to a
//! direct signature when the pool is empty.

use crate::config::QuasarConfig;
use crate::domain::{share_digest, Certificate, PrecomputePool, Share, WaiterId};
use crate::error::{QuasarError, QuasarResult};
use crate::metrics;
use crate::ports::{CertificateVerifier, ThresholdSigner};
use parking_lot::{Mutex, RwLock};
use shared_types::{Block, NodeId, Validators};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};


/// External capabilities the certifier is wired to.
#[derive(Clone)]
pub struct QuasarDependencies {
    pub signer: Arc<dyn ThresholdSigner>,
    pub verifier: Arc<dyn CertificateVerifier>,
    /// When set, shares from non-members are refused.
    pub validators: Option<Arc<dyn Validators>>,
}

/// Counter snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuasarStats {
    pub shares_collected: u64,
    pub certificates_generated: u64,
    pub certificates_delivered: u64,
    pub aggregation_failures: u64,
    pub timeouts: u64,
    pub precomputed_generated: u64,
    pub precomputed_consumed: u64,
    pub pool_misses: u64,
}

#[derive(Default)]
struct Counters {
    shares_collected: AtomicU64,
    certificates_generated: AtomicU64,
    certificates_delivered: AtomicU64,
    aggregation_failures: AtomicU64,
    timeouts: AtomicU64,
    pool_misses: AtomicU64,
}

/// Pending registration for one height's certificate.
#[derive(Debug)]
pub struct CertificateWaiter {
    height: u64,
    id: WaiterId,
    rx: oneshot::Receiver<Certificate>,
}

impl CertificateWaiter {
    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn id(&self) -> WaiterId {
        self.id
    }
}

type Waiters = Vec<(WaiterId, oneshot::Sender<Certificate>)>;

struct Inner {
    node_id: NodeId,
    secret: Vec<u8>,
    config: QuasarConfig,
    signer: Arc<dyn ThresholdSigner>,
    verifier: Arc<dyn CertificateVerifier>,
    validators: Option<Arc<dyn Validators>>,
    pool: PrecomputePool,
    shares: RwLock<HashMap<u64, BTreeMap<NodeId, Share>>>,
    waiters: Mutex<HashMap<u64, Waiters>>,
    aggregating: Mutex<HashSet<u64>>,
    next_waiter: AtomicU64,
    counters: Counters,
}

impl Inner {
    /// Generate one precomputed item if the pool has room.
    fn refill_one(&self) -> bool {
        if self.pool.is_full() {
            return false;
        }
        match self.signer.precompute(&self.secret) {
            Ok(item) => {
                let kept = self.pool.push(item);
                metrics::set_pool_size(self.pool.len());
                kept
            }
            Err(e) => {
                warn!(error = %e, "Precomputation failed");
                false
            }
        }
    }

    fn fill_pool(&self) {
        while self.refill_one() {}
        debug!(size = self.pool.len(), "Precompute pool filled");
    }

    fn remove_waiter(&self, height: u64, id: WaiterId) -> bool {
        let mut waiters = self.waiters.lock();
        let Some(list) = waiters.get_mut(&height) else {
            return false;
        };
        let before = list.len();
        list.retain(|(waiter, _)| *waiter != id);
        let removed = list.len() != before;
        if list.is_empty() {
            waiters.remove(&height);
        }
        removed
    }

    /// Aggregate the first `threshold` shares for `height` and deliver.
    fn aggregate(&self, height: u64) {
        let threshold = self.config.threshold;
        let selected: Vec<Share> = {
            let shares = self.shares.read();
            match shares.get(&height) {
                Some(by_node) if by_node.len() >= threshold => {
                    by_node.values().take(threshold).cloned().collect()
                }
                _ => {
                    self.aggregating.lock().remove(&height);
                    return;
                }
            }
        };

        match self.signer.aggregate(&selected) {
            Ok(certificate) => {
                self.shares.write().remove(&height);
                let waiters = self.waiters.lock().remove(&height).unwrap_or_default();
                self.aggregating.lock().remove(&height);

                let registered = waiters.len();
                let delivered = waiters
                    .into_iter()
                    .filter_map(|(_, tx)| tx.send(certificate.clone()).ok())
                    .count();

                self.counters
                    .certificates_generated
                    .fetch_add(1, Ordering::Relaxed);
                self.counters
                    .certificates_delivered
                    .fetch_add(delivered as u64, Ordering::Relaxed);
                metrics::record_certificate();
                info!(
                    height,
                    shares = selected.len(),
                    registered,
                    delivered,
                    "Ringtail certificate aggregated"
                );
            }
            Err(e) => {
                self.counters
                    .aggregation_failures
                    .fetch_add(1, Ordering::Relaxed);
                metrics::record_aggregation_failure();
                self.aggregating.lock().remove(&height);
                warn!(height, error = %e, "Share aggregation failed");
            }
        }
    }
}

/// Quasar certifier.
///
/// Must be constructed inside a tokio runtime. Aggregation tasks are spawned
/// on that runtime, so `on_share` may be called from any thread.
pub struct Quasar {
    inner: Arc<Inner>,
    runtime: Handle,
    cancel: CancellationToken,
    refill: Mutex<Option<JoinHandle<()>>>,
}

impl Quasar {
    pub fn new(
        node_id: NodeId,
        secret: impl Into<Vec<u8>>,
        config: QuasarConfig,
        deps: QuasarDependencies,
    ) -> QuasarResult<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(QuasarError::EmptySecretKey);
        }
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| QuasarError::NoRuntime)?;

        let inner = Arc::new(Inner {
            node_id,
            secret,
            pool: PrecomputePool::new(config.pool_capacity),
            config,
            signer: deps.signer,
            verifier: deps.verifier,
            validators: deps.validators,
            shares: RwLock::new(HashMap::new()),
            waiters: Mutex::new(HashMap::new()),
            aggregating: Mutex::new(HashSet::new()),
            next_waiter: AtomicU64::new(0),
            counters: Counters::default(),
        });

        if inner.config.prefill {
            inner.fill_pool();
        }

        let cancel = CancellationToken::new();
        let refill = runtime.spawn(refill_loop(Arc::clone(&inner), cancel.clone()));

        info!(
            node = %node_id,
            threshold = inner.config.threshold,
            pool_capacity = inner.config.pool_capacity,
            "Quasar certifier started"
        );

        Ok(Self {
            inner,
            runtime,
            cancel,
            refill: Mutex::new(Some(refill)),
        })
    }

    pub fn node_id(&self) -> NodeId {
        self.inner.node_id
    }

    pub fn config(&self) -> &QuasarConfig {
        &self.inner.config
    }

    pub fn threshold(&self) -> usize {
        self.inner.config.threshold
    }

    // =========================================================================
    // WAITERS
    // =========================================================================

    /// Register a channel for the certificate at `height`.
    pub fn register_for_certificate(
        &self,
        height: u64,
        tx: oneshot::Sender<Certificate>,
    ) -> WaiterId {
        let id = WaiterId(self.inner.next_waiter.fetch_add(1, Ordering::Relaxed));
        self.inner
            .waiters
            .lock()
            .entry(height)
            .or_default()
            .push((id, tx));
        debug!(height, waiter = id.0, "Registered certificate waiter");
        id
    }

    /// Remove a registration. Returns whether it was still pending.
    pub fn cancel_registration(&self, height: u64, id: WaiterId) -> bool {
        self.inner.remove_waiter(height, id)
    }

    /// Register and return the receiving side.
    pub fn subscribe(&self, height: u64) -> CertificateWaiter {
        let (tx, rx) = oneshot::channel();
        let id = self.register_for_certificate(height, tx);
        CertificateWaiter { height, id, rx }
    }

    /// Wait for a subscribed certificate.
    ///
    /// On timeout or cancellation the registration is removed.
    pub async fn wait(
        &self,
        waiter: CertificateWaiter,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> QuasarResult<Certificate> {
        let CertificateWaiter { height, id, rx } = waiter;
        tokio::select! {
            biased;
            result = rx => result.map_err(|_| QuasarError::WaiterDropped { height }),
            _ = cancel.cancelled() => {
                self.inner.remove_waiter(height, id);
                debug!(height, "Certificate wait cancelled");
                Err(QuasarError::Cancelled { height })
            }
            _ = tokio::time::sleep(timeout) => {
                self.inner.remove_waiter(height, id);
                self.inner.counters.timeouts.fetch_add(1, Ordering::Relaxed);
                metrics::record_timeout();
                warn!(height, timeout_ms = timeout.as_millis() as u64, "Certificate wait timed out");
                Err(QuasarError::Timeout { height })
            }
        }
    }

    /// Register for `height` and wait at most `timeout`.
    pub async fn await_certificate(
        &self,
        height: u64,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> QuasarResult<Certificate> {
        let waiter = self.subscribe(height);
        self.wait(waiter, timeout, cancel).await
    }

    // =========================================================================
    // SHARES
    // =========================================================================

    /// Record a share for `height`.
    ///
    /// A later share from the same node replaces the earlier one. Reaching
    /// the threshold starts at most one aggregation per height.
    pub fn on_share(&self, height: u64, node_id: NodeId, share: Share) -> QuasarResult<()> {
        if let Some(validators) = &self.inner.validators {
            if !validators.contains(&node_id) {
                return Err(QuasarError::UnknownValidator { node: node_id });
            }
        }
        if share.is_empty() {
            return Err(QuasarError::EmptyShare {
                height,
                node: node_id,
            });
        }

        let count = {
            let mut shares = self.inner.shares.write();
            let by_node = shares.entry(height).or_default();
            by_node.insert(node_id, share);
            by_node.len()
        };
        self.inner
            .counters
            .shares_collected
            .fetch_add(1, Ordering::Relaxed);
        metrics::record_share();
        debug!(height, node = %node_id, count, "Share recorded");

        if count >= self.inner.config.threshold && self.inner.aggregating.lock().insert(height) {
            let inner = Arc::clone(&self.inner);
            self.runtime.spawn_blocking(move || inner.aggregate(height));
        }
        Ok(())
    }

    /// Sign `message` with this node's share key.
    pub fn quick_sign(&self, message: &[u8]) -> QuasarResult<Share> {
        let digest = share_digest(message);
        let share = match self.inner.pool.pop() {
            Some(precomputed) => self.inner.signer.quick_sign(precomputed, &digest),
            None => {
                self.inner
                    .counters
                    .pool_misses
                    .fetch_add(1, Ordering::Relaxed);
                debug!("Precompute pool empty, signing directly");
                self.inner.signer.sign(&self.inner.secret, &digest)
            }
        }
        .map_err(QuasarError::Signing)?;
        metrics::set_pool_size(self.inner.pool.len());
        Ok(share)
    }

    /// Check both certificates attached to `block`.
    pub fn verify_dual_certificates(
        &self,
        block: &Block,
        bls_public_key: &[u8],
        rt_public_key: &[u8],
    ) -> QuasarResult<()> {
        if !block.has_dual_cert() {
            return Err(QuasarError::MissingCertificate);
        }
        let message = block.signing_digest();
        let certs = block.certs();
        if !self
            .inner
            .verifier
            .verify_bls(bls_public_key, &message, &certs.bls_aggregate)
        {
            return Err(QuasarError::InvalidBls);
        }
        if !self.inner.verifier.verify_ringtail(
            rt_public_key,
            &share_digest(&message),
            &certs.rt_certificate,
        ) {
            return Err(QuasarError::InvalidRingtail);
        }
        Ok(())
    }

    // =========================================================================
    // MAINTENANCE
    // =========================================================================

    /// Drop share and waiter state for heights below `height`.
    ///
    /// Dropped waiters observe `WaiterDropped`. Returns the heights cleared.
    pub fn prune_below(&self, height: u64) -> usize {
        let mut cleared = HashSet::new();
        self.inner.shares.write().retain(|h, _| {
            let keep = *h >= height;
            if !keep {
                cleared.insert(*h);
            }
            keep
        });
        self.inner.waiters.lock().retain(|h, _| {
            let keep = *h >= height;
            if !keep {
                cleared.insert(*h);
            }
            keep
        });
        if !cleared.is_empty() {
            debug!(below = height, heights = cleared.len(), "Pruned certifier state");
        }
        cleared.len()
    }

    pub fn share_count(&self, height: u64) -> usize {
        self.inner
            .shares
            .read()
            .get(&height)
            .map_or(0, BTreeMap::len)
    }

    pub fn waiter_count(&self, height: u64) -> usize {
        self.inner.waiters.lock().get(&height).map_or(0, Vec::len)
    }

    pub fn pool_size(&self) -> usize {
        self.inner.pool.len()
    }

    pub fn stats(&self) -> QuasarStats {
        let counters = &self.inner.counters;
        let pool = self.inner.pool.stats();
        QuasarStats {
            shares_collected: counters.shares_collected.load(Ordering::Relaxed),
            certificates_generated: counters.certificates_generated.load(Ordering::Relaxed),
            certificates_delivered: counters.certificates_delivered.load(Ordering::Relaxed),
            aggregation_failures: counters.aggregation_failures.load(Ordering::Relaxed),
            timeouts: counters.timeouts.load(Ordering::Relaxed),
            precomputed_generated: pool.generated,
            precomputed_consumed: pool.consumed,
            pool_misses: counters.pool_misses.load(Ordering::Relaxed),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Stop the refill task and wait for it to exit.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.refill.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Precompute task ended abnormally");
            }
        }
        info!(node = %self.inner.node_id, "Quasar certifier stopped");
    }
}

impl Drop for Quasar {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn refill_loop(inner: Arc<Inner>, cancel: CancellationToken) {
    let period = inner.config.precompute_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                inner.refill_one();
            }
        }
    }
    debug!("Precompute refill task exited");
}
