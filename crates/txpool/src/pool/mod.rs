//! Transaction pool internals.
//!
//! The pool is a concurrent table of pending transactions with per-transaction
//! sealing state. Incoming transactions pass the admission pipeline (dedup,
//! external validation, insert, asynchronous ledger pre-store); the sealer
//! claims batches of them for proposals and reports commit results back, at
//! which point they are removed and their submitters notified.
//!
//! Single-key operations go straight to the concurrent table. A coarse
//! readers-writer lock serialises the multi-step operations only: the
//! enforce-import's check-then-insert, the commit-time iterate-and-erase and
//! the invalid-transaction purge. Per-transaction mutations (sealed flag,
//! batch identity) are atomic and taken without the structure lock; readers
//! accept mildly stale values.
//!
//! Deferred work runs on two bounded pools: a single-threaded worker
//! serialising ledger pre-stores and a multi-threaded notifier delivering
//! submit receipts and purges. Jobs hold a non-owning handle to the pool and
//! return without effect once it is gone.

use crate::{
    config::PoolConfig,
    error::{PoolError, TransactionStatus},
    metrics::TxPoolMetrics,
    traits::{
        BatchId, BlockNumber, FetchedTxs, Ledger, LedgerNonceChecker, PeerId, PoolNonceChecker,
        Transaction, TransactionDecoder, TransactionMeta, TxHash, TxNonce, TxSubmitCallback,
        TxSubmitResult, META_SOURCE_RPC, OnReady, StoreAck, UnsealedNotifier,
    },
    validate::TransactionValidator,
};
use alloy_primitives::B256;
use dashmap::{DashMap, DashSet};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use std::{
    collections::HashSet,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering},
        Arc, OnceLock, Weak,
    },
    thread,
};
use tracing::{debug, info, trace, warn};

mod transaction;
mod workers;

pub use transaction::{BatchInfo, PooledTransaction, UNASSIGNED_BATCH_ID};

use transaction::unix_millis;
use workers::WorkerPool;

/// Transaction pool internals.
pub struct PoolInner<V, D> {
    /// Pool settings.
    config: PoolConfig,
    /// Transaction validation.
    validator: V,
    /// Wire-payload decoding.
    decoder: D,
    /// Durable transaction storage receiving pre-stores.
    ledger: Arc<dyn Ledger>,
    /// Nonce book of committed blocks.
    ledger_nonces: Arc<dyn LedgerNonceChecker>,
    /// Nonce book of pending transactions.
    pool_nonces: Arc<dyn PoolNonceChecker>,
    /// The authoritative set of pending transactions.
    txs: DashMap<TxHash, Arc<PooledTransaction>>,
    /// Hashes requested from peers but not yet received.
    missed: DashSet<TxHash>,
    /// Hashes awaiting asynchronous purge.
    invalid_txs: DashSet<TxHash>,
    /// Nonces awaiting asynchronous purge.
    invalid_nonces: DashSet<TxNonce>,
    /// Number of transactions currently claimed by proposals.
    sealed_count: AtomicUsize,
    /// Highest committed block observed via `batch_remove`.
    block_number: AtomicI64,
    /// Wall-clock millis of the last `block_number` update.
    block_number_updated: AtomicU64,
    /// Serialises multi-step table operations; single-key access on the
    /// concurrent table itself needs the read side only.
    table_lock: RwLock<()>,
    /// Guards compound operations on the missed set.
    missed_lock: RwLock<()>,
    /// Wakes the sealer when a transaction lands in the pool.
    on_ready: RwLock<Option<OnReady>>,
    /// Receives the unsealed size after every mutation that could change it.
    unsealed_notifier: RwLock<Option<UnsealedNotifier>>,
    /// Serialises ledger pre-stores. Strict FIFO.
    worker: WorkerPool,
    /// Delivers submit receipts and invalid-transaction purges.
    notifier: WorkerPool,
    /// Non-owning handle captured by deferred jobs.
    self_ref: OnceLock<Weak<Self>>,
    metrics: TxPoolMetrics,
}

// === impl PoolInner ===

impl<V, D> PoolInner<V, D>
where
    V: TransactionValidator + 'static,
    D: TransactionDecoder + 'static,
{
    /// Creates the pool internals and spawns both worker pools.
    pub(crate) fn new(
        validator: V,
        decoder: D,
        ledger: Arc<dyn Ledger>,
        ledger_nonces: Arc<dyn LedgerNonceChecker>,
        pool_nonces: Arc<dyn PoolNonceChecker>,
        config: PoolConfig,
    ) -> Self {
        let notifier = WorkerPool::new("txNotifier", config.notifier_worker_num);
        let worker = WorkerPool::new("txpoolWorker", 1);
        Self {
            validator,
            decoder,
            ledger,
            ledger_nonces,
            pool_nonces,
            txs: DashMap::new(),
            missed: DashSet::new(),
            invalid_txs: DashSet::new(),
            invalid_nonces: DashSet::new(),
            sealed_count: AtomicUsize::new(0),
            block_number: AtomicI64::new(0),
            block_number_updated: AtomicU64::new(unix_millis()),
            table_lock: RwLock::new(()),
            missed_lock: RwLock::new(()),
            on_ready: RwLock::new(None),
            unsealed_notifier: RwLock::new(None),
            worker,
            notifier,
            self_ref: OnceLock::new(),
            metrics: TxPoolMetrics::default(),
            config,
        }
    }

    /// Wires the non-owning self handle captured by deferred jobs.
    pub(crate) fn bind(self: &Arc<Self>) {
        let _ = self.self_ref.set(Arc::downgrade(self));
    }

    fn weak(&self) -> Weak<Self> {
        self.self_ref.get().cloned().unwrap_or_default()
    }

    /// Get the config the pool was configured with.
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Get the validator reference.
    pub const fn validator(&self) -> &V {
        &self.validator
    }

    /// Number of transactions in the pool.
    pub fn len(&self) -> usize {
        let _guard = self.table_lock.read();
        self.txs.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest committed block observed so far.
    pub fn block_number(&self) -> BlockNumber {
        self.block_number.load(Ordering::Acquire)
    }

    /// Wall-clock millis of the last committed-block observation.
    pub fn block_number_updated_time(&self) -> u64 {
        self.block_number_updated.load(Ordering::Acquire)
    }

    /// Registers the hook waking the sealer on new transactions.
    pub fn set_on_ready(&self, hook: OnReady) {
        *self.on_ready.write() = Some(hook);
    }

    /// Registers the hook receiving the unsealed size.
    pub fn set_unsealed_notifier(&self, notifier: UnsealedNotifier) {
        *self.unsealed_notifier.write() = Some(notifier);
    }

    /// Halts both worker pools. Queued jobs drain first; idempotent.
    pub fn stop(&self) {
        self.notifier.stop();
        self.worker.stop();
    }

    // === admission ===

    /// Decodes and admits a raw transaction payload.
    ///
    /// Any rejection is reported through the callback as well as the returned
    /// status; a payload that fails to decode yields [`TransactionStatus::Malform`]
    /// and an invalid receipt carrying a zero hash.
    pub fn submit(&self, data: &[u8], callback: TxSubmitCallback) -> TransactionStatus {
        let tx = match self.decoder.decode(data) {
            Ok(tx) => tx,
            Err(err) => {
                warn!(target: "txpool", %err, "rejecting undecodable transaction");
                self.notify_invalid_receipt(B256::ZERO, TransactionStatus::Malform, callback);
                return TransactionStatus::Malform;
            }
        };
        let hash = tx.hash;
        match self.verify_and_submit(tx, Some(callback)) {
            (status, Some(callback)) if !status.is_ok() => {
                // the pipeline bailed out before attaching the callback
                self.notify_invalid_receipt(hash, status, callback);
                status
            }
            (status, _) => status,
        }
    }

    /// Admits an already decoded transaction.
    ///
    /// A full pool is reported through the returned status only; the callback
    /// is not fired for it.
    pub fn submit_transaction(
        &self,
        tx: Transaction,
        callback: Option<TxSubmitCallback>,
    ) -> TransactionStatus {
        self.verify_and_submit(tx, callback).0
    }

    /// The admission pipeline: capacity check, dedup, external validation,
    /// insert.
    ///
    /// Returns the callback untouched when the pipeline rejected the
    /// transaction before attaching it.
    fn verify_and_submit(
        &self,
        tx: Transaction,
        callback: Option<TxSubmitCallback>,
    ) -> (TransactionStatus, Option<TxSubmitCallback>) {
        if self.len() >= self.config.pool_limit {
            return (TransactionStatus::TxPoolIsFull, callback);
        }
        let hash = tx.hash;
        let pooled = Arc::new(PooledTransaction::new(tx));
        if let Some(callback) = callback {
            pooled.set_submit_callback(callback);
        }

        let status = if self.txs.contains_key(&hash) {
            TransactionStatus::AlreadyInTxPool
        } else {
            self.validator.verify(pooled.transaction())
        };

        if status.is_ok() {
            pooled.stamp_import_time();
            self.insert(pooled);
            let _guard = self.missed_lock.write();
            self.missed.remove(&hash);
        } else if let Some(callback) = pooled.take_submit_callback() {
            self.notify_invalid_receipt(hash, status, callback);
        }
        (status, None)
    }

    /// Imports a transaction on behalf of a consensus proposal.
    ///
    /// The signature was already validated upstream; the transaction enters
    /// (or is flipped) pre-sealed under the given proposal so the local
    /// sealer cannot claim it again.
    pub fn enforce_submit(
        &self,
        tx: Transaction,
        batch_id: BatchId,
        batch_hash: B256,
    ) -> TransactionStatus {
        // already committed on chain, reject it
        if self.validator.submitted_to_chain(&tx) == TransactionStatus::NonceCheckFail {
            return TransactionStatus::NonceCheckFail;
        }

        let hash = tx.hash;
        {
            // write guard: the sealing state must not move under the compound
            // check below
            let _guard = self.table_lock.write();
            if let Some(existing) = self.txs.get(&hash).map(|entry| entry.value().clone()) {
                if !existing.set_sealed(true) {
                    self.inc_sealed();
                    existing.set_batch(batch_id, batch_hash);
                    trace!(
                        target: "txpool",
                        tx = %hash,
                        batch_id,
                        batch_hash = %batch_hash,
                        "enforce sealed pending transaction"
                    );
                    return TransactionStatus::None;
                }
                let batch = existing.batch();
                if batch.id == batch_id && batch.hash == batch_hash {
                    // sealed for the same proposal
                    return TransactionStatus::None;
                }
                // sealed by a competing proposal
                return TransactionStatus::AlreadyInTxPool;
            }
        }

        let pooled = Arc::new(PooledTransaction::new(tx));
        // pre-mark sealed so a concurrent fetch cannot claim it
        pooled.set_sealed(true);
        pooled.set_batch(batch_id, batch_hash);
        self.inc_sealed();
        self.insert(pooled);
        {
            let _guard = self.missed_lock.write();
            self.missed.remove(&hash);
        }
        TransactionStatus::None
    }

    /// Inserts pre-verified transactions, e.g. the bodies of missed
    /// transactions received from a peer.
    pub fn batch_insert(&self, txs: Vec<Transaction>) {
        let hashes: Vec<TxHash> = txs.iter().map(|tx| tx.hash).collect();
        for tx in txs {
            self.insert(Arc::new(PooledTransaction::new(tx)));
        }
        let _guard = self.missed_lock.write();
        for hash in hashes {
            self.missed.remove(&hash);
        }
    }

    /// Stores the transaction and kicks off the deferred admission work:
    /// sealer wake-up, ledger pre-store, unsealed-size notification.
    fn insert(&self, tx: Arc<PooledTransaction>) {
        let _guard = self.table_lock.read();
        let hash = tx.hash();
        self.txs.insert(hash, tx.clone());
        self.metrics.inserted_transactions.increment(1);
        trace!(target: "txpool", tx = %hash, "inserted transaction");
        if let Some(hook) = self.on_ready.read().as_ref() {
            hook();
        }
        self.pre_commit_transaction(tx, 0);
        self.notify_unsealed_size(0);
    }

    /// Hands the payload to the ledger ahead of block commit.
    ///
    /// Failed stores retry on the worker pool with a pause in between; once
    /// the budget is exhausted the transaction stays in memory only and the
    /// next seal re-drives persistence upstream.
    fn pre_commit_transaction(&self, tx: Arc<PooledTransaction>, retry: usize) {
        if retry > self.config.precommit_retries {
            return;
        }
        let weak = self.weak();
        self.worker.execute(move || {
            let Some(pool) = weak.upgrade() else { return };
            let hash = tx.hash();
            let payload = tx.payload().clone();
            let backoff = pool.config.precommit_backoff;
            let ack_weak = Arc::downgrade(&pool);
            let ack: StoreAck = Box::new(move |error| {
                let Some(error) = error else { return };
                warn!(
                    target: "txpool",
                    %error,
                    tx = %tx.hash(),
                    retry,
                    "async pre-store failed"
                );
                thread::sleep(backoff);
                if let Some(pool) = ack_weak.upgrade() {
                    pool.pre_commit_transaction(tx, retry + 1);
                }
            });
            pool.ledger.async_store_transactions(vec![payload], vec![hash], ack);
        });
    }

    /// Delivers an invalid receipt for a rejected admission.
    fn notify_invalid_receipt(
        &self,
        tx_hash: TxHash,
        status: TransactionStatus,
        callback: TxSubmitCallback,
    ) {
        let result = TxSubmitResult::rejected(tx_hash, status);
        let delivery = panic::catch_unwind(AssertUnwindSafe(move || {
            callback(Some(PoolError::new(status)), result)
        }));
        if delivery.is_err() {
            warn!(target: "txpool", tx = %tx_hash, "submit callback panicked");
        }
        warn!(target: "txpool", tx = %tx_hash, %status, "rejected invalid transaction");
    }

    // === removal ===

    /// Removes a single transaction. The caller must hold the structure lock.
    fn remove_without_lock(&self, tx_hash: &TxHash) -> Option<Arc<PooledTransaction>> {
        let (_, tx) = self.txs.remove(tx_hash)?;
        if tx.is_sealed() {
            self.dec_sealed();
        }
        self.metrics.removed_transactions.increment(1);
        Some(tx)
    }

    /// Removes a single transaction by hash.
    pub fn remove(&self, tx_hash: &TxHash) -> Option<Arc<PooledTransaction>> {
        let tx = {
            let _guard = self.table_lock.write();
            self.remove_without_lock(tx_hash)
        };
        self.notify_unsealed_size(0);
        tx
    }

    /// Removes a settled transaction and delivers its submit receipt.
    pub fn remove_submitted_tx(&self, result: TxSubmitResult) -> Option<Arc<PooledTransaction>> {
        let tx = self.remove(&result.tx_hash)?;
        self.notify_tx_result(&tx, result);
        Some(tx)
    }

    fn remove_submitted_tx_without_lock(
        &self,
        result: TxSubmitResult,
    ) -> Option<Arc<PooledTransaction>> {
        let tx = self.remove_without_lock(&result.tx_hash)?;
        self.notify_unsealed_size(0);
        self.notify_tx_result(&tx, result);
        Some(tx)
    }

    /// Removes the transactions settled by a committed proposal and updates
    /// the nonce books.
    pub fn batch_remove(&self, batch_id: BatchId, results: Vec<TxSubmitResult>) {
        self.block_number_updated.store(unix_millis(), Ordering::Release);
        let expected = results.len();
        let mut removed = 0usize;
        let mut nonces: Vec<TxNonce> = Vec::with_capacity(expected);
        {
            let _guard = self.table_lock.write();
            for result in results {
                let result_nonce = result.nonce;
                match self.remove_submitted_tx_without_lock(result) {
                    Some(tx) => {
                        removed += 1;
                        nonces.push(tx.nonce());
                    }
                    // the transaction never reached this pool; trust the
                    // result's nonce when it carries one
                    None => nonces.extend(result_nonce),
                }
            }
            // publish the block number only after the batch's txs are gone
            self.block_number.fetch_max(batch_id, Ordering::AcqRel);
        }
        info!(target: "txpool", expected, removed, batch_id, "batch removed transactions");
        self.ledger_nonces.batch_insert(batch_id, nonces.clone());
        self.pool_nonces.batch_remove(&nonces);
    }

    /// Delivers the final submit receipt through the notifier pool.
    ///
    /// Fires only when the transaction still carries its callback and the
    /// status is terminal from the submitter's perspective; delivery consumes
    /// the callback, so it happens at most once per transaction.
    fn notify_tx_result(&self, tx: &Arc<PooledTransaction>, result: TxSubmitResult) {
        if !result.status.is_terminal() {
            return;
        }
        let Some(callback) = tx.take_submit_callback() else { return };
        let weak = self.weak();
        let hash = result.tx_hash;
        let enqueued = self.notifier.execute(move || {
            if weak.upgrade().is_none() {
                return;
            }
            let error = (!result.status.is_ok()).then(|| PoolError::new(result.status));
            callback(error, result);
            trace!(target: "txpool", tx = %hash, "notified submit result");
        });
        if !enqueued {
            debug!(target: "txpool", tx = %hash, "notifier stopped; dropping submit receipt");
        }
    }

    // === fetching ===

    /// Looks up the given hashes, returning the found transactions and the
    /// hashes this pool does not hold.
    pub fn fetch_txs(
        &self,
        hashes: &[TxHash],
    ) -> (Vec<Arc<PooledTransaction>>, Vec<TxHash>) {
        let _guard = self.table_lock.read();
        let mut found = Vec::with_capacity(hashes.len());
        let mut missing = Vec::new();
        for hash in hashes {
            match self.txs.get(hash) {
                Some(entry) => found.push(entry.value().clone()),
                None => missing.push(*hash),
            }
        }
        (found, missing)
    }

    /// Yields up to `limit` transactions that were never handed out for
    /// gossip, claiming each one as it is emitted.
    pub fn fetch_new_txs(&self, limit: usize) -> Vec<Arc<PooledTransaction>> {
        let _guard = self.table_lock.read();
        let mut fetched = Vec::new();
        for entry in self.txs.iter() {
            let tx = entry.value();
            if tx.mark_synced() {
                continue;
            }
            fetched.push(tx.clone());
            if fetched.len() >= limit {
                break;
            }
        }
        fetched
    }

    /// Claims up to `limit` transactions for a new proposal.
    ///
    /// Skips transactions queued for purge, already committed on chain, in
    /// `avoid`, or (with `avoid_duplicate`) already sealed. Unsealed
    /// transactions whose block limit expired are queued for purge instead of
    /// being claimed. Claimed transactions are sealed with an unassigned
    /// batch until the sealer names the proposal, and their submit callbacks
    /// move to the sealer's responsibility.
    pub fn batch_fetch_txs(
        &self,
        limit: usize,
        avoid: Option<&HashSet<TxHash>>,
        avoid_duplicate: bool,
    ) -> FetchedTxs {
        let mut fetched = FetchedTxs::default();
        {
            let _guard = self.table_lock.read();
            for entry in self.txs.iter() {
                let tx = entry.value();
                let hash = tx.hash();
                if self.invalid_txs.contains(&hash) {
                    continue;
                }
                match self.validator.submitted_to_chain(tx.transaction()) {
                    TransactionStatus::NonceCheckFail => continue,
                    TransactionStatus::BlockLimitCheckFail if !tx.is_sealed() => {
                        self.invalid_txs.insert(hash);
                        self.invalid_nonces.insert(tx.nonce());
                        continue;
                    }
                    _ => {}
                }
                if avoid.is_some_and(|avoid| avoid.contains(&hash)) {
                    continue;
                }
                // already sealed for a newer proposal
                if avoid_duplicate && tx.is_sealed() {
                    continue;
                }

                let meta = TransactionMeta { hash, to: tx.to(), source: META_SOURCE_RPC };
                // the sealer owns notifying the submitter from here on
                let _ = tx.take_submit_callback();
                if tx.is_system() {
                    fetched.system.push(meta);
                } else {
                    fetched.user.push(meta);
                }
                if !tx.set_sealed(true) {
                    self.inc_sealed();
                }
                tx.set_batch(UNASSIGNED_BATCH_ID, B256::ZERO);
                if fetched.len() >= limit {
                    break;
                }
            }
        }
        self.notify_unsealed_size(0);
        self.remove_invalid_txs();
        fetched
    }

    /// Schedules the asynchronous purge of transactions collected into the
    /// invalid sets during fetch.
    ///
    /// The purge removes each invalid transaction, delivers its submitter a
    /// block-limit rejection and drops the expired nonces from the pending
    /// nonce book.
    pub fn remove_invalid_txs(&self) {
        let weak = self.weak();
        self.notifier.execute(move || {
            let Some(pool) = weak.upgrade() else { return };
            if pool.invalid_txs.is_empty() {
                return;
            }
            let _guard = pool.table_lock.write();
            let hashes: Vec<TxHash> = pool.invalid_txs.iter().map(|hash| *hash).collect();
            for hash in &hashes {
                let result =
                    TxSubmitResult::rejected(*hash, TransactionStatus::BlockLimitCheckFail);
                pool.remove_submitted_tx_without_lock(result);
            }
            let nonces: Vec<TxNonce> = pool.invalid_nonces.iter().map(|nonce| *nonce).collect();
            pool.pool_nonces.batch_remove(&nonces);
            pool.metrics.invalid_transactions.increment(hashes.len() as u64);
            debug!(target: "txpool", count = hashes.len(), "purged invalid transactions");
            pool.invalid_txs.clear();
            pool.invalid_nonces.clear();
        });
    }

    // === sealing ===

    /// Applies a proposal's seal (or unseal) to the given transactions.
    ///
    /// An unseal is skipped for any transaction that was meanwhile re-sealed
    /// by a different proposal, recognisable by a differing nonzero batch
    /// hash.
    pub fn batch_mark_txs(
        &self,
        hashes: &[TxHash],
        batch_id: BatchId,
        batch_hash: B256,
        seal: bool,
    ) {
        {
            let _guard = self.table_lock.read();
            for hash in hashes {
                let Some(tx) = self.txs.get(hash).map(|entry| entry.value().clone()) else {
                    trace!(target: "txpool", tx = %hash, seal, "marking missing transaction");
                    continue;
                };
                let current = tx.batch();
                if !seal && current.hash != B256::ZERO && current.hash != batch_hash {
                    // re-sealed by a newer proposal, do not unseal underneath it
                    continue;
                }
                let was_sealed = tx.set_sealed(seal);
                if seal && !was_sealed {
                    self.inc_sealed();
                }
                if !seal && was_sealed {
                    self.dec_sealed();
                }
                if seal {
                    tx.set_batch(batch_id, batch_hash);
                }
            }
        }
        self.notify_unsealed_size(0);
    }

    /// Seals or unseals every transaction in the pool.
    pub fn batch_mark_all_txs(&self, seal: bool) {
        {
            let _guard = self.table_lock.read();
            for entry in self.txs.iter() {
                let tx = entry.value();
                tx.set_sealed(seal);
                if !seal {
                    tx.set_batch(UNASSIGNED_BATCH_ID, B256::ZERO);
                }
            }
            let count = if seal { self.txs.len() } else { 0 };
            self.sealed_count.store(count, Ordering::Release);
        }
        self.notify_unsealed_size(0);
    }

    // === proposal verification ===

    /// Returns the proposal hashes this pool does not hold.
    pub fn missing_proposal_txs(&self, hashes: &[TxHash]) -> Vec<TxHash> {
        let _guard = self.table_lock.read();
        hashes.iter().copied().filter(|hash| !self.txs.contains_key(hash)).collect()
    }

    /// Whether the pool holds every transaction of the proposal.
    pub fn contains_proposal_txs(&self, hashes: &[TxHash]) -> bool {
        let _guard = self.table_lock.read();
        hashes.iter().all(|hash| self.txs.contains_key(hash))
    }

    // === gossip ===

    /// Records the peer against every known hash and returns the hashes this
    /// node should request, remembering them as missed.
    ///
    /// The missed set is wiped once it reaches the pool limit so stale
    /// entries cannot accumulate indefinitely.
    pub fn filter_unknown_txs(&self, hashes: &[TxHash], peer: PeerId) -> Vec<TxHash> {
        {
            let _guard = self.table_lock.read();
            for hash in hashes {
                if let Some(entry) = self.txs.get(hash) {
                    entry.value().append_known_peer(peer);
                }
            }
        }
        let mut unknown = Vec::new();
        let guard = self.missed_lock.upgradable_read();
        for hash in hashes {
            if self.txs.contains_key(hash) || self.missed.contains(hash) {
                continue;
            }
            unknown.push(*hash);
            self.missed.insert(*hash);
        }
        if self.missed.len() >= self.config.pool_limit {
            let _guard = RwLockUpgradableReadGuard::upgrade(guard);
            self.missed.clear();
        }
        unknown
    }

    // === size accounting ===

    /// Drops every pending transaction.
    pub fn clear(&self) {
        let _guard = self.table_lock.write();
        self.txs.clear();
    }

    /// Number of transactions available to the sealer.
    pub fn unsealed_size(&self) -> usize {
        let _guard = self.table_lock.read();
        self.unsealed_size_without_lock()
    }

    fn unsealed_size_without_lock(&self) -> usize {
        let len = self.txs.len();
        let sealed = self.sealed_count.load(Ordering::Acquire);
        if len < sealed {
            // the counter drifted past the table during a clear; snap it back
            self.sealed_count.store(len, Ordering::Release);
            return 0;
        }
        len - sealed
    }

    /// Pushes the current unsealed size to the registered notifier.
    ///
    /// A failed acknowledgement re-notifies with the fresh value, up to the
    /// configured retry budget.
    fn notify_unsealed_size(&self, retry: usize) {
        let size = self.unsealed_size_without_lock();
        self.metrics.unsealed_transactions.set(size as f64);
        let guard = self.unsealed_notifier.read_recursive();
        let Some(notifier) = guard.as_ref() else { return };
        trace!(target: "txpool", unsealed = size, pending = self.txs.len(), "notify unsealed size");
        let weak = self.weak();
        notifier(
            size,
            Box::new(move |error| {
                let Some(error) = error else { return };
                warn!(target: "txpool", %error, retry, "unsealed size notification failed");
                let Some(pool) = weak.upgrade() else { return };
                if retry >= pool.config.max_notify_retries {
                    return;
                }
                pool.notify_unsealed_size(retry + 1);
            }),
        );
    }

    fn inc_sealed(&self) {
        self.sealed_count.fetch_add(1, Ordering::AcqRel);
    }

    fn dec_sealed(&self) {
        let _ = self.sealed_count.fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
            Some(count.saturating_sub(1))
        });
    }
}

impl<V, D> fmt::Debug for PoolInner<V, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolInner")
            .field("config", &self.config)
            .field("pending", &self.txs.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        capture_callback, random_system_tx, random_tx, testing_pool, testing_pool_with,
        TestPoolHandle,
    };
    use std::time::{Duration, Instant};

    const RECV_TIMEOUT: Duration = Duration::from_secs(1);

    fn small_pool(pool_limit: usize) -> TestPoolHandle {
        testing_pool_with(PoolConfig { pool_limit, ..Default::default() })
    }

    /// Polls until the condition holds or a second passed.
    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(1);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    fn sealed_in_table<V, D>(inner: &PoolInner<V, D>) -> usize {
        inner.txs.iter().filter(|entry| entry.value().is_sealed()).count()
    }

    #[test]
    fn duplicate_admit_rejects_second_submit() {
        let h = testing_pool();
        let tx = random_tx();

        let (cb1, rx1) = capture_callback();
        assert_eq!(h.pool.submit_transaction(tx.clone(), Some(cb1)), TransactionStatus::None);
        assert_eq!(h.pool.len(), 1);

        let (cb2, rx2) = capture_callback();
        assert_eq!(
            h.pool.submit_transaction(tx.clone(), Some(cb2)),
            TransactionStatus::AlreadyInTxPool
        );
        let (error, result) = rx2.recv_timeout(RECV_TIMEOUT).expect("duplicate receipt");
        assert_eq!(result.status, TransactionStatus::AlreadyInTxPool);
        assert_eq!(result.tx_hash, tx.hash);
        assert_eq!(error.expect("carries error").code(), 2);

        // the first submitter only hears back once the block commits
        assert!(rx1.try_recv().is_err());
        let result = TxSubmitResult::committed(tx.hash, 1, B256::repeat_byte(0x01))
            .with_nonce(tx.nonce);
        h.pool.batch_remove(1, vec![result]);

        let (error, result) = rx1.recv_timeout(RECV_TIMEOUT).expect("commit receipt");
        assert!(error.is_none());
        assert_eq!(result.status, TransactionStatus::None);
        assert_eq!(h.pool.len(), 0);
    }

    #[test]
    fn full_pool_rejects_without_receipt() {
        let h = small_pool(2);
        assert_eq!(h.pool.submit_transaction(random_tx(), None), TransactionStatus::None);
        let second = random_tx();
        assert_eq!(h.pool.submit_transaction(second.clone(), None), TransactionStatus::None);

        let (cb, rx) = capture_callback();
        let third = random_tx();
        assert_eq!(
            h.pool.submit_transaction(third.clone(), Some(cb)),
            TransactionStatus::TxPoolIsFull
        );
        assert!(rx.try_recv().is_err());

        // room frees up after a commit
        h.pool.batch_remove(
            1,
            vec![TxSubmitResult::committed(second.hash, 1, B256::repeat_byte(0x01))],
        );
        assert_eq!(h.pool.submit_transaction(third, None), TransactionStatus::None);
    }

    #[test]
    fn full_pool_on_decode_path_still_reports_through_callback() {
        let h = small_pool(1);
        assert_eq!(h.pool.submit_transaction(random_tx(), None), TransactionStatus::None);

        let tx = random_tx();
        h.decoder.register(&tx);
        let (cb, rx) = capture_callback();
        assert_eq!(h.pool.submit(&tx.payload, cb), TransactionStatus::TxPoolIsFull);
        let (error, result) = rx.recv_timeout(RECV_TIMEOUT).expect("full receipt");
        assert_eq!(result.status, TransactionStatus::TxPoolIsFull);
        assert_eq!(result.tx_hash, tx.hash);
        assert_eq!(error.expect("carries error").code(), 3);
    }

    #[test]
    fn malformed_payload_reports_zero_hash() {
        let h = testing_pool();
        let (cb, rx) = capture_callback();
        assert_eq!(h.pool.submit(b"garbage", cb), TransactionStatus::Malform);
        let (error, result) = rx.recv_timeout(RECV_TIMEOUT).expect("malform receipt");
        assert_eq!(result.status, TransactionStatus::Malform);
        assert_eq!(result.tx_hash, B256::ZERO);
        assert_eq!(error.expect("carries error").code(), 1);
        assert_eq!(h.pool.len(), 0);
    }

    #[test]
    fn decode_path_admits_and_prestores() {
        let h = testing_pool();
        let tx = random_tx();
        h.decoder.register(&tx);
        let (cb, _rx) = capture_callback();
        assert_eq!(h.pool.submit(&tx.payload, cb), TransactionStatus::None);
        assert_eq!(h.pool.len(), 1);
        assert!(wait_until(|| h.ledger.stored_hashes().contains(&tx.hash)));
    }

    #[test]
    fn rejected_verification_fires_receipt() {
        let h = testing_pool();
        let tx = random_tx();
        h.validator.set_verify_status(tx.hash, TransactionStatus::NonceCheckFail);
        let (cb, rx) = capture_callback();
        assert_eq!(
            h.pool.submit_transaction(tx.clone(), Some(cb)),
            TransactionStatus::NonceCheckFail
        );
        let (error, result) = rx.recv_timeout(RECV_TIMEOUT).expect("rejection receipt");
        assert_eq!(result.status, TransactionStatus::NonceCheckFail);
        assert_eq!(error.expect("carries error").code(), 4);
        assert_eq!(h.pool.len(), 0);
    }

    #[test]
    fn enforce_submit_seals_pending_transaction() {
        let h = testing_pool();
        let tx = random_tx();
        assert_eq!(h.pool.submit_transaction(tx.clone(), None), TransactionStatus::None);
        assert_eq!(h.pool.unsealed_size(), 1);

        let batch_hash = B256::repeat_byte(0xbb);
        assert_eq!(h.pool.enforce_submit(tx.clone(), 7, batch_hash), TransactionStatus::None);

        let pooled = h.pool.inner.txs.get(&tx.hash).map(|e| e.value().clone()).expect("pending");
        assert!(pooled.is_sealed());
        assert_eq!(pooled.batch().id, 7);
        assert_eq!(pooled.batch().hash, batch_hash);
        assert_eq!(h.pool.unsealed_size(), 0);

        // idempotent for the same proposal
        assert_eq!(h.pool.enforce_submit(tx.clone(), 7, batch_hash), TransactionStatus::None);
        // a competing proposal is turned away
        assert_eq!(
            h.pool.enforce_submit(tx, 8, B256::repeat_byte(0xcc)),
            TransactionStatus::AlreadyInTxPool
        );
    }

    #[test]
    fn enforce_submit_rejects_committed_nonce() {
        let h = testing_pool();
        let tx = random_tx();
        h.validator.set_chain_status(tx.hash, TransactionStatus::NonceCheckFail);
        assert_eq!(
            h.pool.enforce_submit(tx, 1, B256::repeat_byte(0x01)),
            TransactionStatus::NonceCheckFail
        );
        assert_eq!(h.pool.len(), 0);
    }

    #[test]
    fn enforce_submit_inserts_sealed_and_clears_missed() {
        let h = testing_pool();
        let tx = random_tx();
        let peer = PeerId::repeat_byte(0x42);

        let unknown = h.pool.filter_unknown_txs(&[tx.hash], peer);
        assert_eq!(unknown, vec![tx.hash]);
        assert!(h.pool.inner.missed.contains(&tx.hash));

        assert_eq!(
            h.pool.enforce_submit(tx.clone(), 3, B256::repeat_byte(0x03)),
            TransactionStatus::None
        );
        assert!(!h.pool.inner.missed.contains(&tx.hash));
        assert_eq!(h.pool.len(), 1);
        assert_eq!(h.pool.unsealed_size(), 0);
        assert_eq!(sealed_in_table(&h.pool.inner), 1);
    }

    #[test]
    fn batch_fetch_claims_and_routes_system_txs() {
        let h = testing_pool();
        let user = random_tx();
        let system = random_system_tx();
        h.pool.submit_transaction(user.clone(), None);
        h.pool.submit_transaction(system.clone(), None);

        let fetched = h.pool.batch_fetch_txs(10, None, false);
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched.user.len(), 1);
        assert_eq!(fetched.system.len(), 1);
        assert_eq!(fetched.user[0].hash, user.hash);
        assert_eq!(fetched.system[0].hash, system.hash);
        assert_eq!(fetched.user[0].source, META_SOURCE_RPC);
        assert_eq!(h.pool.unsealed_size(), 0);

        // claimed transactions carry the unassigned batch sentinel
        let pooled = h.pool.inner.txs.get(&user.hash).map(|e| e.value().clone()).expect("pending");
        assert_eq!(pooled.batch().id, UNASSIGNED_BATCH_ID);
        assert_eq!(pooled.batch().hash, B256::ZERO);

        // a second avoid-duplicate fetch claims nothing
        let refetch = h.pool.batch_fetch_txs(10, None, true);
        assert!(refetch.is_empty());
    }

    #[test]
    fn batch_fetch_respects_limit_and_avoid_set() {
        let h = testing_pool();
        let txs: Vec<_> = (0..4).map(|_| random_tx()).collect();
        for tx in &txs {
            h.pool.submit_transaction(tx.clone(), None);
        }

        let avoid: HashSet<TxHash> = [txs[0].hash, txs[1].hash].into_iter().collect();
        let fetched = h.pool.batch_fetch_txs(1, Some(&avoid), true);
        assert_eq!(fetched.len(), 1);
        assert!(!avoid.contains(&fetched.user[0].hash));
        assert_eq!(h.pool.unsealed_size(), 3);
    }

    #[test]
    fn expired_block_limit_purges_transaction() {
        let h = testing_pool();
        let tx = random_tx();
        let (cb, rx) = capture_callback();
        assert_eq!(h.pool.submit_transaction(tx.clone(), Some(cb)), TransactionStatus::None);
        h.validator.set_chain_status(tx.hash, TransactionStatus::BlockLimitCheckFail);

        let fetched = h.pool.batch_fetch_txs(10, None, false);
        assert!(fetched.is_empty());

        assert!(wait_until(|| h.pool.len() == 0));
        let (error, result) = rx.recv_timeout(RECV_TIMEOUT).expect("purge receipt");
        assert_eq!(result.status, TransactionStatus::BlockLimitCheckFail);
        assert_eq!(error.expect("carries error").code(), 5);
        assert!(wait_until(|| h.nonces.removed().contains(&tx.nonce)));
    }

    #[test]
    fn sealed_transaction_survives_expired_block_limit() {
        let h = testing_pool();
        let tx = random_tx();
        h.pool.submit_transaction(tx.clone(), None);
        h.pool.batch_mark_txs(&[tx.hash], 5, B256::repeat_byte(0x05), true);
        h.validator.set_chain_status(tx.hash, TransactionStatus::BlockLimitCheckFail);

        // sealed txs fall through the block-limit invalidation
        let fetched = h.pool.batch_fetch_txs(10, None, false);
        assert_eq!(fetched.len(), 1);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(h.pool.len(), 1);
    }

    #[test]
    fn missed_set_clears_under_pressure() {
        let h = small_pool(4);
        let peer = PeerId::repeat_byte(0x07);
        let hashes: Vec<TxHash> = (0..5u8).map(|i| B256::repeat_byte(i + 1)).collect();

        let unknown = h.pool.filter_unknown_txs(&hashes, peer);
        assert_eq!(unknown.len(), 5);
        // the safety valve wiped the set the moment it reached the limit
        assert!(h.pool.inner.missed.is_empty());

        // so the same advertisement is missed again in full
        let unknown = h.pool.filter_unknown_txs(&hashes, peer);
        assert_eq!(unknown.len(), 5);
    }

    #[test]
    fn filter_unknown_records_peer_on_known_txs() {
        let h = testing_pool();
        let tx = random_tx();
        h.pool.submit_transaction(tx.clone(), None);
        let peer = PeerId::repeat_byte(0x09);

        let unknown = h.pool.filter_unknown_txs(&[tx.hash], peer);
        assert!(unknown.is_empty());
        let pooled = h.pool.inner.txs.get(&tx.hash).map(|e| e.value().clone()).expect("pending");
        assert!(pooled.is_known_by(&peer));
        // known hashes never enter the missed set
        assert!(h.pool.inner.missed.is_empty());
    }

    #[test]
    fn stale_unseal_is_ignored() {
        let h = testing_pool();
        let tx = random_tx();
        h.pool.submit_transaction(tx.clone(), None);

        h.pool.batch_mark_txs(&[tx.hash], 5, B256::repeat_byte(0xdd), true);
        assert_eq!(h.pool.unsealed_size(), 0);

        // an unseal for a different proposal must not steal the tx
        h.pool.batch_mark_txs(&[tx.hash], 4, B256::repeat_byte(0xee), false);
        let pooled = h.pool.inner.txs.get(&tx.hash).map(|e| e.value().clone()).expect("pending");
        assert!(pooled.is_sealed());
        assert_eq!(pooled.batch().id, 5);
        assert_eq!(pooled.batch().hash, B256::repeat_byte(0xdd));
        assert_eq!(h.pool.unsealed_size(), 0);

        // the owning proposal may unseal
        h.pool.batch_mark_txs(&[tx.hash], 5, B256::repeat_byte(0xdd), false);
        assert_eq!(h.pool.unsealed_size(), 1);
    }

    #[test]
    fn mark_all_resets_batch_identity() {
        let h = testing_pool();
        for _ in 0..3 {
            h.pool.submit_transaction(random_tx(), None);
        }
        h.pool.batch_mark_all_txs(true);
        assert_eq!(h.pool.unsealed_size(), 0);
        assert_eq!(sealed_in_table(&h.pool.inner), 3);

        h.pool.batch_mark_all_txs(false);
        assert_eq!(h.pool.unsealed_size(), 3);
        assert_eq!(sealed_in_table(&h.pool.inner), 0);
        for entry in h.pool.inner.txs.iter() {
            assert_eq!(entry.value().batch(), BatchInfo::default());
        }
    }

    #[test]
    fn fetch_new_txs_yields_each_tx_once() {
        let h = testing_pool();
        for _ in 0..3 {
            h.pool.submit_transaction(random_tx(), None);
        }
        assert_eq!(h.pool.fetch_new_txs(10).len(), 3);
        assert!(h.pool.fetch_new_txs(10).is_empty());

        h.pool.submit_transaction(random_tx(), None);
        assert_eq!(h.pool.fetch_new_txs(10).len(), 1);
    }

    #[test]
    fn fetch_txs_splits_found_and_missing() {
        let h = testing_pool();
        let known = random_tx();
        h.pool.submit_transaction(known.clone(), None);
        let missing = B256::repeat_byte(0x99);

        let (found, missed) = h.pool.fetch_txs(&[known.hash, missing]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].hash(), known.hash);
        assert_eq!(missed, vec![missing]);
    }

    #[test]
    fn proposal_verification_reports_missing_hashes() {
        let h = testing_pool();
        let tx = random_tx();
        h.pool.submit_transaction(tx.clone(), None);
        let absent = B256::repeat_byte(0x31);

        assert!(h.pool.contains_proposal_txs(&[tx.hash]));
        assert!(!h.pool.contains_proposal_txs(&[tx.hash, absent]));
        assert_eq!(h.pool.missing_proposal_txs(&[tx.hash, absent]), vec![absent]);
        assert!(h.pool.missing_proposal_txs(&[]).is_empty());
    }

    #[test]
    fn batch_remove_updates_nonce_books_and_block_number() {
        let h = testing_pool();
        let tx = random_tx();
        h.pool.submit_transaction(tx.clone(), None);

        let absent_nonce = TxNonce::from(77u64);
        let results = vec![
            TxSubmitResult::committed(tx.hash, 5, B256::repeat_byte(0x05)),
            // a tx this pool never held, with a known nonce
            TxSubmitResult::committed(B256::repeat_byte(0x66), 5, B256::repeat_byte(0x05))
                .with_nonce(absent_nonce),
            // absent tx without a nonce contributes nothing
            TxSubmitResult::committed(B256::repeat_byte(0x67), 5, B256::repeat_byte(0x05)),
        ];
        h.pool.batch_remove(5, results);

        assert_eq!(h.pool.len(), 0);
        assert_eq!(h.pool.block_number(), 5);
        let committed = h.nonces.committed();
        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].0, 5);
        assert_eq!(committed[0].1, vec![tx.nonce, absent_nonce]);
        assert_eq!(h.nonces.removed(), vec![tx.nonce, absent_nonce]);

        // block number is monotone
        h.pool.batch_remove(3, Vec::new());
        assert_eq!(h.pool.block_number(), 5);
        h.pool.batch_remove(9, Vec::new());
        assert_eq!(h.pool.block_number(), 9);
    }

    #[test]
    fn remove_submitted_tx_delivers_receipt() {
        let h = testing_pool();
        let tx = random_tx();
        let (cb, rx) = capture_callback();
        h.pool.submit_transaction(tx.clone(), Some(cb));

        let removed = h
            .pool
            .remove_submitted_tx(TxSubmitResult::committed(tx.hash, 2, B256::repeat_byte(0x02)));
        assert!(removed.is_some());
        let (error, result) = rx.recv_timeout(RECV_TIMEOUT).expect("receipt");
        assert!(error.is_none());
        assert_eq!(result.status, TransactionStatus::None);

        assert!(h
            .pool
            .remove_submitted_tx(TxSubmitResult::committed(tx.hash, 2, B256::repeat_byte(0x02)))
            .is_none());
    }

    #[test]
    fn batch_insert_backfills_missed_txs() {
        let h = testing_pool();
        let txs: Vec<_> = (0..3).map(|_| random_tx()).collect();
        let hashes: Vec<TxHash> = txs.iter().map(|tx| tx.hash).collect();
        let peer = PeerId::repeat_byte(0x55);

        assert_eq!(h.pool.filter_unknown_txs(&hashes, peer).len(), 3);
        h.pool.batch_insert(txs);
        assert_eq!(h.pool.len(), 3);
        assert!(h.pool.inner.missed.is_empty());
    }

    #[test]
    fn precommit_retries_after_store_failure() {
        let h = testing_pool();
        h.ledger.fail_times(1);
        let tx = random_tx();
        h.pool.submit_transaction(tx.clone(), None);
        assert!(wait_until(|| h.ledger.stored_hashes().contains(&tx.hash)));
    }

    #[test]
    fn precommit_gives_up_and_keeps_tx_in_memory() {
        let h = testing_pool_with(PoolConfig {
            precommit_backoff: Duration::from_millis(1),
            ..Default::default()
        });
        h.ledger.fail_times(usize::MAX);
        let tx = random_tx();
        h.pool.submit_transaction(tx.clone(), None);

        thread::sleep(Duration::from_millis(100));
        assert!(h.ledger.stored_hashes().is_empty());
        assert_eq!(h.pool.len(), 1);
    }

    #[test]
    fn unsealed_notifier_sees_every_size_change() {
        let h = testing_pool();
        let sizes = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen = sizes.clone();
        h.pool.set_unsealed_notifier(Box::new(move |size, ack| {
            seen.lock().push(size);
            ack(None);
        }));

        let tx = random_tx();
        h.pool.submit_transaction(tx.clone(), None);
        h.pool.batch_mark_txs(&[tx.hash], 1, B256::repeat_byte(0x01), true);
        h.pool.remove(&tx.hash);

        let sizes = sizes.lock().clone();
        assert_eq!(sizes, vec![1, 0, 0]);
    }

    #[test]
    fn failed_notification_retries_up_to_budget() {
        let h = testing_pool();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        h.pool.set_unsealed_notifier(Box::new(move |_, ack| {
            counter.fetch_add(1, Ordering::SeqCst);
            ack(Some(crate::error::AckError::new(-1, "sealer unavailable")));
        }));

        h.pool.submit_transaction(random_tx(), None);
        // initial delivery plus the configured retries
        assert_eq!(calls.load(Ordering::SeqCst), 1 + h.pool.config().max_notify_retries);
    }

    #[test]
    fn on_ready_fires_for_every_insert() {
        let h = testing_pool();
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = wakes.clone();
        h.pool.set_on_ready(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        h.pool.submit_transaction(random_tx(), None);
        h.pool.enforce_submit(random_tx(), 1, B256::repeat_byte(0x01));
        h.pool.batch_insert(vec![random_tx(), random_tx()]);
        assert_eq!(wakes.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn clear_empties_the_pool_and_heals_the_sealed_counter() {
        let h = testing_pool();
        for _ in 0..3 {
            h.pool.submit_transaction(random_tx(), None);
        }
        h.pool.batch_mark_all_txs(true);
        h.pool.clear();
        assert_eq!(h.pool.len(), 0);
        assert_eq!(h.pool.unsealed_size(), 0);
    }

    #[test]
    fn stop_halts_background_work() {
        let h = testing_pool();
        h.pool.stop();
        h.pool.stop();
        // receipts queued after stop are dropped rather than delivered
        let tx = random_tx();
        let (cb, rx) = capture_callback();
        h.pool.submit_transaction(tx.clone(), Some(cb));
        h.pool
            .remove_submitted_tx(TxSubmitResult::committed(tx.hash, 1, B256::repeat_byte(0x01)));
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn concurrent_admit_fetch_remove_keeps_invariants() {
        let h = testing_pool();
        let submitted = Arc::new(parking_lot::Mutex::new(Vec::new()));

        thread::scope(|scope| {
            for _ in 0..4 {
                let pool = h.pool.clone();
                let submitted = submitted.clone();
                scope.spawn(move || {
                    for _ in 0..100 {
                        let tx = random_tx();
                        if pool.submit_transaction(tx.clone(), None).is_ok() {
                            submitted.lock().push(tx.hash);
                        }
                    }
                });
            }
            let sealer = h.pool.clone();
            scope.spawn(move || {
                for _ in 0..40 {
                    sealer.batch_fetch_txs(10, None, true);
                    thread::sleep(Duration::from_micros(200));
                }
            });
            let gossip = h.pool.clone();
            scope.spawn(move || {
                for _ in 0..40 {
                    gossip.fetch_new_txs(20);
                    thread::sleep(Duration::from_micros(200));
                }
            });
            let importer = h.pool.clone();
            let committed = submitted.clone();
            scope.spawn(move || {
                for batch in 0..20 {
                    let hashes: Vec<TxHash> = {
                        let mut lock = committed.lock();
                        let take = lock.len().min(5);
                        lock.drain(..take).collect()
                    };
                    let results = hashes
                        .into_iter()
                        .map(|hash| {
                            TxSubmitResult::committed(hash, batch, B256::repeat_byte(0x10))
                        })
                        .collect();
                    importer.batch_remove(batch, results);
                    thread::sleep(Duration::from_micros(500));
                }
            });
        });

        // quiescent: the sealed counter agrees with the table
        let sealed = sealed_in_table(&h.pool.inner);
        assert_eq!(h.pool.inner.sealed_count.load(Ordering::SeqCst), sealed);
        assert_eq!(h.pool.unsealed_size(), h.pool.len() - sealed);
        assert!(h.pool.len() <= h.pool.config().pool_limit);
    }
}
