#![warn(missing_debug_implementations, missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]

//! An in-memory transaction pool for a consensus node.
//!
//! The pool admits client-submitted transactions, validates them through an
//! external [`TransactionValidator`], stores them in a concurrent table and
//! feeds batches of them to the sealer. Sealed transactions are tracked per
//! proposal until the block commits, at which point `batch_remove` drops them
//! and their submitters receive a one-shot receipt.
//!
//! Durable storage, nonce databases, decoding and signature checks live
//! behind the collaborator traits in [`traits`]; the pool itself is purely in
//! memory and rebuilt from the ledger on restart.

pub mod error;

mod config;
pub use config::{
    PoolConfig, TXPOOL_MAX_NOTIFY_RETRIES_DEFAULT, TXPOOL_MAX_TXS_DEFAULT,
    TXPOOL_NOTIFIER_WORKERS_DEFAULT, TXPOOL_PRECOMMIT_BACKOFF_DEFAULT,
    TXPOOL_PRECOMMIT_RETRIES_DEFAULT,
};

mod metrics;

pub mod pool;
pub mod traits;

mod validate;
pub use crate::{
    error::{PoolError, TransactionStatus},
    pool::{BatchInfo, PooledTransaction, UNASSIGNED_BATCH_ID},
    traits::{
        BatchId, BlockNumber, FetchedTxs, Ledger, LedgerNonceChecker, PeerId, PoolNonceChecker,
        Transaction, TransactionDecoder, TransactionMeta, TxHash, TxNonce, TxSubmitCallback,
        TxSubmitResult,
    },
    validate::TransactionValidator,
};

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use crate::{
    pool::PoolInner,
    traits::{OnReady, UnsealedNotifier},
};
use alloy_primitives::B256;
use std::{collections::HashSet, sync::Arc};

/// A shareable handle to the transaction pool.
///
/// Cloning is cheap; all clones operate on the same pool. Background jobs
/// hold only a non-owning reference, so dropping the last handle (or calling
/// [`Pool::stop`]) shuts the pool down cleanly.
pub struct Pool<V, D> {
    /// The actual pool where transactions are handled.
    inner: Arc<PoolInner<V, D>>,
}

// === impl Pool ===

impl<V, D> Pool<V, D>
where
    V: TransactionValidator + 'static,
    D: TransactionDecoder + 'static,
{
    /// Creates a new pool over the given collaborators.
    pub fn new(
        validator: V,
        decoder: D,
        ledger: Arc<dyn Ledger>,
        ledger_nonces: Arc<dyn LedgerNonceChecker>,
        pool_nonces: Arc<dyn PoolNonceChecker>,
        config: PoolConfig,
    ) -> Self {
        let inner = Arc::new(PoolInner::new(
            validator,
            decoder,
            ledger,
            ledger_nonces,
            pool_nonces,
            config,
        ));
        inner.bind();
        Self { inner }
    }

    /// Get the config the pool was configured with.
    pub fn config(&self) -> &PoolConfig {
        self.inner.config()
    }

    /// Decodes and admits a raw transaction payload; rejections are also
    /// reported through the callback.
    pub fn submit(&self, data: &[u8], callback: TxSubmitCallback) -> TransactionStatus {
        self.inner.submit(data, callback)
    }

    /// Admits an already decoded transaction.
    pub fn submit_transaction(
        &self,
        tx: Transaction,
        callback: Option<TxSubmitCallback>,
    ) -> TransactionStatus {
        self.inner.submit_transaction(tx, callback)
    }

    /// Imports a transaction on behalf of a consensus proposal, pre-sealed
    /// under the given batch.
    pub fn enforce_submit(
        &self,
        tx: Transaction,
        batch_id: BatchId,
        batch_hash: B256,
    ) -> TransactionStatus {
        self.inner.enforce_submit(tx, batch_id, batch_hash)
    }

    /// Inserts pre-verified transactions received from peers.
    pub fn batch_insert(&self, txs: Vec<Transaction>) {
        self.inner.batch_insert(txs)
    }

    /// Removes a single transaction by hash.
    pub fn remove(&self, tx_hash: &TxHash) -> Option<Arc<PooledTransaction>> {
        self.inner.remove(tx_hash)
    }

    /// Removes a settled transaction and delivers its submit receipt.
    pub fn remove_submitted_tx(&self, result: TxSubmitResult) -> Option<Arc<PooledTransaction>> {
        self.inner.remove_submitted_tx(result)
    }

    /// Removes the transactions settled by a committed proposal and updates
    /// the nonce books.
    pub fn batch_remove(&self, batch_id: BatchId, results: Vec<TxSubmitResult>) {
        self.inner.batch_remove(batch_id, results)
    }

    /// Looks up the given hashes, returning found transactions and missing
    /// hashes.
    pub fn fetch_txs(&self, hashes: &[TxHash]) -> (Vec<Arc<PooledTransaction>>, Vec<TxHash>) {
        self.inner.fetch_txs(hashes)
    }

    /// Yields up to `limit` transactions not yet handed out for gossip.
    pub fn fetch_new_txs(&self, limit: usize) -> Vec<Arc<PooledTransaction>> {
        self.inner.fetch_new_txs(limit)
    }

    /// Claims up to `limit` transactions for a new proposal.
    pub fn batch_fetch_txs(
        &self,
        limit: usize,
        avoid: Option<&HashSet<TxHash>>,
        avoid_duplicate: bool,
    ) -> FetchedTxs {
        self.inner.batch_fetch_txs(limit, avoid, avoid_duplicate)
    }

    /// Applies a proposal's seal (or unseal) to the given transactions.
    pub fn batch_mark_txs(
        &self,
        hashes: &[TxHash],
        batch_id: BatchId,
        batch_hash: B256,
        seal: bool,
    ) {
        self.inner.batch_mark_txs(hashes, batch_id, batch_hash, seal)
    }

    /// Seals or unseals every transaction in the pool.
    pub fn batch_mark_all_txs(&self, seal: bool) {
        self.inner.batch_mark_all_txs(seal)
    }

    /// Returns the proposal hashes this pool does not hold.
    pub fn missing_proposal_txs(&self, hashes: &[TxHash]) -> Vec<TxHash> {
        self.inner.missing_proposal_txs(hashes)
    }

    /// Whether the pool holds every transaction of the proposal.
    pub fn contains_proposal_txs(&self, hashes: &[TxHash]) -> bool {
        self.inner.contains_proposal_txs(hashes)
    }

    /// Records the peer against known hashes and returns the hashes worth
    /// requesting.
    pub fn filter_unknown_txs(&self, hashes: &[TxHash], peer: PeerId) -> Vec<TxHash> {
        self.inner.filter_unknown_txs(hashes, peer)
    }

    /// Schedules the purge of transactions queued as invalid.
    pub fn remove_invalid_txs(&self) {
        self.inner.remove_invalid_txs()
    }

    /// Drops every pending transaction.
    pub fn clear(&self) {
        self.inner.clear()
    }

    /// Number of transactions in the pool.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of transactions available to the sealer.
    pub fn unsealed_size(&self) -> usize {
        self.inner.unsealed_size()
    }

    /// Highest committed block observed so far.
    pub fn block_number(&self) -> BlockNumber {
        self.inner.block_number()
    }

    /// Wall-clock millis of the last committed-block observation.
    pub fn block_number_updated_time(&self) -> u64 {
        self.inner.block_number_updated_time()
    }

    /// Registers the hook waking the sealer on new transactions.
    pub fn set_on_ready(&self, hook: OnReady) {
        self.inner.set_on_ready(hook)
    }

    /// Registers the hook receiving the unsealed size.
    pub fn set_unsealed_notifier(&self, notifier: UnsealedNotifier) {
        self.inner.set_unsealed_notifier(notifier)
    }

    /// Halts both background pools; queued jobs drain first.
    pub fn stop(&self) {
        self.inner.stop()
    }
}

impl<V, D> Clone for Pool<V, D> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<V, D> std::fmt::Debug for Pool<V, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool").field("inner", &self.inner).finish()
    }
}
