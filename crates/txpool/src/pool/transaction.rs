//! The per-transaction record held by the pool.

use crate::traits::{
    BatchId, PeerId, Transaction, TxHash, TxNonce, TxSubmitCallback,
};
use alloy_primitives::{Address, Bytes, B256};
use parking_lot::{Mutex, RwLock};
use std::{
    collections::HashSet,
    fmt,
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

/// Sentinel batch id for a transaction that was claimed by the local sealer
/// but not yet assigned to a proposal. Paired with a zero batch hash.
pub const UNASSIGNED_BATCH_ID: BatchId = -1;

/// Identity of the proposal a sealed transaction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchInfo {
    /// Proposal number, [`UNASSIGNED_BATCH_ID`] until the sealer assigns one.
    pub id: BatchId,
    /// Proposal hash, zero until assigned.
    pub hash: B256,
}

impl Default for BatchInfo {
    fn default() -> Self {
        Self { id: UNASSIGNED_BATCH_ID, hash: B256::ZERO }
    }
}

/// A transaction admitted into the pool, together with its sealing state.
///
/// The flags are atomic so the sealer can flip them without taking the pool's
/// structure lock; readers accept mildly stale values.
pub struct PooledTransaction {
    /// The decoded transaction.
    transaction: Transaction,
    /// Wall-clock millis when the transaction passed verification. Zero for
    /// enforced imports.
    import_time: AtomicU64,
    /// Whether some proposal, local or observed, currently claims this
    /// transaction.
    sealed: AtomicBool,
    /// Whether the transaction was already handed out for gossip once.
    synced: AtomicBool,
    /// The proposal that sealed this transaction.
    batch: RwLock<BatchInfo>,
    /// Peers known to hold or have advertised this transaction.
    known_peers: RwLock<HashSet<PeerId>>,
    /// One-shot submit callback, consumed on first delivery.
    submit_callback: Mutex<Option<TxSubmitCallback>>,
}

impl PooledTransaction {
    /// Wraps a freshly decoded transaction.
    pub fn new(transaction: Transaction) -> Self {
        Self {
            transaction,
            import_time: AtomicU64::new(0),
            sealed: AtomicBool::new(false),
            synced: AtomicBool::new(false),
            batch: RwLock::new(BatchInfo::default()),
            known_peers: RwLock::new(HashSet::new()),
            submit_callback: Mutex::new(None),
        }
    }

    /// The decoded transaction.
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Content hash of the transaction.
    pub fn hash(&self) -> TxHash {
        self.transaction.hash
    }

    /// Chain-level nonce of the transaction.
    pub fn nonce(&self) -> TxNonce {
        self.transaction.nonce
    }

    /// Destination address.
    pub fn to(&self) -> Address {
        self.transaction.to
    }

    /// Original encoded bytes.
    pub fn payload(&self) -> &Bytes {
        &self.transaction.payload
    }

    /// Whether this transaction routes to the system sub-list during fetch.
    pub fn is_system(&self) -> bool {
        self.transaction.system
    }

    /// Wall-clock millis of admission, zero for enforced imports.
    pub fn import_time(&self) -> u64 {
        self.import_time.load(Ordering::Relaxed)
    }

    /// Stamps the admission time with the current wall clock.
    pub fn stamp_import_time(&self) {
        self.import_time.store(unix_millis(), Ordering::Relaxed);
    }

    /// Whether some proposal currently claims this transaction.
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Sets the sealed flag, returning the previous value.
    pub fn set_sealed(&self, sealed: bool) -> bool {
        self.sealed.swap(sealed, Ordering::AcqRel)
    }

    /// Whether the transaction was already handed out for gossip.
    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    /// Claims the transaction for gossip, returning whether it had been
    /// claimed before.
    pub fn mark_synced(&self) -> bool {
        self.synced.swap(true, Ordering::AcqRel)
    }

    /// The proposal that sealed this transaction.
    pub fn batch(&self) -> BatchInfo {
        *self.batch.read()
    }

    /// Records the proposal that sealed this transaction.
    pub fn set_batch(&self, id: BatchId, hash: B256) {
        *self.batch.write() = BatchInfo { id, hash };
    }

    /// Records that the given peer holds or advertised this transaction.
    pub fn append_known_peer(&self, peer: PeerId) {
        self.known_peers.write().insert(peer);
    }

    /// Whether the given peer is known to hold this transaction.
    pub fn is_known_by(&self, peer: &PeerId) -> bool {
        self.known_peers.read().contains(peer)
    }

    /// Attaches the submit callback delivering the final receipt.
    pub fn set_submit_callback(&self, callback: TxSubmitCallback) {
        *self.submit_callback.lock() = Some(callback);
    }

    /// Whether a submit callback is still attached.
    pub fn has_submit_callback(&self) -> bool {
        self.submit_callback.lock().is_some()
    }

    /// Consumes the submit callback.
    ///
    /// Whichever delivery path wins the race gets the callback; every later
    /// taker sees `None` and stays silent.
    pub fn take_submit_callback(&self) -> Option<TxSubmitCallback> {
        self.submit_callback.lock().take()
    }
}

impl fmt::Debug for PooledTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledTransaction")
            .field("hash", &self.transaction.hash)
            .field("sealed", &self.is_sealed())
            .field("synced", &self.is_synced())
            .field("batch", &self.batch())
            .finish_non_exhaustive()
    }
}

/// Current wall clock in milliseconds since the unix epoch.
pub(crate) fn unix_millis() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::TransactionStatus, traits::TxSubmitResult};
    use alloy_primitives::{Address, B512, U256};
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn tx(hash_byte: u8) -> Transaction {
        Transaction {
            hash: B256::repeat_byte(hash_byte),
            nonce: U256::from(hash_byte),
            to: Address::repeat_byte(0x11),
            payload: Bytes::from(vec![hash_byte; 8]),
            system: false,
            block_limit: 100,
        }
    }

    #[test]
    fn callback_is_consumed_exactly_once() {
        let pooled = PooledTransaction::new(tx(0xaa));
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        pooled.set_submit_callback(Box::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let cb = pooled.take_submit_callback().expect("callback attached");
        assert!(pooled.take_submit_callback().is_none());
        assert!(!pooled.has_submit_callback());

        cb(None, TxSubmitResult::new(B256::repeat_byte(0xaa), TransactionStatus::None));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn seal_transitions_report_previous_state() {
        let pooled = PooledTransaction::new(tx(0x01));
        assert!(!pooled.is_sealed());
        assert!(!pooled.set_sealed(true));
        assert!(pooled.set_sealed(true));
        assert!(pooled.set_sealed(false));
        assert!(!pooled.is_sealed());
    }

    #[test]
    fn batch_defaults_to_unassigned() {
        let pooled = PooledTransaction::new(tx(0x02));
        assert_eq!(pooled.batch(), BatchInfo::default());
        pooled.set_batch(7, B256::repeat_byte(0xbb));
        assert_eq!(pooled.batch().id, 7);
        assert_eq!(pooled.batch().hash, B256::repeat_byte(0xbb));
    }

    #[test]
    fn synced_claim_happens_once() {
        let pooled = PooledTransaction::new(tx(0x03));
        assert!(!pooled.mark_synced());
        assert!(pooled.mark_synced());
        assert!(pooled.is_synced());
    }

    #[test]
    fn known_peers_accumulate() {
        let pooled = PooledTransaction::new(tx(0x04));
        let peer = B512::repeat_byte(0x77);
        assert!(!pooled.is_known_by(&peer));
        pooled.append_known_peer(peer);
        pooled.append_known_peer(peer);
        assert!(pooled.is_known_by(&peer));
    }
}
