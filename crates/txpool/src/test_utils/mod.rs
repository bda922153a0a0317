//! Internal helpers for testing.
#![allow(missing_docs, unreachable_pub)]

use crate::{
    error::{AckError, DecodeError, PoolError, TransactionStatus},
    traits::{
        BlockNumber, Ledger, LedgerNonceChecker, PoolNonceChecker, StoreAck, Transaction,
        TransactionDecoder, TxHash, TxNonce, TxSubmitCallback, TxSubmitResult,
    },
    validate::TransactionValidator,
    Pool, PoolConfig,
};
use alloy_primitives::{Address, Bytes, B256, U256};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    mpsc, Arc,
};

/// A [`Pool`] over the mock collaborators.
pub type TestPool = Pool<MockValidator, MockDecoder>;

/// A pool plus handles to the mocks it was built over.
#[derive(Debug)]
pub struct TestPoolHandle {
    pub pool: TestPool,
    pub validator: MockValidator,
    pub decoder: MockDecoder,
    pub ledger: MockLedger,
    pub nonces: MockNonceBook,
}

/// Returns a new [`Pool`] with default configuration for testing purposes.
pub fn testing_pool() -> TestPoolHandle {
    testing_pool_with(PoolConfig::default())
}

/// Returns a new [`Pool`] with the given configuration for testing purposes.
pub fn testing_pool_with(config: PoolConfig) -> TestPoolHandle {
    let validator = MockValidator::default();
    let decoder = MockDecoder::default();
    let ledger = MockLedger::default();
    let nonces = MockNonceBook::default();
    let pool = Pool::new(
        validator.clone(),
        decoder.clone(),
        Arc::new(ledger.clone()),
        Arc::new(nonces.clone()),
        Arc::new(nonces.clone()),
        config,
    );
    TestPoolHandle { pool, validator, decoder, ledger, nonces }
}

/// A validator whose verdicts are programmed per transaction hash.
///
/// Unknown hashes pass every check.
#[derive(Debug, Clone, Default)]
pub struct MockValidator {
    verify: Arc<DashMap<TxHash, TransactionStatus>>,
    chain: Arc<DashMap<TxHash, TransactionStatus>>,
}

impl MockValidator {
    /// Makes `verify` return the given status for the hash.
    pub fn set_verify_status(&self, hash: TxHash, status: TransactionStatus) {
        self.verify.insert(hash, status);
    }

    /// Makes `submitted_to_chain` return the given status for the hash.
    pub fn set_chain_status(&self, hash: TxHash, status: TransactionStatus) {
        self.chain.insert(hash, status);
    }

    /// Clears a programmed `submitted_to_chain` verdict.
    pub fn clear_chain_status(&self, hash: &TxHash) {
        self.chain.remove(hash);
    }
}

impl TransactionValidator for MockValidator {
    fn verify(&self, tx: &Transaction) -> TransactionStatus {
        self.verify.get(&tx.hash).map(|s| *s).unwrap_or(TransactionStatus::None)
    }

    fn submitted_to_chain(&self, tx: &Transaction) -> TransactionStatus {
        self.chain.get(&tx.hash).map(|s| *s).unwrap_or(TransactionStatus::None)
    }
}

/// A decoder over a registry of known payloads.
#[derive(Debug, Clone, Default)]
pub struct MockDecoder {
    known: Arc<DashMap<Vec<u8>, Transaction>>,
}

impl MockDecoder {
    /// Registers a transaction so its payload decodes back to it.
    pub fn register(&self, tx: &Transaction) {
        self.known.insert(tx.payload.to_vec(), tx.clone());
    }
}

impl TransactionDecoder for MockDecoder {
    fn decode(&self, data: &[u8]) -> Result<Transaction, DecodeError> {
        self.known
            .get(data)
            .map(|tx| tx.clone())
            .ok_or_else(|| DecodeError("unknown payload".to_owned()))
    }
}

/// A ledger recording stored hashes, with a programmable failure budget.
#[derive(Debug, Clone, Default)]
pub struct MockLedger {
    stored: Arc<Mutex<Vec<TxHash>>>,
    failures: Arc<AtomicUsize>,
}

impl MockLedger {
    /// Makes the next `n` stores fail their acknowledgement.
    pub fn fail_times(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Hashes stored so far.
    pub fn stored_hashes(&self) -> Vec<TxHash> {
        self.stored.lock().clone()
    }
}

impl Ledger for MockLedger {
    fn async_store_transactions(&self, _payloads: Vec<Bytes>, hashes: Vec<TxHash>, ack: StoreAck) {
        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            ack(Some(AckError::new(-1, "mock store failure")));
        } else {
            self.stored.lock().extend(hashes);
            ack(None);
        }
    }
}

/// Records every nonce-book update the pool pushes out.
#[derive(Debug, Clone, Default)]
pub struct MockNonceBook {
    committed: Arc<Mutex<Vec<(BlockNumber, Vec<TxNonce>)>>>,
    removed: Arc<Mutex<Vec<TxNonce>>>,
}

impl MockNonceBook {
    pub fn committed(&self) -> Vec<(BlockNumber, Vec<TxNonce>)> {
        self.committed.lock().clone()
    }

    pub fn removed(&self) -> Vec<TxNonce> {
        self.removed.lock().clone()
    }
}

impl LedgerNonceChecker for MockNonceBook {
    fn batch_insert(&self, block: BlockNumber, nonces: Vec<TxNonce>) {
        self.committed.lock().push((block, nonces));
    }
}

impl PoolNonceChecker for MockNonceBook {
    fn batch_remove(&self, nonces: &[TxNonce]) {
        self.removed.lock().extend_from_slice(nonces);
    }
}

/// Creates a random user transaction.
pub fn random_tx() -> Transaction {
    Transaction {
        hash: B256::from(rand::random::<[u8; 32]>()),
        nonce: U256::from_be_bytes(rand::random::<[u8; 32]>()),
        to: Address::from(rand::random::<[u8; 20]>()),
        payload: Bytes::from(rand::random::<[u8; 32]>().to_vec()),
        system: false,
        block_limit: 500,
    }
}

/// Creates a random system transaction.
pub fn random_system_tx() -> Transaction {
    Transaction { system: true, ..random_tx() }
}

/// A submit callback that forwards its receipt into a channel.
pub fn capture_callback() -> (TxSubmitCallback, mpsc::Receiver<(Option<PoolError>, TxSubmitResult)>)
{
    let (tx, rx) = mpsc::channel();
    let callback: TxSubmitCallback = Box::new(move |error, result| {
        let _ = tx.send((error, result));
    });
    (callback, rx)
}
