//! Contracts between the pool and its collaborators.

use crate::error::{AckError, DecodeError, PoolError, TransactionStatus};
use alloy_primitives::{Address, Bytes, B256, B512, U256};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Content-addressed transaction identifier.
pub type TxHash = B256;

/// Chain-level uniqueness token carried by every transaction.
pub type TxNonce = U256;

/// Identifier of a peer node, as advertised on the gossip layer.
pub type PeerId = B512;

/// Height of a committed block.
pub type BlockNumber = i64;

/// Identifier of the proposal a sealed transaction belongs to.
pub type BatchId = i64;

/// One-shot callback delivering the final submit receipt to the RPC layer.
///
/// The pool stores it inside the pending transaction and consumes it on first
/// delivery; no path can invoke it twice.
pub type TxSubmitCallback = Box<dyn FnOnce(Option<PoolError>, TxSubmitResult) + Send + 'static>;

/// Acknowledgement for an asynchronous ledger store.
pub type StoreAck = Box<dyn FnOnce(Option<AckError>) + Send + 'static>;

/// Acknowledgement for an unsealed-size notification.
pub type NotifyAck = Box<dyn FnOnce(Option<AckError>) + Send + 'static>;

/// Hook invoked whenever a new transaction lands in the pool.
pub type OnReady = Box<dyn Fn() + Send + Sync + 'static>;

/// Hook receiving the current unsealed size after every mutation that could
/// change it. The acknowledgement reports delivery failures back to the pool.
pub type UnsealedNotifier = Box<dyn Fn(usize, NotifyAck) + Send + Sync + 'static>;

/// A decoded wire transaction.
///
/// Signature verification and payload decoding happen before the pool sees
/// the transaction; the pool treats all fields as opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transaction {
    /// Content hash of the encoded transaction.
    pub hash: TxHash,
    /// Chain-level uniqueness token.
    pub nonce: TxNonce,
    /// Destination address.
    pub to: Address,
    /// Original encoded bytes, retained for the ledger write.
    pub payload: Bytes,
    /// Whether this is a system transaction, routed to the system sub-list
    /// during fetch.
    pub system: bool,
    /// Highest block the chain will still accept this transaction in.
    /// Consumed by the validator; opaque to the pool.
    pub block_limit: u64,
}

/// Decodes raw submit payloads into [`Transaction`]s.
pub trait TransactionDecoder: Send + Sync {
    /// Decodes the payload, verifying its framing.
    fn decode(&self, data: &[u8]) -> Result<Transaction, DecodeError>;
}

/// Durable block and transaction storage.
pub trait Ledger: Send + Sync {
    /// Stores the given transaction payloads ahead of block commit.
    ///
    /// The acknowledgement fires once the write completed, carrying the error
    /// if it failed.
    fn async_store_transactions(&self, payloads: Vec<Bytes>, hashes: Vec<TxHash>, ack: StoreAck);
}

/// Records nonces consumed by committed blocks.
pub trait LedgerNonceChecker: Send + Sync {
    /// Marks the given nonces as consumed by the given block.
    fn batch_insert(&self, block: BlockNumber, nonces: Vec<TxNonce>);
}

/// Tracks nonces of transactions currently pending in the pool.
pub trait PoolNonceChecker: Send + Sync {
    /// Drops the given nonces from the pending set.
    fn batch_remove(&self, nonces: &[TxNonce]);
}

/// Final outcome of a submitted transaction, delivered through the submit
/// callback and consumed by `batch_remove`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TxSubmitResult {
    /// Status the transaction settled with.
    pub status: TransactionStatus,
    /// Hash of the transaction this receipt is for.
    pub tx_hash: TxHash,
    /// Nonce of the transaction, when known to the result's producer.
    pub nonce: Option<TxNonce>,
    /// Hash of the block the transaction was committed in.
    pub block_hash: Option<B256>,
    /// Height of the block the transaction was committed in.
    pub block_number: Option<BlockNumber>,
}

impl TxSubmitResult {
    /// A receipt for a transaction that settled with the given status.
    pub const fn new(tx_hash: TxHash, status: TransactionStatus) -> Self {
        Self { status, tx_hash, nonce: None, block_hash: None, block_number: None }
    }

    /// A receipt for a transaction rejected before it reached a block.
    pub const fn rejected(tx_hash: TxHash, status: TransactionStatus) -> Self {
        Self::new(tx_hash, status)
    }

    /// A receipt for a transaction committed in the given block.
    pub const fn committed(tx_hash: TxHash, block_number: BlockNumber, block_hash: B256) -> Self {
        Self {
            status: TransactionStatus::None,
            tx_hash,
            nonce: None,
            block_hash: Some(block_hash),
            block_number: Some(block_number),
        }
    }

    /// Sets the nonce carried by this receipt.
    pub fn with_nonce(mut self, nonce: TxNonce) -> Self {
        self.nonce = Some(nonce);
        self
    }
}

/// Source tag stamped on metadata fetched for proposals.
pub const META_SOURCE_RPC: &str = "From rpc";

/// Lightweight transaction metadata handed to the sealer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TransactionMeta {
    /// Hash of the transaction.
    pub hash: TxHash,
    /// Destination address.
    pub to: Address,
    /// Where the transaction entered the node.
    pub source: &'static str,
}

/// Transactions claimed by a `batch_fetch_txs` call, split by kind.
#[derive(Debug, Clone, Default)]
pub struct FetchedTxs {
    /// Ordinary user transactions.
    pub user: Vec<TransactionMeta>,
    /// System transactions, executed ahead of user transactions.
    pub system: Vec<TransactionMeta>,
}

impl FetchedTxs {
    /// Total number of claimed transactions.
    pub fn len(&self) -> usize {
        self.user.len() + self.system.len()
    }

    /// Whether the fetch claimed nothing.
    pub fn is_empty(&self) -> bool {
        self.user.is_empty() && self.system.is_empty()
    }
}
