//! Transaction pool errors and the admission status taxonomy.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Outcome of a transaction admission or chain-level check.
///
/// The numeric codes are part of the RPC interface and are forwarded verbatim
/// into error payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(i32)]
pub enum TransactionStatus {
    /// The transaction was accepted.
    None = 0,
    /// The transaction payload could not be decoded.
    Malform = 1,
    /// A transaction with the same hash is already pending.
    AlreadyInTxPool = 2,
    /// The pool has reached its configured capacity.
    TxPoolIsFull = 3,
    /// The transaction's nonce has already been consumed on chain.
    NonceCheckFail = 4,
    /// The transaction's block limit has expired.
    BlockLimitCheckFail = 5,
}

impl TransactionStatus {
    /// The numeric code forwarded into error payloads.
    pub const fn code(&self) -> i32 {
        *self as i32
    }

    /// Whether the transaction was accepted.
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Whether this status is final from the submitter's perspective.
    ///
    /// A transaction still claimed by another proposal may yet commit, so
    /// `AlreadyInTxPool` (and a full pool) must not consume the submit
    /// callback on the removal path.
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::AlreadyInTxPool | Self::TxPoolIsFull)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "None",
            Self::Malform => "Malform",
            Self::AlreadyInTxPool => "AlreadyInTxPool",
            Self::TxPoolIsFull => "TxPoolIsFull",
            Self::NonceCheckFail => "NonceCheckFail",
            Self::BlockLimitCheckFail => "BlockLimitCheckFail",
        };
        f.write_str(s)
    }
}

/// Error delivered alongside a rejected submit receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{status} (code {})", .status.code())]
pub struct PoolError {
    /// The status the transaction was rejected with.
    pub status: TransactionStatus,
}

impl PoolError {
    /// Wraps a rejection status.
    pub const fn new(status: TransactionStatus) -> Self {
        Self { status }
    }

    /// The numeric code of the underlying status.
    pub const fn code(&self) -> i32 {
        self.status.code()
    }
}

impl From<TransactionStatus> for PoolError {
    fn from(status: TransactionStatus) -> Self {
        Self::new(status)
    }
}

/// The payload handed to `submit` could not be decoded into a transaction.
#[derive(Debug, Clone, thiserror::Error)]
#[error("malformed transaction payload: {0}")]
pub struct DecodeError(pub String);

/// Error reported through an asynchronous acknowledgement (ledger store,
/// unsealed-size notification).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct AckError {
    /// Collaborator-specific error code.
    pub code: i32,
    /// Human-readable description.
    pub message: String,
}

impl AckError {
    /// Creates a new acknowledgement error.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}
