//! Transaction validation abstractions.

use crate::{error::TransactionStatus, traits::Transaction};

/// Provides support for validating transactions against the current chain
/// state.
///
/// Implementations own the signature checks, the nonce databases and the
/// block-limit window; the pool only interprets the returned status.
pub trait TransactionValidator: Send + Sync {
    /// Full admission check: signature, nonce window, block limit.
    ///
    /// Returns [`TransactionStatus::None`] when the transaction may enter the
    /// pool.
    fn verify(&self, tx: &Transaction) -> TransactionStatus;

    /// Cheap check whether the chain already consumed this transaction's
    /// nonce ([`TransactionStatus::NonceCheckFail`]) or its block limit
    /// expired ([`TransactionStatus::BlockLimitCheckFail`]).
    fn submitted_to_chain(&self, tx: &Transaction) -> TransactionStatus;
}
