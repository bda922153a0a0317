//! Transaction pool metrics.

use metrics::{counter, gauge, Counter, Gauge};

pub(crate) struct TxPoolMetrics {
    /// Number of transactions inserted in the pool.
    pub(crate) inserted_transactions: Counter,
    /// Number of transactions removed from the pool.
    pub(crate) removed_transactions: Counter,
    /// Number of transactions purged after their block limit expired.
    pub(crate) invalid_transactions: Counter,
    /// Transactions currently available to the sealer.
    pub(crate) unsealed_transactions: Gauge,
}

impl Default for TxPoolMetrics {
    /// Initialize the metrics struct and register the series.
    fn default() -> Self {
        Self {
            inserted_transactions: counter!("txpool.inserted_transactions"),
            removed_transactions: counter!("txpool.removed_transactions"),
            invalid_transactions: counter!("txpool.invalid_transactions"),
            unsealed_transactions: gauge!("txpool.unsealed_transactions"),
        }
    }
}
