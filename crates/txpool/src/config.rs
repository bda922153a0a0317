use std::time::Duration;

/// The default maximum number of transactions the pool will hold.
pub const TXPOOL_MAX_TXS_DEFAULT: usize = 15_000;

/// The default number of workers delivering submit receipts.
pub const TXPOOL_NOTIFIER_WORKERS_DEFAULT: usize = 2;

/// The default number of times a failed unsealed-size notification is retried.
pub const TXPOOL_MAX_NOTIFY_RETRIES_DEFAULT: usize = 3;

/// The default number of retries for a failed ledger pre-store.
pub const TXPOOL_PRECOMMIT_RETRIES_DEFAULT: usize = 3;

/// The default pause between ledger pre-store retries.
pub const TXPOOL_PRECOMMIT_BACKOFF_DEFAULT: Duration = Duration::from_millis(100);

/// Configuration options for the transaction pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Max number of transactions in the pool.
    ///
    /// Admission re-checks this bound, so the pool may momentarily exceed it
    /// under concurrent submits.
    pub pool_limit: usize,
    /// Number of workers delivering submit receipts and invalid-tx purges.
    pub notifier_worker_num: usize,
    /// How often a failed unsealed-size notification is retried.
    pub max_notify_retries: usize,
    /// How often a failed ledger pre-store is retried.
    ///
    /// Once exhausted the transaction stays in memory only; the next seal and
    /// commit persist it upstream.
    pub precommit_retries: usize,
    /// Pause between ledger pre-store retries.
    pub precommit_backoff: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_limit: TXPOOL_MAX_TXS_DEFAULT,
            notifier_worker_num: TXPOOL_NOTIFIER_WORKERS_DEFAULT,
            max_notify_retries: TXPOOL_MAX_NOTIFY_RETRIES_DEFAULT,
            precommit_retries: TXPOOL_PRECOMMIT_RETRIES_DEFAULT,
            precommit_backoff: TXPOOL_PRECOMMIT_BACKOFF_DEFAULT,
        }
    }
}
