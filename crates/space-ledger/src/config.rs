//! Ledger configuration.

use std::time::Duration;

use space_ledger_state::DEFAULT_VERIFY_TIMEOUT;

/// Configuration for a [`SpaceLedger`](crate::SpaceLedger).
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// How many times a write is rebuilt after losing a counter race.
    pub max_retries: u32,
    /// Base delay between retries. Attempt `n` waits `n * retry_backoff`.
    pub retry_backoff: Duration,
    /// Deadline for each identity verification.
    pub verify_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_backoff: Duration::from_millis(25),
            verify_timeout: DEFAULT_VERIFY_TIMEOUT,
        }
    }
}
