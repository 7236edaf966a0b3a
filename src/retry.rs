use std::thread::sleep;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::RemoteError;

/// Bounded exponential backoff applied to every remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts. Used by tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Delay before the attempt following `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        let delay = self.base_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

/// Runs `op` until it succeeds, fails permanently, or the attempts run out.
///
/// Only transient errors are retried. Once the bound is hit the last error is
/// returned as it was observed.
pub fn with_retry<T, F>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, RemoteError>
where
    F: FnMut() -> Result<T, RemoteError>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        debug!(attempt, max_attempts, call = what, "Calling remote service");

        match op() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(error = %e, attempt, call = what, delay_ms = delay.as_millis() as u64, "Transient failure, retrying");
                sleep(delay);
            }
            Err(e) => {
                if e.is_transient() {
                    warn!(error = %e, attempts = attempt, call = what, "Retries exhausted");
                }
                return Err(e);
            }
        }
    }
}
