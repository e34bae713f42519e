//! Configuration for the client.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Configuration for a [`Database`](crate::Database).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the store (e.g., "https://example.firebaseio.com").
    pub base_url: String,
    /// Deadline for each round trip, handed to the HTTP client.
    pub timeout: Duration,
    /// Retry policy for `run_transaction_with_retry`.
    pub retry: RetryConfig,
}

impl ClientConfig {
    /// Creates a configuration for the given store.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::no_retry(),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the transaction retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("")
    }
}

/// How often, and how patiently, a transaction is re-run after a conflict.
///
/// Only conflicts are retried. The pause after the n-th conflict is
/// `base_backoff * backoff_factor^(n-1)`, capped at `max_backoff`. With
/// `jitter` the pause is drawn from the upper half of that value, so clients
/// that lost the same race do not collide again in lockstep.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Pause after the first conflict.
    pub base_backoff: Duration,
    /// Upper bound for any pause.
    pub max_backoff: Duration,
    /// Growth of the pause per further conflict. Values below 1.0 are
    /// treated as 1.0.
    pub backoff_factor: f64,
    /// Whether to randomize pauses.
    pub jitter: bool,
}

impl RetryConfig {
    /// Allows up to `max_attempts` attempts with the default backoff.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(5),
            backoff_factor: 2.0,
            jitter: true,
        }
    }

    /// A single attempt: the first conflict is final.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_factor: 1.0,
            jitter: false,
        }
    }

    /// Sets the pause after the first conflict.
    pub fn with_base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    /// Sets the upper bound for any pause.
    pub fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// Sets the growth factor, clamped to at least 1.0.
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = if factor.is_nan() { 1.0 } else { factor.max(1.0) };
        self
    }

    /// Enables or disables randomized pauses.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Returns true if another attempt may follow the `conflicts`-th conflict.
    pub fn allows_retry_after(&self, conflicts: u32) -> bool {
        conflicts < self.max_attempts.max(1)
    }

    /// Pause before re-running after the `conflicts`-th conflict (1-based).
    pub fn backoff_after_conflict(&self, conflicts: u32) -> Duration {
        if conflicts == 0 || self.base_backoff.is_zero() {
            return Duration::ZERO;
        }

        let factor = if self.backoff_factor.is_nan() {
            1.0
        } else {
            self.backoff_factor.max(1.0)
        };
        let exponent = i32::try_from(conflicts - 1).unwrap_or(i32::MAX);
        let grown = self.base_backoff.as_secs_f64() * factor.powi(exponent);
        let capped = Duration::try_from_secs_f64(grown)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff);

        if self.jitter {
            capped / 2 + capped.mul_f64(0.5 * jitter_fraction())
        } else {
            capped
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::no_retry()
    }
}

/// A value in `[0, 1)` taken from the clock's sub-second nanos.
fn jitter_fraction() -> f64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_nanos())
        .unwrap_or(0);
    f64::from(nanos % 1_000_000) / 1_000_000.0
}
