//! Transaction attempts and retry.

use super::context::Transaction;
use crate::config::RetryConfig;
use crate::error::{ClientError, ClientResult};
use crate::transport::StoreTransport;
use parking_lot::RwLock;
use tracing::{debug, warn};

/// Statistics about transactions run through a database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionStats {
    /// Total number of attempts started.
    pub attempts: u64,
    /// Total number of transactions whose callback returned `Ok`.
    pub committed: u64,
    /// Total number of rejected conditional writes.
    pub conflicts: u64,
    /// Total number of attempts repeated after a conflict.
    pub retries: u64,
    /// Total number of conditional writes applied.
    pub writes_applied: u64,
}

/// Runs transaction callbacks against a transport.
pub struct TransactionRunner<'a, T: StoreTransport + ?Sized> {
    transport: &'a T,
    retry: RetryConfig,
    stats: Option<&'a RwLock<TransactionStats>>,
}

impl<'a, T: StoreTransport + ?Sized> TransactionRunner<'a, T> {
    /// Creates a single-attempt runner.
    pub fn new(transport: &'a T) -> Self {
        Self {
            transport,
            retry: RetryConfig::no_retry(),
            stats: None,
        }
    }

    /// Sets the retry policy used by [`run_with_retry`](Self::run_with_retry).
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Records statistics into `stats`.
    pub fn with_stats(mut self, stats: &'a RwLock<TransactionStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Runs the callback exactly once with a fresh transaction.
    ///
    /// The callback's result is returned unchanged, including any
    /// conflict it lets escape.
    pub fn run<R, F>(&self, callback: F) -> ClientResult<R>
    where
        F: FnOnce(&mut Transaction<'_, T>) -> ClientResult<R>,
    {
        self.attempt(1, callback)
    }

    /// Runs the callback, starting over with a fresh transaction after a conflict.
    ///
    /// Only [`ClientError::TransactionFailed`] triggers another attempt, and
    /// at most `max_attempts` are made. Any other error ends the run.
    pub fn run_with_retry<R, F>(&self, mut callback: F) -> ClientResult<R>
    where
        F: FnMut(&mut Transaction<'_, T>) -> ClientResult<R>,
    {
        let mut attempt = 1;

        loop {
            match self.attempt(attempt, &mut callback) {
                // Every failed attempt so far ended in a conflict, so the
                // attempt number is also the conflict count.
                Err(err) if err.is_conflict() && self.retry.allows_retry_after(attempt) => {
                    let backoff = self.retry.backoff_after_conflict(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "retrying transaction after conflict"
                    );
                    std::thread::sleep(backoff);

                    if let Some(stats) = self.stats {
                        stats.write().retries += 1;
                    }
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn attempt<R, F>(&self, attempt: u32, callback: F) -> ClientResult<R>
    where
        F: FnOnce(&mut Transaction<'_, T>) -> ClientResult<R>,
    {
        debug!(attempt, "transaction attempt started");
        let mut transaction = Transaction::new(self.transport, attempt);
        let result = callback(&mut transaction);

        if let Some(stats) = self.stats {
            let mut stats = stats.write();
            stats.attempts += 1;
            stats.writes_applied += transaction.writes_applied();
            stats.conflicts += transaction.conflicts();
            if result.is_ok() {
                stats.committed += 1;
            }
        }

        match &result {
            Ok(_) => debug!(
                attempt,
                writes = transaction.writes_applied(),
                "transaction attempt succeeded"
            ),
            Err(ClientError::TransactionFailed(failure)) => {
                warn!(attempt, path = %failure.path(), "transaction attempt conflicted")
            }
            Err(err) => debug!(attempt, error = %err, "transaction attempt failed"),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::Reference;
    use crate::transport::{ConflictResponse, NodeRead, WriteOp, WriteOutcome};
    use canopy_protocol::{status, Path, Precondition, Request, Response, Value, VersionToken};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Rejects the first `conflicts` writes, then applies everything.
    struct FlakyTransport {
        conflicts: AtomicU32,
        writes: AtomicU32,
    }

    impl FlakyTransport {
        fn new(conflicts: u32) -> Self {
            Self {
                conflicts: AtomicU32::new(conflicts),
                writes: AtomicU32::new(0),
            }
        }
    }

    impl StoreTransport for FlakyTransport {
        fn read_node(&self, _path: &Path) -> ClientResult<NodeRead> {
            Ok(NodeRead {
                value: Value::Null,
                version: VersionToken::null(),
            })
        }

        fn write_node(
            &self,
            path: &Path,
            _op: &WriteOp,
            _precondition: &Precondition,
        ) -> ClientResult<WriteOutcome> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let remaining = self.conflicts.load(Ordering::SeqCst);
            if remaining > 0 {
                self.conflicts.store(remaining - 1, Ordering::SeqCst);
                return Ok(WriteOutcome::Conflict(ConflictResponse {
                    request: Request::delete(path.to_url("mem://")),
                    response: Response::new(status::PRECONDITION_FAILED),
                }));
            }
            Ok(WriteOutcome::Applied(VersionToken::new("v")))
        }

        fn is_connected(&self) -> bool {
            true
        }

        fn close(&self) -> ClientResult<()> {
            Ok(())
        }
    }

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig::new(max_attempts)
            .with_base_backoff(Duration::from_millis(1))
            .with_jitter(false)
    }

    fn bump(tx: &mut Transaction<'_, FlakyTransport>) -> ClientResult<u32> {
        let reference = Reference::new("/counter")?;
        tx.snapshot(&reference)?;
        tx.set(&reference, 1)?;
        Ok(tx.attempt())
    }

    #[test]
    fn single_attempt_surfaces_conflict() {
        let transport = FlakyTransport::new(1);
        let stats = RwLock::new(TransactionStats::default());
        let runner = TransactionRunner::new(&transport)
            .with_retry(fast_retry(5))
            .with_stats(&stats);

        let err = runner.run(bump).unwrap_err();
        assert!(err.is_conflict());

        let stats = stats.read();
        assert_eq!(stats.attempts, 1);
        assert_eq!(stats.conflicts, 1);
        assert_eq!(stats.committed, 0);
    }

    #[test]
    fn retry_after_conflict() {
        let transport = FlakyTransport::new(1);
        let stats = RwLock::new(TransactionStats::default());
        let runner = TransactionRunner::new(&transport)
            .with_retry(fast_retry(3))
            .with_stats(&stats);

        let attempt = runner.run_with_retry(bump).unwrap();
        assert_eq!(attempt, 2);

        let stats = stats.read().clone();
        assert_eq!(
            stats,
            TransactionStats {
                attempts: 2,
                committed: 1,
                conflicts: 1,
                retries: 1,
                writes_applied: 1,
            }
        );
    }

    #[test]
    fn retry_gives_up_after_max_attempts() {
        let transport = FlakyTransport::new(10);
        let runner = TransactionRunner::new(&transport).with_retry(fast_retry(3));

        assert!(runner.run_with_retry(bump).unwrap_err().is_conflict());
        assert_eq!(transport.writes.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn default_policy_is_single_attempt() {
        let transport = FlakyTransport::new(1);
        let runner = TransactionRunner::new(&transport);

        assert!(runner.run_with_retry(bump).unwrap_err().is_conflict());
        assert_eq!(transport.writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callback_errors_are_not_retried() {
        let transport = FlakyTransport::new(0);
        let runner = TransactionRunner::new(&transport).with_retry(fast_retry(3));
        let mut calls = 0;

        let err = runner
            .run_with_retry(|_tx| -> ClientResult<()> {
                calls += 1;
                Err(ClientError::aborted("balance too low"))
            })
            .unwrap_err();

        assert!(matches!(err, ClientError::Aborted { ref reason } if reason == "balance too low"));
        assert_eq!(calls, 1);
    }

    #[test]
    fn usage_errors_are_not_retried() {
        let transport = FlakyTransport::new(0);
        let runner = TransactionRunner::new(&transport).with_retry(fast_retry(3));
        let mut calls = 0;

        let err = runner
            .run_with_retry(|tx| {
                calls += 1;
                tx.remove(&Reference::new("/never/read")?)
            })
            .unwrap_err();

        assert!(err.is_usage_error());
        assert_eq!(calls, 1);
        assert_eq!(transport.writes.load(Ordering::SeqCst), 0);
    }
}
