//! Reconnect backoff controller (spec.md §4.6): exponential delay with
//! jitter, reset on a successful connection, capped by an optional attempt
//! budget, plus the `execute`/`execute_with_reconnect` wrappers that drive
//! a unit of work through that backoff and classify which errors are worth
//! retrying.

use std::future::Future;
use std::time::Duration;

use crate::config::{RetryConfig, RetryableErrors};
use crate::error::ImapError;

#[derive(Debug, Clone)]
pub struct RetryController {
    config: RetryConfig,
    attempt: u32,
}

impl RetryController {
    pub fn new(config: RetryConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Call after a successful connect to forget prior failures.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Returns the delay to wait before the next reconnect attempt, or
    /// `None` when the configured attempt budget is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if let Some(max) = self.config.max_attempts {
            if self.attempt >= max {
                return None;
            }
        }
        let base = self.config.initial_backoff.as_secs_f64() * self.config.multiplier.powi(self.attempt as i32);
        let capped = base.min(self.config.max_backoff.as_secs_f64());
        self.attempt += 1;
        Some(apply_jitter(capped, self.config.jitter))
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Runs `work` to completion, retrying per the classification rules in
    /// `RetryableErrors` with exponential backoff between attempts. `op` is a
    /// short label carried on each `RetryAttempt`, for callers that want to
    /// log retries themselves — this module has no logging dependency of its
    /// own.
    pub async fn execute<T, F, Fut>(&mut self, op: &str, work: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ImapError>>,
    {
        self.execute_with_reconnect(op, default_needs_reconnect, no_reconnect, work).await
    }

    /// Like `execute`, but reconnects before the next attempt whenever
    /// `needs_reconnect` says the error warrants it. The reconnect itself
    /// runs outside the backoff delay — it happens in addition to, not
    /// instead of, the computed sleep.
    pub async fn execute_with_reconnect<T, F, Fut, N, R, RFut>(
        &mut self,
        op: &str,
        needs_reconnect: N,
        mut reconnect: R,
        mut work: F,
    ) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ImapError>>,
        N: Fn(&ImapError) -> bool,
        R: FnMut() -> RFut,
        RFut: Future<Output = Result<(), ImapError>>,
    {
        let mut history = Vec::new();
        let mut attempt_num: u32 = 1;
        loop {
            match work().await {
                Ok(result) => {
                    self.reset();
                    return RetryOutcome::Succeeded { attempts: attempt_num, history, result };
                }
                Err(error) => {
                    if !classify_retryable(&error, &self.config.retryable) {
                        return RetryOutcome::Failed { attempts: attempt_num, history, last_error: error };
                    }
                    let exhausted =
                        self.config.max_attempts.map(|max| attempt_num >= max).unwrap_or(false);
                    if exhausted {
                        return RetryOutcome::Failed { attempts: attempt_num, history, last_error: error };
                    }
                    let delay = self.next_delay().unwrap_or(self.config.max_backoff);
                    if needs_reconnect(&error) {
                        if let Err(reconnect_error) = reconnect().await {
                            history.push(RetryAttempt { op: op.to_string(), attempt: attempt_num, error, delay });
                            return RetryOutcome::Failed {
                                attempts: attempt_num,
                                history,
                                last_error: reconnect_error,
                            };
                        }
                    }
                    history.push(RetryAttempt { op: op.to_string(), attempt: attempt_num, error, delay });
                    tokio::time::sleep(delay).await;
                    attempt_num += 1;
                }
            }
        }
    }
}

/// `execute`'s reconnect step: there is nothing to reconnect, so it never
/// triggers (`default_needs_reconnect` / the caller's predicate still gates
/// whether this would even run).
async fn no_reconnect() -> Result<(), ImapError> {
    Ok(())
}

/// Default "does this error mean the connection itself is gone" predicate
/// (spec.md §4.6): connection errors/closures, or a server error mentioning
/// BYE, DISCONNECTED, or CONNECTION RESET.
fn default_needs_reconnect(error: &ImapError) -> bool {
    matches!(error, ImapError::ConnectionError(_) | ImapError::ConnectionClosed)
        || error.server_text_contains_any(&["BYE", "DISCONNECTED", "CONNECTION RESET"])
}

const TEMPORARY_FAILURE_MARKERS: [&str; 4] = ["UNAVAILABLE", "TRY AGAIN", "TEMPORARY", "BUSY"];

/// Classifies `error` per spec.md §4.6 rules (a)-(e), gated by which
/// categories `policy` enables.
fn classify_retryable(error: &ImapError, policy: &RetryableErrors) -> bool {
    match error {
        ImapError::ConnectionError(_) | ImapError::ConnectionClosed => return policy.connection_lost,
        ImapError::Timeout => return policy.timeout,
        _ => {}
    }
    if error.server_text_contains_any(&TEMPORARY_FAILURE_MARKERS) {
        return policy.temporary_failure;
    }
    if error.mentions_network_issue() {
        return policy.network_error;
    }
    if error.mentions_tls_issue() {
        return policy.tls_handshake_failure;
    }
    false
}

/// One failed-and-retried attempt, recorded for callers that want to log or
/// report retry activity.
#[derive(Debug, Clone)]
pub struct RetryAttempt {
    pub op: String,
    pub attempt: u32,
    pub error: ImapError,
    pub delay: Duration,
}

/// The terminal result of `execute`/`execute_with_reconnect`: either the
/// work eventually succeeded, or every retry was exhausted (or the error
/// wasn't retryable to begin with).
#[derive(Debug, Clone)]
pub enum RetryOutcome<T> {
    Succeeded { attempts: u32, history: Vec<RetryAttempt>, result: T },
    Failed { attempts: u32, history: Vec<RetryAttempt>, last_error: ImapError },
}

impl<T> RetryOutcome<T> {
    /// Collapses to the plain `Result` most callers want, discarding the
    /// attempt history.
    pub fn into_result(self) -> Result<T, ImapError> {
        match self {
            RetryOutcome::Succeeded { result, .. } => Ok(result),
            RetryOutcome::Failed { last_error, .. } => Err(last_error),
        }
    }
}

fn apply_jitter(seconds: f64, jitter: f64) -> Duration {
    if jitter <= 0.0 {
        return Duration::from_secs_f64(seconds.max(0.0));
    }
    let spread: f64 = rand::random::<f64>() * 2.0 - 1.0; // [-1.0, 1.0)
    let factor = 1.0 + spread * jitter;
    Duration::from_secs_f64((seconds * factor).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_attempts: Option<u32>) -> RetryConfig {
        RetryConfig {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: 0.0,
            max_attempts,
            retryable: RetryableErrors::default(),
        }
    }

    #[test]
    fn delay_doubles_each_attempt_without_jitter() {
        let mut controller = RetryController::new(config(None));
        assert_eq!(controller.next_delay(), Some(Duration::from_millis(100)));
        assert_eq!(controller.next_delay(), Some(Duration::from_millis(200)));
        assert_eq!(controller.next_delay(), Some(Duration::from_millis(400)));
    }

    #[test]
    fn delay_is_capped_at_max_backoff() {
        let mut controller = RetryController::new(config(None));
        for _ in 0..20 {
            controller.next_delay();
        }
        assert_eq!(controller.next_delay(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn reset_restarts_the_sequence() {
        let mut controller = RetryController::new(config(None));
        controller.next_delay();
        controller.next_delay();
        controller.reset();
        assert_eq!(controller.next_delay(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn exhausts_after_max_attempts() {
        let mut controller = RetryController::new(config(Some(2)));
        assert!(controller.next_delay().is_some());
        assert!(controller.next_delay().is_some());
        assert_eq!(controller.next_delay(), None);
    }

    #[test]
    fn jitter_keeps_delay_within_bounds() {
        let mut controller = RetryController::new(RetryConfig {
            jitter: 0.5,
            ..config(None)
        });
        let delay = controller.next_delay().unwrap();
        assert!(delay >= Duration::from_millis(50));
        assert!(delay <= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn execute_retries_connection_errors_then_succeeds() {
        tokio::time::pause();
        let mut controller = RetryController::new(config(None));
        let mut calls = 0u32;
        let outcome = controller
            .execute("NOOP", || {
                calls += 1;
                async move {
                    if calls < 3 {
                        Err(ImapError::ConnectionClosed)
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;
        match outcome {
            RetryOutcome::Succeeded { attempts, result, history } => {
                assert_eq!(attempts, 3);
                assert_eq!(result, 42);
                assert_eq!(history.len(), 2);
            }
            RetryOutcome::Failed { .. } => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn execute_does_not_retry_no_or_bad() {
        let mut controller = RetryController::new(config(None));
        let outcome: RetryOutcome<()> = controller
            .execute("SELECT", || async {
                Err(ImapError::CommandFailed { command: "SELECT".into(), text: "no such mailbox".into() })
            })
            .await;
        match outcome {
            RetryOutcome::Failed { attempts, history, .. } => {
                assert_eq!(attempts, 1);
                assert!(history.is_empty());
            }
            RetryOutcome::Succeeded { .. } => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn execute_retries_temporary_server_failures() {
        tokio::time::pause();
        let mut controller = RetryController::new(config(None));
        let mut calls = 0u32;
        let outcome = controller
            .execute("SELECT", || {
                calls += 1;
                async move {
                    if calls < 2 {
                        Err(ImapError::ServerError("[UNAVAILABLE] try again later".into()))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;
        assert!(matches!(outcome, RetryOutcome::Succeeded { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn execute_stops_once_attempt_budget_is_exhausted() {
        tokio::time::pause();
        let mut controller = RetryController::new(config(Some(2)));
        let outcome: RetryOutcome<()> =
            controller.execute("NOOP", || async { Err(ImapError::Timeout) }).await;
        match outcome {
            RetryOutcome::Failed { attempts, history, .. } => {
                assert_eq!(attempts, 2);
                assert_eq!(history.len(), 1);
            }
            RetryOutcome::Succeeded { .. } => panic!("expected exhaustion"),
        }
    }

    #[tokio::test]
    async fn execute_with_reconnect_runs_reconnect_before_retrying() {
        tokio::time::pause();
        let mut controller = RetryController::new(config(None));
        let mut reconnects = 0u32;
        let mut calls = 0u32;
        let outcome = controller
            .execute_with_reconnect(
                "FETCH",
                |e: &ImapError| matches!(e, ImapError::ConnectionClosed),
                || {
                    reconnects += 1;
                    async { Ok(()) }
                },
                || {
                    calls += 1;
                    async move { if calls < 2 { Err(ImapError::ConnectionClosed) } else { Ok(()) } }
                },
            )
            .await;
        assert!(matches!(outcome, RetryOutcome::Succeeded { .. }));
        assert_eq!(reconnects, 1);
    }
}
