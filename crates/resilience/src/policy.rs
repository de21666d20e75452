use std::str::FromStr;
use std::time::Duration;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};
use crate::retry::{Backoff, IsTransient, RetryConfig, retry_on_transient};

/// Errors a [`ResilientCaller`] can surface must be able to represent the
/// failures the pipeline itself produces.
pub trait PolicyError: IsTransient + std::fmt::Display + Sized {
    /// An attempt exceeded its timeout.
    fn timed_out(after: Duration) -> Self;
    /// The call was short-circuited by an open breaker.
    fn circuit_open(breaker: &str) -> Self;
}

/// Resilience settings for one downstream dependency.
#[derive(Debug, Clone)]
pub struct ResiliencePolicy {
    pub circuit_breaker: CircuitBreakerConfig,
    pub retry: RetryConfig,
    /// Bound on each individual attempt.
    pub timeout: Duration,
}

impl Default for ResiliencePolicy {
    fn default() -> Self {
        Self {
            circuit_breaker: CircuitBreakerConfig::default(),
            retry: RetryConfig::default(),
            timeout: Duration::from_secs(2),
        }
    }
}

impl ResiliencePolicy {
    /// Loads a policy from `{prefix}*` environment variables, falling back to defaults.
    ///
    /// Reads `TIMEOUT_MS`, `RETRY_MAX_ATTEMPTS`, `RETRY_WAIT_MS`,
    /// `RETRY_BACKOFF_MULTIPLIER` (1.0 means fixed wait), `CB_SLIDING_WINDOW_SIZE`,
    /// `CB_MINIMUM_CALLS`, `CB_FAILURE_RATE_THRESHOLD`, `CB_WAIT_IN_OPEN_MS` and
    /// `CB_PERMITTED_CALLS_IN_HALF_OPEN`, each prefixed, e.g. `PRODUCT_TIMEOUT_MS`.
    pub fn from_env(prefix: &str) -> Self {
        let defaults = Self::default();
        let var = |name: &str| std::env::var(format!("{prefix}{name}")).ok();

        let wait = env_or(var("RETRY_WAIT_MS"), 1000u64);
        let multiplier = env_or(var("RETRY_BACKOFF_MULTIPLIER"), 1.0f64);
        let backoff = if multiplier > 1.0 {
            Backoff::Exponential {
                initial: Duration::from_millis(wait),
                multiplier,
                max: Duration::from_millis(wait.saturating_mul(10)),
            }
        } else {
            Backoff::Fixed(Duration::from_millis(wait))
        };

        let cb = defaults.circuit_breaker;
        Self {
            circuit_breaker: CircuitBreakerConfig {
                sliding_window_size: env_or(var("CB_SLIDING_WINDOW_SIZE"), cb.sliding_window_size),
                minimum_number_of_calls: env_or(var("CB_MINIMUM_CALLS"), cb.minimum_number_of_calls),
                failure_rate_threshold: env_or(
                    var("CB_FAILURE_RATE_THRESHOLD"),
                    cb.failure_rate_threshold,
                ),
                wait_duration_in_open_state: Duration::from_millis(env_or(
                    var("CB_WAIT_IN_OPEN_MS"),
                    cb.wait_duration_in_open_state.as_millis() as u64,
                )),
                permitted_calls_in_half_open_state: env_or(
                    var("CB_PERMITTED_CALLS_IN_HALF_OPEN"),
                    cb.permitted_calls_in_half_open_state,
                ),
            },
            retry: RetryConfig {
                max_attempts: env_or(var("RETRY_MAX_ATTEMPTS"), defaults.retry.max_attempts).max(1),
                backoff,
            },
            timeout: Duration::from_millis(env_or(
                var("TIMEOUT_MS"),
                defaults.timeout.as_millis() as u64,
            )),
        }
    }
}

fn env_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Runs calls to one dependency through breaker → retry → timeout.
///
/// Cloning shares the breaker, so every clone observes the same circuit.
#[derive(Clone)]
pub struct ResilientCaller {
    breaker: CircuitBreaker,
    retry: RetryConfig,
    timeout: Duration,
}

impl ResilientCaller {
    pub fn new(name: impl Into<String>, policy: ResiliencePolicy) -> Self {
        Self {
            breaker: CircuitBreaker::new(name, policy.circuit_breaker),
            retry: policy.retry,
            timeout: policy.timeout,
        }
    }

    /// Executes `operation`, which receives the 1-based attempt number.
    pub async fn call<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: PolicyError,
    {
        let timeout = self.timeout;
        let retried = async {
            retry_on_transient(&self.retry, |attempt| {
                let attempt_fut = operation(attempt);
                async move {
                    match tokio::time::timeout(timeout, attempt_fut).await {
                        Ok(result) => result,
                        Err(_) => Err(E::timed_out(timeout)),
                    }
                }
            })
            .await
            .into_result()
        };

        match self
            .breaker
            .call_classified(retried, E::is_breaker_failure)
            .await
        {
            Ok(value) => Ok(value),
            Err(CircuitBreakerError::CircuitOpen) => Err(E::circuit_open(self.breaker.name())),
            Err(CircuitBreakerError::OperationFailed(err)) => Err(err),
        }
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum CallError {
        NotFound,
        Unavailable,
        TimedOut,
        Open(String),
    }

    impl std::fmt::Display for CallError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl IsTransient for CallError {
        fn is_transient(&self) -> bool {
            !matches!(self, CallError::NotFound)
        }
    }

    impl PolicyError for CallError {
        fn timed_out(_after: Duration) -> Self {
            CallError::TimedOut
        }

        fn circuit_open(breaker: &str) -> Self {
            CallError::Open(breaker.to_string())
        }
    }

    fn policy(threshold: usize, attempts: u32, timeout: Duration) -> ResiliencePolicy {
        ResiliencePolicy {
            circuit_breaker: CircuitBreakerConfig {
                sliding_window_size: threshold,
                minimum_number_of_calls: threshold,
                failure_rate_threshold: 50.0,
                wait_duration_in_open_state: Duration::from_secs(60),
                permitted_calls_in_half_open_state: 1,
            },
            retry: RetryConfig {
                max_attempts: attempts,
                backoff: Backoff::Fixed(Duration::from_millis(1)),
            },
            timeout,
        }
    }

    #[tokio::test]
    async fn test_slow_attempt_times_out_and_is_retried() {
        let caller = ResilientCaller::new("slow", policy(10, 2, Duration::from_millis(20)));
        let attempts = AtomicU32::new(0);

        let result: Result<(), CallError> = caller
            .call(|_| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(())
                }
            })
            .await;

        assert_eq!(result, Err(CallError::TimedOut));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_neither_retried_nor_counted() {
        let caller = ResilientCaller::new("product", policy(1, 3, Duration::from_secs(1)));
        let attempts = AtomicU32::new(0);

        for _ in 0..3 {
            let result: Result<(), CallError> = caller
                .call(|_| {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Err(CallError::NotFound) }
                })
                .await;
            assert_eq!(result, Err(CallError::NotFound));
        }

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(caller.circuit_state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_open_circuit_short_circuits_without_attempt() {
        let caller = ResilientCaller::new("product", policy(2, 1, Duration::from_secs(1)));
        let attempts = AtomicU32::new(0);

        for _ in 0..2 {
            let _: Result<(), CallError> = caller
                .call(|_| {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Err(CallError::Unavailable) }
                })
                .await;
        }
        assert_eq!(caller.circuit_state(), CircuitState::Open);

        let result: Result<(), CallError> = caller
            .call(|_| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;

        assert_eq!(result, Err(CallError::Open("product".to_string())));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_default_policy() {
        let policy = ResiliencePolicy::default();
        assert_eq!(policy.timeout, Duration::from_secs(2));
        assert_eq!(policy.retry.max_attempts, 3);
        assert_eq!(policy.circuit_breaker.sliding_window_size, 5);
    }

    #[test]
    fn test_env_values_fall_back_on_garbage() {
        assert_eq!(env_or(Some("250".to_string()), 7u64), 250);
        assert_eq!(env_or(Some("abc".to_string()), 7u64), 7);
        assert_eq!(env_or::<u64>(None, 7), 7);
    }
}
