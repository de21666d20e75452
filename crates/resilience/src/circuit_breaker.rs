use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

// ============================================================================
// Circuit Breaker
// ============================================================================
//
// States:
// - Closed: calls pass through, outcomes recorded in a sliding window
// - Open: calls rejected without running, until the open wait elapses
// - HalfOpen: a fixed number of trial calls run; all succeeding closes the
//   circuit, any failure reopens it
//
// Every transition bumps a generation counter. Outcomes reported by calls
// admitted under an older generation are dropped.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of most recent outcomes considered while closed.
    pub sliding_window_size: usize,
    /// Outcomes required in the window before the failure rate is evaluated.
    pub minimum_number_of_calls: usize,
    /// Failure percentage (0-100) at or above which the circuit opens.
    pub failure_rate_threshold: f64,
    /// How long the circuit stays open before allowing trial calls.
    pub wait_duration_in_open_state: Duration,
    /// Trial calls allowed while half-open.
    pub permitted_calls_in_half_open_state: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            sliding_window_size: 5,
            minimum_number_of_calls: 5,
            failure_rate_threshold: 50.0,
            wait_duration_in_open_state: Duration::from_secs(10),
            permitted_calls_in_half_open_state: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failure,
    Ignored,
}

struct BreakerState {
    state: CircuitState,
    /// `true` marks a failure.
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    half_open_in_flight: u32,
    half_open_successes: u32,
    generation: u64,
}

#[derive(Clone)]
pub struct CircuitBreaker {
    name: Arc<str>,
    state: Arc<Mutex<BreakerState>>,
    config: CircuitBreakerConfig,
}

#[derive(Debug)]
pub enum CircuitBreakerError<E> {
    CircuitOpen,
    OperationFailed(E),
}

impl<E: std::fmt::Display> std::fmt::Display for CircuitBreakerError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitBreakerError::CircuitOpen => write!(f, "Circuit breaker is open"),
            CircuitBreakerError::OperationFailed(e) => write!(f, "Operation failed: {e}"),
        }
    }
}

impl<E: std::error::Error> std::error::Error for CircuitBreakerError<E> {}

/// Admission ticket for one call. Dropping it unsettled (for example when the
/// caller's future is cancelled) releases any half-open slot it holds.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    settled: bool,
}

impl Permit<'_> {
    fn settle(mut self, outcome: Outcome) {
        self.settled = true;
        self.breaker.record(self.generation, outcome);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.record(self.generation, Outcome::Ignored);
        }
    }
}

impl CircuitBreaker {
    /// The window holds at least one outcome, and the minimum number of calls
    /// never exceeds the window, so a full window of failures always opens.
    pub fn new(name: impl Into<String>, mut config: CircuitBreakerConfig) -> Self {
        let name: String = name.into();
        config.sliding_window_size = config.sliding_window_size.max(1);
        config.minimum_number_of_calls = config
            .minimum_number_of_calls
            .clamp(1, config.sliding_window_size);
        Self {
            name: Arc::from(name),
            state: Arc::new(Mutex::new(BreakerState {
                state: CircuitState::Closed,
                window: VecDeque::with_capacity(config.sliding_window_size),
                opened_at: None,
                half_open_in_flight: 0,
                half_open_successes: 0,
                generation: 0,
            })),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs an operation under breaker protection, counting every error as a failure.
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        self.call_classified(operation, |_| true).await
    }

    /// Runs an operation under breaker protection.
    ///
    /// Errors for which `is_failure` returns `false` are neither successes nor
    /// failures: they leave the window untouched.
    pub async fn call_classified<F, T, E, C>(
        &self,
        operation: F,
        is_failure: C,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
        C: Fn(&E) -> bool,
    {
        let permit = self.acquire().ok_or(CircuitBreakerError::CircuitOpen)?;

        let result = operation.await;
        let outcome = match &result {
            Ok(_) => Outcome::Success,
            Err(e) if is_failure(e) => Outcome::Failure,
            Err(_) => Outcome::Ignored,
        };
        permit.settle(outcome);

        result.map_err(CircuitBreakerError::OperationFailed)
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Manually close the circuit and clear recorded outcomes.
    pub fn reset(&self) {
        let mut state = self.lock();
        tracing::info!(breaker = %self.name, "circuit breaker manually reset");
        self.transition(&mut state, CircuitState::Closed);
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        // No call ever panics while holding the lock; recover the state if one did.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn acquire(&self) -> Option<Permit<'_>> {
        let mut state = self.lock();

        if state.state == CircuitState::Open {
            let waited = state
                .opened_at
                .is_none_or(|at| at.elapsed() >= self.config.wait_duration_in_open_state);
            if !waited {
                tracing::debug!(breaker = %self.name, "call rejected, circuit open");
                return None;
            }
            self.transition(&mut state, CircuitState::HalfOpen);
        }

        if state.state == CircuitState::HalfOpen {
            let used = state.half_open_in_flight + state.half_open_successes;
            if used >= self.config.permitted_calls_in_half_open_state {
                tracing::debug!(breaker = %self.name, "call rejected, half-open trials exhausted");
                return None;
            }
            state.half_open_in_flight += 1;
        }

        Some(Permit {
            breaker: self,
            generation: state.generation,
            settled: false,
        })
    }

    fn record(&self, generation: u64, outcome: Outcome) {
        let mut state = self.lock();
        if state.generation != generation {
            return;
        }

        match state.state {
            CircuitState::Closed => {
                if outcome == Outcome::Ignored {
                    return;
                }
                state.window.push_back(outcome == Outcome::Failure);
                while state.window.len() > self.config.sliding_window_size {
                    state.window.pop_front();
                }

                if state.window.len() >= self.config.minimum_number_of_calls {
                    let failures = state.window.iter().filter(|failed| **failed).count();
                    let rate = failures as f64 * 100.0 / state.window.len() as f64;
                    if rate >= self.config.failure_rate_threshold {
                        tracing::warn!(
                            breaker = %self.name,
                            failure_rate = rate,
                            calls = state.window.len(),
                            "circuit breaker opening"
                        );
                        self.transition(&mut state, CircuitState::Open);
                    }
                }
            }
            CircuitState::HalfOpen => {
                state.half_open_in_flight = state.half_open_in_flight.saturating_sub(1);
                match outcome {
                    Outcome::Success => {
                        state.half_open_successes += 1;
                        if state.half_open_successes
                            >= self.config.permitted_calls_in_half_open_state
                        {
                            tracing::info!(
                                breaker = %self.name,
                                successes = state.half_open_successes,
                                "circuit breaker closing"
                            );
                            self.transition(&mut state, CircuitState::Closed);
                        }
                    }
                    Outcome::Failure => {
                        tracing::warn!(breaker = %self.name, "failure during half-open, reopening circuit");
                        self.transition(&mut state, CircuitState::Open);
                    }
                    Outcome::Ignored => {}
                }
            }
            CircuitState::Open => {}
        }
    }

    fn transition(&self, state: &mut BreakerState, to: CircuitState) {
        if state.state != to {
            tracing::info!(breaker = %self.name, from = %state.state, to = %to, "circuit breaker transition");
            metrics::counter!(
                "circuit_breaker_transitions_total",
                "name" => self.name.to_string(),
                "to" => to.as_str()
            )
            .increment(1);
        }

        state.state = to;
        state.generation += 1;
        state.window.clear();
        state.half_open_in_flight = 0;
        state.half_open_successes = 0;
        state.opened_at = (to == CircuitState::Open).then(Instant::now);
    }
}
