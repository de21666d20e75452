//! Resilience policies for calls to downstream dependencies.
//!
//! A [`ResilientCaller`] composes, outer to inner:
//! circuit breaker → retry → per-attempt timeout → the wrapped call.
//! Policies are plain values built once per dependency; nothing here knows
//! whether the dependency it guards is critical to its caller.

pub mod circuit_breaker;
pub mod policy;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};
pub use policy::{PolicyError, ResiliencePolicy, ResilientCaller};
pub use retry::{Backoff, IsTransient, RetryConfig, RetryResult, retry_on_transient};
