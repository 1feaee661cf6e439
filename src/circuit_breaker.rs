//! # Circuit Breaker Module
//!
//! This module implements the circuit breaker pattern for outbound service
//! calls. Each external service gets its own breaker so a dead geocoder does
//! not take the send API down with it.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::RecoveryConfig;

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

/// Circuit breaker for one external service
///
/// # State Machine
///
/// - **Closed**: Normal operation, requests pass through
/// - **Open**: Failure threshold exceeded, requests fail fast
/// - **Half-Open**: Reset time elapsed, the next request is let through
///
/// # Configuration
///
/// Uses `RecoveryConfig` for:
/// - `circuit_breaker_threshold`: Failures before opening (default: 5)
/// - `circuit_breaker_reset_secs`: Time before attempting reset (default: 60s)
#[derive(Debug)]
pub struct CircuitBreaker {
    service: &'static str,
    state: Mutex<BreakerState>,
    threshold: u32,
    reset_after: Duration,
}

impl CircuitBreaker {
    /// Create a new circuit breaker for `service`
    ///
    /// ```rust
    /// use jimbot::config::RecoveryConfig;
    /// use jimbot::circuit_breaker::CircuitBreaker;
    ///
    /// let breaker = CircuitBreaker::new("geocoding", &RecoveryConfig::default());
    /// assert!(!breaker.is_open());
    /// ```
    pub fn new(service: &'static str, config: &RecoveryConfig) -> Self {
        Self {
            service,
            state: Mutex::new(BreakerState::default()),
            threshold: config.circuit_breaker_threshold.max(1),
            reset_after: Duration::from_secs(config.circuit_breaker_reset_secs),
        }
    }

    /// Check if the circuit is open (blocking requests)
    ///
    /// Returns `true` while the failure count is at or above the threshold and
    /// the reset time hasn't elapsed. Once it has, the count is cleared and the
    /// caller is allowed through.
    pub fn is_open(&self) -> bool {
        let mut state = self.lock();
        if state.failure_count < self.threshold {
            return false;
        }
        match state.last_failure_time {
            Some(last) if last.elapsed() < self.reset_after => true,
            _ => {
                tracing::info!(service = self.service, "Circuit breaker half-open, letting a request through");
                *state = BreakerState::default();
                false
            }
        }
    }

    /// Record a failed call
    pub fn record_failure(&self) {
        let mut state = self.lock();
        state.failure_count = state.failure_count.saturating_add(1);
        state.last_failure_time = Some(Instant::now());
        if state.failure_count == self.threshold {
            tracing::warn!(
                service = self.service,
                failures = state.failure_count,
                "Circuit breaker opened"
            );
        }
    }

    /// Record a successful call, closing the circuit
    pub fn record_success(&self) {
        *self.lock() = BreakerState::default();
    }

    // A poisoned lock only means another task panicked mid-update; the
    // counters are still usable.
    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
