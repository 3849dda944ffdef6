//! # Circuit Breaker Implementation
//!
//! Provides fault isolation for a synchronous dependency. Three states: Closed (normal
//! operation), Open (failing fast to a fallback) and Half-Open (probing recovery with a
//! bounded number of trial calls). Outcomes are tracked in a rolling window of the most
//! recent calls and the circuit opens once the window's failure percentage exceeds the
//! configured threshold.

use crate::resilience::{CircuitBreakerConfig, CircuitBreakerMetrics};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed = 0,
    /// Failure mode - all calls fail fast without executing
    Open = 1,
    /// Testing recovery - limited calls allowed to test system health
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Open,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Errors that can occur during circuit breaker operation
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open, rejecting all calls
    #[error("Circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    /// Operation exceeded the per-call timeout
    #[error("Operation timed out after {timeout_ms}ms in {component}")]
    Timeout { component: String, timeout_ms: u64 },

    /// Operation failed and was recorded
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

impl<E> CircuitBreakerError<E> {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CircuitOpen { .. } => "circuit_open",
            Self::Timeout { .. } => "timeout",
            Self::OperationFailed(_) => "operation_failed",
        }
    }
}

/// Mutable breaker bookkeeping, guarded by a single mutex
#[derive(Debug)]
struct BreakerWindow {
    /// `true` marks a failed outcome
    outcomes: VecDeque<bool>,
    opened_at: Option<Instant>,
    half_open_in_flight: u32,
    metrics: CircuitBreakerMetrics,
}

impl BreakerWindow {
    fn failure_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        let failures = self.outcomes.iter().filter(|failed| **failed).count();
        failures as f64 / self.outcomes.len() as f64
    }
}

/// Core circuit breaker implementation with atomic state management
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Component name for logging and metrics
    name: String,

    /// Current circuit state, readable without taking the lock
    state: AtomicU8,

    config: CircuitBreakerConfig,

    /// Window, timestamps and counters; every state transition happens under this lock
    inner: Mutex<BreakerWindow>,
}

/// Admission ticket for one call; releases its half-open slot if the call is abandoned
struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if self.trial && !self.settled {
            let mut inner = self.breaker.inner.lock();
            inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
        }
    }
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given name and configuration
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        info!(
            component = %name,
            timeout_ms = config.timeout.as_millis() as u64,
            error_threshold_percentage = config.error_threshold_percentage,
            rolling_window_size = config.rolling_window_size,
            reset_timeout_ms = config.reset_timeout.as_millis() as u64,
            "🛡️ Circuit breaker initialized"
        );

        Self {
            name,
            state: AtomicU8::new(CircuitState::Closed as u8),
            inner: Mutex::new(BreakerWindow {
                outcomes: VecDeque::with_capacity(config.rolling_window_size),
                opened_at: None,
                half_open_in_flight: 0,
                metrics: CircuitBreakerMetrics::new(),
            }),
            config,
        }
    }

    /// Get current circuit state
    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Execute an operation with circuit breaker protection and the configured timeout
    pub async fn call<F, T, E, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(mut permit) = self.try_acquire() else {
            return Err(CircuitBreakerError::CircuitOpen {
                component: self.name.clone(),
            });
        };

        let start_time = Instant::now();
        let outcome = tokio::time::timeout(self.config.timeout, operation()).await;
        let duration = start_time.elapsed();

        permit.settled = true;
        match outcome {
            Ok(Ok(value)) => {
                self.record_success(permit.trial, duration);
                Ok(value)
            }
            Ok(Err(err)) => {
                self.record_failure(permit.trial, duration, false);
                Err(CircuitBreakerError::OperationFailed(err))
            }
            Err(_) => {
                self.record_failure(permit.trial, duration, true);
                Err(CircuitBreakerError::Timeout {
                    component: self.name.clone(),
                    timeout_ms: self.config.timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Execute an operation, substituting `fallback` for any timeout, failure or rejection
    pub async fn call_with_fallback<F, T, E, Fut, FB>(&self, operation: F, fallback: FB) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        FB: FnOnce(CircuitBreakerError<E>) -> T,
    {
        match self.call(operation).await {
            Ok(value) => value,
            Err(err) => {
                self.inner.lock().metrics.fallbacks += 1;
                debug!(
                    component = %self.name,
                    reason = err.kind(),
                    "↩️ Using circuit breaker fallback"
                );
                fallback(err)
            }
        }
    }

    fn try_acquire(&self) -> Option<CallPermit<'_>> {
        let mut inner = self.inner.lock();
        inner.metrics.fires += 1;

        let trial = match self.state() {
            CircuitState::Closed => false,
            CircuitState::Open => {
                let cooled_down = inner
                    .opened_at
                    .map_or(true, |opened| opened.elapsed() >= self.config.reset_timeout);
                if !cooled_down {
                    inner.metrics.rejects += 1;
                    return None;
                }
                self.transition_to_half_open(&mut inner);
                inner.half_open_in_flight += 1;
                true
            }
            CircuitState::HalfOpen => {
                if inner.half_open_in_flight >= self.config.half_open_max_calls {
                    inner.metrics.rejects += 1;
                    return None;
                }
                inner.half_open_in_flight += 1;
                true
            }
        };

        Some(CallPermit {
            breaker: self,
            trial,
            settled: false,
        })
    }

    /// Record a successful operation
    fn record_success(&self, trial: bool, duration: Duration) {
        let mut inner = self.inner.lock();
        inner.metrics.successes += 1;
        inner.metrics.total_duration += duration;
        if trial {
            inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
        }

        debug!(
            component = %self.name,
            duration_ms = duration.as_millis() as u64,
            "🟢 Operation succeeded"
        );

        match self.state() {
            CircuitState::HalfOpen if trial => self.transition_to_closed(&mut inner),
            CircuitState::Closed => self.push_outcome(&mut inner, false),
            _ => {}
        }
    }

    /// Record a failed or timed out operation
    fn record_failure(&self, trial: bool, duration: Duration, timed_out: bool) {
        let mut inner = self.inner.lock();
        inner.metrics.failures += 1;
        inner.metrics.total_duration += duration;
        if timed_out {
            inner.metrics.timeouts += 1;
        }
        if trial {
            inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
        }

        warn!(
            component = %self.name,
            duration_ms = duration.as_millis() as u64,
            timed_out,
            "🔴 Operation failed"
        );

        match self.state() {
            CircuitState::Closed => {
                self.push_outcome(&mut inner, true);
                let failure_percentage = inner.failure_rate() * 100.0;
                if inner.outcomes.len() >= self.config.minimum_calls
                    && failure_percentage > self.config.error_threshold_percentage
                {
                    self.transition_to_open(&mut inner);
                }
            }
            // Any trial failure immediately reopens the circuit
            CircuitState::HalfOpen if trial => self.transition_to_open(&mut inner),
            _ => {}
        }
    }

    fn push_outcome(&self, inner: &mut BreakerWindow, failed: bool) {
        if inner.outcomes.len() == self.config.rolling_window_size.max(1) {
            inner.outcomes.pop_front();
        }
        inner.outcomes.push_back(failed);
    }

    /// Transition to closed state (normal operation)
    fn transition_to_closed(&self, inner: &mut BreakerWindow) {
        self.state.store(CircuitState::Closed as u8, Ordering::Release);
        inner.outcomes.clear();
        inner.opened_at = None;
        inner.half_open_in_flight = 0;

        info!(
            component = %self.name,
            successes = inner.metrics.successes,
            "🟢 Circuit breaker closed (recovered)"
        );
    }

    /// Transition to open state (failing fast)
    fn transition_to_open(&self, inner: &mut BreakerWindow) {
        self.state.store(CircuitState::Open as u8, Ordering::Release);
        inner.opened_at = Some(Instant::now());
        inner.half_open_in_flight = 0;

        error!(
            component = %self.name,
            window_failure_rate = inner.failure_rate(),
            error_threshold_percentage = self.config.error_threshold_percentage,
            reset_timeout_ms = self.config.reset_timeout.as_millis() as u64,
            "🔴 Circuit breaker opened (failing fast)"
        );
    }

    /// Transition to half-open state (testing recovery)
    fn transition_to_half_open(&self, inner: &mut BreakerWindow) {
        self.state.store(CircuitState::HalfOpen as u8, Ordering::Release);
        inner.half_open_in_flight = 0;

        info!(
            component = %self.name,
            half_open_max_calls = self.config.half_open_max_calls,
            "🟡 Circuit breaker half-open (testing recovery)"
        );
    }

    /// Force circuit to open state (for emergency situations)
    pub fn force_open(&self) {
        warn!(component = %self.name, "🚨 Circuit breaker forced open");
        let mut inner = self.inner.lock();
        self.transition_to_open(&mut inner);
    }

    /// Force circuit to closed state (for emergency recovery)
    pub fn force_closed(&self) {
        warn!(component = %self.name, "🚨 Circuit breaker forced closed");
        let mut inner = self.inner.lock();
        self.transition_to_closed(&mut inner);
    }

    /// Get current metrics snapshot
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.inner.lock();
        let mut snapshot = inner.metrics.clone();

        snapshot.current_state = self.state();
        snapshot.window_failure_rate = inner.failure_rate();
        snapshot.window_calls = inner.outcomes.len();

        let executed = snapshot.executed_calls();
        if executed > 0 {
            snapshot.average_duration_ms =
                (snapshot.total_duration.as_millis() / executed as u128) as u64;
        }

        snapshot
    }

    /// Get component name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if circuit is healthy (closed with a window failure rate under the threshold)
    pub fn is_healthy(&self) -> bool {
        if self.state() != CircuitState::Closed {
            return false;
        }
        let inner = self.inner.lock();
        inner.failure_rate() * 100.0 < self.config.error_threshold_percentage
    }
}
