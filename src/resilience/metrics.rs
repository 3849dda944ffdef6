use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::circuit_breaker::CircuitState;

/// Counters for a single circuit breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerMetrics {
    /// Calls requested through the breaker, including rejected ones
    pub fires: u64,
    pub successes: u64,
    pub failures: u64,
    pub timeouts: u64,
    /// Calls short-circuited while open or while half-open slots were taken
    pub rejects: u64,
    pub fallbacks: u64,
    pub current_state: CircuitState,
    /// Failure rate over the current rolling window
    pub window_failure_rate: f64,
    pub window_calls: usize,
    #[serde(skip)]
    pub total_duration: Duration,
    pub average_duration_ms: u64,
}

impl CircuitBreakerMetrics {
    pub fn new() -> Self {
        Self {
            fires: 0,
            successes: 0,
            failures: 0,
            timeouts: 0,
            rejects: 0,
            fallbacks: 0,
            current_state: CircuitState::Closed,
            window_failure_rate: 0.0,
            window_calls: 0,
            total_duration: Duration::ZERO,
            average_duration_ms: 0,
        }
    }

    /// Calls that actually reached the dependency
    pub fn executed_calls(&self) -> u64 {
        self.successes + self.failures
    }
}

impl Default for CircuitBreakerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
