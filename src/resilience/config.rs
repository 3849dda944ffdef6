use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Circuit breaker thresholds and timings
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Upper bound on a single guarded call
    pub timeout: Duration,
    /// Failure percentage over the window at which the circuit opens
    pub error_threshold_percentage: f64,
    /// Number of most recent outcomes considered
    pub rolling_window_size: usize,
    /// Outcomes required in the window before the percentage is evaluated
    pub minimum_calls: usize,
    /// Cooldown spent open before trial calls are allowed
    pub reset_timeout: Duration,
    /// Concurrent trial calls allowed while half-open
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(3000),
            error_threshold_percentage: 50.0,
            rolling_window_size: 10,
            minimum_calls: 1,
            reset_timeout: Duration::from_millis(10_000),
            half_open_max_calls: 1,
        }
    }
}

/// Serializable form used by the configuration files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub timeout_ms: u64,
    pub error_threshold_percentage: f64,
    pub rolling_window_size: usize,
    pub minimum_calls: usize,
    pub reset_timeout_ms: u64,
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        let defaults = CircuitBreakerConfig::default();
        Self {
            timeout_ms: defaults.timeout.as_millis() as u64,
            error_threshold_percentage: defaults.error_threshold_percentage,
            rolling_window_size: defaults.rolling_window_size,
            minimum_calls: defaults.minimum_calls,
            reset_timeout_ms: defaults.reset_timeout.as_millis() as u64,
            half_open_max_calls: defaults.half_open_max_calls,
        }
    }
}

impl From<&CircuitBreakerSettings> for CircuitBreakerConfig {
    fn from(settings: &CircuitBreakerSettings) -> Self {
        Self {
            timeout: Duration::from_millis(settings.timeout_ms),
            error_threshold_percentage: settings.error_threshold_percentage,
            rolling_window_size: settings.rolling_window_size,
            minimum_calls: settings.minimum_calls,
            reset_timeout: Duration::from_millis(settings.reset_timeout_ms),
            half_open_max_calls: settings.half_open_max_calls,
        }
    }
}
