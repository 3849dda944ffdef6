//! # Resilience Module
//!
//! Circuit breaker guarding synchronous dependencies so a flaky collaborator degrades into
//! a fallback instead of cascading into unavailability.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use order_pipeline::resilience::{CircuitBreaker, CircuitBreakerConfig};
//!
//! # async fn example() {
//! let breaker = CircuitBreaker::new("menu_service", CircuitBreakerConfig::default());
//!
//! let available = breaker
//!     .call_with_fallback(
//!         || async { Ok::<bool, String>(true) },
//!         |_err| true,
//!     )
//!     .await;
//! # }
//! ```

pub mod circuit_breaker;
pub mod config;
pub mod metrics;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitState};
pub use config::{CircuitBreakerConfig, CircuitBreakerSettings};
pub use metrics::CircuitBreakerMetrics;
