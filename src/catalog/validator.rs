use std::sync::Arc;
use tracing::{info, warn};

use super::client::{CatalogClient, CatalogError};
use crate::models::LineItem;
use crate::resilience::{CircuitBreaker, CircuitBreakerError};

/// Result of validating one line item against the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemCheck {
    /// Item exists and can be ordered
    Confirmed,
    /// Item exists but is currently not available
    Unavailable,
    NotFound,
    /// Catalog was not consulted or did not answer in time
    Skipped { reason: String },
}

impl ItemCheck {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// Breaker-guarded catalog validation used during order placement
pub struct MenuValidator {
    client: Option<Arc<dyn CatalogClient>>,
    breaker: Arc<CircuitBreaker>,
}

impl MenuValidator {
    pub fn new(client: Arc<dyn CatalogClient>, breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            client: Some(client),
            breaker,
        }
    }

    /// Validator that never calls the catalog
    pub fn disabled(breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            client: None,
            breaker,
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Check one item. Never fails: dependency errors become [`ItemCheck::Skipped`]
    pub async fn check_item(&self, item_id: &str) -> ItemCheck {
        let Some(client) = &self.client else {
            return ItemCheck::Skipped {
                reason: "catalog validation disabled".to_string(),
            };
        };

        self.breaker
            .call_with_fallback(
                || async {
                    client.lookup(item_id).await.map(|found| match found {
                        Some(item) if item.available => ItemCheck::Confirmed,
                        Some(_) => ItemCheck::Unavailable,
                        None => ItemCheck::NotFound,
                    })
                },
                |err: CircuitBreakerError<CatalogError>| ItemCheck::Skipped {
                    reason: err.to_string(),
                },
            )
            .await
    }

    /// Check every item in order and log each outcome; no outcome aborts placement
    pub async fn check_items(&self, items: &[LineItem]) -> Vec<(String, ItemCheck)> {
        let mut checks = Vec::with_capacity(items.len());
        for item in items {
            let check = self.check_item(&item.id).await;
            match &check {
                ItemCheck::Confirmed => {}
                ItemCheck::Unavailable => {
                    warn!(
                        item_id = %item.id,
                        "⚠️ Menu item is not available, accepting order anyway"
                    )
                }
                ItemCheck::NotFound => {
                    warn!(
                        item_id = %item.id,
                        "⚠️ Menu item unknown to catalog, accepting order anyway"
                    )
                }
                ItemCheck::Skipped { reason } => {
                    info!(
                        item_id = %item.id,
                        reason = %reason,
                        breaker_state = %self.breaker.state(),
                        "↩️ Menu validation skipped"
                    )
                }
            }
            checks.push((item.id.clone(), check));
        }
        checks
    }
}
