use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::CatalogSettings;

/// Menu item as reported by the catalog service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Invalid catalog base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Catalog request failed: {0}")]
    Request(String),

    #[error("Catalog answered HTTP {status}")]
    UnexpectedStatus { status: u16 },

    #[error("Failed to parse catalog response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// `Ok(None)` when the catalog does not know the item
    async fn lookup(&self, item_id: &str) -> Result<Option<MenuItem>, CatalogError>;
}

/// Catalog client speaking `GET {base_url}/menu-items/{itemId}`
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    client: Client,
    base_url: Url,
}

impl HttpCatalogClient {
    /// `timeout` should match the breaker timeout so abandoned requests do not linger
    pub fn new(settings: &CatalogSettings, timeout: Duration) -> Result<Self, CatalogError> {
        let mut raw = settings.base_url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url = Url::parse(&raw).map_err(|e| CatalogError::InvalidBaseUrl {
            url: settings.base_url.clone(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("order-pipeline/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CatalogError::Request(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    fn item_url(&self, item_id: &str) -> Result<Url, CatalogError> {
        let mut url = self.base_url.join("menu-items/").map_err(|e| {
            CatalogError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            }
        })?;
        url.path_segments_mut()
            .map_err(|_| CatalogError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "base URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .push(item_id);
        Ok(url)
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn lookup(&self, item_id: &str) -> Result<Option<MenuItem>, CatalogError> {
        let url = self.item_url(item_id)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CatalogError::Request(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(item_id, "Catalog does not know item");
                Ok(None)
            }
            status if status.is_success() => response
                .json::<MenuItem>()
                .await
                .map(Some)
                .map_err(|e| CatalogError::Decode(e.to_string())),
            status => Err(CatalogError::UnexpectedStatus {
                status: status.as_u16(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_url_building() {
        let settings = CatalogSettings {
            base_url: "http://catalog.local:3002/api".to_string(),
            enabled: true,
        };
        let client = HttpCatalogClient::new(&settings, Duration::from_millis(100)).unwrap();

        assert_eq!(
            client.item_url("i1").unwrap().as_str(),
            "http://catalog.local:3002/api/menu-items/i1"
        );
        // Ids are path-encoded
        assert_eq!(
            client.item_url("a/b").unwrap().as_str(),
            "http://catalog.local:3002/api/menu-items/a%2Fb"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let settings = CatalogSettings {
            base_url: "not a url".to_string(),
            enabled: true,
        };
        assert!(matches!(
            HttpCatalogClient::new(&settings, Duration::from_millis(100)),
            Err(CatalogError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_menu_item_defaults_to_available() {
        let item: MenuItem = serde_json::from_str(r#"{"id":"i1"}"#).unwrap();
        assert!(item.available);
        assert!(item.name.is_none());
    }
}
