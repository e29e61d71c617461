//! Shopify driver: `POST /admin/api/<version>/inventory_levels/set.json`
//! with `{location_id, inventory_item_id, available}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, instrument};

use super::{ChannelDriver, PushRequest};
use crate::entities::channel::ChannelType;
use crate::errors::{ServiceError, ServiceResult};

const DEFAULT_API_VERSION: &str = "2024-01";

pub struct ShopifyDriver {
    http: Client,
}

impl ShopifyDriver {
    pub fn new(push_timeout: Duration) -> ServiceResult<Self> {
        let http = Client::builder()
            .timeout(push_timeout)
            .build()
            .map_err(|e| ServiceError::Internal(format!("http client: {e}")))?;
        Ok(Self { http })
    }

    /// Per-channel connection settings live in the channel's config JSON:
    /// `{"base_url": "...", "access_token": "...", "api_version": "..."}`.
    fn channel_settings(request: &PushRequest) -> ServiceResult<(String, String, String)> {
        let config = request
            .channel
            .config
            .as_ref()
            .ok_or_else(|| ServiceError::Validation("shopify channel has no config".into()))?;
        let base_url = config
            .get("base_url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ServiceError::Validation("shopify config is missing base_url".into()))?
            .trim_end_matches('/')
            .to_string();
        let token = config
            .get("access_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ServiceError::Validation("shopify config is missing access_token".into())
            })?
            .to_string();
        let version = config
            .get("api_version")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_API_VERSION)
            .to_string();
        Ok((base_url, token, version))
    }
}

#[async_trait]
impl ChannelDriver for ShopifyDriver {
    fn driver_type(&self) -> ChannelType {
        ChannelType::Shopify
    }

    #[instrument(skip(self, request), fields(feed_id = %request.feed.id, qty = request.qty))]
    async fn push_inventory(&self, request: &PushRequest) -> ServiceResult<()> {
        let (base_url, token, version) = Self::channel_settings(request)?;

        let location_ref = request
            .external_location_ref
            .clone()
            .or_else(|| request.channel.default_external_location_ref.clone())
            .ok_or_else(|| {
                ServiceError::Validation("no external location to push against".into())
            })?;
        let inventory_item_ref = request
            .feed
            .external_inventory_item_ref
            .clone()
            .unwrap_or_else(|| request.feed.external_variant_ref.clone());

        // Shopify ids are numeric; fall back to strings for test doubles.
        let as_id = |s: &str| -> serde_json::Value {
            s.parse::<i64>()
                .map(serde_json::Value::from)
                .unwrap_or_else(|_| serde_json::Value::from(s))
        };

        let url = format!("{base_url}/admin/api/{version}/inventory_levels/set.json");
        let body = json!({
            "location_id": as_id(&location_ref),
            "inventory_item_id": as_id(&inventory_item_ref),
            "available": request.qty,
        });
        debug!(%url, "pushing inventory level");

        let response = self
            .http
            .post(&url)
            .header("X-Shopify-Access-Token", token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::External(format!("shopify push failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ServiceError::External(format!(
                "shopify push returned {status}: {text}"
            )));
        }
        Ok(())
    }
}
