//! Shopify driver wire format, verified against a mock HTTP server.

use std::time::Duration;

use assert_matches::assert_matches;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wms_api::channels::shopify::ShopifyDriver;
use wms_api::channels::{ChannelDriver, PushRequest};
use wms_api::entities::channel::{self, ChannelType};
use wms_api::entities::channel_feed;
use wms_api::errors::ServiceError;

fn push_request(base_url: &str, qty: i64) -> PushRequest {
    let now = Utc::now();
    PushRequest {
        channel: channel::Model {
            id: Uuid::new_v4(),
            name: "shop".to_string(),
            channel_type: ChannelType::Shopify,
            is_active: true,
            default_external_location_ref: Some("8001".to_string()),
            config: Some(json!({
                "base_url": base_url,
                "access_token": "shpat_test",
            })),
            created_at: now,
            updated_at: now,
        },
        feed: channel_feed::Model {
            id: Uuid::new_v4(),
            channel_id: Uuid::new_v4(),
            variant_id: Uuid::new_v4(),
            external_variant_ref: "9002".to_string(),
            external_inventory_item_ref: Some("9003".to_string()),
            last_synced_qty: None,
            last_synced_at: None,
            last_error: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        },
        external_location_ref: Some("8001".to_string()),
        qty,
    }
}

#[tokio::test]
async fn pushes_inventory_levels_set_with_numeric_ids() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/api/2024-01/inventory_levels/set.json"))
        .and(header("X-Shopify-Access-Token", "shpat_test"))
        .and(body_json(json!({
            "location_id": 8001,
            "inventory_item_id": 9003,
            "available": 17,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "inventory_level": { "available": 17 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let driver = ShopifyDriver::new(Duration::from_secs(5)).unwrap();
    driver
        .push_inventory(&push_request(&server.uri(), 17))
        .await
        .expect("push should succeed");
}

#[tokio::test]
async fn provider_errors_surface_as_external() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let driver = ShopifyDriver::new(Duration::from_secs(5)).unwrap();
    let err = driver
        .push_inventory(&push_request(&server.uri(), 1))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::External(_));
}

#[tokio::test]
async fn missing_config_is_a_validation_error() {
    let driver = ShopifyDriver::new(Duration::from_secs(5)).unwrap();
    let mut request = push_request("http://unused", 1);
    request.channel.config = None;
    let err = driver.push_inventory(&request).await.unwrap_err();
    assert_matches!(err, ServiceError::Validation(_));
}
