//! Channel sync: one-way ATP projection to marketplaces.
//!
//! Pushes never run inside an inventory transaction; the ledger emits an
//! event after commit and the sync loop reacts to it. Per-feed failures
//! are recorded on the feed row and never abort a batch.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::Serialize;
use tokio::time::sleep;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::channels::{DriverRegistry, PushRequest};
use crate::config::ChannelSyncConfig;
use crate::entities::channel::{self, ChannelType};
use crate::entities::channel_feed;
use crate::entities::product_variant;
use crate::errors::{ServiceError, ServiceResult};
use crate::services::inventory::InventoryService;

#[derive(Debug, Clone, Serialize)]
pub struct FeedSyncOutcome {
    pub feed_id: Uuid,
    pub channel_id: Uuid,
    pub variant_id: Uuid,
    pub pushed_qty: Option<i64>,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct ChannelSyncService {
    db: Arc<DatabaseConnection>,
    inventory: InventoryService,
    registry: Arc<DriverRegistry>,
    config: ChannelSyncConfig,
}

impl ChannelSyncService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        inventory: InventoryService,
        registry: Arc<DriverRegistry>,
        config: ChannelSyncConfig,
    ) -> Self {
        Self {
            db,
            inventory,
            registry,
            config,
        }
    }

    // ------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------

    /// Push the product's ATP to every active feed on any of its
    /// variants. Returns one outcome per feed; errors are per-feed.
    #[instrument(skip(self))]
    pub async fn sync_product(&self, product_id: Uuid) -> ServiceResult<Vec<FeedSyncOutcome>> {
        self.sync_product_scoped(product_id, None).await
    }

    /// Sweep every product owning an active feed, spacing pushes to
    /// respect provider rate limits.
    #[instrument(skip(self))]
    pub async fn sync_all_products(&self) -> ServiceResult<Vec<FeedSyncOutcome>> {
        let product_ids = self.products_with_feeds(None).await?;
        let mut outcomes = Vec::new();
        for (idx, product_id) in product_ids.iter().enumerate() {
            if idx > 0 && self.config.push_delay_ms > 0 {
                sleep(Duration::from_millis(self.config.push_delay_ms)).await;
            }
            match self.sync_product(*product_id).await {
                Ok(mut batch) => outcomes.append(&mut batch),
                Err(e) => warn!(%product_id, "product sync failed: {e}"),
            }
        }
        info!(products = product_ids.len(), "full channel sweep finished");
        Ok(outcomes)
    }

    /// Sweep restricted to one channel.
    #[instrument(skip(self))]
    pub async fn sync_channel(&self, channel_id: Uuid) -> ServiceResult<Vec<FeedSyncOutcome>> {
        let channel = channel::Entity::find_by_id(channel_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("channel {channel_id} not found")))?;
        if !channel.is_active {
            return Err(ServiceError::Validation(format!(
                "channel {} is inactive",
                channel.name
            )));
        }

        let product_ids = self.products_with_feeds(Some(channel_id)).await?;
        let mut outcomes = Vec::new();
        for (idx, product_id) in product_ids.iter().enumerate() {
            if idx > 0 && self.config.push_delay_ms > 0 {
                sleep(Duration::from_millis(self.config.push_delay_ms)).await;
            }
            match self.sync_product_scoped(*product_id, Some(channel_id)).await {
                Ok(mut batch) => outcomes.append(&mut batch),
                Err(e) => warn!(%product_id, "product sync failed: {e}"),
            }
        }
        Ok(outcomes)
    }

    /// Reactive trigger invoked after every committed ledger mutation.
    /// A variant without active feeds is a no-op.
    #[instrument(skip(self))]
    pub async fn queue_sync_after_inventory_change(&self, variant_id: Uuid) -> ServiceResult<()> {
        let has_feed = channel_feed::Entity::find()
            .filter(channel_feed::Column::VariantId.eq(variant_id))
            .filter(channel_feed::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .is_some();
        if !has_feed {
            return Ok(());
        }
        let variant = product_variant::Entity::find_by_id(variant_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("variant {variant_id} not found")))?;
        self.sync_product(variant.product_id).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Core
    // ------------------------------------------------------------------

    async fn sync_product_scoped(
        &self,
        product_id: Uuid,
        channel_scope: Option<Uuid>,
    ) -> ServiceResult<Vec<FeedSyncOutcome>> {
        let atp = self.inventory.atp_for_product(product_id).await?;
        let variant_ids: Vec<Uuid> = atp.variants.iter().map(|v| v.variant_id).collect();

        let mut feed_query = channel_feed::Entity::find()
            .filter(channel_feed::Column::VariantId.is_in(variant_ids))
            .filter(channel_feed::Column::IsActive.eq(true));
        if let Some(channel_id) = channel_scope {
            feed_query = feed_query.filter(channel_feed::Column::ChannelId.eq(channel_id));
        }
        let feeds = feed_query
            .find_also_related(channel::Entity)
            .all(&*self.db)
            .await?;

        // Warehouses with an external mapping get location-level pushes;
        // otherwise one aggregate push per feed.
        let mapped_warehouses = self.inventory.externally_mapped_warehouses().await?;

        let mut outcomes = Vec::new();
        for (feed, channel) in feeds {
            let channel = match channel {
                Some(c) if c.is_active => c,
                _ => continue,
            };
            let projection = atp
                .variants
                .iter()
                .find(|v| v.variant_id == feed.variant_id)
                .ok_or_else(|| ServiceError::Internal("feed variant missing from ATP".into()))?;

            let outcome = self
                .push_feed(&feed, &channel, projection.units_per_variant, &mapped_warehouses, atp.atp_base)
                .await;
            outcomes.push(self.record_outcome(feed, &channel, outcome).await?);
        }
        Ok(outcomes)
    }

    async fn push_feed(
        &self,
        feed: &channel_feed::Model,
        channel: &channel::Model,
        units_per_variant: i64,
        mapped_warehouses: &[crate::entities::warehouse::Model],
        aggregate_atp_base: i64,
    ) -> ServiceResult<i64> {
        let driver = self
            .registry
            .get(channel.channel_type)
            .ok_or_else(|| {
                ServiceError::External(format!(
                    "no driver registered for channel type {}",
                    channel.channel_type
                ))
            })?;

        if mapped_warehouses.is_empty() {
            let qty = aggregate_atp_base / units_per_variant;
            driver
                .push_inventory(&PushRequest {
                    channel: channel.clone(),
                    feed: feed.clone(),
                    external_location_ref: self
                        .config
                        .default_external_location_ref
                        .clone()
                        .or_else(|| channel.default_external_location_ref.clone()),
                    qty,
                })
                .await?;
            counter!("wms_channel_sync.push", 1, "channel" => channel.channel_type.to_string());
            return Ok(qty);
        }

        for warehouse in mapped_warehouses {
            let atp_base = self
                .inventory
                .atp_base_for_variant(feed.variant_id, warehouse.id)
                .await?;
            let qty = atp_base / units_per_variant;
            driver
                .push_inventory(&PushRequest {
                    channel: channel.clone(),
                    feed: feed.clone(),
                    external_location_ref: warehouse.external_location_ref.clone(),
                    qty,
                })
                .await?;
            counter!("wms_channel_sync.push", 1, "channel" => channel.channel_type.to_string());
        }
        Ok(aggregate_atp_base / units_per_variant)
    }

    async fn record_outcome(
        &self,
        feed: channel_feed::Model,
        channel: &channel::Model,
        outcome: ServiceResult<i64>,
    ) -> ServiceResult<FeedSyncOutcome> {
        let feed_id = feed.id;
        let variant_id = feed.variant_id;
        let mut active: channel_feed::ActiveModel = feed.into();
        let result = match outcome {
            Ok(qty) => {
                active.last_synced_qty = Set(Some(qty));
                active.last_synced_at = Set(Some(Utc::now()));
                active.last_error = Set(None);
                FeedSyncOutcome {
                    feed_id,
                    channel_id: channel.id,
                    variant_id,
                    pushed_qty: Some(qty),
                    error: None,
                }
            }
            Err(e) => {
                warn!(%feed_id, "feed push failed: {e}");
                counter!("wms_channel_sync.push_error", 1, "channel" => channel.channel_type.to_string());
                active.last_error = Set(Some(e.to_string()));
                FeedSyncOutcome {
                    feed_id,
                    channel_id: channel.id,
                    variant_id,
                    pushed_qty: None,
                    error: Some(e.to_string()),
                }
            }
        };
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;
        Ok(result)
    }

    async fn products_with_feeds(&self, channel_scope: Option<Uuid>) -> ServiceResult<Vec<Uuid>> {
        let mut query = channel_feed::Entity::find()
            .filter(channel_feed::Column::IsActive.eq(true));
        if let Some(channel_id) = channel_scope {
            query = query.filter(channel_feed::Column::ChannelId.eq(channel_id));
        }
        let feeds = query.all(&*self.db).await?;
        let variant_ids: Vec<Uuid> = feeds.iter().map(|f| f.variant_id).collect();
        let variants = product_variant::Entity::find()
            .filter(product_variant::Column::Id.is_in(variant_ids))
            .all(&*self.db)
            .await?;

        let mut seen = HashSet::new();
        let mut product_ids = Vec::new();
        for v in variants {
            if seen.insert(v.product_id) {
                product_ids.push(v.product_id);
            }
        }
        Ok(product_ids)
    }

    // ------------------------------------------------------------------
    // Channel & feed management
    // ------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn list_channels(&self) -> ServiceResult<Vec<channel::Model>> {
        channel::Entity::find().all(&*self.db).await.map_err(Into::into)
    }

    #[instrument(skip(self, config))]
    pub async fn create_channel(
        &self,
        name: &str,
        channel_type: ChannelType,
        default_external_location_ref: Option<String>,
        config: Option<serde_json::Value>,
    ) -> ServiceResult<channel::Model> {
        let now = Utc::now();
        channel::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            channel_type: Set(channel_type),
            is_active: Set(true),
            default_external_location_ref: Set(default_external_location_ref),
            config: Set(config),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn create_feed(
        &self,
        channel_id: Uuid,
        variant_id: Uuid,
        external_variant_ref: &str,
        external_inventory_item_ref: Option<String>,
    ) -> ServiceResult<channel_feed::Model> {
        channel::Entity::find_by_id(channel_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("channel {channel_id} not found")))?;
        product_variant::Entity::find_by_id(variant_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("variant {variant_id} not found")))?;

        let now = Utc::now();
        channel_feed::ActiveModel {
            id: Set(Uuid::new_v4()),
            channel_id: Set(channel_id),
            variant_id: Set(variant_id),
            external_variant_ref: Set(external_variant_ref.to_string()),
            external_inventory_item_ref: Set(external_inventory_item_ref),
            last_synced_qty: Set(None),
            last_synced_at: Set(None),
            last_error: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| crate::services::map_unique_violation(e, "channel feed"))
    }

    #[instrument(skip(self))]
    pub async fn get_feed(&self, feed_id: Uuid) -> ServiceResult<channel_feed::Model> {
        channel_feed::Entity::find_by_id(feed_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("feed {feed_id} not found")))
    }
}
