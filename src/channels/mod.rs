//! Channel drivers: one implementation per marketplace, dispatched by
//! channel type. Drivers only push; nothing flows back into the ledger.

pub mod shopify;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::entities::channel::{self, ChannelType};
use crate::entities::channel_feed;
use crate::errors::ServiceResult;

/// Everything a driver needs for one push.
#[derive(Debug, Clone)]
pub struct PushRequest {
    pub channel: channel::Model,
    pub feed: channel_feed::Model,
    /// Marketplace-side location; `None` means the channel's default.
    pub external_location_ref: Option<String>,
    pub qty: i64,
}

#[async_trait]
pub trait ChannelDriver: Send + Sync {
    fn driver_type(&self) -> ChannelType;

    /// Set the available quantity for the feed's external item. Errors
    /// surface as `ServiceError::External` and are recorded on the feed.
    async fn push_inventory(&self, request: &PushRequest) -> ServiceResult<()>;
}

/// Dispatch table from channel type to driver.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: HashMap<ChannelType, Arc<dyn ChannelDriver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, driver: Arc<dyn ChannelDriver>) {
        self.drivers.insert(driver.driver_type(), driver);
    }

    pub fn get(&self, channel_type: ChannelType) -> Option<Arc<dyn ChannelDriver>> {
        self.drivers.get(&channel_type).cloned()
    }

    pub fn types(&self) -> Vec<ChannelType> {
        self.drivers.keys().copied().collect()
    }
}
