use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::inventory_balance;
use crate::entities::location::{self, LocationType};
use crate::entities::warehouse::{self, InventorySourceType};
use crate::errors::{ServiceError, ServiceResult};
use crate::services::map_unique_violation;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateWarehouseInput {
    pub code: String,
    pub name: String,
    pub is_default: bool,
    pub external_location_ref: Option<String>,
    pub inventory_source_type: InventorySourceType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateWarehouseInput {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub is_default: Option<bool>,
    pub external_location_ref: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLocationInput {
    pub warehouse_id: Uuid,
    pub code: String,
    pub location_type: LocationType,
    pub is_pickable: bool,
    #[serde(default)]
    pub zone_sequence: i32,
}

/// Warehouses and bin locations.
#[derive(Clone)]
pub struct LocationService {
    db: Arc<DatabaseConnection>,
}

impl LocationService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn create_warehouse(
        &self,
        input: CreateWarehouseInput,
    ) -> ServiceResult<warehouse::Model> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        if input.is_default {
            self.clear_default(&txn).await?;
        }

        let created = warehouse::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(input.code.trim().to_string()),
            name: Set(input.name),
            is_default: Set(input.is_default),
            is_active: Set(true),
            external_location_ref: Set(input.external_location_ref),
            inventory_source_type: Set(input.inventory_source_type),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| map_unique_violation(e, "warehouse code"))?;

        txn.commit().await?;
        info!(warehouse_id = %created.id, code = %created.code, "warehouse created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update_warehouse(
        &self,
        warehouse_id: Uuid,
        input: UpdateWarehouseInput,
    ) -> ServiceResult<warehouse::Model> {
        let txn = self.db.begin().await?;
        let existing = warehouse::Entity::find_by_id(warehouse_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("warehouse {warehouse_id} not found")))?;

        if input.is_default == Some(true) && !existing.is_default {
            self.clear_default(&txn).await?;
        }

        let mut active: warehouse::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(is_default) = input.is_default {
            active.is_default = Set(is_default);
        }
        if input.external_location_ref.is_some() {
            active.external_location_ref = Set(input.external_location_ref);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// At most one default warehouse exists at a time.
    async fn clear_default<C: sea_orm::ConnectionTrait>(&self, conn: &C) -> ServiceResult<()> {
        let defaults = warehouse::Entity::find()
            .filter(warehouse::Column::IsDefault.eq(true))
            .all(conn)
            .await?;
        for w in defaults {
            let mut active: warehouse::ActiveModel = w.into();
            active.is_default = Set(false);
            active.updated_at = Set(Utc::now());
            active.update(conn).await?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_warehouse(&self, warehouse_id: Uuid) -> ServiceResult<warehouse::Model> {
        warehouse::Entity::find_by_id(warehouse_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("warehouse {warehouse_id} not found")))
    }

    #[instrument(skip(self))]
    pub async fn list_warehouses(&self) -> ServiceResult<Vec<warehouse::Model>> {
        warehouse::Entity::find()
            .order_by_asc(warehouse::Column::Code)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn create_location(
        &self,
        input: CreateLocationInput,
    ) -> ServiceResult<location::Model> {
        self.get_warehouse(input.warehouse_id).await?;
        location::ActiveModel {
            id: Set(Uuid::new_v4()),
            warehouse_id: Set(input.warehouse_id),
            code: Set(input.code.trim().to_string()),
            location_type: Set(input.location_type),
            is_pickable: Set(input.is_pickable),
            zone_sequence: Set(input.zone_sequence),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| map_unique_violation(e, "location code"))
    }

    #[instrument(skip(self))]
    pub async fn get_location(&self, location_id: Uuid) -> ServiceResult<location::Model> {
        location::Entity::find_by_id(location_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("location {location_id} not found")))
    }

    #[instrument(skip(self))]
    pub async fn list_locations(&self, warehouse_id: Uuid) -> ServiceResult<Vec<location::Model>> {
        location::Entity::find()
            .filter(location::Column::WarehouseId.eq(warehouse_id))
            .order_by_asc(location::Column::ZoneSequence)
            .order_by_asc(location::Column::Code)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// A location with stock in any state cannot be removed.
    #[instrument(skip(self))]
    pub async fn delete_location(&self, location_id: Uuid) -> ServiceResult<()> {
        let loc = self.get_location(location_id).await?;

        let carrying = inventory_balance::Entity::find()
            .filter(inventory_balance::Column::LocationId.eq(location_id))
            .filter(inventory_balance::Column::Quantity.gt(0))
            .one(&*self.db)
            .await?;
        if carrying.is_some() {
            return Err(ServiceError::InUse(format!(
                "location {} carries non-zero balances",
                loc.code
            )));
        }

        loc.delete(&*self.db).await?;
        info!(%location_id, "location deleted");
        Ok(())
    }
}
