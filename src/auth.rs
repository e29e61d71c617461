//! Identity and permissions.
//!
//! Session handling lives in the fronting gateway; requests arrive with
//! `x-user-id` and `x-user-permissions` headers already resolved. This
//! module provides the extractor, the static permission catalog, and the
//! role-management service backing `/api/roles`.

use std::collections::HashMap;

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use lazy_static::lazy_static;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{role, role_permission, user, user_role};
use crate::errors::{ServiceError, ServiceResult};

/// Permission string constants, `resource:action`.
pub mod consts {
    pub const CATALOG_VIEW: &str = "catalog:view";
    pub const CATALOG_EDIT: &str = "catalog:edit";

    pub const LOCATIONS_VIEW: &str = "locations:view";
    pub const LOCATIONS_EDIT: &str = "locations:edit";

    pub const INVENTORY_VIEW: &str = "inventory:view";
    pub const INVENTORY_ADJUST: &str = "inventory:adjust";
    pub const INVENTORY_TRANSFER: &str = "inventory:transfer";

    pub const PURCHASING_VIEW: &str = "purchasing:view";
    pub const PURCHASING_EDIT: &str = "purchasing:edit";
    pub const PURCHASING_APPROVE: &str = "purchasing:approve";

    pub const SHIPMENTS_VIEW: &str = "shipments:view";
    pub const SHIPMENTS_EDIT: &str = "shipments:edit";

    pub const RECEIVING_VIEW: &str = "receiving:view";
    pub const RECEIVING_EDIT: &str = "receiving:edit";

    pub const ORDERS_VIEW: &str = "orders:view";
    pub const ORDERS_EDIT: &str = "orders:edit";

    pub const PICKING_VIEW: &str = "picking:view";
    pub const PICKING_EDIT: &str = "picking:edit";

    pub const REPLEN_VIEW: &str = "replen:view";
    pub const REPLEN_EDIT: &str = "replen:edit";

    pub const CHANNELS_VIEW: &str = "channels:view";
    pub const CHANNELS_SYNC: &str = "channels:sync";

    pub const ROLES_VIEW: &str = "roles:view";
    pub const ROLES_EDIT: &str = "roles:edit";

    pub const SETTINGS_VIEW: &str = "settings:view";
    pub const SETTINGS_EDIT: &str = "settings:edit";
}

lazy_static! {
    /// The full permission catalog with human descriptions, keyed by name.
    pub static ref PERMISSION_REGISTRY: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert(consts::CATALOG_VIEW, "View products and variants");
        m.insert(consts::CATALOG_EDIT, "Create and edit products and variants");
        m.insert(consts::LOCATIONS_VIEW, "View warehouses and locations");
        m.insert(consts::LOCATIONS_EDIT, "Create and edit warehouses and locations");
        m.insert(consts::INVENTORY_VIEW, "View balances and the transaction ledger");
        m.insert(consts::INVENTORY_ADJUST, "Post inventory adjustments");
        m.insert(consts::INVENTORY_TRANSFER, "Transfer stock between locations");
        m.insert(consts::PURCHASING_VIEW, "View purchase orders and vendors");
        m.insert(consts::PURCHASING_EDIT, "Create and edit purchase orders");
        m.insert(consts::PURCHASING_APPROVE, "Approve pending purchase orders");
        m.insert(consts::SHIPMENTS_VIEW, "View inbound shipments");
        m.insert(consts::SHIPMENTS_EDIT, "Manage inbound shipments and costs");
        m.insert(consts::RECEIVING_VIEW, "View receiving orders");
        m.insert(consts::RECEIVING_EDIT, "Create, edit and close receiving orders");
        m.insert(consts::ORDERS_VIEW, "View sales orders");
        m.insert(consts::ORDERS_EDIT, "Manage sales orders and combining");
        m.insert(consts::PICKING_VIEW, "View waves and pick tasks");
        m.insert(consts::PICKING_EDIT, "Generate waves and confirm picks");
        m.insert(consts::REPLEN_VIEW, "View replenishment rules and tasks");
        m.insert(consts::REPLEN_EDIT, "Manage replenishment rules and tasks");
        m.insert(consts::CHANNELS_VIEW, "View channels and feeds");
        m.insert(consts::CHANNELS_SYNC, "Trigger channel inventory sync");
        m.insert(consts::ROLES_VIEW, "View roles and permissions");
        m.insert(consts::ROLES_EDIT, "Edit role permission grants");
        m.insert(consts::SETTINGS_VIEW, "View settings");
        m.insert(consts::SETTINGS_EDIT, "Edit settings");
        m
    };
}

/// Identity resolved by the gateway, attached to the request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub permissions: Vec<String>,
}

impl AuthenticatedUser {
    /// Membership check against the flat permission list.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn require(&self, permission: &str) -> ServiceResult<()> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "missing permission {permission}"
            )))
        }
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or_else(|| {
                ServiceError::Unauthorized("missing or malformed x-user-id header".into())
            })?;

        let permissions = parts
            .headers
            .get("x-user-permissions")
            .and_then(|v| v.to_str().ok())
            .map(|v| {
                v.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            user_id,
            permissions,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub user: user::Model,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PermissionInfo {
    pub name: String,
    pub description: String,
}

/// Role and permission management over the RBAC tables.
#[derive(Clone)]
pub struct RbacService {
    db: Arc<DatabaseConnection>,
}

impl RbacService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// `GET /api/auth/me` payload: the user plus role names and the union
    /// of permissions granted through those roles.
    #[instrument(skip(self))]
    pub async fn profile(&self, user_id: Uuid) -> ServiceResult<UserProfile> {
        let db = &*self.db;
        let user = user::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {user_id} not found")))?;

        let role_ids: Vec<Uuid> = user_role::Entity::find()
            .filter(user_role::Column::UserId.eq(user_id))
            .all(db)
            .await?
            .into_iter()
            .map(|ur| ur.role_id)
            .collect();

        let roles = role::Entity::find()
            .filter(role::Column::Id.is_in(role_ids.clone()))
            .all(db)
            .await?;

        let mut permissions: Vec<String> = role_permission::Entity::find()
            .filter(role_permission::Column::RoleId.is_in(role_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|rp| rp.permission)
            .collect();
        permissions.sort();
        permissions.dedup();

        Ok(UserProfile {
            user,
            roles: roles.into_iter().map(|r| r.name).collect(),
            permissions,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_roles(&self) -> ServiceResult<Vec<role::Model>> {
        role::Entity::find()
            .order_by_asc(role::Column::Name)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// The static catalog, sorted by name.
    pub fn list_permissions(&self) -> Vec<PermissionInfo> {
        let mut perms: Vec<PermissionInfo> = PERMISSION_REGISTRY
            .iter()
            .map(|(name, description)| PermissionInfo {
                name: (*name).to_string(),
                description: (*description).to_string(),
            })
            .collect();
        perms.sort_by(|a, b| a.name.cmp(&b.name));
        perms
    }

    /// Replace a role's grants with the given set. Unknown permission
    /// names are rejected before anything is written.
    #[instrument(skip(self, permissions))]
    pub async fn set_role_permissions(
        &self,
        role_id: Uuid,
        permissions: Vec<String>,
    ) -> ServiceResult<Vec<String>> {
        for p in &permissions {
            if !PERMISSION_REGISTRY.contains_key(p.as_str()) {
                return Err(ServiceError::Validation(format!("unknown permission {p}")));
            }
        }

        let db = &*self.db;
        role::Entity::find_by_id(role_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("role {role_id} not found")))?;

        let txn = db.begin().await?;
        role_permission::Entity::delete_many()
            .filter(role_permission::Column::RoleId.eq(role_id))
            .exec(&txn)
            .await?;

        let mut granted = permissions.clone();
        granted.sort();
        granted.dedup();
        for p in &granted {
            role_permission::ActiveModel {
                id: Set(Uuid::new_v4()),
                role_id: Set(role_id),
                permission: Set(p.clone()),
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;

        Ok(granted)
    }

    /// Seed helper used at startup and by tests.
    pub async fn ensure_role(&self, name: &str, description: Option<&str>) -> ServiceResult<role::Model> {
        let db = &*self.db;
        if let Some(existing) = role::Entity::find()
            .filter(role::Column::Name.eq(name))
            .one(db)
            .await?
        {
            return Ok(existing);
        }
        role::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(description.map(|d| d.to_string())),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_membership_is_exact() {
        let user = AuthenticatedUser {
            user_id: Uuid::new_v4(),
            permissions: vec!["inventory:view".into(), "roles:view".into()],
        };
        assert!(user.has_permission("inventory:view"));
        assert!(!user.has_permission("inventory:adjust"));
        assert!(user.require("roles:view").is_ok());
        assert!(matches!(
            user.require("roles:edit"),
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[test]
    fn registry_names_follow_resource_action_pattern() {
        for name in PERMISSION_REGISTRY.keys() {
            let parts: Vec<&str> = name.split(':').collect();
            assert_eq!(parts.len(), 2, "bad permission name {name}");
        }
    }
}
