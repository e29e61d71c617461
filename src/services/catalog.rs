use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::entities::{product, product_variant};
use crate::errors::{ServiceError, ServiceResult};
use crate::events::EventSender;
use crate::services::map_unique_violation;

/// Hierarchy levels. Level 1 (Each/Piece) always has `units_per_variant = 1`.
pub const LEVEL_EACH: i32 = 1;
pub const LEVEL_PACK: i32 = 2;
pub const LEVEL_CASE: i32 = 3;
pub const LEVEL_PALLET: i32 = 4;

static SKU_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<base>.+)-(?P<kind>[PBC])(?P<units>[1-9]\d*)$").expect("sku suffix regex")
});

/// Outcome of parsing an external SKU into its UOM shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSku {
    pub base_sku: String,
    pub hierarchy_level: i32,
    pub units_per_variant: i64,
}

/// `BASE-P6` → Pack of 6, `BASE-B12` → Box of 12 (pack level),
/// `BASE-C48` → Case of 48. Anything else is an Each.
pub fn parse_sku(sku: &str) -> ParsedSku {
    if let Some(caps) = SKU_SUFFIX.captures(sku) {
        let units: i64 = caps["units"].parse().unwrap_or(1);
        let level = match &caps["kind"] {
            "P" | "B" => LEVEL_PACK,
            "C" => LEVEL_CASE,
            _ => LEVEL_EACH,
        };
        return ParsedSku {
            base_sku: caps["base"].to_string(),
            hierarchy_level: level,
            units_per_variant: units,
        };
    }
    ParsedSku {
        base_sku: sku.to_string(),
        hierarchy_level: LEVEL_EACH,
        units_per_variant: 1,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductInput {
    pub base_sku: String,
    pub name: String,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub external_product_ref: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateVariantInput {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub units_per_variant: i64,
    pub hierarchy_level: i32,
    pub barcode: Option<String>,
    pub external_variant_ref: Option<String>,
    pub external_inventory_item_ref: Option<String>,
    pub weight_grams: Option<i64>,
    pub length_mm: Option<i32>,
    pub width_mm: Option<i32>,
    pub height_mm: Option<i32>,
}

/// One row of an external catalog import.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalCatalogRow {
    pub sku: String,
    pub name: String,
    pub barcode: Option<String>,
    pub external_variant_ref: Option<String>,
    pub external_inventory_item_ref: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImportRowOutcome {
    pub sku: String,
    pub created: bool,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Default)]
pub struct ImportReport {
    pub created_products: usize,
    pub created_variants: usize,
    pub skipped: usize,
    pub rows: Vec<ImportRowOutcome>,
}

/// Products, UOM variants, SKU and barcode resolution.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    #[allow(dead_code)]
    event_sender: EventSender,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn create_product(&self, input: CreateProductInput) -> ServiceResult<product::Model> {
        if input.base_sku.trim().is_empty() {
            return Err(ServiceError::Validation("base_sku must not be empty".into()));
        }
        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            base_sku: Set(input.base_sku.trim().to_string()),
            name: Set(input.name),
            category: Set(input.category),
            brand: Set(input.brand),
            external_product_ref: Set(input.external_product_ref),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model
            .insert(&*self.db)
            .await
            .map_err(|e| map_unique_violation(e, "product base_sku"))?;
        info!(product_id = %created.id, "product created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> ServiceResult<product::Model> {
        let existing = self.get_product(product_id).await?;
        let mut active: product::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if input.category.is_some() {
            active.category = Set(input.category);
        }
        if input.brand.is_some() {
            active.brand = Set(input.brand);
        }
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await.map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: Uuid) -> ServiceResult<product::Model> {
        product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product {product_id} not found")))
    }

    #[instrument(skip(self))]
    pub async fn create_variant(
        &self,
        input: CreateVariantInput,
    ) -> ServiceResult<product_variant::Model> {
        if input.units_per_variant < 1 {
            return Err(ServiceError::Validation(
                "units_per_variant must be at least 1".into(),
            ));
        }
        if input.hierarchy_level == LEVEL_EACH && input.units_per_variant != 1 {
            return Err(ServiceError::Validation(
                "level-1 variants must have units_per_variant = 1".into(),
            ));
        }
        if !(LEVEL_EACH..=LEVEL_PALLET).contains(&input.hierarchy_level) {
            return Err(ServiceError::Validation(format!(
                "hierarchy_level {} out of range",
                input.hierarchy_level
            )));
        }
        self.get_product(input.product_id).await?;

        let now = Utc::now();
        let model = product_variant::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(input.product_id),
            sku: Set(input.sku.trim().to_string()),
            name: Set(input.name),
            units_per_variant: Set(input.units_per_variant),
            hierarchy_level: Set(input.hierarchy_level),
            barcode: Set(input.barcode),
            external_variant_ref: Set(input.external_variant_ref),
            external_inventory_item_ref: Set(input.external_inventory_item_ref),
            weight_grams: Set(input.weight_grams),
            length_mm: Set(input.length_mm),
            width_mm: Set(input.width_mm),
            height_mm: Set(input.height_mm),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model
            .insert(&*self.db)
            .await
            .map_err(|e| map_unique_violation(e, "variant SKU or barcode"))?;
        info!(variant_id = %created.id, sku = %created.sku, "variant created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_variant(&self, variant_id: Uuid) -> ServiceResult<product_variant::Model> {
        product_variant::Entity::find_by_id(variant_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("variant {variant_id} not found")))
    }

    #[instrument(skip(self))]
    pub async fn find_variant_by_sku(&self, sku: &str) -> ServiceResult<product_variant::Model> {
        product_variant::Entity::find()
            .filter(product_variant::Column::Sku.eq(sku))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("SKU {sku} not found")))
    }

    #[instrument(skip(self))]
    pub async fn find_variant_by_barcode(
        &self,
        barcode: &str,
    ) -> ServiceResult<product_variant::Model> {
        product_variant::Entity::find()
            .filter(product_variant::Column::Barcode.eq(barcode))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("barcode {barcode} not found")))
    }

    #[instrument(skip(self))]
    pub async fn find_variant_by_external_ref(
        &self,
        external_ref: &str,
    ) -> ServiceResult<product_variant::Model> {
        product_variant::Entity::find()
            .filter(product_variant::Column::ExternalVariantRef.eq(external_ref))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("external variant {external_ref} not found"))
            })
    }

    /// All variants of a product, smallest unit first.
    #[instrument(skip(self))]
    pub async fn variants_of(&self, product_id: Uuid) -> ServiceResult<Vec<product_variant::Model>> {
        product_variant::Entity::find()
            .filter(product_variant::Column::ProductId.eq(product_id))
            .order_by_asc(product_variant::Column::HierarchyLevel)
            .order_by_asc(product_variant::Column::UnitsPerVariant)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// Import variants from an external catalog. Rows whose SKU already
    /// exists under a *different* product are refused individually; the
    /// rest of the import proceeds.
    #[instrument(skip(self, rows))]
    pub async fn import_external_catalog(
        &self,
        rows: Vec<ExternalCatalogRow>,
    ) -> ServiceResult<ImportReport> {
        let mut report = ImportReport::default();

        for row in rows {
            let parsed = parse_sku(&row.sku);

            let product = match self.find_or_create_product(&parsed, &row).await {
                Ok(p) => p,
                Err(e) => {
                    report.skipped += 1;
                    report.rows.push(ImportRowOutcome {
                        sku: row.sku.clone(),
                        created: false,
                        error: Some(e.to_string()),
                    });
                    continue;
                }
            };

            match product_variant::Entity::find()
                .filter(product_variant::Column::Sku.eq(row.sku.clone()))
                .one(&*self.db)
                .await?
            {
                Some(existing) if existing.product_id != product.id => {
                    warn!(sku = %row.sku, "import refused: SKU belongs to another product");
                    report.skipped += 1;
                    report.rows.push(ImportRowOutcome {
                        sku: row.sku.clone(),
                        created: false,
                        error: Some("SKU already exists under a different product".into()),
                    });
                }
                Some(_) => {
                    // Re-import of a known variant is a no-op.
                    report.rows.push(ImportRowOutcome {
                        sku: row.sku.clone(),
                        created: false,
                        error: None,
                    });
                }
                None => {
                    let input = CreateVariantInput {
                        product_id: product.id,
                        sku: row.sku.clone(),
                        name: row.name.clone(),
                        units_per_variant: parsed.units_per_variant,
                        hierarchy_level: parsed.hierarchy_level,
                        barcode: row.barcode.clone(),
                        external_variant_ref: row.external_variant_ref.clone(),
                        external_inventory_item_ref: row.external_inventory_item_ref.clone(),
                        weight_grams: None,
                        length_mm: None,
                        width_mm: None,
                        height_mm: None,
                    };
                    match self.create_variant(input).await {
                        Ok(_) => {
                            report.created_variants += 1;
                            report.rows.push(ImportRowOutcome {
                                sku: row.sku.clone(),
                                created: true,
                                error: None,
                            });
                        }
                        Err(e) => {
                            report.skipped += 1;
                            report.rows.push(ImportRowOutcome {
                                sku: row.sku.clone(),
                                created: false,
                                error: Some(e.to_string()),
                            });
                        }
                    }
                }
            }
        }

        Ok(report)
    }

    async fn find_or_create_product(
        &self,
        parsed: &ParsedSku,
        row: &ExternalCatalogRow,
    ) -> ServiceResult<product::Model> {
        if let Some(existing) = product::Entity::find()
            .filter(product::Column::BaseSku.eq(parsed.base_sku.clone()))
            .one(&*self.db)
            .await?
        {
            return Ok(existing);
        }
        self.create_product(CreateProductInput {
            base_sku: parsed.base_sku.clone(),
            name: row.name.clone(),
            category: None,
            brand: None,
            external_product_ref: None,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_sku_is_an_each() {
        let parsed = parse_sku("WIDGET-RED");
        assert_eq!(parsed.base_sku, "WIDGET-RED");
        assert_eq!(parsed.hierarchy_level, LEVEL_EACH);
        assert_eq!(parsed.units_per_variant, 1);
    }

    #[test]
    fn pack_box_case_suffixes_parse() {
        let pack = parse_sku("WIDGET-P6");
        assert_eq!(pack.base_sku, "WIDGET");
        assert_eq!(pack.hierarchy_level, LEVEL_PACK);
        assert_eq!(pack.units_per_variant, 6);

        let boxed = parse_sku("WIDGET-B12");
        assert_eq!(boxed.hierarchy_level, LEVEL_PACK);
        assert_eq!(boxed.units_per_variant, 12);

        let case = parse_sku("WIDGET-C48");
        assert_eq!(case.hierarchy_level, LEVEL_CASE);
        assert_eq!(case.units_per_variant, 48);
    }

    #[test]
    fn suffix_requires_positive_units() {
        // A zero count is not a valid suffix; the whole string is the base.
        let parsed = parse_sku("WIDGET-C0");
        assert_eq!(parsed.hierarchy_level, LEVEL_EACH);
        assert_eq!(parsed.base_sku, "WIDGET-C0");
    }

    #[test]
    fn base_may_itself_contain_dashes() {
        let parsed = parse_sku("ACME-WIDGET-XL-C24");
        assert_eq!(parsed.base_sku, "ACME-WIDGET-XL");
        assert_eq!(parsed.units_per_variant, 24);
    }
}
