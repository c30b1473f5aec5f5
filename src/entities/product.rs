use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Product entity
///
/// Carries the static stock thresholds the reposition evaluator compares
/// against. Lots are looked up by `product_id`; the product deliberately
/// holds no lot collection.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "products")]
#[validate(schema(function = "validate_stock_thresholds", skip_on_field_errors = false))]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// SKU (Stock Keeping Unit)
    #[validate(length(
        min = 1,
        max = 100,
        message = "SKU must be between 1 and 100 characters"
    ))]
    pub sku: String,

    /// Product name
    #[validate(length(
        min = 1,
        max = 255,
        message = "Product name must be between 1 and 255 characters"
    ))]
    pub name: String,

    /// Barcode or EAN
    pub barcode: Option<String>,

    /// Unit of measure code (e.g., BOX, BLISTER, UNIT)
    #[validate(length(min = 1, max = 32, message = "Unit of measure is required"))]
    pub unit_of_measure: String,

    /// Code of the warehouse holding this product
    #[validate(length(min = 1, max = 64, message = "Warehouse code is required"))]
    pub warehouse: String,

    /// Upper stock bound
    #[validate(range(min = 0))]
    pub stock_max: i32,

    /// Hard minimum below which the product is low on stock
    #[validate(range(min = 0))]
    pub stock_min: i32,

    /// Threshold at which the product should be reordered
    #[validate(range(min = 0))]
    pub reorder_point: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Thresholds must be ordered; inconsistent values are a caller bug and are
/// rejected at write time rather than silently stored.
fn validate_stock_thresholds(model: &Model) -> Result<(), ValidationError> {
    if model.stock_min > model.reorder_point || model.reorder_point > model.stock_max {
        let mut err = ValidationError::new("stock_thresholds");
        err.message = Some("stock_min <= reorder_point <= stock_max must hold".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            active_model.created_at = Set(Utc::now());
        }
        active_model.updated_at = Set(Some(Utc::now()));

        let model: Model = active_model.clone().try_into().map_err(|_| {
            DbErr::Custom("Failed to convert ActiveModel to Model for validation".to_string())
        })?;

        if let Err(err) = model.validate() {
            return Err(DbErr::Custom(format!("Validation error: {}", err)));
        }

        Ok(active_model)
    }
}
