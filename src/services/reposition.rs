use std::collections::HashMap;
use std::sync::Arc;

use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{lot::Entity as LotEntity, product::Entity as ProductEntity},
    errors::ServiceError,
};

/// Severity of a stock alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertLevel {
    /// Aggregate quantity at or below the hard minimum
    LowStock,
    /// Aggregate quantity at or below the reorder point (but above the minimum)
    Reposition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAlert {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub quantity_on_hand: i32,
    pub stock_min: i32,
    pub reorder_point: i32,
    pub level: AlertLevel,
}

/// Read-only evaluation of products against their static stock thresholds.
#[derive(Clone)]
pub struct RepositionService {
    db: Arc<DbPool>,
}

impl RepositionService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Lists products whose aggregate lot quantity has fallen to the reorder
    /// point or below. Mutates nothing; results are sorted by ascending
    /// quantity so the most starved products come first.
    #[instrument(skip(self))]
    pub async fn evaluate(&self) -> Result<Vec<ProductAlert>, ServiceError> {
        let db = self.db.as_ref();

        let products = ProductEntity::find()
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let lots = LotEntity::find()
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let mut on_hand: HashMap<Uuid, i32> = HashMap::new();
        for lot in lots {
            *on_hand.entry(lot.product_id).or_insert(0) += lot.quantity;
        }

        let mut alerts = Vec::new();
        for product in products {
            let quantity = on_hand.get(&product.id).copied().unwrap_or(0);

            let level = if quantity <= product.stock_min {
                AlertLevel::LowStock
            } else if quantity <= product.reorder_point {
                AlertLevel::Reposition
            } else {
                continue;
            };

            alerts.push(ProductAlert {
                product_id: product.id,
                sku: product.sku,
                name: product.name,
                quantity_on_hand: quantity,
                stock_min: product.stock_min,
                reorder_point: product.reorder_point,
                level,
            });
        }

        alerts.sort_by_key(|alert| alert.quantity_on_hand);

        Ok(alerts)
    }
}
