use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::stock_movement::{self, Entity as StockMovementEntity, MovementKind},
    errors::ServiceError,
};

/// Total value of a movement: `quantity * unit_value` when priced, else unset.
pub fn compute_total(quantity: i32, unit_value: Option<Decimal>) -> Option<Decimal> {
    unit_value.map(|value| value * Decimal::from(quantity))
}

/// Appends an immutable ledger record for a product.
///
/// Performs no stock-level validation; callers run this inside the same
/// transaction as the quantity guard so both commit or roll back together.
pub async fn post<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    lot_id: Option<Uuid>,
    kind: MovementKind,
    quantity: i32,
    unit_value: Option<Decimal>,
    note: Option<String>,
) -> Result<stock_movement::Model, ServiceError> {
    let now = Utc::now();

    let entry = stock_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        lot_id: Set(lot_id),
        kind: Set(kind.as_str().to_string()),
        occurred_at: Set(now),
        quantity: Set(quantity),
        unit_value: Set(unit_value),
        total_value: Set(compute_total(quantity, unit_value)),
        note: Set(note),
        created_at: Set(now),
    };

    entry.insert(conn).await.map_err(ServiceError::DatabaseError)
}

/// Read surface over the append-only movement ledger.
#[derive(Clone)]
pub struct LedgerService {
    db: Arc<DbPool>,
}

impl LedgerService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Lists a product's movements in posting order (audit view).
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn history_for_product(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<stock_movement::Model>, ServiceError> {
        StockMovementEntity::find()
            .filter(stock_movement::Column::ProductId.eq(product_id))
            .order_by_asc(stock_movement::Column::OccurredAt)
            .order_by_asc(stock_movement::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn total_is_quantity_times_unit_value() {
        assert_eq!(compute_total(100, Some(dec!(2.50))), Some(dec!(250.00)));
        assert_eq!(compute_total(3, Some(dec!(0.01))), Some(dec!(0.03)));
    }

    #[test]
    fn total_is_unset_without_unit_value() {
        assert_eq!(compute_total(100, None), None);
    }
}
