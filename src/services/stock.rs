use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        lot::{self, Entity as LotEntity},
        stock_movement::{self, MovementKind},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::ledger,
};

/// Outcome of a guard application, kept for ledger reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDelta {
    pub lot_id: Uuid,
    pub previous: i32,
    pub new: i32,
}

/// Pure post-condition check of the quantity guard: the resulting quantity
/// when `current + delta` stays non-negative (and does not overflow), `None`
/// otherwise.
pub fn guarded_quantity(current: i32, delta: i32) -> Option<i32> {
    let new = current.checked_add(delta)?;
    (new >= 0).then_some(new)
}

/// Applies a signed quantity delta to a lot, all-or-nothing.
///
/// This is the only code path that mutates `lots.quantity`. The write is a
/// compare-and-swap on the observed quantity, so a concurrent movement
/// against the same lot loses with `ConcurrentModification` instead of
/// silently overwriting. Generic over the connection so the orchestrator can
/// run it inside its own transaction.
pub async fn apply_delta<C: ConnectionTrait>(
    conn: &C,
    lot: &lot::Model,
    delta: i32,
) -> Result<StockDelta, ServiceError> {
    // An unrepresentable sum is a bad delta, not a stock shortage.
    let new_quantity = guarded_quantity(lot.quantity, delta).ok_or_else(|| {
        if lot.quantity.checked_add(delta).is_none() {
            ServiceError::InvalidQuantity(delta)
        } else {
            ServiceError::InsufficientStock {
                lot_id: lot.id,
                available: lot.quantity,
                delta,
            }
        }
    })?;

    let result = LotEntity::update_many()
        .col_expr(lot::Column::Quantity, Expr::value(new_quantity))
        .col_expr(lot::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(lot::Column::Id.eq(lot.id))
        .filter(lot::Column::Quantity.eq(lot.quantity))
        .exec(conn)
        .await
        .map_err(ServiceError::DatabaseError)?;

    if result.rows_affected == 0 {
        warn!(lot_id = %lot.id, "Lot quantity changed underneath; delta not applied");
        return Err(ServiceError::ConcurrentModification(lot.id));
    }

    Ok(StockDelta {
        lot_id: lot.id,
        previous: lot.quantity,
        new: new_quantity,
    })
}

/// Request to post a stock movement against a lot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostStockMovementRequest {
    pub product_id: Uuid,
    pub lot_id: Uuid,
    pub kind: MovementKind,
    pub quantity: i32,
    pub unit_value: Option<Decimal>,
    pub note: Option<String>,
}

/// The posted movement together with the lot quantities around it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementResult {
    pub movement: stock_movement::Model,
    pub previous_quantity: i32,
    pub new_quantity: i32,
}

/// Service posting entry/exit movements: quantity guard plus ledger record
/// in one transaction.
#[derive(Clone)]
pub struct StockService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl StockService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, request), fields(lot_id = %request.lot_id, kind = %request.kind, quantity = request.quantity))]
    pub async fn post_stock_movement(
        &self,
        request: PostStockMovementRequest,
    ) -> Result<MovementResult, ServiceError> {
        if request.quantity <= 0 {
            return Err(ServiceError::InvalidQuantity(request.quantity));
        }

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction for stock movement");
            ServiceError::DatabaseError(e)
        })?;

        let lot = LotEntity::find_by_id(request.lot_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Lot {} not found", request.lot_id)))?;

        if lot.product_id != request.product_id {
            return Err(ServiceError::ValidationError(format!(
                "Lot {} does not belong to product {}",
                request.lot_id, request.product_id
            )));
        }

        let delta = match request.kind {
            MovementKind::Entry => request.quantity,
            MovementKind::Exit => -request.quantity,
        };

        let applied = apply_delta(&txn, &lot, delta).await?;

        let movement = ledger::post(
            &txn,
            request.product_id,
            Some(request.lot_id),
            request.kind,
            request.quantity,
            request.unit_value,
            request.note.clone(),
        )
        .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, lot_id = %request.lot_id, "Failed to commit stock movement");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            movement_id = %movement.id,
            previous = applied.previous,
            new = applied.new,
            "Stock movement posted"
        );

        if let Some(event_sender) = &self.event_sender {
            let event = Event::StockMovementPosted {
                movement_id: movement.id,
                product_id: request.product_id,
                lot_id: request.lot_id,
                kind: request.kind.as_str().to_string(),
                quantity: request.quantity,
            };
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send stock movement event");
            }
        }

        Ok(MovementResult {
            movement,
            previous_quantity: applied.previous,
            new_quantity: applied.new,
        })
    }
}
