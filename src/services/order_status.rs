use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, QueryFilter, TransactionTrait,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        lot::Entity as LotEntity,
        purchase_order::{self, Entity as OrderEntity, Model as OrderModel, OrderStatus},
        purchase_order_item::{self, Entity as OrderItemEntity},
        stock_movement::MovementKind,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{ledger, stock},
};

/// Applies the status write for a transition, guarded by the order's version.
///
/// Legality is the caller's responsibility; this step only serializes
/// concurrent writers. A stale `order` snapshot (version already bumped by a
/// competing transition) loses with `ConcurrentModification` and the caller
/// may reload and retry.
pub async fn apply_status_change<C: ConnectionTrait>(
    conn: &C,
    order: &OrderModel,
    target: OrderStatus,
) -> Result<(), ServiceError> {
    let result = OrderEntity::update_many()
        .col_expr(purchase_order::Column::Status, Expr::value(target.as_str()))
        .col_expr(
            purchase_order::Column::Version,
            Expr::value(order.version + 1),
        )
        .col_expr(
            purchase_order::Column::UpdatedAt,
            Expr::value(Some(Utc::now())),
        )
        .filter(purchase_order::Column::Id.eq(order.id))
        .filter(purchase_order::Column::Version.eq(order.version))
        .exec(conn)
        .await
        .map_err(ServiceError::DatabaseError)?;

    if result.rows_affected == 0 {
        warn!(order_id = %order.id, version = order.version, "Lost status update race");
        return Err(ServiceError::ConcurrentModification(order.id));
    }

    Ok(())
}

/// Drives the purchase-order lifecycle: validates transitions against the
/// state machine and, on completion, receives every item into stock with a
/// matching ledger posting, all in one transaction.
#[derive(Clone)]
pub struct OrderStatusService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderStatusService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Transitions an order to `target`.
    ///
    /// Illegal transitions fail with `InvalidTransition` and leave the order
    /// untouched. Entering `CONC` posts one stock ENTRY and one ledger record
    /// per item; if any item fails, the whole transition rolls back and the
    /// order keeps its prior status. Entering `CANC` posts no stock movement.
    #[instrument(skip(self), fields(order_id = %order_id, target = %target))]
    pub async fn transition_order(
        &self,
        order_id: Uuid,
        target: OrderStatus,
    ) -> Result<OrderModel, ServiceError> {
        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction for status transition");
            ServiceError::DatabaseError(e)
        })?;

        let order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let current = OrderStatus::parse(&order.status).ok_or_else(|| {
            ServiceError::InternalError(format!(
                "Order {} carries unknown status code '{}'",
                order_id, order.status
            ))
        })?;

        if !current.can_transition_to(target) {
            return Err(ServiceError::InvalidTransition {
                order_id,
                from: current.as_str().to_string(),
                to: target.as_str().to_string(),
            });
        }

        // The version CAS runs before any stock work: concurrent transitions
        // serialize here, so at most one completion attempt reaches the item
        // receipts. A failure below rolls the status write back with the rest.
        apply_status_change(&txn, &order, target).await?;

        if target == OrderStatus::Completed {
            self.receive_order_items(&txn, &order).await?;
        }

        let updated = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::InternalError(format!("Order {} vanished mid-transition", order_id))
            })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit status transition");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            order_id = %order_id,
            from = current.as_str(),
            to = target.as_str(),
            "Order status transitioned"
        );

        self.emit_transition_events(order_id, current, target).await;

        Ok(updated)
    }

    /// Gets the current status of an order.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_status(&self, order_id: Uuid) -> Result<OrderStatus, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        OrderStatus::parse(&order.status).ok_or_else(|| {
            ServiceError::InternalError(format!(
                "Order {} carries unknown status code '{}'",
                order_id, order.status
            ))
        })
    }

    /// Receives every order item into its lot and posts the matching ledger
    /// entries. Runs inside the transition's transaction; the first failing
    /// item aborts everything.
    async fn receive_order_items(
        &self,
        txn: &DatabaseTransaction,
        order: &OrderModel,
    ) -> Result<(), ServiceError> {
        let items = OrderItemEntity::find()
            .filter(purchase_order_item::Column::OrderId.eq(order.id))
            .all(txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        for item in items {
            let lot = LotEntity::find_by_id(item.lot_id)
                .one(txn)
                .await
                .map_err(ServiceError::DatabaseError)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Lot {} for order item {} not found",
                        item.lot_id, item.id
                    ))
                })?;

            if lot.product_id != item.product_id {
                return Err(ServiceError::ValidationError(format!(
                    "Lot {} does not belong to product {} (order item {})",
                    item.lot_id, item.product_id, item.id
                )));
            }

            stock::apply_delta(txn, &lot, item.quantity).await?;

            ledger::post(
                txn,
                item.product_id,
                Some(item.lot_id),
                MovementKind::Entry,
                item.quantity,
                Some(item.unit_price),
                Some(format!("Receipt for purchase order {}", order.id)),
            )
            .await?;
        }

        Ok(())
    }

    async fn emit_transition_events(&self, order_id: Uuid, from: OrderStatus, to: OrderStatus) {
        let Some(event_sender) = &self.event_sender else {
            return;
        };

        let status_event = Event::OrderStatusChanged {
            order_id,
            old_status: from.as_str().to_string(),
            new_status: to.as_str().to_string(),
        };
        if let Err(e) = event_sender.send(status_event).await {
            warn!(error = %e, order_id = %order_id, "Failed to send status changed event");
        }

        let lifecycle_event = match to {
            OrderStatus::Completed => Some(Event::OrderCompleted(order_id)),
            OrderStatus::Cancelled => Some(Event::OrderCancelled(order_id)),
            _ => None,
        };
        if let Some(event) = lifecycle_event {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, order_id = %order_id, "Failed to send lifecycle event");
            }
        }
    }
}
