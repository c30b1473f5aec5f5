use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        purchase_order::{
            self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
            OrderStatus,
        },
        purchase_order_item::{
            self, ActiveModel as OrderItemActiveModel, Entity as OrderItemEntity,
            Model as OrderItemModel,
        },
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Request/Response types for the order service
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub order_date: NaiveDate,
    pub expected_date: NaiveDate,
    /// Defaults to `expected_date` when omitted
    pub delivery_date: Option<NaiveDate>,
    /// Defaults to zero when omitted
    pub value: Option<Decimal>,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<CreateOrderItemRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrderItemRequest {
    pub product_id: Uuid,
    pub lot_id: Uuid,
    #[validate(range(min = 1, message = "Item quantity must be a positive integer"))]
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub lot_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub status: String,
    pub value: Decimal,
    pub order_date: NaiveDate,
    pub expected_date: NaiveDate,
    pub delivery_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
    pub items: Vec<OrderItemResponse>,
}

/// Fills the required-but-optional order fields, exactly once, before the
/// first persistence. Never invoked on updates: an order that already has an
/// identifier goes through the status service, which touches nothing else.
pub fn normalize_defaults(request: &mut CreateOrderRequest) {
    if request.value.is_none() {
        request.value = Some(Decimal::ZERO);
    }
    if request.delivery_date.is_none() {
        request.delivery_date = Some(request.expected_date);
    }
}

/// Service for creating and reading purchase orders.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a new purchase order with its items as one unit.
    ///
    /// The initial status is always `PEND`; callers cannot set it.
    #[instrument(skip(self, request), fields(item_count = request.items.len()))]
    pub async fn create_order(
        &self,
        mut request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        for item in &request.items {
            item.validate()
                .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
            if item.unit_price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "Item unit price must not be negative (product {})",
                    item.product_id
                )));
            }
        }

        normalize_defaults(&mut request);

        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let order_active_model = OrderActiveModel {
            id: Set(order_id),
            status: Set(OrderStatus::Pending.as_str().to_string()),
            value: Set(request.value.unwrap_or(Decimal::ZERO)),
            order_date: Set(request.order_date),
            expected_date: Set(request.expected_date),
            delivery_date: Set(request.delivery_date.unwrap_or(request.expected_date)),
            notes: Set(request.notes.clone()),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            version: Set(1),
        };

        let order_model = order_active_model.insert(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to create order");
            ServiceError::DatabaseError(e)
        })?;

        let mut item_models = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let item_active_model = OrderItemActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                lot_id: Set(item.lot_id),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                created_at: Set(now),
            };
            let item_model = item_active_model.insert(&txn).await.map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to create order item");
                ServiceError::DatabaseError(e)
            })?;
            item_models.push(item_model);
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit order creation");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, "Purchase order created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::OrderCreated(order_id)).await {
                warn!(error = %e, order_id = %order_id, "Failed to send order created event");
            }
        }

        Ok(model_to_response(order_model, item_models))
    }

    /// Retrieves an order with its items.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<Option<OrderResponse>, ServiceError> {
        let db = self.db.as_ref();

        let order = OrderEntity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let Some(order_model) = order else {
            return Ok(None);
        };

        let items = OrderItemEntity::find()
            .filter(purchase_order_item::Column::OrderId.eq(order_id))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(Some(model_to_response(order_model, items)))
    }
}

fn model_to_response(order: OrderModel, items: Vec<OrderItemModel>) -> OrderResponse {
    OrderResponse {
        id: order.id,
        status: order.status,
        value: order.value,
        order_date: order.order_date,
        expected_date: order.expected_date,
        delivery_date: order.delivery_date,
        notes: order.notes,
        created_at: order.created_at,
        updated_at: order.updated_at,
        version: order.version,
        items: items
            .into_iter()
            .map(|item| OrderItemResponse {
                id: item.id,
                product_id: item.product_id,
                lot_id: item.lot_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(value: Option<Decimal>, delivery_date: Option<NaiveDate>) -> CreateOrderRequest {
        CreateOrderRequest {
            order_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            expected_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            delivery_date,
            value,
            notes: None,
            items: vec![CreateOrderItemRequest {
                product_id: Uuid::new_v4(),
                lot_id: Uuid::new_v4(),
                quantity: 10,
                unit_price: dec!(1.25),
            }],
        }
    }

    #[test]
    fn normalizer_backfills_unset_fields() {
        let mut req = request(None, None);
        normalize_defaults(&mut req);
        assert_eq!(req.value, Some(Decimal::ZERO));
        assert_eq!(req.delivery_date, Some(req.expected_date));
    }

    #[test]
    fn normalizer_preserves_caller_values() {
        let delivery = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let mut req = request(Some(dec!(99.90)), Some(delivery));
        normalize_defaults(&mut req);
        assert_eq!(req.value, Some(dec!(99.90)));
        assert_eq!(req.delivery_date, Some(delivery));
    }

    #[test]
    fn normalizer_is_idempotent() {
        let mut req = request(None, None);
        normalize_defaults(&mut req);
        let first = req.clone();
        normalize_defaults(&mut req);
        assert_eq!(req.value, first.value);
        assert_eq!(req.delivery_date, first.delivery_date);
    }

    #[test]
    fn empty_item_list_fails_validation() {
        let mut req = request(None, None);
        req.items.clear();
        assert!(req.validate().is_err());
    }

    #[test]
    fn non_positive_item_quantity_fails_validation() {
        let mut req = request(None, None);
        req.items[0].quantity = 0;
        assert!(req.items[0].validate().is_err());
        req.items[0].quantity = -4;
        assert!(req.items[0].validate().is_err());
    }
}
