#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

use pharmastock_api::{
    db::{self, DbConfig, DbPool},
    entities::{lot, product, stock_movement},
    services::orders::{CreateOrderItemRequest, CreateOrderRequest},
    AppState,
};

/// Test harness over an in-memory SQLite database.
///
/// The pool is pinned to a single connection so the in-memory database
/// survives for the lifetime of the harness.
pub struct TestApp {
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        let config = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };

        let pool = db::establish_connection_with_config(&config)
            .await
            .expect("failed to open test database");
        db::ensure_schema(&pool)
            .await
            .expect("failed to bootstrap test schema");

        Self {
            state: AppState::new(Arc::new(pool), None),
        }
    }

    pub fn db(&self) -> &DbPool {
        self.state.db.as_ref()
    }

    pub async fn seed_product(
        &self,
        sku: &str,
        stock_min: i32,
        reorder_point: i32,
        stock_max: i32,
    ) -> product::Model {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(sku.to_string()),
            name: Set(format!("Product {sku}")),
            barcode: Set(None),
            unit_of_measure: Set("BOX".to_string()),
            warehouse: Set("CENTRAL".to_string()),
            stock_max: Set(stock_max),
            stock_min: Set(stock_min),
            reorder_point: Set(reorder_point),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("failed to seed product")
    }

    pub async fn seed_lot(&self, product_id: Uuid, lot_number: &str, quantity: i32) -> lot::Model {
        let now = Utc::now();
        lot::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            lot_number: Set(lot_number.to_string()),
            quantity: Set(quantity),
            expiration_date: Set(None),
            received_date: Set(NaiveDate::from_ymd_opt(2024, 1, 10).expect("valid date")),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("failed to seed lot")
    }

    pub async fn lot_quantity(&self, lot_id: Uuid) -> i32 {
        lot::Entity::find_by_id(lot_id)
            .one(self.db())
            .await
            .expect("failed to load lot")
            .expect("lot missing")
            .quantity
    }

    pub async fn movements_for(&self, product_id: Uuid) -> Vec<stock_movement::Model> {
        self.state
            .ledger
            .history_for_product(product_id)
            .await
            .expect("failed to load ledger history")
    }
}

pub fn order_request(items: Vec<CreateOrderItemRequest>) -> CreateOrderRequest {
    CreateOrderRequest {
        order_date: NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date"),
        expected_date: NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date"),
        delivery_date: None,
        value: None,
        notes: None,
        items,
    }
}

pub fn order_item(
    product_id: Uuid,
    lot_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
) -> CreateOrderItemRequest {
    CreateOrderItemRequest {
        product_id,
        lot_id,
        quantity,
        unit_price,
    }
}
