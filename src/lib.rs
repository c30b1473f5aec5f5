//! Backend engine for pharmaceutical warehouse inventory.
//!
//! The engine tracks products, stock lots, purchase orders, and an
//! append-only movement ledger. The purchase-order lifecycle is a strict
//! state machine (`PEND -> ANDA -> {CONC, CANC}`); completing an order
//! receives every item into stock and posts matching ledger records as one
//! transaction, and every lot mutation goes through a quantity guard that
//! keeps stock non-negative.

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod services;

use std::sync::Arc;

pub use config::AppConfig;
pub use entities::purchase_order::OrderStatus;
pub use entities::stock_movement::MovementKind;
pub use errors::ServiceError;
pub use events::{Event, EventSender};

use services::{
    ledger::LedgerService, order_status::OrderStatusService, orders::OrderService,
    reposition::RepositionService, stock::StockService,
};

/// Composition root bundling the service handles around one connection pool.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub orders: OrderService,
    pub order_status: OrderStatusService,
    pub stock: StockService,
    pub ledger: LedgerService,
    pub reposition: RepositionService,
}

impl AppState {
    pub fn new(db: Arc<db::DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            orders: OrderService::new(db.clone(), event_sender.clone()),
            order_status: OrderStatusService::new(db.clone(), event_sender.clone()),
            stock: StockService::new(db.clone(), event_sender),
            ledger: LedgerService::new(db.clone()),
            reposition: RepositionService::new(db.clone()),
            db,
        }
    }
}

/// Initializes the global tracing subscriber from the application config.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.log_json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already initialized");
    }
}
