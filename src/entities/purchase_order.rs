use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Purchase order lifecycle states.
///
/// Storage keeps the historical four-letter codes; the enum carries the full
/// transition table so legality is decided in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum OrderStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PEND",
            OrderStatus::InProgress => "ANDA",
            OrderStatus::Completed => "CONC",
            OrderStatus::Cancelled => "CANC",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "PEND" => Some(OrderStatus::Pending),
            "ANDA" => Some(OrderStatus::InProgress),
            "CONC" => Some(OrderStatus::Completed),
            "CANC" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal states admit no outbound transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// The full transition table. Self-transitions are not legal, and no
    /// state transitions back into `Pending`.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        matches!(
            (self, target),
            (OrderStatus::Pending, OrderStatus::InProgress)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::InProgress, OrderStatus::Completed)
                | (OrderStatus::InProgress, OrderStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Purchase order header.
///
/// `delivery_date` and `value` are never NULL in storage: they are defaulted
/// once by the order service before the first insert. `version` is the
/// optimistic concurrency token checked by every status update.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
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
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_order_item::Entity")]
    Items,
}

impl Related<super::purchase_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
