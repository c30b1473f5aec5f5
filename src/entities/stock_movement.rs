use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Movement kinds for the stock ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementKind {
    Entry,
    Exit,
}

impl MovementKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Entry => "ENTRY",
            MovementKind::Exit => "EXIT",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "ENTRY" => Some(MovementKind::Entry),
            "EXIT" => Some(MovementKind::Exit),
            _ => None,
        }
    }
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable accounting record of a stock-affecting movement.
///
/// Rows are append-only: created once by the ledger poster, never updated or
/// deleted. `total_value` is `quantity * unit_value` when the movement is
/// priced, otherwise NULL.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub kind: String,
    pub occurred_at: DateTime<Utc>,
    pub quantity: i32,
    pub unit_value: Option<Decimal>,
    pub total_value: Option<Decimal>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_entry(&self) -> bool {
        self.kind == MovementKind::Entry.as_str()
    }

    pub fn is_exit(&self) -> bool {
        self.kind == MovementKind::Exit.as_str()
    }

    /// Signed quantity (positive for entries, negative for exits)
    pub fn signed_quantity(&self) -> i32 {
        if self.is_exit() {
            -self.quantity
        } else {
            self.quantity
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_kind_codes_round_trip() {
        assert_eq!(MovementKind::parse("ENTRY"), Some(MovementKind::Entry));
        assert_eq!(MovementKind::parse("EXIT"), Some(MovementKind::Exit));
        assert_eq!(MovementKind::parse("entry"), None);
        assert_eq!(MovementKind::Entry.to_string(), "ENTRY");
    }

    #[test]
    fn signed_quantity_follows_kind() {
        let mut model = Model {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            lot_id: None,
            kind: MovementKind::Entry.as_str().to_string(),
            occurred_at: Utc::now(),
            quantity: 7,
            unit_value: None,
            total_value: None,
            note: None,
            created_at: Utc::now(),
        };
        assert_eq!(model.signed_quantity(), 7);

        model.kind = MovementKind::Exit.as_str().to_string();
        assert_eq!(model.signed_quantity(), -7);
    }
}
