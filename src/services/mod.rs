pub mod ledger;
pub mod order_status;
pub mod orders;
pub mod reposition;
pub mod stock;
