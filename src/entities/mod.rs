pub mod lot;
pub mod product;
pub mod purchase_order;
pub mod purchase_order_item;
pub mod stock_movement;
