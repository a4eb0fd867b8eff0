//! Framework-agnostic order model.

pub mod actor;
pub mod catalog;
pub mod order;
pub mod report;
pub mod status;

pub use actor::{Actor, Role};
pub use catalog::{CatalogProduct, CustomerProfile, StockAdjustment};
pub use order::{
    generate_order_number, Order, OrderDetail, OrderItem, OrderPage, PricedLine, TimelineEntry,
};
pub use status::{OrderStatus, Transition};
