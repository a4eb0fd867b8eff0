pub mod order_engine;
pub mod reporter;

pub use order_engine::{
    CartLine, CreateOrder, NumberSource, OrderEngine, OrderQuery, OrderUpdate, StatusChange,
};
pub use reporter::{
    CustomerQuery, LimitQuery, LowStockQuery, PeriodQuery, Reporter, TopProductsQuery,
};
