//! Storage ports.
//!
//! The order engine and reporter only talk to these traits. Production wires
//! in the Postgres adapter; tests and local runs can use the in-memory one.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::report::{
    CategoryRevenue, DashboardStats, LowStockProduct, RecentOrder, ReportWindows, TopProduct,
};
use crate::domain::{
    CatalogProduct, CustomerProfile, Order, OrderItem, OrderStatus, StockAdjustment,
    TimelineEntry,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Criteria for a page of orders, newest first.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Restricts the page to one customer's orders.
    pub customer_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    /// Case-insensitive substring of order number, customer name or phone.
    pub search: Option<String>,
    pub limit: u32,
    pub offset: u64,
}

impl OrderFilter {
    /// Applies the search rule used by every adapter.
    pub fn matches_search(&self, order: &Order) -> bool {
        let Some(needle) = self.search.as_deref() else {
            return true;
        };
        let needle = needle.to_lowercase();
        [
            order.order_number.as_str(),
            order.customer_name.as_str(),
            order.customer_phone.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Criteria for a page of customer accounts, newest first.
#[derive(Debug, Clone, Default)]
pub struct CustomerFilter {
    /// Case-insensitive substring of name, email or phone.
    pub search: Option<String>,
    pub limit: u32,
    pub offset: u64,
}

impl CustomerFilter {
    pub fn matches_search(&self, customer: &CustomerProfile) -> bool {
        let Some(needle) = self.search.as_deref() else {
            return true;
        };
        let needle = needle.to_lowercase();
        [
            Some(customer.full_name.as_str()),
            customer.email.as_deref(),
            Some(customer.phone.as_str()),
        ]
        .iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// One atomic unit of work. Dropping it without `commit` discards every write
/// made through it.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn customer(&mut self, id: Uuid) -> RepositoryResult<Option<CustomerProfile>>;

    /// Locks the given products for the rest of the unit of work and returns
    /// the ones that exist, ordered by id.
    async fn lock_products(&mut self, ids: &[Uuid]) -> RepositoryResult<Vec<CatalogProduct>>;

    /// Adds `delta` to a product's stock unless the result would be negative.
    async fn adjust_stock(
        &mut self,
        product_id: Uuid,
        delta: i32,
    ) -> RepositoryResult<StockAdjustment>;

    /// Inserts the order header. Returns `false` without writing anything when
    /// the order number is already taken.
    async fn insert_order(&mut self, order: &Order) -> RepositoryResult<bool>;

    async fn insert_items(&mut self, items: &[OrderItem]) -> RepositoryResult<()>;

    /// Loads an order with its items and holds its row lock.
    async fn lock_order(&mut self, id: Uuid) -> RepositoryResult<Option<Order>>;

    /// Persists `status` and `updated_at`.
    async fn update_status(&mut self, order: &Order) -> RepositoryResult<()>;

    /// Persists `notes`, `delivery_address` and `updated_at`.
    async fn update_details(&mut self, order: &Order) -> RepositoryResult<()>;

    async fn append_timeline(&mut self, entry: &TimelineEntry) -> RepositoryResult<()>;

    async fn timeline(&mut self, order_id: Uuid) -> RepositoryResult<Vec<TimelineEntry>>;

    async fn commit(self: Box<Self>) -> RepositoryResult<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn begin(&self) -> RepositoryResult<Box<dyn UnitOfWork>>;

    async fn find_order(&self, id: Uuid) -> RepositoryResult<Option<Order>>;

    /// Entries oldest first.
    async fn order_timeline(&self, order_id: Uuid) -> RepositoryResult<Vec<TimelineEntry>>;

    /// Returns the requested page and the total number of matching orders.
    async fn list_orders(&self, filter: &OrderFilter) -> RepositoryResult<(Vec<Order>, i64)>;

    async fn ping(&self) -> RepositoryResult<()>;
}

/// Read-only analytics. Revenue figures only include
/// `OrderStatus::REVENUE_RECOGNIZED` orders.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn dashboard(
        &self,
        windows: &ReportWindows,
        low_stock_threshold: i32,
    ) -> RepositoryResult<DashboardStats>;

    async fn revenue_by_category(
        &self,
        since: DateTime<Utc>,
    ) -> RepositoryResult<Vec<CategoryRevenue>>;

    async fn top_products(
        &self,
        since: DateTime<Utc>,
        limit: u32,
    ) -> RepositoryResult<Vec<TopProduct>>;

    async fn low_stock(&self, threshold: i32) -> RepositoryResult<Vec<LowStockProduct>>;

    async fn recent_orders(
        &self,
        customer_id: Option<Uuid>,
        limit: u32,
    ) -> RepositoryResult<Vec<RecentOrder>>;

    /// Accounts with the customer role only; admins are not customers.
    async fn customer(&self, id: Uuid) -> RepositoryResult<Option<CustomerProfile>>;

    /// Returns the requested page of customer accounts and the total number
    /// matching.
    async fn list_customers(
        &self,
        filter: &CustomerFilter,
    ) -> RepositoryResult<(Vec<CustomerProfile>, i64)>;

    /// Number of orders and revenue-recognized spend for one customer.
    async fn customer_totals(&self, customer_id: Uuid) -> RepositoryResult<(i64, BigDecimal)>;
}
