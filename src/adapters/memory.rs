//! In-memory order store.
//!
//! Units of work are serialized behind one async mutex and write to a staged
//! copy of the state, which replaces the live state on commit. No I/O, so it
//! backs the test suites and local runs without Postgres.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::report::{
    CategoryRevenue, DashboardStats, LowStockProduct, RecentOrder, ReportWindows, TopProduct,
};
use crate::domain::{
    CatalogProduct, CustomerProfile, Order, OrderItem, OrderStatus, Role, StockAdjustment,
    TimelineEntry,
};
use crate::ports::{
    CustomerFilter, OrderFilter, OrderStore, ReportStore, RepositoryError, RepositoryResult,
    UnitOfWork,
};

#[derive(Debug, Clone, Default)]
struct State {
    customers: HashMap<Uuid, (CustomerProfile, Role)>,
    /// Customer ids in registration order.
    registered: Vec<Uuid>,
    categories: HashMap<Uuid, String>,
    products: BTreeMap<Uuid, CatalogProduct>,
    orders: HashMap<Uuid, Order>,
    timeline: Vec<(u64, TimelineEntry)>,
    next_seq: u64,
}

impl State {
    fn timeline_for(&self, order_id: Uuid) -> Vec<TimelineEntry> {
        let mut entries: Vec<&(u64, TimelineEntry)> = self
            .timeline
            .iter()
            .filter(|(_, entry)| entry.order_id == order_id)
            .collect();
        entries.sort_by_key(|(seq, entry)| (entry.created_at, *seq));
        entries.into_iter().map(|(_, entry)| entry.clone()).collect()
    }

    fn order_with_sorted_items(&self, id: Uuid) -> Option<Order> {
        let mut order = self.orders.get(&id).cloned()?;
        order.items.sort_by_key(|item| item.position);
        Some(order)
    }

    /// Orders newest first, ties broken by id descending.
    fn orders_newest_first(&self) -> Vec<&Order> {
        let mut orders: Vec<&Order> = self.orders.values().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        orders
    }

    fn recognized_lines_since(&self, since: DateTime<Utc>) -> impl Iterator<Item = &OrderItem> {
        self.orders
            .values()
            .filter(move |o| o.created_at >= since && o.status.is_revenue_recognized())
            .flat_map(|o| o.items.iter())
    }
}

#[derive(Debug, Default)]
struct Faults {
    fail_timeline_append: AtomicBool,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    faults: Arc<Faults>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_customer(&self, profile: CustomerProfile, role: Role) {
        let mut state = self.state.lock().await;
        if !state.customers.contains_key(&profile.id) {
            state.registered.push(profile.id);
        }
        state.customers.insert(profile.id, (profile, role));
    }

    pub async fn insert_category(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().await.categories.insert(id, name.to_string());
        id
    }

    pub async fn insert_product(&self, product: CatalogProduct) {
        self.state.lock().await.products.insert(product.id, product);
    }

    pub async fn product_stock(&self, id: Uuid) -> Option<i32> {
        self.state.lock().await.products.get(&id).map(|p| p.stock)
    }

    /// Moves an order's creation time, e.g. to place it outside a report window.
    #[doc(hidden)]
    pub async fn backdate_order(&self, id: Uuid, created_at: DateTime<Utc>) -> bool {
        match self.state.lock().await.orders.get_mut(&id) {
            Some(order) => {
                order.created_at = created_at;
                true
            }
            None => false,
        }
    }

    /// Makes the next timeline append fail, aborting whatever unit of work
    /// issued it.
    #[doc(hidden)]
    pub fn fail_next_timeline_append(&self) {
        self.faults.fail_timeline_append.store(true, Ordering::SeqCst);
    }
}

pub struct MemoryUnitOfWork {
    live: OwnedMutexGuard<State>,
    staged: State,
    faults: Arc<Faults>,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn customer(&mut self, id: Uuid) -> RepositoryResult<Option<CustomerProfile>> {
        Ok(self.staged.customers.get(&id).map(|(p, _)| p.clone()))
    }

    async fn lock_products(&mut self, ids: &[Uuid]) -> RepositoryResult<Vec<CatalogProduct>> {
        let mut products: Vec<CatalogProduct> = ids
            .iter()
            .filter_map(|id| self.staged.products.get(id).cloned())
            .collect();
        products.sort_by_key(|p| p.id);
        products.dedup_by_key(|p| p.id);
        Ok(products)
    }

    async fn adjust_stock(
        &mut self,
        product_id: Uuid,
        delta: i32,
    ) -> RepositoryResult<StockAdjustment> {
        let Some(product) = self.staged.products.get_mut(&product_id) else {
            return Ok(StockAdjustment::UnknownProduct);
        };
        let next = product.stock.checked_add(delta).ok_or_else(|| {
            RepositoryError::Backend(format!("stock of product {} out of range", product_id))
        })?;
        if next < 0 {
            return Ok(StockAdjustment::Insufficient {
                available: product.stock,
            });
        }
        product.stock = next;
        Ok(StockAdjustment::Applied { stock: next })
    }

    async fn insert_order(&mut self, order: &Order) -> RepositoryResult<bool> {
        let taken = self
            .staged
            .orders
            .values()
            .any(|o| o.order_number == order.order_number);
        if taken {
            return Ok(false);
        }
        let mut header = order.clone();
        header.items.clear();
        self.staged.orders.insert(header.id, header);
        Ok(true)
    }

    async fn insert_items(&mut self, items: &[OrderItem]) -> RepositoryResult<()> {
        for item in items {
            let order = self.staged.orders.get_mut(&item.order_id).ok_or_else(|| {
                RepositoryError::Backend(format!("order {} does not exist", item.order_id))
            })?;
            order.items.push(item.clone());
        }
        Ok(())
    }

    async fn lock_order(&mut self, id: Uuid) -> RepositoryResult<Option<Order>> {
        Ok(self.staged.order_with_sorted_items(id))
    }

    async fn update_status(&mut self, order: &Order) -> RepositoryResult<()> {
        let stored = self.stored_order(order.id)?;
        stored.status = order.status;
        stored.updated_at = order.updated_at;
        Ok(())
    }

    async fn update_details(&mut self, order: &Order) -> RepositoryResult<()> {
        let stored = self.stored_order(order.id)?;
        stored.notes = order.notes.clone();
        stored.delivery_address = order.delivery_address.clone();
        stored.updated_at = order.updated_at;
        Ok(())
    }

    async fn append_timeline(&mut self, entry: &TimelineEntry) -> RepositoryResult<()> {
        if self.faults.fail_timeline_append.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::Backend(
                "injected timeline append failure".to_string(),
            ));
        }
        let seq = self.staged.next_seq;
        self.staged.next_seq += 1;
        self.staged.timeline.push((seq, entry.clone()));
        Ok(())
    }

    async fn timeline(&mut self, order_id: Uuid) -> RepositoryResult<Vec<TimelineEntry>> {
        Ok(self.staged.timeline_for(order_id))
    }

    async fn commit(self: Box<Self>) -> RepositoryResult<()> {
        let MemoryUnitOfWork {
            mut live, staged, ..
        } = *self;
        *live = staged;
        Ok(())
    }
}

impl MemoryUnitOfWork {
    fn stored_order(&mut self, id: Uuid) -> RepositoryResult<&mut Order> {
        self.staged
            .orders
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::Backend(format!("order {} does not exist", id)))
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn begin(&self) -> RepositoryResult<Box<dyn UnitOfWork>> {
        let live = self.state.clone().lock_owned().await;
        let staged = (*live).clone();
        Ok(Box::new(MemoryUnitOfWork {
            live,
            staged,
            faults: self.faults.clone(),
        }))
    }

    async fn find_order(&self, id: Uuid) -> RepositoryResult<Option<Order>> {
        Ok(self.state.lock().await.order_with_sorted_items(id))
    }

    async fn order_timeline(&self, order_id: Uuid) -> RepositoryResult<Vec<TimelineEntry>> {
        Ok(self.state.lock().await.timeline_for(order_id))
    }

    async fn list_orders(&self, filter: &OrderFilter) -> RepositoryResult<(Vec<Order>, i64)> {
        let state = self.state.lock().await;
        let matching: Vec<&Order> = state
            .orders_newest_first()
            .into_iter()
            .filter(|o| filter.customer_id.map_or(true, |id| o.customer_id == id))
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .filter(|o| filter.matches_search(o))
            .collect();

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .filter_map(|o| state.order_with_sorted_items(o.id))
            .collect();
        Ok((page, total))
    }

    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ReportStore for InMemoryStore {
    async fn dashboard(
        &self,
        windows: &ReportWindows,
        low_stock_threshold: i32,
    ) -> RepositoryResult<DashboardStats> {
        let state = self.state.lock().await;
        let orders: Vec<&Order> = state.orders.values().collect();

        let count_since = |since: DateTime<Utc>| {
            orders.iter().filter(|o| o.created_at >= since).count() as i64
        };
        let revenue_since = |since: DateTime<Utc>| {
            orders
                .iter()
                .filter(|o| o.created_at >= since && o.status.is_revenue_recognized())
                .fold(BigDecimal::from(0), |acc, o| acc + &o.total)
        };
        let active = state.products.values().filter(|p| p.is_active);

        Ok(DashboardStats {
            total_products: active.clone().count() as i64,
            total_orders: orders.len() as i64,
            orders_today: count_since(windows.today),
            orders_this_week: count_since(windows.week),
            orders_this_month: count_since(windows.month),
            revenue_today: revenue_since(windows.today),
            revenue_this_week: revenue_since(windows.week),
            revenue_this_month: revenue_since(windows.month),
            total_customers: state
                .customers
                .values()
                .filter(|(_, role)| *role == Role::Customer)
                .count() as i64,
            low_stock_count: active.filter(|p| p.stock <= low_stock_threshold).count() as i64,
            pending_orders: orders
                .iter()
                .filter(|o| o.status == OrderStatus::Pending)
                .count() as i64,
        })
    }

    async fn revenue_by_category(
        &self,
        since: DateTime<Utc>,
    ) -> RepositoryResult<Vec<CategoryRevenue>> {
        let state = self.state.lock().await;
        let mut by_category: HashMap<&str, (BigDecimal, Vec<Uuid>)> = HashMap::new();

        for item in state.recognized_lines_since(since) {
            let Some(name) = state
                .products
                .get(&item.product_id)
                .and_then(|p| p.category_id)
                .and_then(|id| state.categories.get(&id))
            else {
                continue;
            };
            let entry = by_category
                .entry(name.as_str())
                .or_insert_with(|| (BigDecimal::from(0), Vec::new()));
            entry.0 += item.line_total();
            if !entry.1.contains(&item.order_id) {
                entry.1.push(item.order_id);
            }
        }

        let mut rows: Vec<CategoryRevenue> = by_category
            .into_iter()
            .map(|(name, (revenue, orders))| CategoryRevenue {
                category_name: name.to_string(),
                revenue,
                order_count: orders.len() as i64,
            })
            .collect();
        rows.sort_by(|a, b| {
            b.revenue
                .cmp(&a.revenue)
                .then_with(|| a.category_name.cmp(&b.category_name))
        });
        Ok(rows)
    }

    async fn top_products(
        &self,
        since: DateTime<Utc>,
        limit: u32,
    ) -> RepositoryResult<Vec<TopProduct>> {
        let state = self.state.lock().await;
        let mut by_product: HashMap<Uuid, (i64, BigDecimal)> = HashMap::new();

        for item in state.recognized_lines_since(since) {
            let entry = by_product
                .entry(item.product_id)
                .or_insert_with(|| (0, BigDecimal::from(0)));
            entry.0 += item.quantity as i64;
            entry.1 += item.line_total();
        }

        let mut rows: Vec<TopProduct> = by_product
            .into_iter()
            .filter_map(|(id, (total_sold, revenue))| {
                let product = state.products.get(&id)?;
                Some(TopProduct {
                    product_id: id,
                    name: product.name.clone(),
                    image: product.primary_image().map(str::to_string),
                    total_sold,
                    revenue,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            b.total_sold
                .cmp(&a.total_sold)
                .then_with(|| b.revenue.cmp(&a.revenue))
                .then_with(|| a.name.cmp(&b.name))
        });
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn low_stock(&self, threshold: i32) -> RepositoryResult<Vec<LowStockProduct>> {
        let state = self.state.lock().await;
        let mut rows: Vec<LowStockProduct> = state
            .products
            .values()
            .filter(|p| p.is_active && p.stock <= threshold)
            .map(|p| LowStockProduct {
                id: p.id,
                name: p.name.clone(),
                stock: p.stock,
                image: p.primary_image().map(str::to_string),
            })
            .collect();
        rows.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));
        Ok(rows)
    }

    async fn recent_orders(
        &self,
        customer_id: Option<Uuid>,
        limit: u32,
    ) -> RepositoryResult<Vec<RecentOrder>> {
        let state = self.state.lock().await;
        Ok(state
            .orders_newest_first()
            .into_iter()
            .filter(|o| customer_id.map_or(true, |id| o.customer_id == id))
            .take(limit as usize)
            .map(|o| RecentOrder {
                id: o.id,
                order_number: o.order_number.clone(),
                customer_name: o.customer_name.clone(),
                total: o.total.clone(),
                status: o.status,
                created_at: o.created_at,
                items_count: o.items.len() as i64,
            })
            .collect())
    }

    async fn customer(&self, id: Uuid) -> RepositoryResult<Option<CustomerProfile>> {
        let state = self.state.lock().await;
        Ok(state
            .customers
            .get(&id)
            .filter(|(_, role)| *role == Role::Customer)
            .map(|(p, _)| p.clone()))
    }

    async fn list_customers(
        &self,
        filter: &CustomerFilter,
    ) -> RepositoryResult<(Vec<CustomerProfile>, i64)> {
        let state = self.state.lock().await;
        let matching: Vec<&CustomerProfile> = state
            .registered
            .iter()
            .rev()
            .filter_map(|id| state.customers.get(id))
            .filter(|(_, role)| *role == Role::Customer)
            .map(|(profile, _)| profile)
            .filter(|profile| filter.matches_search(profile))
            .collect();

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn customer_totals(&self, customer_id: Uuid) -> RepositoryResult<(i64, BigDecimal)> {
        let state = self.state.lock().await;
        let orders = state.orders.values().filter(|o| o.customer_id == customer_id);
        let count = orders.clone().count() as i64;
        let spent = orders
            .filter(|o| o.status.is_revenue_recognized())
            .fold(BigDecimal::from(0), |acc, o| acc + &o.total);
        Ok((count, spent))
    }
}
