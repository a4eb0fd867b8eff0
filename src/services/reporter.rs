use chrono::{Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::OrderPolicy;
use crate::domain::report::{
    CategoryRevenue, CustomerPage, CustomerSummary, DashboardStats, LowStockProduct, RecentOrder,
    ReportWindows, TopProduct,
};
use crate::domain::Actor;
use crate::error::{AppError, AppResult};
use crate::ports::{CustomerFilter, ReportStore};
use crate::validation::{
    sanitize_optional, validate_max_len, validate_range, ValidationError, MAX_SEARCH_LEN,
};

const DEFAULT_REPORT_DAYS: u32 = 30;
const DEFAULT_REPORT_LIMIT: u32 = 10;
const MAX_REPORT_LIMIT: u32 = 50;
const CUSTOMER_RECENT_ORDERS: u32 = 10;
const DEFAULT_CUSTOMER_PAGE_SIZE: u32 = 20;
const MAX_CUSTOMER_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeriodQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopProductsQuery {
    pub limit: Option<u32>,
    pub days: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LowStockQuery {
    pub threshold: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

/// Admin analytics. Read-only; revenue counts confirmed and delivered orders
/// only.
pub struct Reporter {
    store: Arc<dyn ReportStore>,
    policy: OrderPolicy,
}

impl Reporter {
    pub fn new(store: Arc<dyn ReportStore>, policy: OrderPolicy) -> Self {
        Self { store, policy }
    }

    pub async fn dashboard(&self, actor: &Actor) -> AppResult<DashboardStats> {
        require_admin(actor)?;
        let windows = ReportWindows::starting_at(Utc::now());
        Ok(self
            .store
            .dashboard(&windows, self.policy.low_stock_threshold)
            .await?)
    }

    pub async fn revenue_by_category(
        &self,
        actor: &Actor,
        query: PeriodQuery,
    ) -> AppResult<Vec<CategoryRevenue>> {
        require_admin(actor)?;
        let days = self.days(query.days)?;
        let since = Utc::now() - Duration::days(days as i64);
        Ok(self.store.revenue_by_category(since).await?)
    }

    pub async fn top_products(
        &self,
        actor: &Actor,
        query: TopProductsQuery,
    ) -> AppResult<Vec<TopProduct>> {
        require_admin(actor)?;
        let limit = limit(query.limit)?;
        let days = self.days(query.days)?;
        let since = Utc::now() - Duration::days(days as i64);
        Ok(self.store.top_products(since, limit).await?)
    }

    pub async fn low_stock(
        &self,
        actor: &Actor,
        query: LowStockQuery,
    ) -> AppResult<Vec<LowStockProduct>> {
        require_admin(actor)?;
        let threshold = query.threshold.unwrap_or(self.policy.low_stock_threshold);
        if threshold < 1 {
            return Err(ValidationError::new("threshold", "must be at least 1").into());
        }
        Ok(self.store.low_stock(threshold).await?)
    }

    pub async fn recent_orders(
        &self,
        actor: &Actor,
        query: LimitQuery,
    ) -> AppResult<Vec<RecentOrder>> {
        require_admin(actor)?;
        let limit = limit(query.limit)?;
        Ok(self.store.recent_orders(None, limit).await?)
    }

    pub async fn customers(&self, actor: &Actor, query: CustomerQuery) -> AppResult<CustomerPage> {
        require_admin(actor)?;
        let page = query.page.unwrap_or(1);
        if page < 1 {
            return Err(ValidationError::new("page", "must be at least 1").into());
        }
        let limit = query.limit.unwrap_or(DEFAULT_CUSTOMER_PAGE_SIZE);
        validate_range("limit", limit, 1, MAX_CUSTOMER_PAGE_SIZE)?;
        let search = sanitize_optional(query.search.as_deref());
        if let Some(needle) = &search {
            validate_max_len("search", needle, MAX_SEARCH_LEN)?;
        }

        let filter = CustomerFilter {
            search,
            limit,
            offset: (page as u64 - 1) * limit as u64,
        };
        let (customers, total) = self.store.list_customers(&filter).await?;
        Ok(CustomerPage::new(customers, total, page, limit))
    }

    pub async fn customer_summary(
        &self,
        actor: &Actor,
        customer_id: Uuid,
    ) -> AppResult<CustomerSummary> {
        require_admin(actor)?;
        let customer = self
            .store
            .customer(customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Customer {} not found", customer_id)))?;
        let (total_orders, total_spent) = self.store.customer_totals(customer_id).await?;
        let recent_orders = self
            .store
            .recent_orders(Some(customer_id), CUSTOMER_RECENT_ORDERS)
            .await?;

        Ok(CustomerSummary {
            customer,
            total_orders,
            total_spent,
            recent_orders,
        })
    }

    fn days(&self, days: Option<u32>) -> AppResult<u32> {
        let days = days.unwrap_or(DEFAULT_REPORT_DAYS);
        validate_range("days", days, 1, self.policy.max_report_days)?;
        Ok(days)
    }
}

fn limit(limit: Option<u32>) -> AppResult<u32> {
    let limit = limit.unwrap_or(DEFAULT_REPORT_LIMIT);
    validate_range("limit", limit, 1, MAX_REPORT_LIMIT)?;
    Ok(limit)
}

fn require_admin(actor: &Actor) -> AppResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::AccessDenied("Admin access required".to_string()))
    }
}
