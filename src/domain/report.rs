//! Read models returned by the reporter.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::catalog::CustomerProfile;
use super::order::page_count;
use super::status::OrderStatus;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_products: i64,
    pub total_orders: i64,
    pub orders_today: i64,
    pub orders_this_week: i64,
    pub orders_this_month: i64,
    pub revenue_today: BigDecimal,
    pub revenue_this_week: BigDecimal,
    pub revenue_this_month: BigDecimal,
    pub total_customers: i64,
    pub low_stock_count: i64,
    pub pending_orders: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryRevenue {
    pub category_name: String,
    pub revenue: BigDecimal,
    pub order_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub total_sold: i64,
    pub revenue: BigDecimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct LowStockProduct {
    pub id: Uuid,
    pub name: String,
    pub stock: i32,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentOrder {
    pub id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub total: BigDecimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub items_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerSummary {
    pub customer: CustomerProfile,
    pub total_orders: i64,
    pub total_spent: BigDecimal,
    pub recent_orders: Vec<RecentOrder>,
}

/// One page of customer accounts, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerPage {
    pub customers: Vec<CustomerProfile>,
    pub total: i64,
    pub page: u32,
    pub pages: u32,
}

impl CustomerPage {
    pub fn new(customers: Vec<CustomerProfile>, total: i64, page: u32, limit: u32) -> Self {
        Self {
            customers,
            total,
            page,
            pages: page_count(total, limit),
        }
    }
}

/// Start instants of the dashboard's calendar windows, all in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindows {
    pub today: DateTime<Utc>,
    /// Monday of the current week.
    pub week: DateTime<Utc>,
    pub month: DateTime<Utc>,
}

impl ReportWindows {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let week = midnight - Duration::days(now.weekday().num_days_from_monday() as i64);
        let month = midnight - Duration::days(now.day0() as i64);
        Self {
            today: midnight,
            week,
            month,
        }
    }
}
