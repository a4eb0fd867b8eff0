use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::postgres::{escape_like, parse_status, CustomerRow, PostgresStore};
use crate::domain::report::{
    CategoryRevenue, DashboardStats, LowStockProduct, RecentOrder, ReportWindows, TopProduct,
};
use crate::domain::{CustomerProfile, OrderStatus};
use crate::ports::{CustomerFilter, ReportStore, RepositoryResult};

fn revenue_statuses() -> Vec<String> {
    OrderStatus::REVENUE_RECOGNIZED
        .iter()
        .map(|s| s.as_str().to_string())
        .collect()
}

const CUSTOMER_WHERE: &str = r#"
    WHERE role = 'customer'
      AND ($1::text IS NULL
           OR full_name ILIKE $1 ESCAPE '\'
           OR email ILIKE $1 ESCAPE '\'
           OR phone ILIKE $1 ESCAPE '\')
"#;

#[async_trait]
impl ReportStore for PostgresStore {
    async fn dashboard(
        &self,
        windows: &ReportWindows,
        low_stock_threshold: i32,
    ) -> RepositoryResult<DashboardStats> {
        let orders = sqlx::query_as::<_, OrderCountersRow>(
            r#"
            SELECT
                COUNT(*) AS total_orders,
                COUNT(*) FILTER (WHERE created_at >= $1) AS orders_today,
                COUNT(*) FILTER (WHERE created_at >= $2) AS orders_this_week,
                COUNT(*) FILTER (WHERE created_at >= $3) AS orders_this_month,
                COUNT(*) FILTER (WHERE status = $5) AS pending_orders,
                COALESCE(SUM(total) FILTER (WHERE created_at >= $1 AND status = ANY($4)), 0)
                    AS revenue_today,
                COALESCE(SUM(total) FILTER (WHERE created_at >= $2 AND status = ANY($4)), 0)
                    AS revenue_this_week,
                COALESCE(SUM(total) FILTER (WHERE created_at >= $3 AND status = ANY($4)), 0)
                    AS revenue_this_month
            FROM orders
            "#,
        )
        .bind(windows.today)
        .bind(windows.week)
        .bind(windows.month)
        .bind(revenue_statuses())
        .bind(OrderStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await?;

        let (total_products, low_stock_count): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE is_active),
                COUNT(*) FILTER (WHERE is_active AND stock <= $1)
            FROM products
            "#,
        )
        .bind(low_stock_threshold)
        .fetch_one(&self.pool)
        .await?;

        let total_customers: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'customer'")
                .fetch_one(&self.pool)
                .await?;

        Ok(DashboardStats {
            total_products,
            total_orders: orders.total_orders,
            orders_today: orders.orders_today,
            orders_this_week: orders.orders_this_week,
            orders_this_month: orders.orders_this_month,
            revenue_today: orders.revenue_today,
            revenue_this_week: orders.revenue_this_week,
            revenue_this_month: orders.revenue_this_month,
            total_customers,
            low_stock_count,
            pending_orders: orders.pending_orders,
        })
    }

    async fn revenue_by_category(
        &self,
        since: DateTime<Utc>,
    ) -> RepositoryResult<Vec<CategoryRevenue>> {
        let rows = sqlx::query_as::<_, CategoryRevenueRow>(
            r#"
            SELECT
                c.name AS category_name,
                SUM(oi.unit_price * oi.quantity) AS revenue,
                COUNT(DISTINCT o.id) AS order_count
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            JOIN products p ON p.id = oi.product_id
            JOIN categories c ON c.id = p.category_id
            WHERE o.created_at >= $1 AND o.status = ANY($2)
            GROUP BY c.name
            ORDER BY revenue DESC, c.name ASC
            "#,
        )
        .bind(since)
        .bind(revenue_statuses())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| CategoryRevenue {
                category_name: r.category_name,
                revenue: r.revenue,
                order_count: r.order_count,
            })
            .collect())
    }

    async fn top_products(
        &self,
        since: DateTime<Utc>,
        limit: u32,
    ) -> RepositoryResult<Vec<TopProduct>> {
        let rows = sqlx::query_as::<_, TopProductRow>(
            r#"
            SELECT
                p.id AS product_id,
                p.name,
                p.images[1] AS image,
                SUM(oi.quantity)::BIGINT AS total_sold,
                SUM(oi.unit_price * oi.quantity) AS revenue
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            JOIN products p ON p.id = oi.product_id
            WHERE o.created_at >= $1 AND o.status = ANY($2)
            GROUP BY p.id, p.name, p.images
            ORDER BY total_sold DESC, revenue DESC
            LIMIT $3
            "#,
        )
        .bind(since)
        .bind(revenue_statuses())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| TopProduct {
                product_id: r.product_id,
                name: r.name,
                image: r.image,
                total_sold: r.total_sold,
                revenue: r.revenue,
            })
            .collect())
    }

    async fn low_stock(&self, threshold: i32) -> RepositoryResult<Vec<LowStockProduct>> {
        let rows = sqlx::query_as::<_, LowStockRow>(
            r#"
            SELECT id, name, stock, images[1] AS image
            FROM products
            WHERE is_active AND stock <= $1
            ORDER BY stock ASC, name ASC
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| LowStockProduct {
                id: r.id,
                name: r.name,
                stock: r.stock,
                image: r.image,
            })
            .collect())
    }

    async fn recent_orders(
        &self,
        customer_id: Option<Uuid>,
        limit: u32,
    ) -> RepositoryResult<Vec<RecentOrder>> {
        let rows = sqlx::query_as::<_, RecentOrderRow>(
            r#"
            SELECT
                o.id, o.order_number, o.customer_name, o.total, o.status, o.created_at,
                (SELECT COUNT(*) FROM order_items oi WHERE oi.order_id = o.id) AS items_count
            FROM orders o
            WHERE ($1::uuid IS NULL OR o.customer_id = $1)
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $2
            "#,
        )
        .bind(customer_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RecentOrderRow::into_domain).collect()
    }

    async fn customer(&self, id: Uuid) -> RepositoryResult<Option<CustomerProfile>> {
        let row = sqlx::query_as::<_, CustomerRow>(
            "SELECT id, full_name, phone, email FROM users WHERE id = $1 AND role = 'customer'",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CustomerRow::into_domain))
    }

    async fn list_customers(
        &self,
        filter: &CustomerFilter,
    ) -> RepositoryResult<(Vec<CustomerProfile>, i64)> {
        let pattern = filter
            .search
            .as_deref()
            .map(|needle| format!("%{}%", escape_like(needle)));

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users {}", CUSTOMER_WHERE))
                .bind(pattern.as_deref())
                .fetch_one(&self.pool)
                .await?;

        let sql = format!(
            "SELECT id, full_name, phone, email FROM users {} \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
            CUSTOMER_WHERE
        );
        let rows = sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(pattern.as_deref())
            .bind(filter.limit as i64)
            .bind(filter.offset as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok((rows.into_iter().map(CustomerRow::into_domain).collect(), total))
    }

    async fn customer_totals(&self, customer_id: Uuid) -> RepositoryResult<(i64, BigDecimal)> {
        let totals: (i64, BigDecimal) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(total) FILTER (WHERE status = ANY($2)), 0)
            FROM orders
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id)
        .bind(revenue_statuses())
        .fetch_one(&self.pool)
        .await?;

        Ok(totals)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderCountersRow {
    total_orders: i64,
    orders_today: i64,
    orders_this_week: i64,
    orders_this_month: i64,
    pending_orders: i64,
    revenue_today: BigDecimal,
    revenue_this_week: BigDecimal,
    revenue_this_month: BigDecimal,
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRevenueRow {
    category_name: String,
    revenue: BigDecimal,
    order_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct TopProductRow {
    product_id: Uuid,
    name: String,
    image: Option<String>,
    total_sold: i64,
    revenue: BigDecimal,
}

#[derive(Debug, sqlx::FromRow)]
struct LowStockRow {
    id: Uuid,
    name: String,
    stock: i32,
    image: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct RecentOrderRow {
    id: Uuid,
    order_number: String,
    customer_name: String,
    total: BigDecimal,
    status: String,
    created_at: DateTime<Utc>,
    items_count: i64,
}

impl RecentOrderRow {
    fn into_domain(self) -> RepositoryResult<RecentOrder> {
        Ok(RecentOrder {
            id: self.id,
            order_number: self.order_number,
            customer_name: self.customer_name,
            total: self.total,
            status: parse_status(&self.status)?,
            created_at: self.created_at,
            items_count: self.items_count,
        })
    }
}
