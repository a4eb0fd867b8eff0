//! Postgres implementation of the order store.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgExecutor;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::{
    CatalogProduct, CustomerProfile, Order, OrderItem, OrderStatus, StockAdjustment,
    TimelineEntry,
};
use crate::ports::{OrderFilter, OrderStore, RepositoryError, RepositoryResult, UnitOfWork};

pub(crate) const ORDER_COLUMNS: &str = "id, order_number, customer_id, customer_name, \
    customer_phone, customer_email, delivery_address, subtotal, delivery_fee, total, status, \
    notes, created_at, updated_at";

/// Postgres-backed order store. Also implements the reporting queries.
#[derive(Clone)]
pub struct PostgresStore {
    pub(crate) pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn begin(&self) -> RepositoryResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn find_order(&self, id: Uuid) -> RepositoryResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let mut items = fetch_items(&self.pool, &[row.id]).await?;
                let items = items.remove(&row.id).unwrap_or_default();
                Ok(Some(row.into_domain(items)?))
            }
            None => Ok(None),
        }
    }

    async fn order_timeline(&self, order_id: Uuid) -> RepositoryResult<Vec<TimelineEntry>> {
        fetch_timeline(&self.pool, order_id).await
    }

    async fn list_orders(&self, filter: &OrderFilter) -> RepositoryResult<(Vec<Order>, i64)> {
        let pattern = filter
            .search
            .as_deref()
            .map(|needle| format!("%{}%", escape_like(needle)));
        let status = filter.status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM orders {}", LIST_WHERE))
            .bind(filter.customer_id)
            .bind(status)
            .bind(pattern.as_deref())
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {} FROM orders {} ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5",
            ORDER_COLUMNS, LIST_WHERE
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(filter.customer_id)
            .bind(status)
            .bind(pattern.as_deref())
            .bind(filter.limit as i64)
            .bind(filter.offset as i64)
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items = fetch_items(&self.pool, &ids).await?;
        let orders = rows
            .into_iter()
            .map(|row| {
                let row_items = items.remove(&row.id).unwrap_or_default();
                row.into_domain(row_items)
            })
            .collect::<RepositoryResult<Vec<_>>>()?;

        Ok((orders, total))
    }

    async fn ping(&self) -> RepositoryResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

const LIST_WHERE: &str = r#"
    WHERE ($1::uuid IS NULL OR customer_id = $1)
      AND ($2::text IS NULL OR status = $2)
      AND ($3::text IS NULL
           OR order_number ILIKE $3 ESCAPE '\'
           OR customer_name ILIKE $3 ESCAPE '\'
           OR customer_phone ILIKE $3 ESCAPE '\')
"#;

/// Makes `%`, `_` and `\` in user input match literally inside ILIKE.
pub(crate) fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// A database transaction. Rolled back by sqlx if dropped before `commit`.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn customer(&mut self, id: Uuid) -> RepositoryResult<Option<CustomerProfile>> {
        fetch_customer(&mut *self.tx, id).await
    }

    async fn lock_products(&mut self, ids: &[Uuid]) -> RepositoryResult<Vec<CatalogProduct>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, price, stock, images, category_id, is_active
            FROM products
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(ProductRow::into_domain).collect())
    }

    async fn adjust_stock(
        &mut self,
        product_id: Uuid,
        delta: i32,
    ) -> RepositoryResult<StockAdjustment> {
        // The guard and the write are one statement, so two transactions can
        // never both spend the same unit.
        let applied: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock = stock + $2, updated_at = NOW()
            WHERE id = $1 AND stock + $2 >= 0
            RETURNING stock
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some(stock) = applied {
            return Ok(StockAdjustment::Applied { stock });
        }

        let available: Option<i32> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(match available {
            Some(available) => StockAdjustment::Insufficient { available },
            None => StockAdjustment::UnknownProduct,
        })
    }

    async fn insert_order(&mut self, order: &Order) -> RepositoryResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, customer_id, customer_name, customer_phone, customer_email,
                delivery_address, subtotal, delivery_fee, total, status, notes,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (order_number) DO NOTHING
            "#,
        )
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.customer_id)
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(&order.customer_email)
        .bind(&order.delivery_address)
        .bind(&order.subtotal)
        .bind(&order.delivery_fee)
        .bind(&order.total)
        .bind(order.status.as_str())
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_items(&mut self, items: &[OrderItem]) -> RepositoryResult<()> {
        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, product_name, unit_price, product_image,
                    quantity, color, position
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(&item.unit_price)
            .bind(&item.product_image)
            .bind(item.quantity)
            .bind(&item.color)
            .bind(item.position)
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn lock_order(&mut self, id: Uuid) -> RepositoryResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1 FOR UPDATE", ORDER_COLUMNS);
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut items = fetch_items(&mut *self.tx, &[row.id]).await?;
        let items = items.remove(&row.id).unwrap_or_default();
        Ok(Some(row.into_domain(items)?))
    }

    async fn update_status(&mut self, order: &Order) -> RepositoryResult<()> {
        sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(order.id)
            .bind(order.status.as_str())
            .bind(order.updated_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn update_details(&mut self, order: &Order) -> RepositoryResult<()> {
        sqlx::query(
            "UPDATE orders SET notes = $2, delivery_address = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(order.id)
        .bind(&order.notes)
        .bind(&order.delivery_address)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn append_timeline(&mut self, entry: &TimelineEntry) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO order_timeline (id, order_id, status, note, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id)
        .bind(entry.order_id)
        .bind(entry.status.as_str())
        .bind(&entry.note)
        .bind(&entry.created_by)
        .bind(entry.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn timeline(&mut self, order_id: Uuid) -> RepositoryResult<Vec<TimelineEntry>> {
        fetch_timeline(&mut *self.tx, order_id).await
    }

    async fn commit(self: Box<Self>) -> RepositoryResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

async fn fetch_customer<'e, E>(
    executor: E,
    id: Uuid,
) -> RepositoryResult<Option<CustomerProfile>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, CustomerRow>(
        "SELECT id, full_name, phone, email FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(CustomerRow::into_domain))
}

async fn fetch_items<'e, E>(
    executor: E,
    order_ids: &[Uuid],
) -> RepositoryResult<HashMap<Uuid, Vec<OrderItem>>>
where
    E: PgExecutor<'e>,
{
    let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    if order_ids.is_empty() {
        return Ok(grouped);
    }

    let rows = sqlx::query_as::<_, OrderItemRow>(
        r#"
        SELECT id, order_id, product_id, product_name, unit_price, product_image,
               quantity, color, position
        FROM order_items
        WHERE order_id = ANY($1)
        ORDER BY order_id, position
        "#,
    )
    .bind(order_ids)
    .fetch_all(executor)
    .await?;

    for row in rows {
        grouped.entry(row.order_id).or_default().push(row.into_domain());
    }
    Ok(grouped)
}

async fn fetch_timeline<'e, E>(executor: E, order_id: Uuid) -> RepositoryResult<Vec<TimelineEntry>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, TimelineRow>(
        r#"
        SELECT id, order_id, status, note, created_by, created_at
        FROM order_timeline
        WHERE order_id = $1
        ORDER BY created_at ASC, seq ASC
        "#,
    )
    .bind(order_id)
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(TimelineRow::into_domain).collect()
}

pub(crate) fn parse_status(raw: &str) -> RepositoryResult<OrderStatus> {
    raw.parse()
        .map_err(|e: crate::domain::status::UnknownStatus| RepositoryError::Corrupt(e.to_string()))
}

// Internal row types for SQLx. Not exposed outside the adapter.

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    customer_id: Uuid,
    customer_name: String,
    customer_phone: String,
    customer_email: Option<String>,
    delivery_address: String,
    subtotal: BigDecimal,
    delivery_fee: BigDecimal,
    total: BigDecimal,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_domain(self, items: Vec<OrderItem>) -> RepositoryResult<Order> {
        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            customer_email: self.customer_email,
            delivery_address: self.delivery_address,
            subtotal: self.subtotal,
            delivery_fee: self.delivery_fee,
            total: self.total,
            status: parse_status(&self.status)?,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    product_name: String,
    unit_price: BigDecimal,
    product_image: Option<String>,
    quantity: i32,
    color: Option<String>,
    position: i32,
}

impl OrderItemRow {
    fn into_domain(self) -> OrderItem {
        OrderItem {
            id: self.id,
            order_id: self.order_id,
            product_id: self.product_id,
            product_name: self.product_name,
            unit_price: self.unit_price,
            product_image: self.product_image,
            quantity: self.quantity,
            color: self.color,
            position: self.position,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TimelineRow {
    id: Uuid,
    order_id: Uuid,
    status: String,
    note: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl TimelineRow {
    fn into_domain(self) -> RepositoryResult<TimelineEntry> {
        Ok(TimelineEntry {
            id: self.id,
            order_id: self.order_id,
            status: parse_status(&self.status)?,
            note: self.note,
            created_by: self.created_by,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    price: BigDecimal,
    stock: i32,
    images: Vec<String>,
    category_id: Option<Uuid>,
    is_active: bool,
}

impl ProductRow {
    fn into_domain(self) -> CatalogProduct {
        CatalogProduct {
            id: self.id,
            name: self.name,
            price: self.price,
            stock: self.stock,
            images: self.images,
            category_id: self.category_id,
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CustomerRow {
    id: Uuid,
    full_name: String,
    phone: String,
    email: Option<String>,
}

impl CustomerRow {
    pub(crate) fn into_domain(self) -> CustomerProfile {
        CustomerProfile {
            id: self.id,
            full_name: self.full_name,
            phone: self.phone,
            email: self.email,
        }
    }
}
