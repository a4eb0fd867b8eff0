//! Order aggregate: header, line-item snapshots and the status timeline.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::actor::Actor;
use super::catalog::{CatalogProduct, CustomerProfile};
use super::status::{OrderStatus, Transition};

pub const ORDER_PLACED_NOTE: &str = "Order placed";
pub const ORDER_CANCELLED_NOTE: &str = "Order cancelled";

/// A committed purchase with its customer snapshot and money totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub delivery_address: String,
    pub subtotal: BigDecimal,
    pub delivery_fee: BigDecimal,
    pub total: BigDecimal,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Builds a new `pending` order from priced cart lines.
    ///
    /// The subtotal is always recomputed from the catalog prices captured in
    /// `lines`; the delivery fee is currently fixed at zero.
    pub fn place(
        order_number: String,
        customer: &CustomerProfile,
        lines: Vec<PricedLine>,
        delivery_address: String,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let id = Uuid::new_v4();
        let items: Vec<OrderItem> = lines
            .into_iter()
            .enumerate()
            .map(|(position, line)| OrderItem {
                id: Uuid::new_v4(),
                order_id: id,
                product_id: line.product.id,
                product_name: line.product.name.clone(),
                unit_price: line.product.price.clone(),
                product_image: line.product.primary_image().map(str::to_string),
                quantity: line.quantity,
                color: line.color,
                position: position as i32,
            })
            .collect();

        let subtotal = sum_line_totals(&items);
        let delivery_fee = BigDecimal::from(0);
        let total = &subtotal + &delivery_fee;

        Self {
            id,
            order_number,
            customer_id: customer.id,
            customer_name: customer.full_name.clone(),
            customer_phone: customer.phone.clone(),
            customer_email: customer.email.clone(),
            delivery_address,
            subtotal,
            delivery_fee,
            total,
            status: OrderStatus::Pending,
            notes,
            created_at: now,
            updated_at: now,
            items,
        }
    }

    pub fn items_subtotal(&self) -> BigDecimal {
        sum_line_totals(&self.items)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Moves the order to `to` and returns the audit entry that must be
    /// persisted alongside the new status.
    pub fn apply_transition(
        &mut self,
        transition: &Transition,
        note: Option<String>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> TimelineEntry {
        self.status = transition.to;
        self.updated_at = now;
        let note = note.unwrap_or_else(|| transition.default_note());
        TimelineEntry::record(self.id, transition.to, note, actor, now)
    }
}

fn sum_line_totals(items: &[OrderItem]) -> BigDecimal {
    items
        .iter()
        .fold(BigDecimal::from(0), |acc, item| acc + item.line_total())
}

/// A cart line after its product has been resolved against the catalog.
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub product: CatalogProduct,
    pub quantity: i32,
    pub color: Option<String>,
}

/// Immutable snapshot of one purchased product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: BigDecimal,
    pub product_image: Option<String>,
    pub quantity: i32,
    pub color: Option<String>,
    pub position: i32,
}

impl OrderItem {
    pub fn line_total(&self) -> BigDecimal {
        &self.unit_price * &BigDecimal::from(self.quantity)
    }
}

/// Append-only record of a status being entered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub note: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl TimelineEntry {
    pub fn record(
        order_id: Uuid,
        status: OrderStatus,
        note: impl Into<String>,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            status,
            note: Some(note.into()),
            created_by: actor.display_name.clone(),
            created_at: at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub timeline: Vec<TimelineEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: i64,
    pub page: u32,
    pub pages: u32,
}

impl OrderPage {
    pub fn new(orders: Vec<Order>, total: i64, page: u32, limit: u32) -> Self {
        Self {
            orders,
            total,
            page,
            pages: page_count(total, limit),
        }
    }
}

/// `ceil(total / limit)`, zero for an empty result.
pub fn page_count(total: i64, limit: u32) -> u32 {
    if limit == 0 {
        return 0;
    }
    ((total.max(0) as u64 + limit as u64 - 1) / limit as u64) as u32
}

/// `PREFIX-YYYYMMDD-XXXXXX` with six uppercase hex characters.
pub fn generate_order_number(prefix: &str, at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        prefix,
        at.format("%Y%m%d"),
        suffix[..6].to_ascii_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn product(price: &str, images: &[&str]) -> CatalogProduct {
        CatalogProduct {
            id: Uuid::new_v4(),
            name: "Chesterfield Sofa".to_string(),
            price: BigDecimal::from_str(price).unwrap(),
            stock: 10,
            images: images.iter().map(|s| s.to_string()).collect(),
            category_id: None,
            is_active: true,
        }
    }

    fn customer() -> CustomerProfile {
        CustomerProfile {
            id: Uuid::new_v4(),
            full_name: "Wanjiru Kamau".to_string(),
            phone: "0712345678".to_string(),
            email: Some("wanjiru@example.com".to_string()),
        }
    }

    #[test]
    fn placed_order_totals_follow_line_items() {
        let lines = vec![
            PricedLine {
                product: product("100.00", &["/uploads/a.jpg", "/uploads/b.jpg"]),
                quantity: 3,
                color: Some("Brown".to_string()),
            },
            PricedLine {
                product: product("49.50", &[]),
                quantity: 2,
                color: None,
            },
        ];
        let order = Order::place(
            "DCF-20260101-ABC123".to_string(),
            &customer(),
            lines,
            "Kenyatta Avenue, Nairobi".to_string(),
            None,
            Utc::now(),
        );

        assert_eq!(order.subtotal, BigDecimal::from(399));
        assert_eq!(order.total, &order.subtotal + &order.delivery_fee);
        assert_eq!(order.subtotal, order.items_subtotal());
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items[0].product_image.as_deref(), Some("/uploads/a.jpg"));
        assert_eq!(order.items[1].product_image, None);
        assert_eq!(order.items[1].position, 1);
        assert!(order.items.iter().all(|item| item.order_id == order.id));
    }

    #[test]
    fn apply_transition_returns_matching_entry() {
        let mut order = Order::place(
            "DCF-20260101-ABC123".to_string(),
            &customer(),
            vec![PricedLine {
                product: product("10", &[]),
                quantity: 1,
                color: None,
            }],
            "Moi Avenue, Mombasa".to_string(),
            None,
            Utc::now(),
        );
        let admin = Actor::admin(Uuid::new_v4(), "Ops Desk");
        let transition = order.status.transition_to(OrderStatus::Confirmed);
        let later = order.created_at + chrono::Duration::minutes(5);

        let entry = order.apply_transition(&transition, None, &admin, later);

        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.updated_at, later);
        assert_eq!(entry.order_id, order.id);
        assert_eq!(entry.status, OrderStatus::Confirmed);
        assert_eq!(entry.created_by, "Ops Desk");
        assert_eq!(
            entry.note.as_deref(),
            Some("Status changed from pending to confirmed")
        );
    }

    #[test]
    fn order_number_format() {
        let at = Utc.with_ymd_and_hms(2026, 3, 7, 12, 0, 0).unwrap();
        let number = generate_order_number("DCF", at);
        let parts: Vec<&str> = number.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "DCF");
        assert_eq!(parts[1], "20260307");
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(OrderPage::new(vec![], 0, 1, 10).pages, 0);
        assert_eq!(OrderPage::new(vec![], 10, 1, 10).pages, 1);
        assert_eq!(OrderPage::new(vec![], 11, 2, 10).pages, 2);
    }
}
