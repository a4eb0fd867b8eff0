use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::OrderPolicy;
use crate::domain::order::{ORDER_CANCELLED_NOTE, ORDER_PLACED_NOTE};
use crate::domain::{
    generate_order_number, Actor, CatalogProduct, Order, OrderDetail, OrderItem, OrderPage,
    OrderStatus, PricedLine, StockAdjustment, TimelineEntry, Transition,
};
use crate::error::{AppError, AppResult};
use crate::ports::{OrderFilter, OrderStore, UnitOfWork};
use crate::validation::{
    sanitize_optional, validate_delivery_address, validate_max_len, validate_quantity,
    validate_range, ValidationError, MAX_COLOR_LEN, MAX_NOTES_LEN, MAX_SEARCH_LEN,
};

/// Produces a candidate order number for a prefix and instant.
pub type NumberSource = Arc<dyn Fn(&str, DateTime<Utc>) -> String + Send + Sync>;

#[derive(Debug, Clone, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrder {
    pub items: Vec<CartLine>,
    pub delivery_address: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
    #[serde(default)]
    pub note: Option<String>,
}

/// Absent fields are left untouched; blank notes clear the stored notes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderUpdate {
    pub notes: Option<String>,
    pub delivery_address: Option<String>,
}

/// Owns every write to orders and stock. Each mutation runs in a single unit
/// of work, so its stock changes, status and timeline entry land together or
/// not at all.
pub struct OrderEngine {
    store: Arc<dyn OrderStore>,
    policy: OrderPolicy,
    next_number: NumberSource,
}

impl OrderEngine {
    pub fn new(store: Arc<dyn OrderStore>, policy: OrderPolicy) -> Self {
        Self {
            store,
            policy,
            next_number: Arc::new(generate_order_number),
        }
    }

    /// Replaces the order number generator.
    pub fn with_number_source(mut self, source: NumberSource) -> Self {
        self.next_number = source;
        self
    }

    pub async fn create_order(&self, actor: &Actor, request: CreateOrder) -> AppResult<Order> {
        let draft = self.validate_create(request)?;

        let mut uow = self.store.begin().await?;
        let customer = uow
            .customer(actor.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Customer {} not found", actor.id)))?;

        let mut product_ids: Vec<Uuid> = draft.lines.iter().map(|l| l.product_id).collect();
        product_ids.sort();
        product_ids.dedup();
        let products: HashMap<Uuid, CatalogProduct> = uow
            .lock_products(&product_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut lines = Vec::with_capacity(draft.lines.len());
        for line in draft.lines {
            let product = products
                .get(&line.product_id)
                .ok_or_else(|| product_not_found(line.product_id))?;
            if line.quantity > product.stock {
                tracing::warn!(
                    product_id = %product.id,
                    requested = line.quantity,
                    available = product.stock,
                    "Order rejected: insufficient stock"
                );
                return Err(AppError::InsufficientStock {
                    product: product.name.clone(),
                    available: product.stock,
                });
            }
            lines.push(PricedLine {
                product: product.clone(),
                quantity: line.quantity,
                color: line.color,
            });
        }

        let now = Utc::now();
        let mut order = Order::place(
            (self.next_number)(&self.policy.order_number_prefix, now),
            &customer,
            lines,
            draft.delivery_address,
            draft.notes,
            now,
        );
        self.insert_with_unique_number(uow.as_mut(), &mut order, now).await?;
        uow.insert_items(&order.items).await?;

        for item in &order.items {
            match uow.adjust_stock(item.product_id, -item.quantity).await? {
                StockAdjustment::Applied { .. } => {}
                StockAdjustment::Insufficient { available } => {
                    tracing::warn!(
                        product_id = %item.product_id,
                        available,
                        "Order rejected: stock guard failed"
                    );
                    return Err(AppError::InsufficientStock {
                        product: item.product_name.clone(),
                        available,
                    });
                }
                StockAdjustment::UnknownProduct => return Err(product_not_found(item.product_id)),
            }
        }

        let placed =
            TimelineEntry::record(order.id, OrderStatus::Pending, ORDER_PLACED_NOTE, actor, now);
        uow.append_timeline(&placed).await?;
        uow.commit().await?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            actor_id = %actor.id,
            total = %order.total,
            items = order.item_count(),
            "Order placed"
        );
        Ok(order)
    }

    pub async fn list_orders(&self, actor: &Actor, query: OrderQuery) -> AppResult<OrderPage> {
        let page = query.page.unwrap_or(1);
        if page < 1 {
            return Err(ValidationError::new("page", "must be at least 1").into());
        }
        let limit = query.limit.unwrap_or(self.policy.default_page_size);
        validate_range("limit", limit, 1, self.policy.max_page_size)?;

        let status = match query.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<OrderStatus>()
                    .map_err(|e| ValidationError::new("status", e.to_string()))?,
            ),
        };
        let search = sanitize_optional(query.search.as_deref());
        if let Some(needle) = &search {
            validate_max_len("search", needle, MAX_SEARCH_LEN)?;
        }

        let filter = OrderFilter {
            customer_id: if actor.is_admin() { None } else { Some(actor.id) },
            status,
            search,
            limit,
            offset: (page as u64 - 1) * limit as u64,
        };
        let (orders, total) = self.store.list_orders(&filter).await?;
        Ok(OrderPage::new(orders, total, page, limit))
    }

    pub async fn get_order(&self, actor: &Actor, order_id: Uuid) -> AppResult<OrderDetail> {
        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or_else(|| order_not_found(order_id))?;
        if !actor.can_access(order.customer_id) {
            return Err(AppError::AccessDenied("Access denied".to_string()));
        }
        let timeline = self.store.order_timeline(order_id).await?;
        Ok(OrderDetail { order, timeline })
    }

    pub async fn set_status(
        &self,
        actor: &Actor,
        order_id: Uuid,
        change: StatusChange,
    ) -> AppResult<OrderDetail> {
        if !actor.is_admin() {
            return Err(AppError::AccessDenied(
                "Only admins can change order status".to_string(),
            ));
        }
        let note = sanitize_optional(change.note.as_deref());
        if let Some(note) = &note {
            validate_max_len("note", note, MAX_NOTES_LEN)?;
        }

        let mut uow = self.store.begin().await?;
        let mut order = uow
            .lock_order(order_id)
            .await?
            .ok_or_else(|| order_not_found(order_id))?;

        let transition = order.status.transition_to(change.status);
        self.apply(uow.as_mut(), &mut order, &transition, note, actor)
            .await?;
        let timeline = uow.timeline(order_id).await?;
        uow.commit().await?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            actor_id = %actor.id,
            from = %transition.from,
            to = %transition.to,
            restocked = transition.restock,
            "Order status changed"
        );
        Ok(OrderDetail { order, timeline })
    }

    pub async fn cancel_order(&self, actor: &Actor, order_id: Uuid) -> AppResult<()> {
        let mut uow = self.store.begin().await?;
        let mut order = uow
            .lock_order(order_id)
            .await?
            .ok_or_else(|| order_not_found(order_id))?;

        if !actor.can_access(order.customer_id) {
            return Err(AppError::AccessDenied("Access denied".to_string()));
        }
        if !order.status.is_self_cancellable() {
            tracing::warn!(
                order_id = %order.id,
                status = %order.status,
                actor_id = %actor.id,
                "Cancellation rejected"
            );
            return Err(AppError::InvalidState(
                "Only pending orders can be cancelled".to_string(),
            ));
        }

        let transition = order.status.transition_to(OrderStatus::Cancelled);
        self.apply(
            uow.as_mut(),
            &mut order,
            &transition,
            Some(ORDER_CANCELLED_NOTE.to_string()),
            actor,
        )
        .await?;
        uow.commit().await?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            actor_id = %actor.id,
            "Order cancelled"
        );
        Ok(())
    }

    pub async fn update_order(
        &self,
        actor: &Actor,
        order_id: Uuid,
        update: OrderUpdate,
    ) -> AppResult<Order> {
        if !actor.is_admin() {
            return Err(AppError::AccessDenied(
                "Only admins can edit orders".to_string(),
            ));
        }
        let address = update
            .delivery_address
            .as_deref()
            .map(|a| validate_delivery_address(a, self.policy.min_address_len))
            .transpose()?;
        let notes = match update.notes.as_deref() {
            Some(raw) => {
                let notes = sanitize_optional(Some(raw));
                if let Some(n) = &notes {
                    validate_max_len("notes", n, MAX_NOTES_LEN)?;
                }
                Some(notes)
            }
            None => None,
        };

        let mut uow = self.store.begin().await?;
        let mut order = uow
            .lock_order(order_id)
            .await?
            .ok_or_else(|| order_not_found(order_id))?;

        if let Some(address) = address {
            order.delivery_address = address;
        }
        if let Some(notes) = notes {
            order.notes = notes;
        }
        order.updated_at = Utc::now();
        uow.update_details(&order).await?;
        uow.commit().await?;

        tracing::info!(order_id = %order.id, actor_id = %actor.id, "Order details updated");
        Ok(order)
    }

    fn validate_create(&self, request: CreateOrder) -> Result<ValidatedOrder, ValidationError> {
        if request.items.is_empty() {
            return Err(ValidationError::new(
                "items",
                "order must have at least one item",
            ));
        }
        let delivery_address =
            validate_delivery_address(&request.delivery_address, self.policy.min_address_len)?;
        let notes = sanitize_optional(request.notes.as_deref());
        if let Some(notes) = &notes {
            validate_max_len("notes", notes, MAX_NOTES_LEN)?;
        }

        let mut lines = Vec::with_capacity(request.items.len());
        for item in request.items {
            validate_quantity(item.quantity)?;
            let color = sanitize_optional(item.color.as_deref());
            if let Some(color) = &color {
                validate_max_len("color", color, MAX_COLOR_LEN)?;
            }
            lines.push(CartLine {
                product_id: item.product_id,
                quantity: item.quantity,
                color,
            });
        }

        Ok(ValidatedOrder {
            lines,
            delivery_address,
            notes,
        })
    }

    /// Inserts the header, drawing a fresh number whenever the current one is
    /// already taken.
    async fn insert_with_unique_number(
        &self,
        uow: &mut dyn UnitOfWork,
        order: &mut Order,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        for attempt in 1..=self.policy.order_number_attempts {
            if uow.insert_order(order).await? {
                return Ok(());
            }
            tracing::warn!(
                order_number = %order.order_number,
                attempt,
                "Order number collision, drawing another"
            );
            order.order_number = (self.next_number)(&self.policy.order_number_prefix, now);
        }
        Err(AppError::Internal(format!(
            "could not allocate a unique order number after {} attempts",
            self.policy.order_number_attempts
        )))
    }

    /// Applies a transition inside `uow`: restocks when required, then
    /// persists the status and its timeline entry.
    async fn apply(
        &self,
        uow: &mut dyn UnitOfWork,
        order: &mut Order,
        transition: &Transition,
        note: Option<String>,
        actor: &Actor,
    ) -> AppResult<()> {
        if transition.restock {
            // Same lock order as create_order: ascending product id.
            let mut items: Vec<&OrderItem> = order.items.iter().collect();
            items.sort_by_key(|item| item.product_id);
            let mut product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
            product_ids.dedup();
            uow.lock_products(&product_ids).await?;

            for item in items {
                match uow.adjust_stock(item.product_id, item.quantity).await? {
                    StockAdjustment::Applied { .. } => {}
                    StockAdjustment::UnknownProduct => tracing::warn!(
                        order_id = %order.id,
                        product_id = %item.product_id,
                        "Skipping restock for a product no longer in the catalog"
                    ),
                    StockAdjustment::Insufficient { available } => {
                        return Err(AppError::Internal(format!(
                            "restock of product {} rejected at stock {}",
                            item.product_id, available
                        )));
                    }
                }
            }
        }

        let entry = order.apply_transition(transition, note, actor, Utc::now());
        uow.update_status(order).await?;
        uow.append_timeline(&entry).await?;
        Ok(())
    }
}

struct ValidatedOrder {
    lines: Vec<CartLine>,
    delivery_address: String,
    notes: Option<String>,
}

fn order_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Order {} not found", id))
}

fn product_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Product {} not found", id))
}
