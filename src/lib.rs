pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod ports;
pub mod services;
pub mod startup;
pub mod validation;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Instant;

use crate::config::OrderPolicy;
use crate::ports::{OrderStore, ReportStore};
use crate::services::{OrderEngine, Reporter};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<OrderEngine>,
    pub reporter: Arc<Reporter>,
    pub store: Arc<dyn OrderStore>,
    pub start_time: Instant,
}

impl AppState {
    /// Wires the engine and reporter over one backing store.
    pub fn new<S>(store: Arc<S>, policy: OrderPolicy) -> Self
    where
        S: OrderStore + ReportStore + 'static,
    {
        let engine = OrderEngine::new(store.clone(), policy.clone());
        Self::from_engine(store, engine, policy)
    }

    /// Like `new`, with a pre-configured engine over the same store.
    pub fn from_engine<S>(store: Arc<S>, engine: OrderEngine, policy: OrderPolicy) -> Self
    where
        S: OrderStore + ReportStore + 'static,
    {
        Self {
            engine: Arc::new(engine),
            reporter: Arc::new(Reporter::new(store.clone(), policy)),
            store,
            start_time: Instant::now(),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/orders",
            post(handlers::orders::create_order).get(handlers::orders::list_orders),
        )
        .route(
            "/orders/:id",
            get(handlers::orders::get_order)
                .put(handlers::orders::update_order)
                .delete(handlers::orders::cancel_order),
        )
        .route("/orders/:id/status", put(handlers::orders::set_status))
        .route("/admin/dashboard", get(handlers::admin::dashboard))
        .route(
            "/admin/analytics/revenue-by-category",
            get(handlers::admin::revenue_by_category),
        )
        .route("/admin/analytics/top-products", get(handlers::admin::top_products))
        .route("/admin/analytics/low-stock", get(handlers::admin::low_stock))
        .route("/admin/analytics/recent-orders", get(handlers::admin::recent_orders))
        .route("/admin/customers", get(handlers::admin::customers))
        .route("/admin/customers/:id", get(handlers::admin::customer_summary))
        .layer(axum::middleware::from_fn(
            middleware::request_logger::request_logger_middleware,
        ))
        .with_state(state)
}
