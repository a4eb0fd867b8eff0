use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::auth::Identity;
use crate::error::AppError;
use crate::services::{CustomerQuery, LimitQuery, LowStockQuery, PeriodQuery, TopProductsQuery};
use crate::AppState;

pub async fn dashboard(
    State(state): State<AppState>,
    Identity(actor): Identity,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.reporter.dashboard(&actor).await?))
}

pub async fn revenue_by_category(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Query(query): Query<PeriodQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.reporter.revenue_by_category(&actor, query).await?))
}

pub async fn top_products(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Query(query): Query<TopProductsQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.reporter.top_products(&actor, query).await?))
}

pub async fn low_stock(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Query(query): Query<LowStockQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.reporter.low_stock(&actor, query).await?))
}

pub async fn recent_orders(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Query(query): Query<LimitQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.reporter.recent_orders(&actor, query).await?))
}

pub async fn customers(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Query(query): Query<CustomerQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.reporter.customers(&actor, query).await?))
}

pub async fn customer_summary(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.reporter.customer_summary(&actor, id).await?))
}
