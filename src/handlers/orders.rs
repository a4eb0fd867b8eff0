use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::auth::Identity;
use crate::error::AppError;
use crate::services::{CreateOrder, OrderQuery, OrderUpdate, StatusChange};
use crate::AppState;

pub async fn create_order(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Json(request): Json<CreateOrder>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.engine.create_order(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Query(query): Query<OrderQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = state.engine.list_orders(&actor, query).await?;
    Ok(Json(page))
}

pub async fn get_order(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = state.engine.get_order(&actor, id).await?;
    Ok(Json(detail))
}

pub async fn set_status(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Path(id): Path<Uuid>,
    Json(change): Json<StatusChange>,
) -> Result<impl IntoResponse, AppError> {
    let detail = state.engine.set_status(&actor, id, change).await?;
    Ok(Json(detail))
}

pub async fn update_order(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Path(id): Path<Uuid>,
    Json(update): Json<OrderUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.engine.update_order(&actor, id, update).await?;
    Ok(Json(order))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.engine.cancel_order(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
