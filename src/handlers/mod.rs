pub mod admin;
pub mod auth;
pub mod orders;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::health::{check_health, StoreChecker};
use crate::AppState;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let checker = StoreChecker::new(state.store.clone());
    let report = check_health(&checker, state.start_time).await;

    // 503 when the store is down, 200 otherwise
    let status_code = if report.status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(report))
}
