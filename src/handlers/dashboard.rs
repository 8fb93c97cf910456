// src/handlers/dashboard.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::AppError, config::AppState, middleware::auth::AuthenticatedActor,
    models::dashboard::DashboardSummary,
};

// GET /api/dashboard/summary
#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    tag = "Dashboard",
    responses((status = 200, description = "Counters for the admin home screen", body = DashboardSummary)),
    security(("api_jwt" = []))
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state.dashboard_service.summary(&actor).await?;
    Ok((StatusCode::OK, Json(summary)))
}
