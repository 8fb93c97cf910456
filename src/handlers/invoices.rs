// src/handlers/invoices.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::ListQuery,
    middleware::auth::AuthenticatedActor,
    models::invoice::{InvoiceStatus, InvoiceView},
    services::{invoice_service::NewPayment, validation},
};

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceStatusPayload {
    pub expected_status: Option<InvoiceStatus>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentPayload {
    #[serde(default)]
    #[schema(value_type = String, example = "250.00")]
    pub amount: Value,
    #[validate(length(min = 1, max = 40, message = "payment method is required"))]
    #[schema(example = "transfer")]
    pub method: String,
    #[validate(length(max = 120))]
    pub reference: Option<String>,
}

// GET /api/invoices
#[utoipa::path(
    get,
    path = "/api/invoices",
    tag = "Invoices",
    params(ListQuery),
    responses((status = 200, description = "Invoices with derived progress", body = Vec<InvoiceView>)),
    security(("api_jwt" = []))
)]
pub async fn list_invoices(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let invoices = app_state.invoice_service.list_invoices(&actor, &query.into()).await?;
    Ok((StatusCode::OK, Json(invoices)))
}

// GET /api/invoices/{id}
#[utoipa::path(
    get,
    path = "/api/invoices/{id}",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "Invoice id")),
    responses(
        (status = 200, description = "Invoice", body = InvoiceView),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_invoice(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = app_state.invoice_service.get_invoice(&actor, id).await?;
    Ok((StatusCode::OK, Json(invoice)))
}

// POST /api/invoices/{id}/approve
#[utoipa::path(
    post,
    path = "/api/invoices/{id}/approve",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "Invoice id")),
    request_body = InvoiceStatusPayload,
    responses(
        (status = 200, description = "Invoice approved", body = InvoiceView),
        (status = 409, description = "Invoice changed since it was read"),
        (status = 422, description = "Move not allowed")
    ),
    security(("api_jwt" = []))
)]
pub async fn approve_invoice(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<InvoiceStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = app_state.invoice_service.approve(&actor, id, payload.expected_status).await?;
    Ok((StatusCode::OK, Json(invoice)))
}

// POST /api/invoices/{id}/void
#[utoipa::path(
    post,
    path = "/api/invoices/{id}/void",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "Invoice id")),
    request_body = InvoiceStatusPayload,
    responses(
        (status = 200, description = "Invoice voided", body = InvoiceView),
        (status = 422, description = "Already void")
    ),
    security(("api_jwt" = []))
)]
pub async fn void_invoice(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<InvoiceStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = app_state.invoice_service.void(&actor, id, payload.expected_status).await?;
    Ok((StatusCode::OK, Json(invoice)))
}

// POST /api/invoices/{id}/payments
#[utoipa::path(
    post,
    path = "/api/invoices/{id}/payments",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "Invoice id")),
    request_body = RecordPaymentPayload,
    responses(
        (status = 200, description = "Payment recorded", body = InvoiceView),
        (status = 400, description = "Invalid amount or overpayment"),
        (status = 422, description = "Invoice cannot take payments")
    ),
    security(("api_jwt" = []))
)]
pub async fn record_payment(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordPaymentPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let payment = NewPayment {
        amount: validation::parse_non_negative("amount", &payload.amount)?,
        method: payload.method,
        reference: payload.reference,
    };
    let invoice = app_state.invoice_service.record_payment(&actor, id, payment).await?;
    Ok((StatusCode::OK, Json(invoice)))
}

// POST /api/invoices/{id}/payment-failed
#[utoipa::path(
    post,
    path = "/api/invoices/{id}/payment-failed",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "Invoice id")),
    responses((status = 200, description = "Payment marked failed", body = InvoiceView)),
    security(("api_jwt" = []))
)]
pub async fn mark_payment_failed(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = app_state.invoice_service.mark_payment_failed(&actor, id).await?;
    Ok((StatusCode::OK, Json(invoice)))
}

// POST /api/invoices/{id}/payment-retry
#[utoipa::path(
    post,
    path = "/api/invoices/{id}/payment-retry",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "Invoice id")),
    responses((status = 200, description = "Payment back to pending", body = InvoiceView)),
    security(("api_jwt" = []))
)]
pub async fn retry_payment(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = app_state.invoice_service.retry_payment(&actor, id).await?;
    Ok((StatusCode::OK, Json(invoice)))
}

// POST /api/invoices/{id}/refund
#[utoipa::path(
    post,
    path = "/api/invoices/{id}/refund",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "Invoice id")),
    responses(
        (status = 200, description = "Invoice refunded", body = InvoiceView),
        (status = 422, description = "Only paid invoices can be refunded")
    ),
    security(("api_jwt" = []))
)]
pub async fn refund_invoice(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = app_state.invoice_service.refund(&actor, id).await?;
    Ok((StatusCode::OK, Json(invoice)))
}
