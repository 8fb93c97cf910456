// src/handlers/quotes.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::ListQuery,
    middleware::auth::AuthenticatedActor,
    models::{
        invoice::Invoice,
        quote::{Quote, QuoteStatus},
    },
    services::{
        quote_service::NewQuote,
        validation::{self, LineItemInput},
    },
};

fn parse_discount(raw: &Value) -> Result<Decimal, AppError> {
    if raw.is_null() {
        return Ok(Decimal::ZERO);
    }
    validation::parse_non_negative("discount", raw)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuotePayload {
    pub job_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    #[validate(nested)]
    pub items: Vec<LineItemInput>,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "0")]
    pub discount: Value,
    #[schema(value_type = Option<String>, example = "0.075")]
    pub vat_rate: Option<Decimal>,
    pub valid_until: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemsPayload {
    #[validate(nested)]
    pub items: Vec<LineItemInput>,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "0")]
    pub discount: Value,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuoteTransitionPayload {
    pub status: QuoteStatus,
    pub expected_status: Option<QuoteStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConvertQuotePayload {
    pub expected_status: Option<QuoteStatus>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    pub quote: Quote,
    pub invoice: Invoice,
}

// POST /api/quotes
#[utoipa::path(
    post,
    path = "/api/quotes",
    tag = "Quotes",
    request_body = CreateQuotePayload,
    responses(
        (status = 201, description = "Draft quote created", body = Quote),
        (status = 400, description = "Invalid data")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_quote(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(payload): Json<CreateQuotePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let input = NewQuote {
        job_id: payload.job_id,
        customer_id: payload.customer_id,
        items: validation::parse_line_items(&payload.items)?,
        discount: parse_discount(&payload.discount)?,
        vat_rate: payload.vat_rate,
        valid_until: payload.valid_until,
        notes: payload.notes,
    };
    let quote = app_state.quote_service.create_quote(&actor, input).await?;

    Ok((StatusCode::CREATED, Json(quote)))
}

// GET /api/quotes
#[utoipa::path(
    get,
    path = "/api/quotes",
    tag = "Quotes",
    params(ListQuery),
    responses((status = 200, description = "Quotes, newest first", body = Vec<Quote>)),
    security(("api_jwt" = []))
)]
pub async fn list_quotes(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let quotes = app_state.quote_service.list_quotes(&actor, &query.into()).await?;
    Ok((StatusCode::OK, Json(quotes)))
}

// GET /api/quotes/{id}
#[utoipa::path(
    get,
    path = "/api/quotes/{id}",
    tag = "Quotes",
    params(("id" = Uuid, Path, description = "Quote id")),
    responses(
        (status = 200, description = "Quote", body = Quote),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_quote(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let quote = app_state.quote_service.get_quote(&actor, id).await?;
    Ok((StatusCode::OK, Json(quote)))
}

// PUT /api/quotes/{id}/items
#[utoipa::path(
    put,
    path = "/api/quotes/{id}/items",
    tag = "Quotes",
    params(("id" = Uuid, Path, description = "Quote id")),
    request_body = UpdateItemsPayload,
    responses(
        (status = 200, description = "Items replaced, totals recomputed", body = Quote),
        (status = 400, description = "Quote is not a draft or data is invalid"),
        (status = 422, description = "Quote is closed")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_items(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateItemsPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let items = validation::parse_line_items(&payload.items)?;
    let discount = parse_discount(&payload.discount)?;
    let quote = app_state.quote_service.update_items(&actor, id, items, discount).await?;
    Ok((StatusCode::OK, Json(quote)))
}

// POST /api/quotes/{id}/status
#[utoipa::path(
    post,
    path = "/api/quotes/{id}/status",
    tag = "Quotes",
    params(("id" = Uuid, Path, description = "Quote id")),
    request_body = QuoteTransitionPayload,
    responses(
        (status = 200, description = "Status changed", body = Quote),
        (status = 409, description = "Quote changed since it was read"),
        (status = 422, description = "Move not allowed")
    ),
    security(("api_jwt" = []))
)]
pub async fn transition_quote(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuoteTransitionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let quote = app_state
        .quote_service
        .transition_quote(&actor, id, payload.status, payload.expected_status)
        .await?;
    Ok((StatusCode::OK, Json(quote)))
}

// POST /api/quotes/{id}/convert
#[utoipa::path(
    post,
    path = "/api/quotes/{id}/convert",
    tag = "Quotes",
    params(("id" = Uuid, Path, description = "Quote id")),
    request_body = ConvertQuotePayload,
    responses(
        (status = 201, description = "Quote converted into a draft invoice", body = ConversionResponse),
        (status = 409, description = "Quote changed since it was read"),
        (status = 422, description = "Quote is closed"),
        (status = 503, description = "Store failure, nothing was written")
    ),
    security(("api_jwt" = []))
)]
pub async fn convert_quote(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConvertQuotePayload>,
) -> Result<impl IntoResponse, AppError> {
    let (quote, invoice) = app_state
        .quote_service
        .convert_quote(&actor, id, payload.expected_status, payload.due_date)
        .await?;
    Ok((StatusCode::CREATED, Json(ConversionResponse { quote, invoice })))
}
