// src/handlers/orders.rs

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
    models::order::{FulfillmentStatus, MarketplaceOrder, PayoutStatus, VendorShare},
    services::{
        order_service::{NewOrder, NewOrderLine},
        validation,
    },
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLinePayload {
    pub product_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "product name is required"))]
    pub name: String,
    pub vendor_id: Uuid,
    #[serde(default)]
    #[schema(value_type = String, example = "1")]
    pub quantity: Value,
    #[serde(default)]
    #[schema(value_type = String, example = "45000")]
    pub unit_price: Value,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    pub customer_id: Option<Uuid>,
    // Emptiness is checked by the service
    #[validate(nested)]
    pub items: Vec<OrderLinePayload>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentPayload {
    pub status: FulfillmentStatus,
    pub expected_status: Option<FulfillmentStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayoutPayload {
    pub payout_status: PayoutStatus,
    pub expected_payout_status: Option<PayoutStatus>,
}

// POST /api/orders
#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Orders",
    request_body = CreateOrderPayload,
    responses(
        (status = 201, description = "Order placed", body = MarketplaceOrder),
        (status = 400, description = "Invalid data")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let items = payload
        .items
        .into_iter()
        .map(|line| {
            Ok(NewOrderLine {
                quantity: validation::parse_non_negative("quantity", &line.quantity)?,
                unit_price: validation::parse_non_negative("unitPrice", &line.unit_price)?,
                product_id: line.product_id,
                name: line.name,
                vendor_id: line.vendor_id,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    let order = app_state
        .order_service
        .create_order(&actor, NewOrder { customer_id: payload.customer_id, items })
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

// GET /api/orders
#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "Orders",
    params(ListQuery),
    responses((status = 200, description = "Orders, newest first", body = Vec<MarketplaceOrder>)),
    security(("api_jwt" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let orders = app_state.order_service.list_orders(&actor, &query.into()).await?;
    Ok((StatusCode::OK, Json(orders)))
}

// GET /api/orders/{id}
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order", body = MarketplaceOrder),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order = app_state.order_service.get_order(&actor, id).await?;
    Ok((StatusCode::OK, Json(order)))
}

// POST /api/orders/{id}/status
#[utoipa::path(
    post,
    path = "/api/orders/{id}/status",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = FulfillmentPayload,
    responses(
        (status = 200, description = "Fulfillment status changed", body = MarketplaceOrder),
        (status = 409, description = "Order changed since it was read"),
        (status = 422, description = "Move not allowed")
    ),
    security(("api_jwt" = []))
)]
pub async fn transition_fulfillment(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<FulfillmentPayload>,
) -> Result<impl IntoResponse, AppError> {
    let order = app_state
        .order_service
        .transition_fulfillment(&actor, id, payload.status, payload.expected_status)
        .await?;
    Ok((StatusCode::OK, Json(order)))
}

// POST /api/orders/{id}/payout
#[utoipa::path(
    post,
    path = "/api/orders/{id}/payout",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = PayoutPayload,
    responses(
        (status = 200, description = "Payout status changed", body = MarketplaceOrder),
        (status = 409, description = "Order changed since it was read"),
        (status = 422, description = "Move not allowed or order cancelled")
    ),
    security(("api_jwt" = []))
)]
pub async fn transition_payout(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<PayoutPayload>,
) -> Result<impl IntoResponse, AppError> {
    let order = app_state
        .order_service
        .transition_payout(&actor, id, payload.payout_status, payload.expected_payout_status)
        .await?;
    Ok((StatusCode::OK, Json(order)))
}

// GET /api/orders/{id}/vendor-shares
#[utoipa::path(
    get,
    path = "/api/orders/{id}/vendor-shares",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order id")),
    responses((status = 200, description = "Amount owed per vendor", body = Vec<VendorShare>)),
    security(("api_jwt" = []))
)]
pub async fn vendor_shares(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let shares = app_state.order_service.vendor_shares(&actor, id).await?;
    Ok((StatusCode::OK, Json(shares)))
}
