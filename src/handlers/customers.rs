// src/handlers/customers.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::ListQuery,
    middleware::auth::AuthenticatedActor,
    models::{
        user::{User, UserProfile},
        vehicle::Vehicle,
    },
    services::customer_service::{NewUser, NewVehicle},
};

// =============================================================================
//  USERS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[validate(length(min = 2, max = 120, message = "name must have at least 2 characters"))]
    #[schema(example = "Chinedu Okafor")]
    pub full_name: String,
    #[validate(email(message = "invalid email"))]
    pub email: Option<String>,
    #[validate(length(min = 5, max = 20, message = "invalid phone number"))]
    pub phone: Option<String>,
    pub profile: UserProfile,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserFilter {
    /// `customer`, `staff` or `vendor`
    pub role: Option<String>,
}

// POST /api/users
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Customers",
    request_body = CreateUserPayload,
    responses(
        (status = 201, description = "User registered", body = User),
        (status = 400, description = "Invalid data"),
        (status = 409, description = "Email already in use")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_user(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(payload): Json<CreateUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = app_state
        .customer_service
        .create_user(
            &actor,
            NewUser {
                full_name: payload.full_name,
                email: payload.email,
                phone: payload.phone,
                profile: payload.profile,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

// GET /api/users
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Customers",
    params(UserFilter, ListQuery),
    responses((status = 200, description = "Users, newest first", body = Vec<User>)),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(filter): Query<UserFilter>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let users = app_state
        .customer_service
        .list_users(&actor, filter.role.as_deref(), &query.into())
        .await?;
    Ok((StatusCode::OK, Json(users)))
}

// GET /api/users/{id}
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_user(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = app_state.customer_service.get_user(&actor, id).await?;
    Ok((StatusCode::OK, Json(user)))
}

// GET /api/users/birthdays
#[utoipa::path(
    get,
    path = "/api/users/birthdays",
    tag = "Customers",
    responses((status = 200, description = "Customers celebrating today", body = Vec<User>)),
    security(("api_jwt" = []))
)]
pub async fn birthdays_today(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<impl IntoResponse, AppError> {
    let users = app_state.customer_service.birthdays_today(&actor).await?;
    Ok((StatusCode::OK, Json(users)))
}

// =============================================================================
//  VEHICLES
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVehiclePayload {
    pub owner_id: Option<Uuid>,
    #[validate(length(min = 1, max = 60))]
    #[schema(example = "Toyota")]
    pub make: String,
    #[validate(length(min = 1, max = 60))]
    #[schema(example = "Corolla")]
    pub model: String,
    #[serde(default)]
    #[schema(value_type = String, example = "2014")]
    pub year: Value,
    #[validate(length(min = 1, max = 20))]
    #[schema(example = "LAG-234-KJ")]
    pub plate_number: String,
    #[validate(length(max = 17, message = "a VIN has at most 17 characters"))]
    pub vin: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct VehicleFilter {
    pub owner_id: Option<Uuid>,
    pub q: Option<String>,
}

// POST /api/vehicles
#[utoipa::path(
    post,
    path = "/api/vehicles",
    tag = "Customers",
    request_body = CreateVehiclePayload,
    responses(
        (status = 201, description = "Vehicle registered", body = Vehicle),
        (status = 409, description = "Plate already registered")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_vehicle(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(payload): Json<CreateVehiclePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let vehicle = app_state
        .customer_service
        .create_vehicle(
            &actor,
            NewVehicle {
                owner_id: payload.owner_id,
                make: payload.make,
                model: payload.model,
                year: payload.year,
                plate_number: payload.plate_number,
                vin: payload.vin,
                color: payload.color,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}

// GET /api/vehicles
#[utoipa::path(
    get,
    path = "/api/vehicles",
    tag = "Customers",
    params(VehicleFilter),
    responses((status = 200, description = "Vehicles, newest first", body = Vec<Vehicle>)),
    security(("api_jwt" = []))
)]
pub async fn list_vehicles(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(filter): Query<VehicleFilter>,
) -> Result<impl IntoResponse, AppError> {
    let vehicles = app_state
        .customer_service
        .list_vehicles(&actor, filter.owner_id, filter.q.as_deref())
        .await?;
    Ok((StatusCode::OK, Json(vehicles)))
}

// GET /api/vehicles/{id}
#[utoipa::path(
    get,
    path = "/api/vehicles/{id}",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "Vehicle id")),
    responses(
        (status = 200, description = "Vehicle", body = Vehicle),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_vehicle(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let vehicle = app_state.customer_service.get_vehicle(&actor, id).await?;
    Ok((StatusCode::OK, Json(vehicle)))
}
