// src/handlers/jobs.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::ListQuery,
    middleware::auth::AuthenticatedActor,
    models::job::{CustomerRef, Job, JobStatus, JobType},
    services::job_service::NewJob,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobPayload {
    pub customer: CustomerRef,
    pub vehicle_id: Option<Uuid>,
    #[validate(length(min = 1, max = 2000, message = "description is required"))]
    #[schema(example = "Brake pads squeal at low speed")]
    pub description: String,
    pub job_type: Option<JobType>,
    #[serde(default)]
    #[validate(length(max = 10, message = "at most 10 technicians"))]
    pub technician_ids: Vec<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobTransitionPayload {
    pub status: JobStatus,
    /// Status the caller was looking at; a mismatch is a 409
    pub expected_status: Option<JobStatus>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignTechniciansPayload {
    #[validate(length(max = 10, message = "at most 10 technicians"))]
    pub technician_ids: Vec<Uuid>,
}

// POST /api/jobs
#[utoipa::path(
    post,
    path = "/api/jobs",
    tag = "Jobs",
    request_body = CreateJobPayload,
    responses(
        (status = 201, description = "Job opened", body = Job),
        (status = 400, description = "Invalid data"),
        (status = 404, description = "Customer or vehicle not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_job(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(payload): Json<CreateJobPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let job = app_state
        .job_service
        .create_job(
            &actor,
            NewJob {
                customer: payload.customer,
                vehicle_id: payload.vehicle_id,
                description: payload.description,
                job_type: payload.job_type.unwrap_or_default(),
                technician_ids: payload.technician_ids,
                scheduled_at: payload.scheduled_at,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(job)))
}

// GET /api/jobs
#[utoipa::path(
    get,
    path = "/api/jobs",
    tag = "Jobs",
    params(ListQuery),
    responses((status = 200, description = "Jobs, newest first", body = Vec<Job>)),
    security(("api_jwt" = []))
)]
pub async fn list_jobs(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let jobs = app_state.job_service.list_jobs(&actor, &query.into()).await?;
    Ok((StatusCode::OK, Json(jobs)))
}

// GET /api/jobs/{id}
#[utoipa::path(
    get,
    path = "/api/jobs/{id}",
    tag = "Jobs",
    params(("id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "Job", body = Job),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_job(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let job = app_state.job_service.get_job(&actor, id).await?;
    Ok((StatusCode::OK, Json(job)))
}

// POST /api/jobs/{id}/status
#[utoipa::path(
    post,
    path = "/api/jobs/{id}/status",
    tag = "Jobs",
    params(("id" = Uuid, Path, description = "Job id")),
    request_body = JobTransitionPayload,
    responses(
        (status = 200, description = "Status changed", body = Job),
        (status = 409, description = "Job changed since it was read"),
        (status = 422, description = "Move not allowed")
    ),
    security(("api_jwt" = []))
)]
pub async fn transition_job(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<JobTransitionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let job = app_state
        .job_service
        .transition_job(&actor, id, payload.status, payload.expected_status)
        .await?;
    Ok((StatusCode::OK, Json(job)))
}

// PUT /api/jobs/{id}/technicians
#[utoipa::path(
    put,
    path = "/api/jobs/{id}/technicians",
    tag = "Jobs",
    params(("id" = Uuid, Path, description = "Job id")),
    request_body = AssignTechniciansPayload,
    responses(
        (status = 200, description = "Technicians assigned", body = Job),
        (status = 422, description = "Job is closed")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_technicians(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignTechniciansPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let job = app_state
        .job_service
        .assign_technicians(&actor, id, payload.technician_ids)
        .await?;
    Ok((StatusCode::OK, Json(job)))
}
