// src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;
#[cfg(test)]
mod test_support;

use crate::config::{AppState, Config};
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

pub fn build_router(app_state: AppState) -> Router {
    let job_routes = Router::new()
        .route("/", post(handlers::jobs::create_job).get(handlers::jobs::list_jobs))
        .route("/{id}", get(handlers::jobs::get_job))
        .route("/{id}/status", post(handlers::jobs::transition_job))
        .route("/{id}/technicians", put(handlers::jobs::assign_technicians));

    let quote_routes = Router::new()
        .route("/", post(handlers::quotes::create_quote).get(handlers::quotes::list_quotes))
        .route("/{id}", get(handlers::quotes::get_quote))
        .route("/{id}/items", put(handlers::quotes::update_items))
        .route("/{id}/status", post(handlers::quotes::transition_quote))
        .route("/{id}/convert", post(handlers::quotes::convert_quote));

    let invoice_routes = Router::new()
        .route("/", get(handlers::invoices::list_invoices))
        .route("/{id}", get(handlers::invoices::get_invoice))
        .route("/{id}/approve", post(handlers::invoices::approve_invoice))
        .route("/{id}/void", post(handlers::invoices::void_invoice))
        .route("/{id}/payments", post(handlers::invoices::record_payment))
        .route("/{id}/payment-failed", post(handlers::invoices::mark_payment_failed))
        .route("/{id}/payment-retry", post(handlers::invoices::retry_payment))
        .route("/{id}/refund", post(handlers::invoices::refund_invoice));

    let order_routes = Router::new()
        .route("/", post(handlers::orders::create_order).get(handlers::orders::list_orders))
        .route("/{id}", get(handlers::orders::get_order))
        .route("/{id}/status", post(handlers::orders::transition_fulfillment))
        .route("/{id}/payout", post(handlers::orders::transition_payout))
        .route("/{id}/vendor-shares", get(handlers::orders::vendor_shares));

    let user_routes = Router::new()
        .route("/", post(handlers::customers::create_user).get(handlers::customers::list_users))
        .route("/birthdays", get(handlers::customers::birthdays_today))
        .route("/{id}", get(handlers::customers::get_user));

    let vehicle_routes = Router::new()
        .route("/", post(handlers::customers::create_vehicle).get(handlers::customers::list_vehicles))
        .route("/{id}", get(handlers::customers::get_vehicle));

    let dashboard_routes = Router::new().route("/summary", get(handlers::dashboard::get_summary));

    // Everything under /api except health needs a valid token
    let protected = Router::new()
        .nest("/jobs", job_routes)
        .nest("/quotes", quote_routes)
        .nest("/invoices", invoice_routes)
        .nest("/orders", order_routes)
        .nest("/users", user_routes)
        .nest("/vehicles", vehicle_routes)
        .nest("/dashboard", dashboard_routes)
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api", protected)
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;
    let app_state = AppState::new(&config).await?;
    let app = build_router(app_state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("🚀 Server listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use chrono::{Duration, FixedOffset};
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{db::MemoryStore, services::auth::AuthService, test_support::actor};

    fn test_config() -> Config {
        Config {
            database_url: config::MEMORY_DATABASE_URL.into(),
            jwt_secret: "test-secret".into(),
            bind_addr: "127.0.0.1:0".into(),
            workshop_tz: FixedOffset::east_opt(3600).unwrap(),
            default_vat_rate: Decimal::new(75, 3),
        }
    }

    fn app() -> (Router, String) {
        let config = test_config();
        let state = AppState::with_store(Arc::new(MemoryStore::new()), &config);
        let token = AuthService::new(config.jwt_secret.clone())
            .create_token(&actor(), Duration::hours(1))
            .unwrap();
        (build_router(state), token)
    }

    async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn health_is_public_and_api_needs_a_token() {
        let (app, _) = app();
        let (status, _) = call(&app, "GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, "GET", "/api/jobs", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "invalid_token");
    }

    #[tokio::test]
    async fn job_lifecycle_over_http() {
        let (app, token) = app();
        let token = Some(token.as_str());

        let (status, job) = call(
            &app,
            "POST",
            "/api/jobs",
            token,
            Some(json!({
                "customer": { "kind": "walk_in", "name": "Emeka", "phone": null },
                "description": "Engine overheating",
                "jobType": "repair"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = job["id"].as_str().unwrap().to_string();

        let (status, moved) = call(
            &app,
            "POST",
            &format!("/api/jobs/{}/status", id),
            token,
            Some(json!({ "status": "repairing", "expectedStatus": "received" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(moved["status"], "repairing");
        assert_eq!(moved["statusHistory"][0]["changedByName"], "Tunde");

        let (status, body) = call(
            &app,
            "POST",
            &format!("/api/jobs/{}/status", id),
            token,
            Some(json!({ "status": "diagnosed" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "invalid_transition");

        let (status, listed) = call(&app, "GET", "/api/jobs?group=active&q=engine", token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn quote_to_invoice_over_http() {
        let (app, token) = app();
        let token = Some(token.as_str());

        let (status, quote) = call(
            &app,
            "POST",
            "/api/quotes",
            token,
            Some(json!({
                "items": [
                    { "description": "Brake pads", "quantity": "2", "unitPrice": "500" },
                    { "description": "Labour", "quantity": 1, "unitPrice": 300 }
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(quote["total"], json!(1397.5));
        let id = quote["id"].as_str().unwrap().to_string();

        let (status, converted) = call(
            &app,
            "POST",
            &format!("/api/quotes/{}/convert", id),
            token,
            Some(json!({ "expectedStatus": "draft" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(converted["quote"]["status"], "converted");
        assert_eq!(converted["invoice"]["quoteId"], json!(id));

        let (status, body) = call(
            &app,
            "POST",
            "/api/quotes",
            token,
            Some(json!({ "items": [{ "description": "Oil", "quantity": -1, "unitPrice": 10 }] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["quantity"][0], "must not be negative");
    }

    #[tokio::test]
    async fn order_payloads_are_checked_over_http() {
        let (app, token) = app();
        let token = Some(token.as_str());

        let (status, body) = call(&app, "POST", "/api/orders", token, Some(json!({ "items": [] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["items"][0], "an order needs at least one item");

        let line = json!({
            "productId": "00000000-0000-0000-0000-000000000001",
            "name": "Brake disc",
            "vendorId": "00000000-0000-0000-0000-000000000002",
            "quantity": "1",
            "unitPrice": "99999999999999999999"
        });
        let (status, body) = call(&app, "POST", "/api/orders", token, Some(json!({ "items": [line] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["unitPrice"][0], "is too large");
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let (app, _) = app();
        let (status, doc) = call(&app, "GET", "/api-docs/openapi.json", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(doc["paths"]["/api/quotes/{id}/convert"].is_object());
    }
}
