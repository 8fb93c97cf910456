// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use chrono::FixedOffset;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;

use crate::{
    db::{DocumentStore, MemoryStore, PgDocumentStore, Repository},
    services::{
        auth::AuthService, customer_service::CustomerService, dashboard_service::DashboardService,
        invoice_service::InvoiceService, job_service::JobService, order_service::OrderService,
        quote_service::QuoteService,
    },
};

// `DATABASE_URL=memory` runs without Postgres (local demos, tests)
pub const MEMORY_DATABASE_URL: &str = "memory";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    /// Offset used for "today" and for date-range filters
    pub workshop_tz: FixedOffset,
    pub default_vat_rate: Decimal,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let offset_minutes: i32 = match env::var("WORKSHOP_UTC_OFFSET_MINUTES") {
            Ok(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("WORKSHOP_UTC_OFFSET_MINUTES is not a number: {}", raw))?,
            Err(_) => 60,
        };
        let workshop_tz = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or_else(|| anyhow!("WORKSHOP_UTC_OFFSET_MINUTES out of range: {}", offset_minutes))?;

        let default_vat_rate = match env::var("DEFAULT_VAT_RATE") {
            Ok(raw) => Decimal::from_str(raw.trim())
                .with_context(|| format!("DEFAULT_VAT_RATE is not a decimal: {}", raw))?,
            Err(_) => Decimal::new(75, 3),
        };

        Ok(Self { database_url, jwt_secret, bind_addr, workshop_tz, default_vat_rate })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub job_service: JobService,
    pub quote_service: QuoteService,
    pub invoice_service: InvoiceService,
    pub order_service: OrderService,
    pub customer_service: CustomerService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let store: Arc<dyn DocumentStore> = if config.database_url == MEMORY_DATABASE_URL {
            tracing::warn!("⚠ Using the in-memory document store, nothing will survive a restart");
            Arc::new(MemoryStore::new())
        } else {
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(3))
                .connect(&config.database_url)
                .await
                .context("failed to connect to the database")?;
            tracing::info!("✅ Database connection established");

            sqlx::migrate!()
                .run(&db_pool)
                .await
                .context("failed to run database migrations")?;
            tracing::info!("✅ Database migrations applied");

            Arc::new(PgDocumentStore::new(db_pool))
        };

        Ok(Self::with_store(store, config))
    }

    // --- Dependency graph ---
    pub fn with_store(store: Arc<dyn DocumentStore>, config: &Config) -> Self {
        let repo = Repository::new(store);
        let tz = config.workshop_tz;

        let customer_service = CustomerService::new(repo.clone(), tz);
        Self {
            auth_service: AuthService::new(config.jwt_secret.clone()),
            job_service: JobService::new(repo.clone(), tz),
            quote_service: QuoteService::new(repo.clone(), tz, config.default_vat_rate),
            invoice_service: InvoiceService::new(repo.clone(), tz),
            order_service: OrderService::new(repo.clone(), tz),
            dashboard_service: DashboardService::new(repo, customer_service.clone()),
            customer_service,
        }
    }
}
