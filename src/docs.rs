// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Jobs ---
        handlers::jobs::create_job,
        handlers::jobs::list_jobs,
        handlers::jobs::get_job,
        handlers::jobs::transition_job,
        handlers::jobs::assign_technicians,

        // --- Quotes ---
        handlers::quotes::create_quote,
        handlers::quotes::list_quotes,
        handlers::quotes::get_quote,
        handlers::quotes::update_items,
        handlers::quotes::transition_quote,
        handlers::quotes::convert_quote,

        // --- Invoices ---
        handlers::invoices::list_invoices,
        handlers::invoices::get_invoice,
        handlers::invoices::approve_invoice,
        handlers::invoices::void_invoice,
        handlers::invoices::record_payment,
        handlers::invoices::mark_payment_failed,
        handlers::invoices::retry_payment,
        handlers::invoices::refund_invoice,

        // --- Orders ---
        handlers::orders::create_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::transition_fulfillment,
        handlers::orders::transition_payout,
        handlers::orders::vendor_shares,

        // --- Customers ---
        handlers::customers::create_user,
        handlers::customers::list_users,
        handlers::customers::get_user,
        handlers::customers::birthdays_today,
        handlers::customers::create_vehicle,
        handlers::customers::list_vehicles,
        handlers::customers::get_vehicle,

        // --- Dashboard ---
        handlers::dashboard::get_summary,
    ),
    components(
        schemas(
            // --- Jobs ---
            models::job::Job,
            models::job::JobStatus,
            models::job::JobType,
            models::job::CustomerRef,
            handlers::jobs::CreateJobPayload,
            handlers::jobs::JobTransitionPayload,
            handlers::jobs::AssignTechniciansPayload,

            // --- Quotes ---
            models::quote::Quote,
            models::quote::QuoteStatus,
            models::quote::QuoteAction,
            models::quote::QuoteLogEntry,
            models::quote::LineItem,
            services::validation::LineItemInput,
            handlers::quotes::CreateQuotePayload,
            handlers::quotes::UpdateItemsPayload,
            handlers::quotes::QuoteTransitionPayload,
            handlers::quotes::ConvertQuotePayload,
            handlers::quotes::ConversionResponse,

            // --- Invoices ---
            models::invoice::Invoice,
            models::invoice::InvoiceView,
            models::invoice::InvoiceStatus,
            models::invoice::PaymentStatus,
            models::invoice::InvoiceProgress,
            models::invoice::PaymentRecord,
            handlers::invoices::InvoiceStatusPayload,
            handlers::invoices::RecordPaymentPayload,

            // --- Orders ---
            models::order::MarketplaceOrder,
            models::order::OrderLine,
            models::order::FulfillmentStatus,
            models::order::PayoutStatus,
            models::order::VendorShare,
            handlers::orders::CreateOrderPayload,
            handlers::orders::OrderLinePayload,
            handlers::orders::FulfillmentPayload,
            handlers::orders::PayoutPayload,

            // --- Customers ---
            models::user::User,
            models::user::UserProfile,
            models::auth::StaffRole,
            models::vehicle::Vehicle,
            handlers::customers::CreateUserPayload,
            handlers::customers::CreateVehiclePayload,

            // --- Dashboard ---
            models::dashboard::DashboardSummary,
        )
    ),
    tags(
        (name = "Jobs", description = "Service, repair and tow jobs"),
        (name = "Quotes", description = "Priced proposals and conversion to invoices"),
        (name = "Invoices", description = "Billing and payments"),
        (name = "Orders", description = "Marketplace orders and vendor payouts"),
        (name = "Customers", description = "Customers, staff, vendors and vehicles"),
        (name = "Dashboard", description = "Admin home screen counters")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
