pub mod auth;
pub mod customer_service;
pub mod dashboard_service;
pub mod invoice_service;
pub mod job_service;
pub mod order_service;
pub mod query;
pub mod quote_service;
pub mod validation;
pub mod workflow;
