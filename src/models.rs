pub mod auth;
pub mod dashboard;
pub mod history;
pub mod invoice;
pub mod job;
pub mod order;
pub mod quote;
pub mod user;
pub mod vehicle;
