// src/models/dashboard.rs

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::user::User;

// The cards at the top of the admin home screen
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub pending_jobs: usize,   // received + diagnosed
    pub active_jobs: usize,    // repairing
    pub completed_jobs: usize,
    pub open_quotes: usize,    // draft + pending_approval
    pub unpaid_invoices: usize,
    pub outstanding_balance: Decimal, // Σ (total - amountPaid) on approved, not settled invoices
    pub pending_payouts: usize,       // delivered orders still waiting on vendor settlement
    pub birthdays_today: Vec<User>,
}
