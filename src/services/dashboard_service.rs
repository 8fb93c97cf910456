// src/services/dashboard_service.rs

use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    db::{DocFilter, Repository},
    models::{
        auth::Actor,
        dashboard::DashboardSummary,
        invoice::{Invoice, InvoiceStatus, PaymentStatus},
        job::Job,
        order::{FulfillmentStatus, MarketplaceOrder, PayoutStatus},
        quote::Quote,
    },
    services::{
        customer_service::CustomerService,
        query::{filter_by_status_group, StatusGrouped},
    },
};

#[derive(Clone)]
pub struct DashboardService {
    repo: Repository,
    customers: CustomerService,
}

fn count_in<T: StatusGrouped + Clone>(items: &[T], group: &str) -> usize {
    filter_by_status_group(items.to_vec(), group).len()
}

impl DashboardService {
    pub fn new(repo: Repository, customers: CustomerService) -> Self {
        Self { repo, customers }
    }

    pub async fn summary(&self, actor: &Actor) -> Result<DashboardSummary, AppError> {
        let jobs: Vec<Job> = self.repo.list(actor.workshop_id, DocFilter::new()).await?;
        let quotes: Vec<Quote> = self.repo.list(actor.workshop_id, DocFilter::new()).await?;
        let invoices: Vec<Invoice> = self.repo.list(actor.workshop_id, DocFilter::new()).await?;
        let orders: Vec<MarketplaceOrder> = self.repo.list(actor.workshop_id, DocFilter::new()).await?;

        // Drafts and voided invoices are not owed yet / anymore
        let live: Vec<Invoice> = invoices
            .into_iter()
            .filter(|i| i.status == InvoiceStatus::Approved)
            .collect();
        let outstanding_balance: Decimal = live
            .iter()
            .filter(|i| !matches!(i.payment_status, PaymentStatus::Paid | PaymentStatus::Refunded))
            .map(Invoice::balance)
            .fold(Decimal::ZERO, Decimal::saturating_add);

        let pending_payouts = orders
            .iter()
            .filter(|o| o.status == FulfillmentStatus::Delivered)
            .filter(|o| o.payout_status != PayoutStatus::Paid)
            .count();

        Ok(DashboardSummary {
            pending_jobs: count_in(&jobs, "pending"),
            active_jobs: count_in(&jobs, "active"),
            completed_jobs: count_in(&jobs, "completed"),
            open_quotes: count_in(&quotes, "open"),
            unpaid_invoices: count_in(&live, "unpaid") + count_in(&live, "partial"),
            outstanding_balance,
            pending_payouts,
            birthdays_today: self.customers.birthdays_today(actor).await?,
        })
    }
}
