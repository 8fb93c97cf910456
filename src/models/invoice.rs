// src/models/invoice.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::history::StatusChange;
use crate::models::quote::LineItem;

// --- Enums ---

// Structural lifecycle of the document itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Approved,
    Void,
}

// Money axis, independent from the structural one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
    PartiallyPaid,
}

// What staff see in the invoice list: a projection of both axes plus the due date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceProgress {
    Draft,
    Open,
    Overdue,
    Settled,
    Refunded,
    Void,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub amount: Decimal,
    #[schema(example = "transfer")]
    pub method: String,
    pub reference: Option<String>,
    pub recorded_by: Uuid,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    #[schema(ignore)]
    pub workshop_id: Uuid,
    #[schema(example = "INV-20261016-9C1D")]
    pub invoice_number: String,
    pub quote_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub vat: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub amount_paid: Decimal,
    pub status: InvoiceStatus,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub status_history: Vec<StatusChange<InvoiceStatus>>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub payment_history: Vec<StatusChange<PaymentStatus>>,
    #[serde(default)]
    pub payments: Vec<PaymentRecord>,
    pub due_date: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Invoice {
    pub fn balance(&self) -> Decimal {
        self.total - self.amount_paid
    }

    pub fn progress(&self, today: NaiveDate) -> InvoiceProgress {
        match (self.status, self.payment_status) {
            (InvoiceStatus::Void, _) => InvoiceProgress::Void,
            (InvoiceStatus::Draft, _) => InvoiceProgress::Draft,
            (InvoiceStatus::Approved, PaymentStatus::Paid) => InvoiceProgress::Settled,
            (InvoiceStatus::Approved, PaymentStatus::Refunded) => InvoiceProgress::Refunded,
            (InvoiceStatus::Approved, _) => match self.due_date {
                Some(due) if due < today => InvoiceProgress::Overdue,
                _ => InvoiceProgress::Open,
            },
        }
    }

    /// Payment status implied by an amount paid against this invoice's total.
    pub fn payment_status_for(&self, amount_paid: Decimal) -> PaymentStatus {
        if amount_paid >= self.total {
            PaymentStatus::Paid
        } else if amount_paid > Decimal::ZERO {
            PaymentStatus::PartiallyPaid
        } else {
            PaymentStatus::Pending
        }
    }
}

// Response wrapper with the derived progress filled in
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceView {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub invoice_status: InvoiceProgress,
    pub balance: Decimal,
}

impl InvoiceView {
    pub fn new(invoice: Invoice, today: NaiveDate) -> Self {
        Self {
            invoice_status: invoice.progress(today),
            balance: invoice.balance(),
            invoice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice(total: i64) -> Invoice {
        Invoice {
            id: Uuid::new_v4(),
            workshop_id: Uuid::new_v4(),
            invoice_number: "INV-1".into(),
            quote_id: None,
            job_id: None,
            customer_id: None,
            customer_name: None,
            items: vec![],
            subtotal: Decimal::from(total),
            vat: Decimal::ZERO,
            discount: Decimal::ZERO,
            total: Decimal::from(total),
            amount_paid: Decimal::ZERO,
            status: InvoiceStatus::Approved,
            payment_status: PaymentStatus::Pending,
            status_history: vec![],
            payment_history: vec![],
            payments: vec![],
            due_date: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn progress_projects_both_axes() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let mut inv = invoice(100);
        assert_eq!(inv.progress(today), InvoiceProgress::Open);

        inv.due_date = NaiveDate::from_ymd_opt(2026, 10, 1);
        assert_eq!(inv.progress(today), InvoiceProgress::Overdue);

        inv.payment_status = PaymentStatus::Paid;
        assert_eq!(inv.progress(today), InvoiceProgress::Settled);

        inv.status = InvoiceStatus::Void;
        assert_eq!(inv.progress(today), InvoiceProgress::Void);
    }

    #[test]
    fn payment_status_follows_amount() {
        let inv = invoice(100);
        assert_eq!(inv.payment_status_for(Decimal::ZERO), PaymentStatus::Pending);
        assert_eq!(inv.payment_status_for(Decimal::from(40)), PaymentStatus::PartiallyPaid);
        assert_eq!(inv.payment_status_for(Decimal::from(100)), PaymentStatus::Paid);
    }
}
