// src/services/invoice_service.rs

use chrono::{FixedOffset, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{DocFilter, Repository},
    models::{
        auth::Actor,
        invoice::{Invoice, InvoiceStatus, InvoiceView, PaymentRecord, PaymentStatus},
    },
    services::{
        query::{apply_criteria, local_today, ListCriteria, INVOICE_SEARCH_FIELDS},
        workflow::{self, Scope, StatusFlow, Tracked},
    },
};

// A payment lands only on the invoice it was computed from
const PAYMENT_WRITE: Scope<'static> = Scope {
    writes: &["amountPaid", "payments"],
    guards: &["status", "amountPaid"],
};

const PAYMENT_MOVE: Scope<'static> = Scope {
    writes: &[],
    guards: &["status", "amountPaid"],
};

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub amount: Decimal,
    pub method: String,
    pub reference: Option<String>,
}

#[derive(Clone)]
pub struct InvoiceService {
    repo: Repository,
    tz: FixedOffset,
}

impl InvoiceService {
    pub fn new(repo: Repository, tz: FixedOffset) -> Self {
        Self { repo, tz }
    }

    fn view(&self, invoice: Invoice) -> InvoiceView {
        InvoiceView::new(invoice, local_today(Utc::now(), self.tz))
    }

    pub async fn get_invoice(&self, actor: &Actor, id: Uuid) -> Result<InvoiceView, AppError> {
        let invoice: Invoice = self.repo.find(actor.workshop_id, id).await?;
        Ok(self.view(invoice))
    }

    pub async fn list_invoices(&self, actor: &Actor, criteria: &ListCriteria) -> Result<Vec<InvoiceView>, AppError> {
        let invoices: Vec<Invoice> = self.repo.list(actor.workshop_id, DocFilter::new()).await?;
        Ok(apply_criteria(invoices, criteria, INVOICE_SEARCH_FIELDS, self.tz)
            .into_iter()
            .map(|invoice| self.view(invoice))
            .collect())
    }

    // --- Structural axis ---

    /// Opens the invoice for payment. An invoice with nothing left to collect
    /// is settled in the same write.
    pub async fn approve(&self, actor: &Actor, id: Uuid, expected: Option<InvoiceStatus>) -> Result<InvoiceView, AppError> {
        let current: Invoice = self.repo.find(actor.workshop_id, id).await?;
        workflow::ensure_expected(current.status, expected)?;

        let now = Utc::now();
        let mut updated = workflow::transition(&current, InvoiceStatus::Approved, actor, now)?;
        let settles = current.payment_status != PaymentStatus::Paid
            && current.payment_status_for(current.amount_paid) == PaymentStatus::Paid;
        if settles {
            updated = workflow::transition(&updated, PaymentStatus::Paid, actor, now)?;
        }

        let writes: &[&str] = if settles { &["paymentStatus", "paymentHistory"] } else { &[] };
        let scope = Scope { writes, guards: &["paymentStatus", "amountPaid"] };
        let saved = workflow::commit_guarded::<_, InvoiceStatus>(&self.repo, &current, &updated, scope).await?;

        tracing::info!(
            "✅ Invoice {} approved by {} ({})",
            saved.invoice_number,
            actor.name,
            saved.payment_status.as_str()
        );
        Ok(self.view(saved))
    }

    pub async fn void(&self, actor: &Actor, id: Uuid, expected: Option<InvoiceStatus>) -> Result<InvoiceView, AppError> {
        let invoice: Invoice = workflow::transition_stored(&self.repo, actor, id, InvoiceStatus::Void, expected).await?;
        Ok(self.view(invoice))
    }

    // --- Payment axis ---

    /// Appends a payment and moves the payment status to whatever the new
    /// amount implies. Overpayment is rejected.
    pub async fn record_payment(&self, actor: &Actor, id: Uuid, payment: NewPayment) -> Result<InvoiceView, AppError> {
        let current = self.payable(actor, id).await?;

        if payment.amount <= Decimal::ZERO {
            return Err(AppError::invalid("amount", "must be greater than zero"));
        }
        let method = payment.method.trim().to_lowercase();
        if method.is_empty() {
            return Err(AppError::invalid("method", "must not be empty"));
        }

        let amount_paid = current
            .amount_paid
            .checked_add(payment.amount)
            .ok_or_else(|| AppError::invalid("amount", "is too large"))?;
        if amount_paid > current.total {
            return Err(AppError::invalid(
                "amount",
                format!("exceeds the outstanding balance of {}", current.balance()),
            ));
        }

        let now = Utc::now();
        let from: PaymentStatus = Tracked::<PaymentStatus>::current(&current);
        let to = current.payment_status_for(amount_paid);

        // A second partial payment keeps the status; everything else is a move
        let mut updated = if to == from {
            current.clone()
        } else {
            workflow::transition(&current, to, actor, now)?
        };

        updated.amount_paid = amount_paid;
        updated.payments.push(PaymentRecord {
            amount: payment.amount,
            method,
            reference: payment.reference.filter(|r| !r.trim().is_empty()),
            recorded_by: actor.id,
            recorded_at: now,
        });

        let saved = workflow::commit_guarded::<_, PaymentStatus>(&self.repo, &current, &updated, PAYMENT_WRITE).await?;
        tracing::info!(
            "✅ Payment of {} recorded on invoice {} by {} ({})",
            payment.amount,
            saved.invoice_number,
            actor.name,
            saved.payment_status.as_str()
        );
        Ok(self.view(saved))
    }

    pub async fn mark_payment_failed(&self, actor: &Actor, id: Uuid) -> Result<InvoiceView, AppError> {
        let current = self.payable(actor, id).await?;
        self.move_payment(actor, current, PaymentStatus::Failed).await
    }

    /// Leaves `failed` for whatever the money already received implies.
    /// From any other status the move is refused.
    pub async fn retry_payment(&self, actor: &Actor, id: Uuid) -> Result<InvoiceView, AppError> {
        let current = self.payable(actor, id).await?;
        let to = match current.payment_status {
            PaymentStatus::Failed => current.payment_status_for(current.amount_paid),
            _ => PaymentStatus::Pending,
        };
        self.move_payment(actor, current, to).await
    }

    pub async fn refund(&self, actor: &Actor, id: Uuid) -> Result<InvoiceView, AppError> {
        let current = self.payable(actor, id).await?;
        self.move_payment(actor, current, PaymentStatus::Refunded).await
    }

    async fn move_payment(&self, actor: &Actor, current: Invoice, to: PaymentStatus) -> Result<InvoiceView, AppError> {
        let updated = workflow::transition(&current, to, actor, Utc::now())?;
        let saved = workflow::commit_guarded::<_, PaymentStatus>(&self.repo, &current, &updated, PAYMENT_MOVE).await?;
        tracing::info!("✅ Invoice {} payment -> {} by {}", saved.invoice_number, to.as_str(), actor.name);
        Ok(self.view(saved))
    }

    // Money only moves on approved invoices
    async fn payable(&self, actor: &Actor, id: Uuid) -> Result<Invoice, AppError> {
        let invoice: Invoice = self.repo.find(actor.workshop_id, id).await?;
        match invoice.status {
            InvoiceStatus::Approved => Ok(invoice),
            InvoiceStatus::Void => Err(AppError::TerminalState {
                entity: InvoiceStatus::ENTITY,
                status: InvoiceStatus::Void.as_str().to_string(),
            }),
            InvoiceStatus::Draft => Err(AppError::invalid("status", "approve the invoice before taking payments")),
        }
    }
}
