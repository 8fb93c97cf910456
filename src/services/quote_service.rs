// src/services/quote_service.rs

use chrono::{FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{store::encode, Collection, DocFilter, Precondition, Repository, WriteBatch},
    models::{
        auth::Actor,
        invoice::{Invoice, InvoiceStatus, PaymentStatus},
        job::Job,
        quote::{LineItem, Quote, QuoteAction, QuoteLogEntry, QuoteStatus, Totals},
        user::User,
    },
    services::{
        query::{apply_criteria, ListCriteria, QUOTE_SEARCH_FIELDS},
        validation,
        workflow::{self, StatusFlow, Tracked},
    },
};

// Everything an item edit rewrites
const PRICED_FIELDS: &[&str] = &["items", "subtotal", "vat", "discount", "total", "history"];

#[derive(Debug, Clone)]
pub struct NewQuote {
    pub job_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub items: Vec<LineItem>,
    pub discount: Decimal,
    /// Falls back to the workshop default
    pub vat_rate: Option<Decimal>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct QuoteService {
    repo: Repository,
    tz: FixedOffset,
    default_vat_rate: Decimal,
}

impl QuoteService {
    pub fn new(repo: Repository, tz: FixedOffset, default_vat_rate: Decimal) -> Self {
        Self { repo, tz, default_vat_rate }
    }

    pub async fn create_quote(&self, actor: &Actor, input: NewQuote) -> Result<Quote, AppError> {
        let vat_rate = input.vat_rate.unwrap_or(self.default_vat_rate);
        if vat_rate < Decimal::ZERO || vat_rate > Decimal::ONE {
            return Err(AppError::invalid("vatRate", "must be between 0 and 1"));
        }

        let (customer_id, customer_name) = self.resolve_customer(actor, input.job_id, input.customer_id).await?;

        let now = Utc::now();
        let id = Uuid::new_v4();
        let mut quote = Quote {
            id,
            workshop_id: actor.workshop_id,
            quote_number: workflow::document_number("QT", now, id),
            job_id: input.job_id,
            customer_id,
            customer_name,
            items: Vec::new(),
            vat_rate,
            subtotal: Decimal::ZERO,
            vat: Decimal::ZERO,
            discount: Decimal::ZERO,
            total: Decimal::ZERO,
            status: QuoteStatus::Draft,
            history: vec![QuoteLogEntry {
                action: QuoteAction::Created,
                from_status: None,
                to_status: Some(QuoteStatus::Draft),
                by: actor.id,
                by_name: actor.name.clone(),
                at: now,
                note: None,
            }],
            converted_to_invoice_id: None,
            valid_until: input.valid_until,
            notes: input.notes.filter(|n| !n.trim().is_empty()),
            created_at: None,
            updated_at: None,
        };
        quote.apply_items(input.items, input.discount).ok_or_else(validation::amounts_too_large)?;
        check_discount(&quote.totals())?;

        let saved = self.repo.insert(&quote).await?;
        tracing::info!("✅ Quote {} created by {} (total {})", saved.quote_number, actor.name, saved.total);
        Ok(saved)
    }

    pub async fn get_quote(&self, actor: &Actor, id: Uuid) -> Result<Quote, AppError> {
        self.repo.find(actor.workshop_id, id).await
    }

    pub async fn list_quotes(&self, actor: &Actor, criteria: &ListCriteria) -> Result<Vec<Quote>, AppError> {
        let quotes: Vec<Quote> = self.repo.list(actor.workshop_id, DocFilter::new()).await?;
        Ok(apply_criteria(quotes, criteria, QUOTE_SEARCH_FIELDS, self.tz))
    }

    /// Replaces the line items of a draft and recomputes every total.
    pub async fn update_items(
        &self,
        actor: &Actor,
        id: Uuid,
        items: Vec<LineItem>,
        discount: Decimal,
    ) -> Result<Quote, AppError> {
        let current = self.get_quote(actor, id).await?;
        if current.status.is_terminal() {
            return Err(AppError::TerminalState {
                entity: QuoteStatus::ENTITY,
                status: current.status.as_str().to_string(),
            });
        }
        if current.status != QuoteStatus::Draft {
            return Err(AppError::invalid("status", "items can only be changed while the quote is a draft"));
        }

        let now = Utc::now();
        let mut updated = current.clone();
        updated.apply_items(items, discount).ok_or_else(validation::amounts_too_large)?;
        check_discount(&updated.totals())?;

        updated.history.push(QuoteLogEntry {
            action: QuoteAction::ItemsUpdated,
            from_status: None,
            to_status: None,
            by: actor.id,
            by_name: actor.name.clone(),
            at: workflow::not_before(now, current.last_changed_at()),
            note: Some(format!("total {} -> {}", current.total, updated.total)),
        });

        // Guarding the trail too catches an edit or a round trip through
        // pending_approval that happened since the read
        let guards = [QuoteStatus::FIELD, "history"];
        let saved = workflow::commit_fields(&self.repo, &current, &updated, PRICED_FIELDS, &guards).await?;
        tracing::info!("✅ Quote {} items updated by {}", saved.quote_number, actor.name);
        Ok(saved)
    }

    pub async fn transition_quote(
        &self,
        actor: &Actor,
        id: Uuid,
        to: QuoteStatus,
        expected: Option<QuoteStatus>,
    ) -> Result<Quote, AppError> {
        workflow::transition_stored(&self.repo, actor, id, to, expected).await
    }

    /// Turns a live quote into a draft invoice. The status flip, the invoice
    /// and the back-link are one batch: either all three land or none do.
    pub async fn convert_quote(
        &self,
        actor: &Actor,
        id: Uuid,
        expected: Option<QuoteStatus>,
        due_date: Option<NaiveDate>,
    ) -> Result<(Quote, Invoice), AppError> {
        let quote = self.get_quote(actor, id).await?;
        workflow::ensure_expected(quote.status, expected)?;

        if quote.status.is_terminal() {
            return Err(AppError::TerminalState {
                entity: QuoteStatus::ENTITY,
                status: quote.status.as_str().to_string(),
            });
        }
        if quote.items.is_empty() {
            return Err(AppError::invalid("items", "a quote without items cannot be invoiced"));
        }

        let now = Utc::now();
        let invoice_id = Uuid::new_v4();
        let invoice = Invoice {
            id: invoice_id,
            workshop_id: quote.workshop_id,
            invoice_number: workflow::document_number("INV", now, invoice_id),
            quote_id: Some(quote.id),
            job_id: quote.job_id,
            customer_id: quote.customer_id,
            customer_name: quote.customer_name.clone(),
            items: quote.items.clone(),
            subtotal: quote.subtotal,
            vat: quote.vat,
            discount: quote.discount,
            total: quote.total,
            amount_paid: Decimal::ZERO,
            status: InvoiceStatus::Draft,
            payment_status: PaymentStatus::Pending,
            status_history: Vec::new(),
            payment_history: Vec::new(),
            payments: Vec::new(),
            due_date,
            created_at: None,
            updated_at: None,
        };

        let mut converted = quote.clone();
        converted.record(workflow::audit_entry(
            quote.status,
            QuoteStatus::Converted,
            actor,
            now,
            quote.last_changed_at(),
        ));

        let batch = WriteBatch::new()
            .update_guarded(
                Collection::Quotes,
                quote.id,
                json!({ "status": converted.status, "history": converted.history }),
                vec![
                    Precondition::new(QuoteStatus::FIELD, json!(quote.status)),
                    Precondition::new("history", json!(quote.history)),
                ],
            )
            .create(Collection::Invoices, invoice_id, encode(&invoice)?)
            .update(Collection::Quotes, quote.id, json!({ "convertedToInvoiceId": invoice_id }));

        if let Err(e) = self.repo.commit(batch).await {
            tracing::warn!("⚠ Quote {} conversion rolled back: {}", quote.quote_number, e);
            return Err(e);
        }

        let saved_quote: Quote = self.repo.find(actor.workshop_id, quote.id).await?;
        let saved_invoice: Invoice = self.repo.find(actor.workshop_id, invoice_id).await?;
        tracing::info!(
            "✅ Quote {} converted into invoice {} by {}",
            saved_quote.quote_number,
            saved_invoice.invoice_number,
            actor.name
        );
        Ok((saved_quote, saved_invoice))
    }

    async fn resolve_customer(
        &self,
        actor: &Actor,
        job_id: Option<Uuid>,
        customer_id: Option<Uuid>,
    ) -> Result<(Option<Uuid>, Option<String>), AppError> {
        let job = match job_id {
            Some(job_id) => Some(self.repo.find::<Job>(actor.workshop_id, job_id).await?),
            None => None,
        };

        match customer_id.or_else(|| job.as_ref().and_then(|j| j.customer.user_id())) {
            Some(customer_id) => {
                let user: User = self.repo.find(actor.workshop_id, customer_id).await?;
                Ok((Some(customer_id), Some(user.full_name)))
            }
            // Walk-in jobs carry the name only
            None => Ok((None, job.and_then(|j| j.customer_name))),
        }
    }
}

fn check_discount(totals: &Totals) -> Result<(), AppError> {
    if totals.discount < Decimal::ZERO {
        return Err(AppError::invalid("discount", "must not be negative"));
    }
    if totals.total < Decimal::ZERO {
        return Err(AppError::invalid("discount", "exceeds the quoted amount"));
    }
    Ok(())
}
