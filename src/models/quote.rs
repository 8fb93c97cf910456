// src/models/quote.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Draft,
    PendingApproval,
    Rejected,
    Converted,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuoteAction {
    Created,
    StatusChanged,
    ItemsUpdated,
    Converted,
}

// --- Structs ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[schema(example = "Front brake pads")]
    pub description: String,
    #[schema(example = "2")]
    pub quantity: Decimal,
    #[schema(example = "500.00")]
    pub unit_price: Decimal,
    // Always quantity × unit_price, recomputed on every write
    #[schema(example = "1000.00")]
    pub total: Decimal,
}

impl LineItem {
    /// `None` when quantity × unit_price does not fit in a decimal.
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Option<Self> {
        Some(Self {
            description: description.into(),
            quantity,
            unit_price,
            total: quantity.checked_mul(unit_price)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: Decimal,
    pub vat: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl Totals {
    /// subtotal = Σ item.total, vat = subtotal × rate (2dp), total = subtotal + vat − discount.
    /// `None` on overflow.
    pub fn compute(items: &[LineItem], vat_rate: Decimal, discount: Decimal) -> Option<Self> {
        let subtotal = items.iter().try_fold(Decimal::ZERO, |sum, i| {
            sum.checked_add(i.quantity.checked_mul(i.unit_price)?)
        })?;
        let vat = subtotal.checked_mul(vat_rate)?.round_dp(2);
        Some(Self {
            subtotal,
            vat,
            discount,
            total: subtotal.checked_add(vat)?.checked_sub(discount)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLogEntry {
    pub action: QuoteAction,
    pub from_status: Option<QuoteStatus>,
    pub to_status: Option<QuoteStatus>,
    pub by: Uuid,
    pub by_name: String,
    pub at: DateTime<Utc>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: Uuid,
    #[schema(ignore)]
    pub workshop_id: Uuid,
    #[schema(example = "QT-20261016-4F2A")]
    pub quote_number: String,
    pub job_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub items: Vec<LineItem>,
    #[schema(example = "0.075")]
    pub vat_rate: Decimal,
    pub subtotal: Decimal,
    pub vat: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub status: QuoteStatus,
    #[serde(default)]
    pub history: Vec<QuoteLogEntry>,
    pub converted_to_invoice_id: Option<Uuid>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Quote {
    pub fn totals(&self) -> Totals {
        Totals {
            subtotal: self.subtotal,
            vat: self.vat,
            discount: self.discount,
            total: self.total,
        }
    }

    /// Replaces the items and recomputes every total. Leaves the quote
    /// untouched and returns `None` when an amount overflows.
    pub fn apply_items(&mut self, items: Vec<LineItem>, discount: Decimal) -> Option<()> {
        let items = items
            .into_iter()
            .map(|i| LineItem::new(i.description, i.quantity, i.unit_price))
            .collect::<Option<Vec<_>>>()?;
        let totals = Totals::compute(&items, self.vat_rate, discount)?;
        self.items = items;
        self.subtotal = totals.subtotal;
        self.vat = totals.vat;
        self.discount = totals.discount;
        self.total = totals.total;
        Some(())
    }
}
