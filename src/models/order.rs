// src/models/order.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::history::StatusChange;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

// Vendor settlement. Moves independently of fulfillment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Processing,
    Paid,
    Failed,
}

// --- Structs ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: Uuid,
    #[schema(example = "Brake disc (front, pair)")]
    pub name: String,
    pub vendor_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceOrder {
    pub id: Uuid,
    #[schema(ignore)]
    pub workshop_id: Uuid,
    #[schema(example = "ORD-20261016-77AB")]
    pub order_number: String,
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub items: Vec<OrderLine>,
    pub total: Decimal,
    pub status: FulfillmentStatus,
    pub payout_status: PayoutStatus,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub status_history: Vec<StatusChange<FulfillmentStatus>>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub payout_history: Vec<StatusChange<PayoutStatus>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VendorShare {
    pub vendor_id: Uuid,
    pub item_count: usize,
    pub amount: Decimal,
}

impl MarketplaceOrder {
    /// Amount owed to each vendor, in vendor id order.
    pub fn vendor_shares(&self) -> Vec<VendorShare> {
        let mut shares: BTreeMap<Uuid, VendorShare> = BTreeMap::new();
        for line in &self.items {
            let share = shares.entry(line.vendor_id).or_insert(VendorShare {
                vendor_id: line.vendor_id,
                item_count: 0,
                amount: Decimal::ZERO,
            });
            share.item_count += 1;
            share.amount = share.amount.saturating_add(line.total);
        }
        shares.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_shares_group_lines_by_vendor() {
        let v1 = Uuid::new_v4();
        let v2 = Uuid::new_v4();
        let line = |vendor, total: i64| OrderLine {
            product_id: Uuid::new_v4(),
            name: "part".into(),
            vendor_id: vendor,
            quantity: Decimal::ONE,
            unit_price: Decimal::from(total),
            total: Decimal::from(total),
        };
        let order = MarketplaceOrder {
            id: Uuid::new_v4(),
            workshop_id: Uuid::new_v4(),
            order_number: "ORD-1".into(),
            customer_id: None,
            customer_name: None,
            items: vec![line(v1, 10), line(v2, 5), line(v1, 20)],
            total: Decimal::from(35),
            status: FulfillmentStatus::Delivered,
            payout_status: PayoutStatus::Pending,
            status_history: vec![],
            payout_history: vec![],
            created_at: None,
            updated_at: None,
        };

        let shares = order.vendor_shares();
        assert_eq!(shares.len(), 2);
        let s1 = shares.iter().find(|s| s.vendor_id == v1).unwrap();
        assert_eq!(s1.item_count, 2);
        assert_eq!(s1.amount, Decimal::from(30));
    }
}
