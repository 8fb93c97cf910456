// src/services/order_service.rs

use chrono::{FixedOffset, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{DocFilter, Repository},
    models::{
        auth::Actor,
        order::{FulfillmentStatus, MarketplaceOrder, OrderLine, PayoutStatus, VendorShare},
        user::{User, UserProfile},
    },
    services::{
        query::{apply_criteria, ListCriteria, ORDER_SEARCH_FIELDS},
        validation,
        workflow::{self, Scope, StatusFlow, Tracked},
    },
};

#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: Uuid,
    pub name: String,
    pub vendor_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: Option<Uuid>,
    pub items: Vec<NewOrderLine>,
}

#[derive(Clone)]
pub struct OrderService {
    repo: Repository,
    tz: FixedOffset,
}

impl OrderService {
    pub fn new(repo: Repository, tz: FixedOffset) -> Self {
        Self { repo, tz }
    }

    pub async fn create_order(&self, actor: &Actor, input: NewOrder) -> Result<MarketplaceOrder, AppError> {
        if input.items.is_empty() {
            return Err(AppError::invalid("items", "an order needs at least one item"));
        }

        let customer_name = match input.customer_id {
            Some(customer_id) => Some(self.repo.find::<User>(actor.workshop_id, customer_id).await?.full_name),
            None => None,
        };

        let mut items: Vec<OrderLine> = Vec::with_capacity(input.items.len());
        for line in input.items {
            let vendor: User = self.repo.find(actor.workshop_id, line.vendor_id).await?;
            if !matches!(vendor.profile, UserProfile::Vendor { .. }) {
                return Err(AppError::invalid("vendorId", format!("{} is not a vendor", vendor.full_name)));
            }
            let total = line
                .quantity
                .checked_mul(line.unit_price)
                .ok_or_else(validation::amounts_too_large)?;
            items.push(OrderLine {
                product_id: line.product_id,
                name: line.name.trim().to_string(),
                vendor_id: line.vendor_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                total,
            });
        }
        let total = items
            .iter()
            .try_fold(Decimal::ZERO, |sum, line| sum.checked_add(line.total))
            .ok_or_else(|| AppError::invalid("items", "order total is too large"))?;

        let id = Uuid::new_v4();
        let order = MarketplaceOrder {
            id,
            workshop_id: actor.workshop_id,
            order_number: workflow::document_number("ORD", Utc::now(), id),
            customer_id: input.customer_id,
            customer_name,
            total,
            items,
            status: FulfillmentStatus::Pending,
            payout_status: PayoutStatus::Pending,
            status_history: Vec::new(),
            payout_history: Vec::new(),
            created_at: None,
            updated_at: None,
        };

        let saved = self.repo.insert(&order).await?;
        tracing::info!("✅ Order {} placed by {} (total {})", saved.order_number, actor.name, saved.total);
        Ok(saved)
    }

    pub async fn get_order(&self, actor: &Actor, id: Uuid) -> Result<MarketplaceOrder, AppError> {
        self.repo.find(actor.workshop_id, id).await
    }

    pub async fn list_orders(&self, actor: &Actor, criteria: &ListCriteria) -> Result<Vec<MarketplaceOrder>, AppError> {
        let orders: Vec<MarketplaceOrder> = self.repo.list(actor.workshop_id, DocFilter::new()).await?;
        Ok(apply_criteria(orders, criteria, ORDER_SEARCH_FIELDS, self.tz))
    }

    pub async fn transition_fulfillment(
        &self,
        actor: &Actor,
        id: Uuid,
        to: FulfillmentStatus,
        expected: Option<FulfillmentStatus>,
    ) -> Result<MarketplaceOrder, AppError> {
        workflow::transition_stored(&self.repo, actor, id, to, expected).await
    }

    /// Moves vendor settlement. Blocked while the order itself is cancelled.
    pub async fn transition_payout(
        &self,
        actor: &Actor,
        id: Uuid,
        to: PayoutStatus,
        expected: Option<PayoutStatus>,
    ) -> Result<MarketplaceOrder, AppError> {
        let current = self.get_order(actor, id).await?;
        let from: PayoutStatus = Tracked::<PayoutStatus>::current(&current);
        workflow::ensure_expected(from, expected)?;

        if current.status == FulfillmentStatus::Cancelled {
            return Err(AppError::InvalidTransition {
                entity: PayoutStatus::ENTITY,
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }

        let updated = workflow::transition(&current, to, actor, Utc::now())?;
        // A cancellation since the read refuses the move
        let scope = Scope { writes: &[], guards: &[FulfillmentStatus::FIELD] };
        let saved = workflow::commit_guarded::<_, PayoutStatus>(&self.repo, &current, &updated, scope).await?;
        tracing::info!("✅ Order {} payout -> {} by {}", saved.order_number, to.as_str(), actor.name);
        Ok(saved)
    }

    pub async fn vendor_shares(&self, actor: &Actor, id: Uuid) -> Result<Vec<VendorShare>, AppError> {
        Ok(self.get_order(actor, id).await?.vendor_shares())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{actor, lagos, memory_repo, seed_customer, seed_vendor};

    async fn placed(repo: &Repository, actor: &Actor) -> MarketplaceOrder {
        let vendor = seed_vendor(repo, actor.workshop_id, "Parts Hub").await;
        let other = seed_vendor(repo, actor.workshop_id, "Tyre World").await;
        let line = |vendor_id, name: &str, price: i64| NewOrderLine {
            product_id: Uuid::new_v4(),
            name: name.into(),
            vendor_id,
            quantity: Decimal::from(2),
            unit_price: Decimal::from(price),
        };
        OrderService::new(repo.clone(), lagos())
            .create_order(
                actor,
                NewOrder {
                    customer_id: None,
                    items: vec![line(vendor.id, "Brake disc", 40), line(other.id, "Tyre", 60)],
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn order_totals_and_vendor_shares() {
        let (_, repo) = memory_repo();
        let actor = actor();
        let order = placed(&repo, &actor).await;
        assert_eq!(order.total, Decimal::from(200));
        assert_eq!(order.status, FulfillmentStatus::Pending);
        assert_eq!(order.payout_status, PayoutStatus::Pending);

        let shares = OrderService::new(repo, lagos()).vendor_shares(&actor, order.id).await.unwrap();
        assert_eq!(shares.len(), 2);
        assert_eq!(shares.iter().map(|s| s.amount).sum::<Decimal>(), Decimal::from(200));
    }

    #[tokio::test]
    async fn customers_cannot_sell() {
        let (_, repo) = memory_repo();
        let actor = actor();
        let customer = seed_customer(&repo, actor.workshop_id, "Ada Obi", None).await;
        let err = OrderService::new(repo, lagos())
            .create_order(
                &actor,
                NewOrder {
                    customer_id: None,
                    items: vec![NewOrderLine {
                        product_id: Uuid::new_v4(),
                        name: "Wiper".into(),
                        vendor_id: customer.id,
                        quantity: Decimal::ONE,
                        unit_price: Decimal::ONE,
                    }],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidField { field: "vendorId", .. }));
    }

    #[tokio::test]
    async fn fulfillment_and_payout_move_independently() {
        let (_, repo) = memory_repo();
        let actor = actor();
        let order = placed(&repo, &actor).await;
        let service = OrderService::new(repo, lagos());

        service.transition_fulfillment(&actor, order.id, FulfillmentStatus::Confirmed, None).await.unwrap();
        let processing = service
            .transition_payout(&actor, order.id, PayoutStatus::Processing, Some(PayoutStatus::Pending))
            .await
            .unwrap();
        assert_eq!(processing.status, FulfillmentStatus::Confirmed);
        assert_eq!(processing.status_history.len(), 1);
        assert_eq!(processing.payout_history.len(), 1);

        service.transition_fulfillment(&actor, order.id, FulfillmentStatus::Shipped, None).await.unwrap();
        service.transition_fulfillment(&actor, order.id, FulfillmentStatus::Delivered, None).await.unwrap();
        let paid = service.transition_payout(&actor, order.id, PayoutStatus::Paid, None).await.unwrap();
        assert_eq!(paid.payout_status, PayoutStatus::Paid);

        let err = service
            .transition_fulfillment(&actor, order.id, FulfillmentStatus::Cancelled, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TerminalState { .. }));
    }

    #[tokio::test]
    async fn cancelled_order_blocks_payout() {
        let (_, repo) = memory_repo();
        let actor = actor();
        let order = placed(&repo, &actor).await;
        let service = OrderService::new(repo, lagos());

        service.transition_fulfillment(&actor, order.id, FulfillmentStatus::Cancelled, None).await.unwrap();
        let err = service
            .transition_payout(&actor, order.id, PayoutStatus::Processing, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { entity: "Order payout", .. }));
    }

    #[tokio::test]
    async fn a_payout_read_before_a_cancellation_cannot_land() {
        let (_, repo) = memory_repo();
        let actor = actor();
        let order = placed(&repo, &actor).await;
        let service = OrderService::new(repo.clone(), lagos());

        let stale: MarketplaceOrder = repo.find(actor.workshop_id, order.id).await.unwrap();
        service
            .transition_fulfillment(&actor, order.id, FulfillmentStatus::Cancelled, None)
            .await
            .unwrap();

        let late = workflow::transition(&stale, PayoutStatus::Processing, &actor, Utc::now()).unwrap();
        let scope = Scope { writes: &[], guards: &[FulfillmentStatus::FIELD] };
        let err = workflow::commit_guarded::<_, PayoutStatus>(&repo, &stale, &late, scope)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let reread = service.get_order(&actor, order.id).await.unwrap();
        assert_eq!(reread.status, FulfillmentStatus::Cancelled);
        assert_eq!(reread.payout_status, PayoutStatus::Pending);
        assert!(reread.payout_history.is_empty());
    }

    #[tokio::test]
    async fn oversized_lines_are_refused() {
        let (_, repo) = memory_repo();
        let actor = actor();
        let vendor = seed_vendor(&repo, actor.workshop_id, "Parts Hub").await;
        let err = OrderService::new(repo, lagos())
            .create_order(
                &actor,
                NewOrder {
                    customer_id: None,
                    items: vec![NewOrderLine {
                        product_id: Uuid::new_v4(),
                        name: "Crate".into(),
                        vendor_id: vendor.id,
                        quantity: Decimal::MAX,
                        unit_price: Decimal::from(2),
                    }],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidField { .. }));
    }

    #[tokio::test]
    async fn in_transit_tab() {
        let (_, repo) = memory_repo();
        let actor = actor();
        let a = placed(&repo, &actor).await;
        placed(&repo, &actor).await;
        let service = OrderService::new(repo, lagos());
        service.transition_fulfillment(&actor, a.id, FulfillmentStatus::Confirmed, None).await.unwrap();
        service.transition_fulfillment(&actor, a.id, FulfillmentStatus::Shipped, None).await.unwrap();

        let criteria = ListCriteria { group: Some("in_transit".into()), ..Default::default() };
        let listed = service.list_orders(&actor, &criteria).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, a.id);

        let search = ListCriteria { q: Some("tyre".into()), ..Default::default() };
        assert_eq!(service.list_orders(&actor, &search).await.unwrap().len(), 2);
    }
}
