// src/services/workflow.rs

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        repository::{Entity, Repository},
        store::{encode, Precondition, WriteBatch},
    },
    models::{
        auth::Actor,
        history::StatusChange,
        invoice::{Invoice, InvoiceStatus, PaymentStatus},
        job::{Job, JobStatus},
        order::{FulfillmentStatus, MarketplaceOrder, PayoutStatus},
        quote::{Quote, QuoteAction, QuoteLogEntry, QuoteStatus},
    },
};

/// One status axis and its legal-move table.
pub trait StatusFlow: Copy + Eq + Debug + Serialize + Send + Sync + 'static {
    /// Used in error messages ("Job cannot move from ...")
    const ENTITY: &'static str;
    /// Document field holding this axis, used as the optimistic-concurrency guard
    const FIELD: &'static str;
    const ALL: &'static [Self];

    fn allowed_next(self) -> &'static [Self];
    fn is_terminal(self) -> bool;
    fn as_str(self) -> &'static str;
}

pub fn check_transition<S: StatusFlow>(from: S, to: S) -> Result<(), AppError> {
    if from.is_terminal() {
        return Err(AppError::TerminalState {
            entity: S::ENTITY,
            status: from.as_str().to_string(),
        });
    }
    if !from.allowed_next().contains(&to) {
        return Err(AppError::InvalidTransition {
            entity: S::ENTITY,
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        });
    }
    Ok(())
}

// =========================================================================
//  LEGAL MOVES
// =========================================================================

impl StatusFlow for JobStatus {
    const ENTITY: &'static str = "Job";
    const FIELD: &'static str = "status";
    const ALL: &'static [Self] = &[
        JobStatus::Received,
        JobStatus::Diagnosed,
        JobStatus::Repairing,
        JobStatus::Completed,
        JobStatus::Cancelled,
    ];

    fn allowed_next(self) -> &'static [Self] {
        match self {
            JobStatus::Received => &[JobStatus::Diagnosed, JobStatus::Repairing, JobStatus::Cancelled],
            JobStatus::Diagnosed => &[JobStatus::Repairing, JobStatus::Cancelled],
            JobStatus::Repairing => &[JobStatus::Completed, JobStatus::Cancelled],
            JobStatus::Completed | JobStatus::Cancelled => &[],
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }

    fn as_str(self) -> &'static str {
        match self {
            JobStatus::Received => "received",
            JobStatus::Diagnosed => "diagnosed",
            JobStatus::Repairing => "repairing",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl StatusFlow for QuoteStatus {
    const ENTITY: &'static str = "Quote";
    const FIELD: &'static str = "status";
    const ALL: &'static [Self] = &[
        QuoteStatus::Draft,
        QuoteStatus::PendingApproval,
        QuoteStatus::Rejected,
        QuoteStatus::Converted,
        QuoteStatus::Cancelled,
    ];

    // `converted` is only reachable through conversion
    fn allowed_next(self) -> &'static [Self] {
        match self {
            QuoteStatus::Draft => &[QuoteStatus::PendingApproval, QuoteStatus::Cancelled],
            QuoteStatus::PendingApproval => &[QuoteStatus::Draft, QuoteStatus::Rejected, QuoteStatus::Cancelled],
            QuoteStatus::Rejected | QuoteStatus::Converted | QuoteStatus::Cancelled => &[],
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, QuoteStatus::Rejected | QuoteStatus::Converted | QuoteStatus::Cancelled)
    }

    fn as_str(self) -> &'static str {
        match self {
            QuoteStatus::Draft => "draft",
            QuoteStatus::PendingApproval => "pending_approval",
            QuoteStatus::Rejected => "rejected",
            QuoteStatus::Converted => "converted",
            QuoteStatus::Cancelled => "cancelled",
        }
    }
}

impl StatusFlow for InvoiceStatus {
    const ENTITY: &'static str = "Invoice";
    const FIELD: &'static str = "status";
    const ALL: &'static [Self] = &[InvoiceStatus::Draft, InvoiceStatus::Approved, InvoiceStatus::Void];

    fn allowed_next(self) -> &'static [Self] {
        match self {
            InvoiceStatus::Draft => &[InvoiceStatus::Approved, InvoiceStatus::Void],
            InvoiceStatus::Approved => &[InvoiceStatus::Void],
            InvoiceStatus::Void => &[],
        }
    }

    fn is_terminal(self) -> bool {
        self == InvoiceStatus::Void
    }

    fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Approved => "approved",
            InvoiceStatus::Void => "void",
        }
    }
}

impl StatusFlow for PaymentStatus {
    const ENTITY: &'static str = "Invoice payment";
    const FIELD: &'static str = "paymentStatus";
    const ALL: &'static [Self] = &[
        PaymentStatus::Pending,
        PaymentStatus::Paid,
        PaymentStatus::Failed,
        PaymentStatus::Refunded,
        PaymentStatus::PartiallyPaid,
    ];

    fn allowed_next(self) -> &'static [Self] {
        match self {
            PaymentStatus::Pending => &[PaymentStatus::Paid, PaymentStatus::PartiallyPaid, PaymentStatus::Failed],
            PaymentStatus::PartiallyPaid => &[PaymentStatus::Paid, PaymentStatus::Failed],
            PaymentStatus::Failed => &[PaymentStatus::Pending, PaymentStatus::Paid, PaymentStatus::PartiallyPaid],
            PaymentStatus::Paid => &[PaymentStatus::Refunded],
            PaymentStatus::Refunded => &[],
        }
    }

    fn is_terminal(self) -> bool {
        self == PaymentStatus::Refunded
    }

    fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::PartiallyPaid => "partially_paid",
        }
    }
}

impl StatusFlow for FulfillmentStatus {
    const ENTITY: &'static str = "Order";
    const FIELD: &'static str = "status";
    const ALL: &'static [Self] = &[
        FulfillmentStatus::Pending,
        FulfillmentStatus::Confirmed,
        FulfillmentStatus::Shipped,
        FulfillmentStatus::Delivered,
        FulfillmentStatus::Cancelled,
    ];

    fn allowed_next(self) -> &'static [Self] {
        match self {
            FulfillmentStatus::Pending => &[FulfillmentStatus::Confirmed, FulfillmentStatus::Cancelled],
            FulfillmentStatus::Confirmed => &[FulfillmentStatus::Shipped, FulfillmentStatus::Cancelled],
            FulfillmentStatus::Shipped => &[FulfillmentStatus::Delivered],
            FulfillmentStatus::Delivered | FulfillmentStatus::Cancelled => &[],
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, FulfillmentStatus::Delivered | FulfillmentStatus::Cancelled)
    }

    fn as_str(self) -> &'static str {
        match self {
            FulfillmentStatus::Pending => "pending",
            FulfillmentStatus::Confirmed => "confirmed",
            FulfillmentStatus::Shipped => "shipped",
            FulfillmentStatus::Delivered => "delivered",
            FulfillmentStatus::Cancelled => "cancelled",
        }
    }
}

impl StatusFlow for PayoutStatus {
    const ENTITY: &'static str = "Order payout";
    const FIELD: &'static str = "payoutStatus";
    const ALL: &'static [Self] = &[
        PayoutStatus::Pending,
        PayoutStatus::Processing,
        PayoutStatus::Paid,
        PayoutStatus::Failed,
    ];

    fn allowed_next(self) -> &'static [Self] {
        match self {
            PayoutStatus::Pending => &[PayoutStatus::Processing],
            PayoutStatus::Processing => &[PayoutStatus::Paid, PayoutStatus::Failed],
            PayoutStatus::Failed => &[PayoutStatus::Processing],
            PayoutStatus::Paid => &[],
        }
    }

    fn is_terminal(self) -> bool {
        self == PayoutStatus::Paid
    }

    fn as_str(self) -> &'static str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Processing => "processing",
            PayoutStatus::Paid => "paid",
            PayoutStatus::Failed => "failed",
        }
    }
}

// =========================================================================
//  TRACKED ENTITIES
// =========================================================================

/// An entity with one status axis `S` and an audit trail for it.
pub trait Tracked<S: StatusFlow>: Clone {
    /// Document field holding this axis' audit trail
    const HISTORY_FIELD: &'static str;

    fn current(&self) -> S;
    fn last_changed_at(&self) -> Option<DateTime<Utc>>;
    /// Sets the status and appends the entry, nothing else.
    fn record(&mut self, change: StatusChange<S>);
}

impl Tracked<JobStatus> for Job {
    const HISTORY_FIELD: &'static str = "statusHistory";

    fn current(&self) -> JobStatus {
        self.status
    }

    fn last_changed_at(&self) -> Option<DateTime<Utc>> {
        self.status_history.last().map(|c| c.changed_at)
    }

    fn record(&mut self, change: StatusChange<JobStatus>) {
        self.status = change.to_status;
        self.status_history.push(change);
    }
}

impl Tracked<QuoteStatus> for Quote {
    const HISTORY_FIELD: &'static str = "history";

    fn current(&self) -> QuoteStatus {
        self.status
    }

    fn last_changed_at(&self) -> Option<DateTime<Utc>> {
        self.history.last().map(|e| e.at)
    }

    fn record(&mut self, change: StatusChange<QuoteStatus>) {
        let action = if change.to_status == QuoteStatus::Converted {
            QuoteAction::Converted
        } else {
            QuoteAction::StatusChanged
        };
        self.status = change.to_status;
        self.history.push(QuoteLogEntry {
            action,
            from_status: Some(change.from_status),
            to_status: Some(change.to_status),
            by: change.changed_by,
            by_name: change.changed_by_name,
            at: change.changed_at,
            note: None,
        });
    }
}

impl Tracked<InvoiceStatus> for Invoice {
    const HISTORY_FIELD: &'static str = "statusHistory";

    fn current(&self) -> InvoiceStatus {
        self.status
    }

    fn last_changed_at(&self) -> Option<DateTime<Utc>> {
        self.status_history.last().map(|c| c.changed_at)
    }

    fn record(&mut self, change: StatusChange<InvoiceStatus>) {
        self.status = change.to_status;
        self.status_history.push(change);
    }
}

impl Tracked<PaymentStatus> for Invoice {
    const HISTORY_FIELD: &'static str = "paymentHistory";

    fn current(&self) -> PaymentStatus {
        self.payment_status
    }

    fn last_changed_at(&self) -> Option<DateTime<Utc>> {
        self.payment_history.last().map(|c| c.changed_at)
    }

    fn record(&mut self, change: StatusChange<PaymentStatus>) {
        self.payment_status = change.to_status;
        self.payment_history.push(change);
    }
}

impl Tracked<FulfillmentStatus> for MarketplaceOrder {
    const HISTORY_FIELD: &'static str = "statusHistory";

    fn current(&self) -> FulfillmentStatus {
        self.status
    }

    fn last_changed_at(&self) -> Option<DateTime<Utc>> {
        self.status_history.last().map(|c| c.changed_at)
    }

    fn record(&mut self, change: StatusChange<FulfillmentStatus>) {
        self.status = change.to_status;
        self.status_history.push(change);
    }
}

impl Tracked<PayoutStatus> for MarketplaceOrder {
    const HISTORY_FIELD: &'static str = "payoutHistory";

    fn current(&self) -> PayoutStatus {
        self.payout_status
    }

    fn last_changed_at(&self) -> Option<DateTime<Utc>> {
        self.payout_history.last().map(|c| c.changed_at)
    }

    fn record(&mut self, change: StatusChange<PayoutStatus>) {
        self.payout_status = change.to_status;
        self.payout_history.push(change);
    }
}

/// Builds the audit entry for `from -> to`. The timestamp never precedes the
/// previous entry, so the trail stays ordered even if the clock steps back.
pub fn audit_entry<S: StatusFlow>(
    from: S,
    to: S,
    actor: &Actor,
    now: DateTime<Utc>,
    previous: Option<DateTime<Utc>>,
) -> StatusChange<S> {
    StatusChange {
        from_status: from,
        to_status: to,
        changed_by: actor.id,
        changed_by_name: actor.name.clone(),
        changed_at: not_before(now, previous),
    }
}

/// `now`, or the previous trail timestamp when the clock is behind it.
pub fn not_before(now: DateTime<Utc>, previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match previous {
        Some(prev) if prev > now => prev,
        _ => now,
    }
}

/// Pure transition: validates the move and returns the entity with the new
/// status and one more audit entry. The input is left untouched.
pub fn transition<E, S>(entity: &E, to: S, actor: &Actor, now: DateTime<Utc>) -> Result<E, AppError>
where
    E: Tracked<S>,
    S: StatusFlow,
{
    let from = entity.current();
    check_transition(from, to)?;

    let mut next = entity.clone();
    next.record(audit_entry(from, to, actor, now, entity.last_changed_at()));
    Ok(next)
}

/// Fails with `Conflict` when the caller acted on a status that is no longer current.
pub fn ensure_expected<S: StatusFlow>(current: S, expected: Option<S>) -> Result<(), AppError> {
    match expected {
        Some(expected) if expected != current => Err(AppError::Conflict(format!(
            "{} is '{}', expected '{}'",
            S::ENTITY,
            current.as_str(),
            expected.as_str()
        ))),
        _ => Ok(()),
    }
}

/// Extra fields a guarded write owns, and extra stored fields that must still
/// hold what was read.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scope<'a> {
    pub writes: &'a [&'a str],
    pub guards: &'a [&'a str],
}

/// Writes only `fields` of `after`, and only while every `guards` field of the
/// stored document still equals its value in `before`. Returns what was persisted.
pub async fn commit_fields<E: Entity>(
    repo: &Repository,
    before: &E,
    after: &E,
    fields: &[&str],
    guards: &[&str],
) -> Result<E, AppError> {
    let read = encode(before)?;
    let written = encode(after)?;

    let mut patch = Map::new();
    for &field in fields {
        patch.insert(field.to_string(), written.get(field).cloned().unwrap_or(Value::Null));
    }
    let expect = guards
        .iter()
        .map(|&field| Precondition::new(field, read.get(field).cloned().unwrap_or(Value::Null)))
        .collect();

    let batch = WriteBatch::new().update_guarded(E::COLLECTION, before.id(), Value::Object(patch), expect);
    if let Err(e) = repo.commit(batch).await {
        if let AppError::Conflict(_) = &e {
            tracing::warn!("⚠ {} {} changed since it was read", E::NAME, before.id());
        }
        return Err(e);
    }

    repo.find(before.workshop_id(), before.id()).await
}

/// Persists a move on the `S` axis: writes that axis' status and trail (plus
/// `scope.writes`), guarded on the stored status (plus `scope.guards`).
/// Fields owned by other axes are never written back.
pub async fn commit_guarded<E, S>(repo: &Repository, before: &E, after: &E, scope: Scope<'_>) -> Result<E, AppError>
where
    E: Entity + Tracked<S>,
    S: StatusFlow,
{
    let mut fields = vec![S::FIELD, <E as Tracked<S>>::HISTORY_FIELD];
    fields.extend_from_slice(scope.writes);
    let mut guards = vec![S::FIELD];
    guards.extend_from_slice(scope.guards);

    commit_fields(repo, before, after, &fields, &guards).await
}

/// Read-modify-write for one axis: load, check the caller's view, transition, persist.
pub async fn transition_stored<E, S>(
    repo: &Repository,
    actor: &Actor,
    id: Uuid,
    to: S,
    expected: Option<S>,
) -> Result<E, AppError>
where
    E: Entity + Tracked<S>,
    S: StatusFlow,
{
    let current: E = repo.find(actor.workshop_id, id).await?;
    ensure_expected(current.current(), expected)?;

    let updated = transition(&current, to, actor, Utc::now())?;
    let saved = commit_guarded::<E, S>(repo, &current, &updated, Scope::default()).await?;

    tracing::info!(
        "✅ {} {} -> {} by {}",
        S::ENTITY,
        id,
        to.as_str(),
        actor.name
    );
    Ok(saved)
}

/// Human-facing reference such as `QT-20261016-4F2A`: day of issue plus the
/// head of the record's id.
pub fn document_number(prefix: &str, now: DateTime<Utc>, id: Uuid) -> String {
    let simple = id.simple().to_string().to_uppercase();
    format!("{}-{}-{}", prefix, now.format("%Y%m%d"), &simple[..4])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{actor, memory_repo};
    use chrono::Duration;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn assert_terminals_reject_everything<S: StatusFlow>() {
        for &from in S::ALL.iter().filter(|s| s.is_terminal()) {
            assert!(from.allowed_next().is_empty(), "{:?} has outgoing moves", from);
            for &to in S::ALL {
                let err = check_transition(from, to).unwrap_err();
                assert!(
                    matches!(err, AppError::TerminalState { .. }),
                    "{:?} -> {:?} gave {:?}",
                    from,
                    to,
                    err
                );
            }
        }
    }

    #[test]
    fn every_terminal_status_of_every_axis_rejects_transitions() {
        assert_terminals_reject_everything::<JobStatus>();
        assert_terminals_reject_everything::<QuoteStatus>();
        assert_terminals_reject_everything::<InvoiceStatus>();
        assert_terminals_reject_everything::<PaymentStatus>();
        assert_terminals_reject_everything::<FulfillmentStatus>();
        assert_terminals_reject_everything::<PayoutStatus>();
    }

    #[test]
    fn documented_terminal_statuses_are_terminal() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(QuoteStatus::Converted.is_terminal());
        assert!(QuoteStatus::Rejected.is_terminal());
        assert!(QuoteStatus::Cancelled.is_terminal());
        assert!(InvoiceStatus::Void.is_terminal());
        assert!(FulfillmentStatus::Cancelled.is_terminal());
    }

    #[test]
    fn as_str_matches_serde_names() {
        fn check<S: StatusFlow>() {
            for &s in S::ALL {
                assert_eq!(serde_json::to_value(s).unwrap(), json!(s.as_str()));
            }
        }
        check::<JobStatus>();
        check::<QuoteStatus>();
        check::<InvoiceStatus>();
        check::<PaymentStatus>();
        check::<FulfillmentStatus>();
        check::<PayoutStatus>();
    }

    #[test]
    fn document_numbers_carry_day_and_id_prefix() {
        let id = Uuid::parse_str("4f2a9c1d-0000-4000-8000-000000000000").unwrap();
        let at = "2026-10-16T08:30:00Z".parse().unwrap();
        assert_eq!(document_number("QT", at, id), "QT-20261016-4F2A");
    }

    #[test]
    fn quote_cannot_be_converted_by_a_plain_transition() {
        let err = check_transition(QuoteStatus::PendingApproval, QuoteStatus::Converted).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[test]
    fn illegal_job_move_is_invalid_transition() {
        let err = check_transition(JobStatus::Received, JobStatus::Completed).unwrap_err();
        match err {
            AppError::InvalidTransition { entity, from, to } => {
                assert_eq!(entity, "Job");
                assert_eq!(from, "received");
                assert_eq!(to, "completed");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    fn job() -> Job {
        job_in(Uuid::new_v4())
    }

    fn job_in(workshop_id: Uuid) -> Job {
        Job {
            id: Uuid::new_v4(),
            workshop_id,
            customer: crate::models::job::CustomerRef::WalkIn { name: "Ada".into(), phone: None },
            customer_name: Some("Ada".into()),
            vehicle_id: None,
            vehicle_label: None,
            description: "Noise".into(),
            job_type: Default::default(),
            status: JobStatus::Received,
            status_history: vec![],
            technician_ids: vec![],
            assigned_technician: None,
            scheduled_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn transition_appends_history_and_leaves_input_alone() {
        let actor = actor();
        let original = job();
        let now = Utc::now();

        let diagnosed = transition(&original, JobStatus::Diagnosed, &actor, now).unwrap();
        assert_eq!(original.status, JobStatus::Received);
        assert!(original.status_history.is_empty());

        assert_eq!(diagnosed.status, JobStatus::Diagnosed);
        let entry = diagnosed.status_history.last().unwrap();
        assert_eq!(entry.from_status, JobStatus::Received);
        assert_eq!(entry.to_status, JobStatus::Diagnosed);
        assert_eq!(entry.changed_by, actor.id);
        assert_eq!(entry.changed_by_name, "Tunde");
        assert_eq!(entry.changed_at, now);
    }

    #[test]
    fn history_stays_monotonic_when_the_clock_steps_back() {
        let actor = actor();
        let now = Utc::now();
        let a = transition(&job(), JobStatus::Diagnosed, &actor, now).unwrap();
        let b = transition(&a, JobStatus::Repairing, &actor, now - Duration::minutes(5)).unwrap();

        let times: Vec<_> = b.status_history.iter().map(|c| c.changed_at).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(b.status_history.last().unwrap().to_status, b.status);
    }

    #[test]
    fn expected_status_mismatch_is_a_conflict() {
        assert!(ensure_expected(JobStatus::Received, None).is_ok());
        assert!(ensure_expected(JobStatus::Received, Some(JobStatus::Received)).is_ok());
        let err = ensure_expected(JobStatus::Repairing, Some(JobStatus::Received)).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    fn approved_invoice(workshop_id: Uuid) -> Invoice {
        serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "workshopId": workshop_id,
            "invoiceNumber": "INV-1",
            "quoteId": null, "jobId": null, "customerId": null,
            "items": [],
            "subtotal": 10, "vat": 0, "discount": 0, "total": 10, "amountPaid": 0,
            "status": "approved",
            "paymentStatus": "pending",
            "dueDate": null, "createdAt": null, "updatedAt": null
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn a_payment_move_never_writes_back_the_structural_status() {
        let (_, repo) = memory_repo();
        let actor = actor();
        let stored = repo.insert(&approved_invoice(actor.workshop_id)).await.unwrap();
        let stale = stored.clone();

        let voided = transition(&stored, InvoiceStatus::Void, &actor, Utc::now()).unwrap();
        commit_guarded::<_, InvoiceStatus>(&repo, &stored, &voided, Scope::default()).await.unwrap();

        // Read before the void: only the payment fields go out
        let failed = transition(&stale, PaymentStatus::Failed, &actor, Utc::now()).unwrap();
        let saved = commit_guarded::<_, PaymentStatus>(&repo, &stale, &failed, Scope::default())
            .await
            .unwrap();
        assert_eq!(saved.status, InvoiceStatus::Void);
        assert_eq!(saved.status_history.len(), 1);
        assert_eq!(saved.payment_status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn extra_guards_refuse_a_write_based_on_a_stale_read() {
        let (_, repo) = memory_repo();
        let actor = actor();
        let stored = repo.insert(&approved_invoice(actor.workshop_id)).await.unwrap();
        let stale = stored.clone();

        let voided = transition(&stored, InvoiceStatus::Void, &actor, Utc::now()).unwrap();
        commit_guarded::<_, InvoiceStatus>(&repo, &stored, &voided, Scope::default()).await.unwrap();

        let mut paying = stale.clone();
        paying.amount_paid = Decimal::from(4);
        let paying = transition(&paying, PaymentStatus::PartiallyPaid, &actor, Utc::now()).unwrap();
        let scope = Scope { writes: &["amountPaid"], guards: &["status", "amountPaid"] };
        let err = commit_guarded::<_, PaymentStatus>(&repo, &stale, &paying, scope).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let current: Invoice = repo.find(actor.workshop_id, stored.id).await.unwrap();
        assert_eq!(current.status, InvoiceStatus::Void);
        assert_eq!(current.payment_status, PaymentStatus::Pending);
        assert_eq!(current.amount_paid, Decimal::ZERO);
    }

    #[tokio::test]
    async fn commit_fields_leaves_unlisted_fields_alone() {
        let (_, repo) = memory_repo();
        let actor = actor();
        let stored = repo.insert(&job_in(actor.workshop_id)).await.unwrap();
        let stale = stored.clone();

        let diagnosed = transition(&stored, JobStatus::Diagnosed, &actor, Utc::now()).unwrap();
        commit_guarded::<_, JobStatus>(&repo, &stored, &diagnosed, Scope::default()).await.unwrap();

        let mut relabelled = stale.clone();
        relabelled.description = "Noise from the rear axle".into();
        relabelled.status = JobStatus::Cancelled;
        let saved = commit_fields(&repo, &stale, &relabelled, &["description"], &[]).await.unwrap();
        assert_eq!(saved.description, "Noise from the rear axle");
        assert_eq!(saved.status, JobStatus::Diagnosed);
        assert_eq!(saved.status_history.len(), 1);
    }

    #[test]
    fn invoice_axes_are_tracked_separately() {
        let actor = actor();
        let invoice = approved_invoice(Uuid::new_v4());

        // Money lands first, the payment axis follows what it implies
        let mut settled = invoice.clone();
        settled.amount_paid = settled.total;
        let to = settled.payment_status_for(settled.amount_paid);
        let paid = transition(&settled, to, &actor, Utc::now()).unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.amount_paid, paid.total);
        assert_eq!(paid.status, InvoiceStatus::Approved);
        assert_eq!(paid.payment_history.len(), 1);
        assert!(paid.status_history.is_empty());

        let voided = transition(&paid, InvoiceStatus::Void, &actor, Utc::now()).unwrap();
        assert_eq!(voided.payment_status, PaymentStatus::Paid);
        assert_eq!(Tracked::<InvoiceStatus>::current(&voided), InvoiceStatus::Void);
    }
}
