// src/services/query.rs
//
// Read-only views over entity lists. Nothing here touches the store; every
// function takes ownership of a list and returns the kept items in order.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::models::{
    invoice::{Invoice, PaymentStatus},
    job::{Job, JobStatus},
    order::{FulfillmentStatus, MarketplaceOrder},
    quote::{Quote, QuoteStatus},
    user::User,
    vehicle::Vehicle,
};

// =========================================================================
//  STATUS GROUPS
// =========================================================================

pub trait StatusGrouped {
    type Status: PartialEq + Copy + 'static;

    fn grouped_status(&self) -> Self::Status;

    /// Raw statuses behind a named tab, `None` for keys this type doesn't know.
    fn group(key: &str) -> Option<&'static [Self::Status]>;
}

/// Keeps items whose status belongs to `group_key`. Unknown keys (including
/// "all") return the input unchanged.
pub fn filter_by_status_group<T: StatusGrouped>(items: Vec<T>, group_key: &str) -> Vec<T> {
    match T::group(group_key) {
        Some(statuses) => items
            .into_iter()
            .filter(|item| statuses.contains(&item.grouped_status()))
            .collect(),
        None => items,
    }
}

impl StatusGrouped for Job {
    type Status = JobStatus;

    fn grouped_status(&self) -> JobStatus {
        self.status
    }

    fn group(key: &str) -> Option<&'static [JobStatus]> {
        match key {
            "pending" => Some(&[JobStatus::Received, JobStatus::Diagnosed]),
            "active" => Some(&[JobStatus::Repairing]),
            "completed" => Some(&[JobStatus::Completed]),
            "cancelled" => Some(&[JobStatus::Cancelled]),
            _ => None,
        }
    }
}

impl StatusGrouped for Quote {
    type Status = QuoteStatus;

    fn grouped_status(&self) -> QuoteStatus {
        self.status
    }

    fn group(key: &str) -> Option<&'static [QuoteStatus]> {
        match key {
            "open" => Some(&[QuoteStatus::Draft, QuoteStatus::PendingApproval]),
            "draft" => Some(&[QuoteStatus::Draft]),
            "pending" => Some(&[QuoteStatus::PendingApproval]),
            "closed" => Some(&[QuoteStatus::Rejected, QuoteStatus::Converted, QuoteStatus::Cancelled]),
            _ => None,
        }
    }
}

// Invoice tabs follow the money axis
impl StatusGrouped for Invoice {
    type Status = PaymentStatus;

    fn grouped_status(&self) -> PaymentStatus {
        self.payment_status
    }

    fn group(key: &str) -> Option<&'static [PaymentStatus]> {
        match key {
            "unpaid" => Some(&[PaymentStatus::Pending, PaymentStatus::Failed]),
            "partial" => Some(&[PaymentStatus::PartiallyPaid]),
            "paid" => Some(&[PaymentStatus::Paid]),
            "refunded" => Some(&[PaymentStatus::Refunded]),
            _ => None,
        }
    }
}

impl StatusGrouped for MarketplaceOrder {
    type Status = FulfillmentStatus;

    fn grouped_status(&self) -> FulfillmentStatus {
        self.status
    }

    fn group(key: &str) -> Option<&'static [FulfillmentStatus]> {
        match key {
            "pending" => Some(&[FulfillmentStatus::Pending, FulfillmentStatus::Confirmed]),
            "in_transit" => Some(&[FulfillmentStatus::Shipped]),
            "delivered" => Some(&[FulfillmentStatus::Delivered]),
            "cancelled" => Some(&[FulfillmentStatus::Cancelled]),
            _ => None,
        }
    }
}

// =========================================================================
//  DATE RANGE
// =========================================================================

pub trait Dated {
    fn date(&self) -> Option<DateTime<Utc>>;
}

macro_rules! dated_by_created_at {
    ($($ty:ty),*) => {
        $(impl Dated for $ty {
            fn date(&self) -> Option<DateTime<Utc>> {
                self.created_at
            }
        })*
    };
}

dated_by_created_at!(Job, Quote, Invoice, MarketplaceOrder, User, Vehicle);

/// Start of `day` in the workshop's zone, as an instant.
pub fn start_of_day(day: NaiveDate, tz: FixedOffset) -> DateTime<Utc> {
    let local = day.and_time(NaiveTime::MIN);
    // A fixed offset has no gaps or folds, so this is always `Single`
    tz.from_local_datetime(&local)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&local))
}

/// Last representable instant of `day` in the workshop's zone.
pub fn end_of_day(day: NaiveDate, tz: FixedOffset) -> DateTime<Utc> {
    match day.succ_opt() {
        Some(next) => start_of_day(next, tz) - chrono::Duration::nanoseconds(1),
        None => DateTime::<Utc>::MAX_UTC,
    }
}

/// Inclusive day window. Without bounds the input passes through; with any
/// bound, undated items are dropped.
pub fn filter_by_date_range<T: Dated>(
    items: Vec<T>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    tz: FixedOffset,
) -> Vec<T> {
    if from.is_none() && to.is_none() {
        return items;
    }

    let lower = from.map(|d| start_of_day(d, tz));
    let upper = to.map(|d| end_of_day(d, tz));

    items
        .into_iter()
        .filter(|item| match item.date() {
            Some(at) => lower.is_none_or(|l| at >= l) && upper.is_none_or(|u| at <= u),
            None => false,
        })
        .collect()
}

/// "Today" in the workshop's zone.
pub fn local_today(now: DateTime<Utc>, tz: FixedOffset) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

// =========================================================================
//  RECURRING DATES
// =========================================================================

/// True when a `YYYY-MM-DD` string falls on today's month and day, any year.
/// Malformed strings never match.
pub fn matches_today_recurring(date: &str, today: NaiveDate) -> bool {
    let parts: Vec<&str> = date.trim().split('-').collect();
    if parts.len() < 3 {
        return false;
    }

    // Tolerate a trailing time part ("15T08:00:00")
    let day_part = parts[2].split(|c: char| !c.is_ascii_digit()).next().unwrap_or("");

    match (parts[1].parse::<u32>(), day_part.parse::<u32>()) {
        (Ok(month), Ok(day)) => month == today.month() && day == today.day(),
        _ => false,
    }
}

pub fn customers_with_birthday_today(users: Vec<User>, today: NaiveDate) -> Vec<User> {
    users
        .into_iter()
        .filter(|u| u.birthday().is_some_and(|b| matches_today_recurring(b, today)))
        .collect()
}

// =========================================================================
//  TEXT SEARCH
// =========================================================================

pub trait Searchable {
    /// Value of a named string field, `None` when the item doesn't have it.
    fn text_field(&self, name: &str) -> Option<String>;
}

/// Case-insensitive substring match across `fields`. An empty query keeps
/// everything; missing fields count as empty strings.
pub fn search_text<T: Searchable>(items: Vec<T>, query: &str, fields: &[&str]) -> Vec<T> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return items;
    }

    items
        .into_iter()
        .filter(|item| {
            fields.iter().any(|field| {
                item.text_field(field)
                    .unwrap_or_default()
                    .to_lowercase()
                    .contains(&needle)
            })
        })
        .collect()
}

pub const JOB_SEARCH_FIELDS: &[&str] = &["customerName", "vehicleLabel", "description", "jobType"];
pub const QUOTE_SEARCH_FIELDS: &[&str] = &["quoteNumber", "customerName", "notes"];
pub const INVOICE_SEARCH_FIELDS: &[&str] = &["invoiceNumber", "customerName"];
pub const ORDER_SEARCH_FIELDS: &[&str] = &["orderNumber", "customerName", "itemNames"];
pub const USER_SEARCH_FIELDS: &[&str] = &["fullName", "email", "phone"];
pub const VEHICLE_SEARCH_FIELDS: &[&str] = &["make", "model", "plateNumber", "vin"];

impl Searchable for Job {
    fn text_field(&self, name: &str) -> Option<String> {
        match name {
            "customerName" => self
                .customer_name
                .clone()
                .or_else(|| self.customer.display_name().map(str::to_string)),
            "vehicleLabel" => self.vehicle_label.clone(),
            "description" => Some(self.description.clone()),
            "jobType" => serde_json::to_value(self.job_type)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string)),
            _ => None,
        }
    }
}

impl Searchable for Quote {
    fn text_field(&self, name: &str) -> Option<String> {
        match name {
            "quoteNumber" => Some(self.quote_number.clone()),
            "customerName" => self.customer_name.clone(),
            "notes" => self.notes.clone(),
            _ => None,
        }
    }
}

impl Searchable for Invoice {
    fn text_field(&self, name: &str) -> Option<String> {
        match name {
            "invoiceNumber" => Some(self.invoice_number.clone()),
            "customerName" => self.customer_name.clone(),
            _ => None,
        }
    }
}

impl Searchable for MarketplaceOrder {
    fn text_field(&self, name: &str) -> Option<String> {
        match name {
            "orderNumber" => Some(self.order_number.clone()),
            "customerName" => self.customer_name.clone(),
            "itemNames" => Some(
                self.items
                    .iter()
                    .map(|i| i.name.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            _ => None,
        }
    }
}

impl Searchable for User {
    fn text_field(&self, name: &str) -> Option<String> {
        match name {
            "fullName" => Some(self.full_name.clone()),
            "email" => self.email.clone(),
            "phone" => self.phone.clone(),
            _ => None,
        }
    }
}

impl Searchable for Vehicle {
    fn text_field(&self, name: &str) -> Option<String> {
        match name {
            "make" => Some(self.make.clone()),
            "model" => Some(self.model.clone()),
            "plateNumber" => Some(self.plate_number.clone()),
            "vin" => self.vin.clone(),
            _ => None,
        }
    }
}

// =========================================================================
//  COMBINED LIST QUERY
// =========================================================================

/// What a list screen sends: a tab, an optional date window and a search box.
#[derive(Debug, Clone, Default)]
pub struct ListCriteria {
    pub group: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub q: Option<String>,
}

pub fn apply_criteria<T>(items: Vec<T>, criteria: &ListCriteria, fields: &[&str], tz: FixedOffset) -> Vec<T>
where
    T: StatusGrouped + Dated + Searchable,
{
    let items = match criteria.group.as_deref() {
        Some(group) => filter_by_status_group(items, group),
        None => items,
    };
    let items = filter_by_date_range(items, criteria.from, criteria.to, tz);
    search_text(items, criteria.q.as_deref().unwrap_or(""), fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::{CustomerRef, JobType};
    use proptest::prelude::*;
    use uuid::Uuid;

    fn job(status: JobStatus) -> Job {
        Job {
            id: Uuid::new_v4(),
            workshop_id: Uuid::nil(),
            customer: CustomerRef::WalkIn { name: "Walk-in".into(), phone: None },
            customer_name: None,
            vehicle_id: None,
            vehicle_label: None,
            description: "Check engine light".into(),
            job_type: JobType::Repair,
            status,
            status_history: vec![],
            technician_ids: vec![],
            assigned_technician: None,
            scheduled_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn job_at(created: &str) -> Job {
        Job {
            created_at: Some(created.parse().unwrap()),
            ..job(JobStatus::Received)
        }
    }

    fn any_status() -> impl Strategy<Value = JobStatus> {
        prop_oneof![
            Just(JobStatus::Received),
            Just(JobStatus::Diagnosed),
            Just(JobStatus::Repairing),
            Just(JobStatus::Completed),
            Just(JobStatus::Cancelled),
        ]
    }

    proptest! {
        #[test]
        fn pending_group_is_exactly_received_and_diagnosed(statuses in prop::collection::vec(any_status(), 0..64)) {
            let jobs: Vec<Job> = statuses.iter().map(|s| job(*s)).collect();
            let expected: Vec<Uuid> = jobs
                .iter()
                .filter(|j| matches!(j.status, JobStatus::Received | JobStatus::Diagnosed))
                .map(|j| j.id)
                .collect();

            let kept: Vec<Uuid> = filter_by_status_group(jobs, "pending").iter().map(|j| j.id).collect();
            prop_assert_eq!(kept, expected);
        }

        #[test]
        fn unknown_group_passes_everything_through(statuses in prop::collection::vec(any_status(), 0..32), key in "[a-z]{1,12}") {
            prop_assume!(Job::group(&key).is_none());
            let jobs: Vec<Job> = statuses.iter().map(|s| job(*s)).collect();
            let ids: Vec<Uuid> = jobs.iter().map(|j| j.id).collect();
            let kept: Vec<Uuid> = filter_by_status_group(jobs, &key).iter().map(|j| j.id).collect();
            prop_assert_eq!(kept, ids);
        }

        #[test]
        fn recurring_match_never_panics(input in ".{0,24}") {
            let today = NaiveDate::from_ymd_opt(2026, 2, 15).unwrap();
            let _ = matches_today_recurring(&input, today);
        }
    }

    #[test]
    fn active_and_all_groups() {
        let jobs = vec![job(JobStatus::Repairing), job(JobStatus::Completed), job(JobStatus::Received)];
        assert_eq!(filter_by_status_group(jobs.clone(), "active").len(), 1);
        assert_eq!(filter_by_status_group(jobs, "all").len(), 3);
    }

    #[test]
    fn birthday_matches_regardless_of_year() {
        for year in [1990, 2024, 2026, 2031] {
            let today = NaiveDate::from_ymd_opt(year, 2, 15).unwrap();
            assert!(matches_today_recurring("1990-02-15", today));
        }
        let other_day = NaiveDate::from_ymd_opt(2026, 2, 16).unwrap();
        assert!(!matches_today_recurring("1990-02-15", other_day));
    }

    #[test]
    fn malformed_dates_never_match() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 15).unwrap();
        assert!(!matches_today_recurring("bad-date", today));
        assert!(!matches_today_recurring("", today));
        assert!(!matches_today_recurring("1990-xx-15", today));
        assert!(!matches_today_recurring("--", today));
        assert!(matches_today_recurring("1990-2-15", today));
    }

    #[test]
    fn date_range_is_inclusive_on_local_days() {
        let lagos = FixedOffset::east_opt(3600).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();

        let jobs = vec![
            job_at("2026-10-15T22:59:59Z"), // 23:59:59 on the 15th in Lagos
            job_at("2026-10-15T23:00:00Z"), // 00:00 on the 16th
            job_at("2026-10-16T22:59:59Z"), // 23:59:59 on the 16th
            job_at("2026-10-16T23:00:00Z"), // 00:00 on the 17th
            job(JobStatus::Received),       // undated
        ];
        let kept = filter_by_date_range(jobs, Some(day), Some(day), lagos);
        let times: Vec<String> = kept.iter().map(|j| j.created_at.unwrap().to_rfc3339()).collect();
        assert_eq!(times, vec!["2026-10-15T23:00:00+00:00", "2026-10-16T22:59:59+00:00"]);
    }

    #[test]
    fn open_ended_ranges_and_no_range() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let jobs = vec![job_at("2026-01-01T10:00:00Z"), job_at("2026-03-01T10:00:00Z"), job(JobStatus::Received)];

        let from_feb = filter_by_date_range(jobs.clone(), NaiveDate::from_ymd_opt(2026, 2, 1), None, utc);
        assert_eq!(from_feb.len(), 1);

        let until_feb = filter_by_date_range(jobs.clone(), None, NaiveDate::from_ymd_opt(2026, 2, 1), utc);
        assert_eq!(until_feb.len(), 1);

        assert_eq!(filter_by_date_range(jobs, None, None, utc).len(), 3);
    }

    #[test]
    fn empty_search_returns_input_in_order() {
        let jobs = vec![job(JobStatus::Received), job(JobStatus::Completed), job(JobStatus::Repairing)];
        let ids: Vec<Uuid> = jobs.iter().map(|j| j.id).collect();
        let kept: Vec<Uuid> = search_text(jobs, "", JOB_SEARCH_FIELDS).iter().map(|j| j.id).collect();
        assert_eq!(kept, ids);
    }

    #[test]
    fn search_is_case_insensitive_and_tolerates_missing_fields() {
        let mut with_vehicle = job(JobStatus::Received);
        with_vehicle.vehicle_label = Some("2014 Toyota Corolla (LAG-234-KJ)".into());
        let without_vehicle = job(JobStatus::Received);

        let kept = search_text(vec![with_vehicle, without_vehicle], "toyota", JOB_SEARCH_FIELDS);
        assert_eq!(kept.len(), 1);

        // Walk-in name is found through the customer reference
        let kept = search_text(vec![job(JobStatus::Received)], "WALK", JOB_SEARCH_FIELDS);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn criteria_combine_group_range_and_search() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let mut a = job_at("2026-10-16T09:00:00Z");
        a.description = "Replace alternator".into();
        let mut b = job_at("2026-10-16T10:00:00Z");
        b.status = JobStatus::Completed;
        b.description = "Replace alternator belt".into();

        let criteria = ListCriteria {
            group: Some("pending".into()),
            from: NaiveDate::from_ymd_opt(2026, 10, 16),
            to: NaiveDate::from_ymd_opt(2026, 10, 16),
            q: Some("alternator".into()),
        };
        let kept = apply_criteria(vec![a.clone(), b], &criteria, JOB_SEARCH_FIELDS, utc);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, a.id);
    }
}
