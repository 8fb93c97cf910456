// src/services/validation.rs
//
// Boundary normalization shared by every service. Payload-level rules
// (lengths, emails, ranges) live on the request structs as `validator`
// derives; what is here needs parsing or a fallback.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    models::{job::CustomerRef, quote::LineItem, user::UserProfile},
};

pub const EARLIEST_MODEL_YEAR: i32 = 1886;

// --- Identifiers ---

pub fn normalize_plate(raw: &str) -> Result<String, AppError> {
    let plate = raw.trim().to_uppercase();
    if plate.is_empty() {
        return Err(AppError::invalid("plateNumber", "plate number is required"));
    }
    Ok(plate)
}

/// Blank VINs are treated as absent.
pub fn normalize_vin(raw: Option<&str>) -> Option<String> {
    raw.map(|v| v.trim().to_uppercase()).filter(|v| !v.is_empty())
}

pub fn require_text(field: &'static str, raw: &str) -> Result<String, AppError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(AppError::invalid(field, "must not be empty"));
    }
    Ok(text.to_string())
}

// --- Numbers ---

/// Model year from whatever the form sent. Anything unparseable or outside
/// 1886..=current+1 becomes the current year.
pub fn parse_year(raw: &Value, current_year: i32) -> i32 {
    let parsed = match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match parsed {
        Some(year) if (EARLIEST_MODEL_YEAR as i64..=current_year as i64 + 1).contains(&year) => year as i32,
        _ => current_year,
    }
}

fn decimal_from(raw: &Value) -> Option<Decimal> {
    let text = match raw {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Largest quantity, price or amount accepted from a form (one trillion).
pub const MAX_INPUT_AMOUNT: Decimal = Decimal::from_parts(3567587328, 232, 0, false, 0);

pub fn parse_non_negative(field: &'static str, raw: &Value) -> Result<Decimal, AppError> {
    match decimal_from(raw) {
        Some(value) if value < Decimal::ZERO => Err(AppError::invalid(field, "must not be negative")),
        Some(value) if value > MAX_INPUT_AMOUNT => Err(AppError::invalid(field, "is too large")),
        Some(value) => Ok(value),
        None => Err(AppError::invalid(field, "must be a number")),
    }
}

// --- Line items ---

/// A priced line as typed into a form. Numbers may arrive as strings.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInput {
    #[validate(length(min = 1, message = "description is required"))]
    #[schema(example = "Front brake pads")]
    pub description: String,
    #[serde(default)]
    #[schema(value_type = String, example = "2")]
    pub quantity: Value,
    #[serde(default)]
    #[schema(value_type = String, example = "500.00")]
    pub unit_price: Value,
}

pub fn parse_line_items(raw: &[LineItemInput]) -> Result<Vec<LineItem>, AppError> {
    raw.iter()
        .map(|item| {
            let description = require_text("description", &item.description)?;
            let quantity = parse_non_negative("quantity", &item.quantity)?;
            let unit_price = parse_non_negative("unitPrice", &item.unit_price)?;
            LineItem::new(description, quantity, unit_price).ok_or_else(amounts_too_large)
        })
        .collect()
}

pub fn amounts_too_large() -> AppError {
    AppError::invalid("quantity", "quantity × unit price is too large")
}

// --- Dates ---

pub fn parse_birthday(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| AppError::invalid("birthday", "expected YYYY-MM-DD"))
}

/// Cleans a profile before it is stored: blank birthdays are dropped,
/// present ones must be real dates.
pub fn normalize_profile(profile: UserProfile) -> Result<UserProfile, AppError> {
    match profile {
        UserProfile::Customer { birthday, address } => {
            let birthday = match birthday.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(b) => Some(parse_birthday(b)?),
            };
            Ok(UserProfile::Customer { birthday, address })
        }
        UserProfile::Vendor { business_name, payout_account } => Ok(UserProfile::Vendor {
            business_name: require_text("businessName", &business_name)?,
            payout_account,
        }),
        staff => Ok(staff),
    }
}

// --- Jobs ---

/// Walk-ins need a name; registered customers are checked against the store by the caller.
pub fn normalize_customer(customer: CustomerRef) -> Result<CustomerRef, AppError> {
    match customer {
        CustomerRef::WalkIn { name, phone } => Ok(CustomerRef::WalkIn {
            name: require_text("customer.name", &name)?,
            phone: phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
        }),
        registered => Ok(registered),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plates_and_vins_are_upper_cased() {
        assert_eq!(normalize_plate("  lag-234-kj ").unwrap(), "LAG-234-KJ");
        assert!(normalize_plate("   ").is_err());
        assert_eq!(normalize_vin(Some(" 1hgcm82633a004352 ")).as_deref(), Some("1HGCM82633A004352"));
        assert_eq!(normalize_vin(Some("  ")), None);
        assert_eq!(normalize_vin(None), None);
    }

    #[test]
    fn year_falls_back_to_current() {
        assert_eq!(parse_year(&json!(2014), 2026), 2014);
        assert_eq!(parse_year(&json!("2019"), 2026), 2019);
        assert_eq!(parse_year(&json!(2027), 2026), 2027);
        assert_eq!(parse_year(&json!(2028), 2026), 2026);
        assert_eq!(parse_year(&json!(1885), 2026), 2026);
        assert_eq!(parse_year(&json!("twenty"), 2026), 2026);
        assert_eq!(parse_year(&Value::Null, 2026), 2026);
    }

    #[test]
    fn decimals_must_be_non_negative() {
        assert_eq!(parse_non_negative("quantity", &json!("2.5")).unwrap(), Decimal::new(25, 1));
        assert_eq!(parse_non_negative("quantity", &json!(3)).unwrap(), Decimal::from(3));
        assert!(matches!(
            parse_non_negative("unitPrice", &json!(-1)),
            Err(AppError::InvalidField { field: "unitPrice", .. })
        ));
        assert!(parse_non_negative("unitPrice", &json!("abc")).is_err());
        assert!(parse_non_negative("unitPrice", &json!(null)).is_err());
    }

    #[test]
    fn amounts_beyond_the_input_cap_are_rejected() {
        assert_eq!(MAX_INPUT_AMOUNT, Decimal::from(1_000_000_000_000i64));
        assert!(matches!(
            parse_non_negative("quantity", &json!("100000000000000000000")),
            Err(AppError::InvalidField { field: "quantity", .. })
        ));

        let raw = vec![LineItemInput {
            description: "Bulk".into(),
            quantity: json!("100000000000000000000"),
            unit_price: json!("100000000000000000000"),
        }];
        assert!(matches!(parse_line_items(&raw), Err(AppError::InvalidField { .. })));

        // The cap keeps the largest line comfortably inside a decimal
        let raw = vec![LineItemInput {
            description: "Bulk".into(),
            quantity: json!("1000000000000"),
            unit_price: json!("1000000000000"),
        }];
        let items = parse_line_items(&raw).unwrap();
        assert_eq!(items[0].total, MAX_INPUT_AMOUNT * MAX_INPUT_AMOUNT);
    }

    #[test]
    fn line_items_get_computed_totals() {
        let raw = vec![LineItemInput {
            description: " Pads ".into(),
            quantity: json!("2"),
            unit_price: json!(500),
        }];
        let items = parse_line_items(&raw).unwrap();
        assert_eq!(items[0].description, "Pads");
        assert_eq!(items[0].total, Decimal::from(1000));
    }

    #[test]
    fn birthdays_must_be_real_dates() {
        assert_eq!(parse_birthday("1990-02-15").unwrap(), "1990-02-15");
        assert!(parse_birthday("1990-02-30").is_err());
        assert!(parse_birthday("15/02/1990").is_err());

        let profile = normalize_profile(UserProfile::Customer { birthday: Some("".into()), address: None }).unwrap();
        assert_eq!(profile, UserProfile::Customer { birthday: None, address: None });
    }

    #[test]
    fn walk_in_needs_a_name() {
        let err = normalize_customer(CustomerRef::WalkIn { name: "  ".into(), phone: None }).unwrap_err();
        assert!(matches!(err, AppError::InvalidField { field: "customer.name", .. }));
    }
}
