// src/handlers.rs

pub mod customers;
pub mod dashboard;
pub mod invoices;
pub mod jobs;
pub mod orders;
pub mod quotes;

use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::services::query::ListCriteria;

// Query string shared by every list screen
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Status tab; unknown values (e.g. `all`) show everything
    pub group: Option<String>,
    /// First local day, inclusive
    pub from: Option<NaiveDate>,
    /// Last local day, inclusive
    pub to: Option<NaiveDate>,
    /// Case-insensitive search text
    pub q: Option<String>,
}

impl From<ListQuery> for ListCriteria {
    fn from(query: ListQuery) -> Self {
        ListCriteria { group: query.group, from: query.from, to: query.to, q: query.q }
    }
}
