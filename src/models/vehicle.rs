// src/models/vehicle.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: Uuid,
    #[schema(ignore)]
    pub workshop_id: Uuid,
    pub owner_id: Option<Uuid>,
    #[schema(example = "Toyota")]
    pub make: String,
    #[schema(example = "Corolla")]
    pub model: String,
    #[schema(example = 2014)]
    pub year: i32,
    // Upper-cased at the boundary
    #[schema(example = "LAG-234-KJ")]
    pub plate_number: String,
    pub vin: Option<String>,
    pub color: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Vehicle {
    pub fn label(&self) -> String {
        format!("{} {} {} ({})", self.year, self.make, self.model, self.plate_number)
    }
}
