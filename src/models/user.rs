// src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::auth::StaffRole;

// Role-specific payload. Each variant only carries what that role uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum UserProfile {
    #[serde(rename_all = "camelCase")]
    Customer {
        // Stored as YYYY-MM-DD, matched on month and day only
        #[schema(example = "1990-02-15")]
        birthday: Option<String>,
        address: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Staff {
        position: StaffRole,
        #[serde(default)]
        can_manage_jobs: bool,
    },
    #[serde(rename_all = "camelCase")]
    Vendor {
        business_name: String,
        payout_account: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[schema(ignore)]
    pub workshop_id: Uuid,
    #[schema(example = "Chinedu Okafor")]
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub profile: UserProfile,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn birthday(&self) -> Option<&str> {
        match &self.profile {
            UserProfile::Customer { birthday, .. } => birthday.as_deref(),
            _ => None,
        }
    }

    pub fn is_customer(&self) -> bool {
        matches!(self.profile, UserProfile::Customer { .. })
    }

    pub fn role_name(&self) -> &'static str {
        match self.profile {
            UserProfile::Customer { .. } => "customer",
            UserProfile::Staff { .. } => "staff",
            UserProfile::Vendor { .. } => "vendor",
        }
    }
}
