// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Admin,
    Manager,
    Technician,
    Staff,
}

// The identity every workflow call is attributed to.
// Built once per request from a validated token and passed down explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
    pub role: StaffRole,
    pub workshop_id: Uuid,
}

// Claims issued by the auth provider
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub role: StaffRole,
    pub workshop_id: Uuid,
    pub exp: usize,
    pub iat: usize,
}

impl From<Claims> for Actor {
    fn from(claims: Claims) -> Self {
        Actor {
            id: claims.sub,
            name: claims.name,
            role: claims.role,
            workshop_id: claims.workshop_id,
        }
    }
}
