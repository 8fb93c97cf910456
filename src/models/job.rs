// src/models/job.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::history::StatusChange;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Received,
    Diagnosed,
    Repairing,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    #[default]
    Service,
    Repair,
    Tow,
}

// Who the job is for. Walk-ins have no user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CustomerRef {
    #[serde(rename_all = "camelCase")]
    Registered { user_id: Uuid },
    #[serde(rename_all = "camelCase")]
    WalkIn { name: String, phone: Option<String> },
}

impl CustomerRef {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            CustomerRef::Registered { user_id } => Some(*user_id),
            CustomerRef::WalkIn { .. } => None,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            CustomerRef::Registered { .. } => None,
            CustomerRef::WalkIn { name, .. } => Some(name),
        }
    }
}

// --- Job ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    #[schema(ignore)]
    pub workshop_id: Uuid,
    pub customer: CustomerRef,
    // Denormalized for search; filled from the user record or the walk-in name
    #[serde(default)]
    pub customer_name: Option<String>,
    pub vehicle_id: Option<Uuid>,
    #[serde(default)]
    pub vehicle_label: Option<String>,
    #[schema(example = "Brake pads squeal at low speed")]
    pub description: String,
    #[serde(default)]
    pub job_type: JobType,
    pub status: JobStatus,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub status_history: Vec<StatusChange<JobStatus>>,

    // `technician_ids` is authoritative, `assigned_technician` mirrors its first entry
    #[serde(default)]
    pub technician_ids: Vec<Uuid>,
    #[serde(default)]
    pub assigned_technician: Option<Uuid>,

    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Reconciles the legacy single-technician field with the list.
    /// Documents written before the list existed only carry the single field.
    pub fn normalize_technicians(&mut self) {
        if self.technician_ids.is_empty() {
            if let Some(legacy) = self.assigned_technician {
                self.technician_ids.push(legacy);
            }
        }
        self.assigned_technician = self.technician_ids.first().copied();
    }

    pub fn set_technicians(&mut self, technicians: Vec<Uuid>) {
        let mut unique = Vec::with_capacity(technicians.len());
        for id in technicians {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        self.technician_ids = unique;
        self.assigned_technician = self.technician_ids.first().copied();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn legacy_job() -> Job {
        serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "workshopId": Uuid::new_v4(),
            "customer": { "kind": "walk_in", "name": "Ada", "phone": null },
            "vehicleId": null,
            "description": "Oil change",
            "status": "received",
            "assignedTechnician": "7d9f4f0e-5b1a-4a8c-9a39-3b5b7a0d2c11",
            "scheduledAt": null,
            "createdAt": null,
            "updatedAt": null
        }))
        .unwrap()
    }

    #[test]
    fn legacy_single_technician_seeds_the_list() {
        let mut job = legacy_job();
        assert!(job.technician_ids.is_empty());
        job.normalize_technicians();
        assert_eq!(job.technician_ids.len(), 1);
        assert_eq!(job.assigned_technician, Some(job.technician_ids[0]));
    }

    #[test]
    fn list_wins_over_the_mirror() {
        let mut job = legacy_job();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        job.set_technicians(vec![a, b, a]);
        assert_eq!(job.technician_ids, vec![a, b]);
        assert_eq!(job.assigned_technician, Some(a));

        job.set_technicians(vec![]);
        assert_eq!(job.assigned_technician, None);
    }

    #[test]
    fn customer_ref_is_tagged() {
        let id = Uuid::new_v4();
        let value = serde_json::to_value(CustomerRef::Registered { user_id: id }).unwrap();
        assert_eq!(value, json!({ "kind": "registered", "userId": id }));
    }
}
