// src/services/job_service.rs

use chrono::{DateTime, FixedOffset, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{DocFilter, Repository},
    models::{
        auth::Actor,
        job::{CustomerRef, Job, JobStatus, JobType},
        user::{User, UserProfile},
        vehicle::Vehicle,
    },
    services::{
        query::{apply_criteria, ListCriteria, JOB_SEARCH_FIELDS},
        validation,
        workflow::{self, StatusFlow},
    },
};

/// Everything staff fill in when opening a job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub customer: CustomerRef,
    pub vehicle_id: Option<Uuid>,
    pub description: String,
    pub job_type: JobType,
    pub technician_ids: Vec<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct JobService {
    repo: Repository,
    tz: FixedOffset,
}

impl JobService {
    pub fn new(repo: Repository, tz: FixedOffset) -> Self {
        Self { repo, tz }
    }

    pub async fn create_job(&self, actor: &Actor, input: NewJob) -> Result<Job, AppError> {
        let description = validation::require_text("description", &input.description)?;
        let customer = validation::normalize_customer(input.customer)?;

        let customer_name = match &customer {
            CustomerRef::Registered { user_id } => {
                let user: User = self.repo.find(actor.workshop_id, *user_id).await?;
                user.full_name
            }
            CustomerRef::WalkIn { name, .. } => name.clone(),
        };

        let vehicle_label = match input.vehicle_id {
            Some(vehicle_id) => {
                let vehicle: Vehicle = self.repo.find(actor.workshop_id, vehicle_id).await?;
                if let (Some(owner), Some(customer_id)) = (vehicle.owner_id, customer.user_id()) {
                    if owner != customer_id {
                        return Err(AppError::invalid("vehicleId", "vehicle belongs to another customer"));
                    }
                }
                Some(vehicle.label())
            }
            None => None,
        };

        self.check_technicians(actor, &input.technician_ids).await?;

        let mut job = Job {
            id: Uuid::new_v4(),
            workshop_id: actor.workshop_id,
            customer,
            customer_name: Some(customer_name),
            vehicle_id: input.vehicle_id,
            vehicle_label,
            description,
            job_type: input.job_type,
            status: JobStatus::Received,
            status_history: Vec::new(),
            technician_ids: Vec::new(),
            assigned_technician: None,
            scheduled_at: input.scheduled_at,
            created_at: None,
            updated_at: None,
        };
        job.set_technicians(input.technician_ids);

        let saved = self.repo.insert(&job).await?;
        tracing::info!("✅ Job {} opened by {}", saved.id, actor.name);
        Ok(saved)
    }

    pub async fn get_job(&self, actor: &Actor, id: Uuid) -> Result<Job, AppError> {
        let mut job: Job = self.repo.find(actor.workshop_id, id).await?;
        job.normalize_technicians();
        Ok(job)
    }

    pub async fn list_jobs(&self, actor: &Actor, criteria: &ListCriteria) -> Result<Vec<Job>, AppError> {
        let mut jobs: Vec<Job> = self.repo.list(actor.workshop_id, DocFilter::new()).await?;
        jobs.iter_mut().for_each(Job::normalize_technicians);
        Ok(apply_criteria(jobs, criteria, JOB_SEARCH_FIELDS, self.tz))
    }

    pub async fn transition_job(
        &self,
        actor: &Actor,
        id: Uuid,
        to: JobStatus,
        expected: Option<JobStatus>,
    ) -> Result<Job, AppError> {
        let mut job: Job = workflow::transition_stored(&self.repo, actor, id, to, expected).await?;
        job.normalize_technicians();
        Ok(job)
    }

    /// Replaces the technician list. The first entry becomes the lead.
    pub async fn assign_technicians(&self, actor: &Actor, id: Uuid, technician_ids: Vec<Uuid>) -> Result<Job, AppError> {
        let current = self.get_job(actor, id).await?;
        if current.status.is_terminal() {
            return Err(AppError::TerminalState {
                entity: JobStatus::ENTITY,
                status: current.status.as_str().to_string(),
            });
        }

        self.check_technicians(actor, &technician_ids).await?;

        let mut updated = current.clone();
        updated.set_technicians(technician_ids);

        // Status moves own the status fields and never touch the crew
        let mut saved = workflow::commit_fields(
            &self.repo,
            &current,
            &updated,
            &["technicianIds", "assignedTechnician"],
            &[JobStatus::FIELD],
        )
        .await?;
        saved.normalize_technicians();
        tracing::info!("✅ Job {} now has {} technician(s)", id, saved.technician_ids.len());
        Ok(saved)
    }

    async fn check_technicians(&self, actor: &Actor, technician_ids: &[Uuid]) -> Result<(), AppError> {
        for id in technician_ids {
            let user: User = self.repo.find(actor.workshop_id, *id).await?;
            if !matches!(user.profile, UserProfile::Staff { .. }) {
                return Err(AppError::invalid("technicianIds", format!("{} is not a staff member", user.full_name)));
            }
        }
        Ok(())
    }
}
