// src/services/customer_service.rs

use chrono::{Datelike, FixedOffset, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{DocFilter, Repository},
    models::{
        auth::Actor,
        user::{User, UserProfile},
        vehicle::Vehicle,
    },
    services::{
        query::{
            customers_with_birthday_today, filter_by_date_range, local_today, search_text, ListCriteria,
            USER_SEARCH_FIELDS, VEHICLE_SEARCH_FIELDS,
        },
        validation,
    },
};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub profile: UserProfile,
}

#[derive(Debug, Clone)]
pub struct NewVehicle {
    pub owner_id: Option<Uuid>,
    pub make: String,
    pub model: String,
    /// Raw form value; unparseable years fall back to the current one
    pub year: Value,
    pub plate_number: String,
    pub vin: Option<String>,
    pub color: Option<String>,
}

#[derive(Clone)]
pub struct CustomerService {
    repo: Repository,
    tz: FixedOffset,
}

impl CustomerService {
    pub fn new(repo: Repository, tz: FixedOffset) -> Self {
        Self { repo, tz }
    }

    // =====================================================================
    //  USERS
    // =====================================================================

    pub async fn create_user(&self, actor: &Actor, input: NewUser) -> Result<User, AppError> {
        let full_name = validation::require_text("fullName", &input.full_name)?;
        let profile = validation::normalize_profile(input.profile)?;
        let email = input.email.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty());

        if let Some(email) = &email {
            let taken: Vec<User> = self
                .repo
                .list(actor.workshop_id, DocFilter::new().eq("email", json!(email)))
                .await?;
            if !taken.is_empty() {
                return Err(AppError::Conflict(format!("a user with email {} already exists", email)));
            }
        }

        let user = User {
            id: Uuid::new_v4(),
            workshop_id: actor.workshop_id,
            full_name,
            email,
            phone: input.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            profile,
            created_at: None,
            updated_at: None,
        };

        let saved = self.repo.insert(&user).await?;
        tracing::info!("✅ {} {} registered by {}", saved.role_name(), saved.id, actor.name);
        Ok(saved)
    }

    pub async fn get_user(&self, actor: &Actor, id: Uuid) -> Result<User, AppError> {
        self.repo.find(actor.workshop_id, id).await
    }

    /// Users of one role (`customer`, `staff`, `vendor`) or all of them.
    pub async fn list_users(&self, actor: &Actor, role: Option<&str>, criteria: &ListCriteria) -> Result<Vec<User>, AppError> {
        let filter = match role {
            Some(role) => DocFilter::new().eq("profile", json!({ "role": role })),
            None => DocFilter::new(),
        };
        let users: Vec<User> = self.repo.list(actor.workshop_id, filter).await?;
        let users = filter_by_date_range(users, criteria.from, criteria.to, self.tz);
        Ok(search_text(users, criteria.q.as_deref().unwrap_or(""), USER_SEARCH_FIELDS))
    }

    /// Customers whose birthday falls on today's local date, any year.
    pub async fn birthdays_today(&self, actor: &Actor) -> Result<Vec<User>, AppError> {
        let customers: Vec<User> = self
            .repo
            .list(actor.workshop_id, DocFilter::new().eq("profile", json!({ "role": "customer" })))
            .await?;
        Ok(customers_with_birthday_today(customers, local_today(Utc::now(), self.tz)))
    }

    // =====================================================================
    //  VEHICLES
    // =====================================================================

    pub async fn create_vehicle(&self, actor: &Actor, input: NewVehicle) -> Result<Vehicle, AppError> {
        let plate_number = validation::normalize_plate(&input.plate_number)?;
        let make = validation::require_text("make", &input.make)?;
        let model = validation::require_text("model", &input.model)?;
        let year = validation::parse_year(&input.year, local_today(Utc::now(), self.tz).year());

        if let Some(owner_id) = input.owner_id {
            self.repo.find::<User>(actor.workshop_id, owner_id).await?;
        }

        let taken: Vec<Vehicle> = self
            .repo
            .list(actor.workshop_id, DocFilter::new().eq("plateNumber", json!(plate_number)))
            .await?;
        if !taken.is_empty() {
            return Err(AppError::Conflict(format!("plate {} is already registered", plate_number)));
        }

        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            workshop_id: actor.workshop_id,
            owner_id: input.owner_id,
            make,
            model,
            year,
            plate_number,
            vin: validation::normalize_vin(input.vin.as_deref()),
            color: input.color.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            created_at: None,
            updated_at: None,
        };

        let saved = self.repo.insert(&vehicle).await?;
        tracing::info!("✅ Vehicle {} registered by {}", saved.label(), actor.name);
        Ok(saved)
    }

    pub async fn get_vehicle(&self, actor: &Actor, id: Uuid) -> Result<Vehicle, AppError> {
        self.repo.find(actor.workshop_id, id).await
    }

    pub async fn list_vehicles(&self, actor: &Actor, owner_id: Option<Uuid>, q: Option<&str>) -> Result<Vec<Vehicle>, AppError> {
        let filter = match owner_id {
            Some(owner_id) => DocFilter::new().eq("ownerId", json!(owner_id)),
            None => DocFilter::new(),
        };
        let vehicles: Vec<Vehicle> = self.repo.list(actor.workshop_id, filter).await?;
        Ok(search_text(vehicles, q.unwrap_or(""), VEHICLE_SEARCH_FIELDS))
    }
}
