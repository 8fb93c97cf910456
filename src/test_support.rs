// src/test_support.rs

use std::sync::Arc;

use chrono::FixedOffset;
use uuid::Uuid;

use crate::{
    db::{MemoryStore, Repository},
    models::{
        auth::{Actor, StaffRole},
        user::{User, UserProfile},
    },
};

pub fn actor() -> Actor {
    Actor {
        id: Uuid::new_v4(),
        name: "Tunde".into(),
        role: StaffRole::Manager,
        workshop_id: Uuid::new_v4(),
    }
}

pub fn actor_in(workshop_id: Uuid) -> Actor {
    Actor { workshop_id, ..actor() }
}

pub fn memory_repo() -> (MemoryStore, Repository) {
    let store = MemoryStore::new();
    let repo = Repository::new(Arc::new(store.clone()));
    (store, repo)
}

// West Africa Time
pub fn lagos() -> FixedOffset {
    FixedOffset::east_opt(3600).unwrap()
}

fn user(workshop_id: Uuid, full_name: &str, profile: UserProfile) -> User {
    User {
        id: Uuid::new_v4(),
        workshop_id,
        full_name: full_name.into(),
        email: None,
        phone: None,
        profile,
        created_at: None,
        updated_at: None,
    }
}

pub async fn seed_customer(repo: &Repository, workshop_id: Uuid, full_name: &str, birthday: Option<&str>) -> User {
    let profile = UserProfile::Customer { birthday: birthday.map(str::to_string), address: None };
    repo.insert(&user(workshop_id, full_name, profile)).await.unwrap()
}

pub async fn seed_staff(repo: &Repository, workshop_id: Uuid, full_name: &str) -> User {
    let profile = UserProfile::Staff { position: StaffRole::Technician, can_manage_jobs: true };
    repo.insert(&user(workshop_id, full_name, profile)).await.unwrap()
}

pub async fn seed_vendor(repo: &Repository, workshop_id: Uuid, business_name: &str) -> User {
    let profile = UserProfile::Vendor { business_name: business_name.into(), payout_account: None };
    repo.insert(&user(workshop_id, business_name, profile)).await.unwrap()
}
