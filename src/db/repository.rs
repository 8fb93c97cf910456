// src/db/repository.rs

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{encode, Collection, DocFilter, DocumentStore, WriteBatch},
    models::{
        invoice::Invoice, job::Job, order::MarketplaceOrder, quote::Quote, user::User,
        vehicle::Vehicle,
    },
};

/// A model persisted as one document in one collection.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;
    const NAME: &'static str;

    fn id(&self) -> Uuid;
    fn workshop_id(&self) -> Uuid;
}

macro_rules! entity {
    ($ty:ty, $collection:expr, $name:literal) => {
        impl Entity for $ty {
            const COLLECTION: Collection = $collection;
            const NAME: &'static str = $name;

            fn id(&self) -> Uuid {
                self.id
            }

            fn workshop_id(&self) -> Uuid {
                self.workshop_id
            }
        }
    };
}

entity!(User, Collection::Users, "User");
entity!(Vehicle, Collection::Vehicles, "Vehicle");
entity!(Job, Collection::Jobs, "Job");
entity!(Quote, Collection::Quotes, "Quote");
entity!(Invoice, Collection::Invoices, "Invoice");
entity!(MarketplaceOrder, Collection::Orders, "Order");

// Typed, workshop-scoped access on top of the raw document store
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn find_optional<T: Entity>(&self, workshop_id: Uuid, id: Uuid) -> Result<Option<T>, AppError> {
        let Some(doc) = self.store.get(T::COLLECTION, id).await? else {
            return Ok(None);
        };

        let entity: T = doc.decode()?;
        // Another workshop's record is indistinguishable from a missing one
        if entity.workshop_id() != workshop_id {
            return Ok(None);
        }
        Ok(Some(entity))
    }

    pub async fn find<T: Entity>(&self, workshop_id: Uuid, id: Uuid) -> Result<T, AppError> {
        self.find_optional(workshop_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", T::NAME, id)))
    }

    /// Lists a workshop's records, newest first. Documents that no longer
    /// decode are skipped so one bad record cannot blank a whole table.
    pub async fn list<T: Entity>(&self, workshop_id: Uuid, filter: DocFilter) -> Result<Vec<T>, AppError> {
        let filter = filter.eq("workshopId", json!(workshop_id));
        let docs = self.store.list(T::COLLECTION, &filter).await?;

        let mut entities = Vec::with_capacity(docs.len());
        for doc in docs {
            let id = doc.id;
            match doc.decode::<T>() {
                Ok(entity) => entities.push(entity),
                Err(e) => tracing::warn!("⚠ Skipping malformed {} {}: {}", T::NAME, id, e),
            }
        }
        Ok(entities)
    }

    pub async fn insert<T: Entity>(&self, entity: &T) -> Result<T, AppError> {
        let doc = self.store.create(T::COLLECTION, encode(entity)?).await?;
        doc.decode()
    }

    pub async fn commit(&self, batch: WriteBatch) -> Result<(), AppError> {
        self.store.commit(batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_store::MemoryStore;
    use crate::models::vehicle::Vehicle;

    fn vehicle(workshop_id: Uuid) -> Vehicle {
        Vehicle {
            id: Uuid::new_v4(),
            workshop_id,
            owner_id: None,
            make: "Honda".into(),
            model: "Civic".into(),
            year: 2015,
            plate_number: "ABC-123".into(),
            vin: None,
            color: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn records_are_scoped_to_their_workshop() {
        let store = MemoryStore::new();
        let repo = Repository::new(Arc::new(store.clone()));
        let mine = Uuid::new_v4();
        let theirs = Uuid::new_v4();

        let saved = repo.insert(&vehicle(mine)).await.unwrap();
        assert!(saved.created_at.is_some());

        assert!(repo.find::<Vehicle>(mine, saved.id).await.is_ok());
        let err = repo.find::<Vehicle>(theirs, saved.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert_eq!(repo.list::<Vehicle>(mine, DocFilter::new()).await.unwrap().len(), 1);
        assert!(repo.list::<Vehicle>(theirs, DocFilter::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_documents_are_skipped_in_lists() {
        let store = MemoryStore::new();
        let repo = Repository::new(Arc::new(store.clone()));
        let workshop = Uuid::new_v4();

        repo.insert(&vehicle(workshop)).await.unwrap();
        store
            .create(Collection::Vehicles, json!({ "workshopId": workshop, "make": 42 }))
            .await
            .unwrap();

        let listed = repo.list::<Vehicle>(workshop, DocFilter::new()).await.unwrap();
        assert_eq!(listed.len(), 1);
    }
}
