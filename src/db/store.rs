// src/db/store.rs

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::common::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Users,
    Vehicles,
    Jobs,
    Quotes,
    Invoices,
    Orders,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Vehicles => "vehicles",
            Collection::Jobs => "jobs",
            Collection::Quotes => "quotes",
            Collection::Invoices => "invoices",
            Collection::Orders => "orders",
        }
    }
}

/// A stored document. `data` always carries `id`, `createdAt` and `updatedAt`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub data: Value,
}

impl Document {
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, AppError> {
        Ok(serde_json::from_value(self.data)?)
    }
}

pub fn encode<T: Serialize>(entity: &T) -> Result<Value, AppError> {
    Ok(serde_json::to_value(entity)?)
}

// Containment on top-level fields, the same test as `data @> filter` on Postgres.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocFilter {
    fields: Map<String, Value>,
}

impl DocFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: Value) -> Self {
        self.fields.insert(field.to_string(), value);
        self
    }

    pub fn matches(&self, data: &Value) -> bool {
        self.fields
            .iter()
            .all(|(field, expected)| data.get(field).is_some_and(|actual| contains(actual, expected)))
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

/// Optimistic-concurrency guard: the stored field must still hold this value.
#[derive(Debug, Clone, PartialEq)]
pub struct Precondition {
    pub field: String,
    pub equals: Value,
}

impl Precondition {
    pub fn new(field: &str, equals: Value) -> Self {
        Self { field: field.to_string(), equals }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Create {
        collection: Collection,
        id: Uuid,
        data: Value,
    },
    Update {
        collection: Collection,
        id: Uuid,
        patch: Value,
        expect: Vec<Precondition>,
    },
}

/// Writes that commit together or not at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(mut self, collection: Collection, id: Uuid, data: Value) -> Self {
        self.ops.push(WriteOp::Create { collection, id, data });
        self
    }

    pub fn update(mut self, collection: Collection, id: Uuid, patch: Value) -> Self {
        self.ops.push(WriteOp::Update { collection, id, patch, expect: Vec::new() });
        self
    }

    pub fn update_if(
        mut self,
        collection: Collection,
        id: Uuid,
        patch: Value,
        field: &str,
        equals: Value,
    ) -> Self {
        self.update_guarded(collection, id, patch, vec![Precondition::new(field, equals)])
    }

    /// Update that only applies while every stored field still equals its expected value.
    pub fn update_guarded(
        mut self,
        collection: Collection,
        id: Uuid,
        patch: Value,
        expect: Vec<Precondition>,
    ) -> Self {
        self.ops.push(WriteOp::Update { collection, id, patch, expect });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Data-access layer over a document database.
///
/// Every method is a single awaited round trip. `commit` is all-or-nothing:
/// a failed precondition yields `Conflict`, a missing target yields `NotFound`
/// and any backend failure yields `DependencyError`, and in every case nothing
/// from the batch is persisted.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, AppError>;

    /// Documents matching `filter`, newest first.
    async fn list(&self, collection: Collection, filter: &DocFilter) -> Result<Vec<Document>, AppError>;

    async fn commit(&self, batch: WriteBatch) -> Result<(), AppError>;

    async fn create(&self, collection: Collection, data: Value) -> Result<Document, AppError> {
        let id = data
            .get("id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        self.commit(WriteBatch::new().create(collection, id, data)).await?;
        self.get(collection, id)
            .await?
            .ok_or_else(|| AppError::DependencyError(format!("{} {} vanished after create", collection.as_str(), id)))
    }

    async fn update(&self, collection: Collection, id: Uuid, patch: Value) -> Result<Document, AppError> {
        self.commit(WriteBatch::new().update(collection, id, patch)).await?;
        self.get(collection, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", collection.as_str(), id)))
    }
}

// jsonb containment: objects match on a subset of keys, arrays on a subset of elements
fn contains(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(actual), Value::Object(expected)) => expected
            .iter()
            .all(|(k, v)| actual.get(k).is_some_and(|a| contains(a, v))),
        (Value::Array(actual), Value::Array(expected)) => {
            expected.iter().all(|e| actual.iter().any(|a| contains(a, e)))
        }
        _ => actual == expected,
    }
}

/// Top-level merge, the same semantics as `jsonb || jsonb`.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    if let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_matches_on_every_field() {
        let filter = DocFilter::new().eq("status", json!("received")).eq("jobType", json!("tow"));
        assert!(filter.matches(&json!({ "status": "received", "jobType": "tow", "x": 1 })));
        assert!(!filter.matches(&json!({ "status": "received" })));
        assert!(DocFilter::new().matches(&json!({})));
    }

    #[test]
    fn nested_filters_match_by_containment() {
        let filter = DocFilter::new().eq("profile", json!({ "role": "customer" }));
        assert!(filter.matches(&json!({ "profile": { "role": "customer", "birthday": "1990-02-15" } })));
        assert!(!filter.matches(&json!({ "profile": { "role": "staff" } })));
        assert!(!filter.matches(&json!({ "profile": "customer" })));
    }

    #[test]
    fn merge_is_shallow() {
        let mut doc = json!({ "a": 1, "nested": { "x": 1, "y": 2 } });
        merge_patch(&mut doc, &json!({ "a": 2, "nested": { "x": 9 } }));
        assert_eq!(doc, json!({ "a": 2, "nested": { "x": 9 } }));
    }
}
