// src/db/memory_store.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::store::{merge_patch, Collection, DocFilter, Document, DocumentStore, WriteBatch, WriteOp};

#[derive(Debug, Clone)]
struct Stored {
    data: Value,
    created_at: DateTime<Utc>,
    // Tie-breaker for documents created in the same instant
    seq: u64,
}

#[derive(Default)]
struct Inner {
    docs: HashMap<(Collection, Uuid), Stored>,
    next_seq: u64,
}

/// Process-local document store.
///
/// A batch is applied to a staged copy and swapped in only when every op
/// succeeded, so a failure never leaves part of a batch behind.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
    // One-shot: the next commit fails when it reaches this op index
    fail_at_op: Arc<Mutex<Option<usize>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next commit fail with `DependencyError` when it reaches op `index`.
    pub fn fail_next_commit_at(&self, index: usize) {
        if let Ok(mut slot) = self.fail_at_op.lock() {
            *slot = Some(index);
        }
    }

    pub async fn len(&self, collection: Collection) -> usize {
        self.inner.read().await.docs.keys().filter(|(c, _)| *c == collection).count()
    }

    fn take_injected_failure(&self) -> Option<usize> {
        self.fail_at_op.lock().ok().and_then(|mut slot| slot.take())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .docs
            .get(&(collection, id))
            .map(|stored| Document { id, data: stored.data.clone() }))
    }

    async fn list(&self, collection: Collection, filter: &DocFilter) -> Result<Vec<Document>, AppError> {
        let inner = self.inner.read().await;
        let mut found: Vec<(&Uuid, &Stored)> = inner
            .docs
            .iter()
            .filter(|((c, _), stored)| *c == collection && filter.matches(&stored.data))
            .map(|((_, id), stored)| (id, stored))
            .collect();

        found.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at).then(b.1.seq.cmp(&a.1.seq)));

        Ok(found
            .into_iter()
            .map(|(id, stored)| Document { id: *id, data: stored.data.clone() })
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), AppError> {
        let fail_at = self.take_injected_failure();
        let mut inner = self.inner.write().await;

        let mut staged = inner.docs.clone();
        let mut next_seq = inner.next_seq;
        let now = Utc::now();

        for (index, op) in batch.ops().iter().enumerate() {
            if fail_at == Some(index) {
                tracing::warn!("⚠ MemoryStore injected failure at op {}", index);
                return Err(AppError::DependencyError(format!("injected failure at op {}", index)));
            }

            match op {
                WriteOp::Create { collection, id, data } => {
                    if staged.contains_key(&(*collection, *id)) {
                        return Err(AppError::Conflict(format!("{} {} already exists", collection.as_str(), id)));
                    }
                    let mut data = data.clone();
                    merge_patch(&mut data, &json!({ "id": id, "createdAt": now, "updatedAt": now }));
                    staged.insert((*collection, *id), Stored { data, created_at: now, seq: next_seq });
                    next_seq += 1;
                }
                WriteOp::Update { collection, id, patch, expect } => {
                    let stored = staged
                        .get_mut(&(*collection, *id))
                        .ok_or_else(|| AppError::NotFound(format!("{} {}", collection.as_str(), id)))?;

                    for pre in expect {
                        if stored.data.get(&pre.field) != Some(&pre.equals) {
                            return Err(AppError::Conflict(format!(
                                "{} {} changed: '{}' is no longer {}",
                                collection.as_str(),
                                id,
                                pre.field,
                                pre.equals
                            )));
                        }
                    }

                    merge_patch(&mut stored.data, patch);
                    merge_patch(&mut stored.data, &json!({ "id": id, "updatedAt": now }));
                }
            }
        }

        inner.docs = staged;
        inner.next_seq = next_seq;
        tracing::debug!("✓ MemoryStore committed {} op(s)", batch.len());
        Ok(())
    }
}
