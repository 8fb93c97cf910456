// src/db/pg_store.rs

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{types::Json, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::store::{Collection, DocFilter, Document, DocumentStore, WriteBatch, WriteOp};

/// Document store on a single JSONB table (see `migrations/`).
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn apply(tx: &mut Transaction<'_, Postgres>, op: &WriteOp) -> Result<(), AppError> {
        match op {
            WriteOp::Create { collection, id, data } => {
                // id, createdAt and updatedAt are always the server's
                let result = sqlx::query(
                    r#"
                    INSERT INTO documents (collection, id, data, created_at, updated_at)
                    VALUES (
                        $1, $2,
                        $3::jsonb || jsonb_build_object('id', $2, 'createdAt', NOW(), 'updatedAt', NOW()),
                        NOW(), NOW()
                    )
                    ON CONFLICT (collection, id) DO NOTHING
                    "#,
                )
                .bind(collection.as_str())
                .bind(id)
                .bind(Json(data))
                .execute(&mut **tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(AppError::Conflict(format!("{} {} already exists", collection.as_str(), id)));
                }
            }
            WriteOp::Update { collection, id, patch, expect } => {
                let mut guard = serde_json::Map::new();
                for pre in expect {
                    guard.insert(pre.field.clone(), pre.equals.clone());
                }

                let result = sqlx::query(
                    r#"
                    UPDATE documents
                    SET data = data || $3::jsonb || jsonb_build_object('id', $2, 'updatedAt', NOW()),
                        updated_at = NOW()
                    WHERE collection = $1 AND id = $2
                      AND NOT EXISTS (
                          SELECT 1 FROM jsonb_each($4::jsonb) AS guard
                          WHERE data -> guard.key IS DISTINCT FROM guard.value
                      )
                    "#,
                )
                .bind(collection.as_str())
                .bind(id)
                .bind(Json(patch))
                .bind(Json(Value::Object(guard)))
                .execute(&mut **tx)
                .await?;

                if result.rows_affected() == 0 {
                    // Either the row is gone or the guard no longer holds
                    let exists: Option<(i32,)> =
                        sqlx::query_as("SELECT 1 FROM documents WHERE collection = $1 AND id = $2")
                            .bind(collection.as_str())
                            .bind(id)
                            .fetch_optional(&mut **tx)
                            .await?;

                    return Err(match exists {
                        Some(_) => AppError::Conflict(format!("{} {} was modified concurrently", collection.as_str(), id)),
                        None => AppError::NotFound(format!("{} {}", collection.as_str(), id)),
                    });
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, AppError> {
        let row: Option<(Json<Value>,)> =
            sqlx::query_as("SELECT data FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection.as_str())
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(Json(data),)| Document { id, data }))
    }

    async fn list(&self, collection: Collection, filter: &DocFilter) -> Result<Vec<Document>, AppError> {
        let rows: Vec<(Uuid, Json<Value>)> = sqlx::query_as(
            r#"
            SELECT id, data FROM documents
            WHERE collection = $1 AND data @> $2::jsonb
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(collection.as_str())
        .bind(Json(filter.to_json()))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id, Json(data))| Document { id, data }).collect())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        for op in batch.ops() {
            // Returning early drops `tx`, which rolls everything back
            Self::apply(&mut tx, op).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
