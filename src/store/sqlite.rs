//! SQLite-backed store.
//!
//! Implements the read traits used by the assembler plus the write and
//! listing operations behind the admin CLI. Read-path errors are mapped
//! onto [`StoreError`]: connection and query failures become
//! `Unavailable`, rows that do not decode become `Malformed`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{DocumentSummary, ReferenceDocument, Scope};

use super::{DocumentFilter, DocumentStore, SettingsStore, StoreError};

/// Whether an upsert created a new row or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Added,
    Updated,
}

/// A raw settings row, as shown by `settings list`.
#[derive(Debug, Clone)]
pub struct SettingRow {
    pub key: String,
    pub value: String,
    pub updated_at: i64,
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteStore { pool }
    }

    /// Insert a document, replacing any existing document with the same
    /// title. The replacement keeps the original row's id and
    /// `created_at` so orderings stay stable across re-loads.
    pub async fn upsert_document(&self, doc: &ReferenceDocument) -> Result<UpsertOutcome> {
        let mut hasher = Sha256::new();
        hasher.update(doc.content.as_bytes());
        let content_hash = format!("{:x}", hasher.finalize());

        let existing_id: Option<String> =
            sqlx::query_scalar("SELECT id FROM reference_documents WHERE title = ?")
                .bind(&doc.title)
                .fetch_optional(&self.pool)
                .await?;
        let outcome = if existing_id.is_some() {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Added
        };
        let doc_id = existing_id.unwrap_or_else(|| doc.id.clone());

        sqlx::query(
            r#"
            INSERT INTO reference_documents (id, title, content, scope, entity_name, priority, estimated_tokens, page_count, content_hash, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(title) DO UPDATE SET
                content = excluded.content,
                scope = excluded.scope,
                entity_name = excluded.entity_name,
                priority = excluded.priority,
                estimated_tokens = excluded.estimated_tokens,
                page_count = excluded.page_count,
                content_hash = excluded.content_hash
            "#,
        )
        .bind(&doc_id)
        .bind(&doc.title)
        .bind(&doc.content)
        .bind(doc.scope.as_str())
        .bind(&doc.entity_name)
        .bind(doc.priority)
        .bind(doc.estimated_tokens)
        .bind(doc.page_count)
        .bind(&content_hash)
        .bind(doc.created_at)
        .execute(&self.pool)
        .await?;

        Ok(outcome)
    }

    /// Delete by id. Returns false when no such document exists.
    pub async fn delete_document(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reference_documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All documents without their bodies, newest first (the admin view).
    pub async fn list_summaries(&self) -> Result<Vec<DocumentSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, scope, entity_name, priority, estimated_tokens, page_count, created_at
            FROM reference_documents
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let scope_str: String = row.try_get("scope")?;
            let scope = Scope::parse(&scope_str)
                .ok_or_else(|| anyhow!("unknown scope in store: '{}'", scope_str))?;
            summaries.push(DocumentSummary {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
                scope,
                entity_name: row.try_get("entity_name")?,
                priority: row.try_get("priority")?,
                estimated_tokens: row.try_get("estimated_tokens")?,
                page_count: row.try_get("page_count")?,
                created_at: row.try_get("created_at")?,
            });
        }
        Ok(summaries)
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO admin_settings (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_settings(&self) -> Result<Vec<SettingRow>> {
        let rows = sqlx::query("SELECT key, value, updated_at FROM admin_settings ORDER BY key ASC")
            .fetch_all(&self.pool)
            .await?;
        let mut settings = Vec::with_capacity(rows.len());
        for row in rows {
            settings.push(SettingRow {
                key: row.try_get("key")?,
                value: row.try_get("value")?,
                updated_at: row.try_get("updated_at")?,
            });
        }
        Ok(settings)
    }
}

fn decode_document(row: &SqliteRow) -> Result<ReferenceDocument, StoreError> {
    let get_err = |e: sqlx::Error| StoreError::Malformed(e.to_string());
    let scope_str: String = row.try_get("scope").map_err(get_err)?;
    let scope = Scope::parse(&scope_str)
        .ok_or_else(|| StoreError::Malformed(format!("unknown scope: '{}'", scope_str)))?;
    Ok(ReferenceDocument {
        id: row.try_get("id").map_err(get_err)?,
        title: row.try_get("title").map_err(get_err)?,
        content: row.try_get("content").map_err(get_err)?,
        scope,
        entity_name: row.try_get("entity_name").map_err(get_err)?,
        priority: row.try_get("priority").map_err(get_err)?,
        estimated_tokens: row.try_get("estimated_tokens").map_err(get_err)?,
        page_count: row.try_get("page_count").map_err(get_err)?,
        created_at: row.try_get("created_at").map_err(get_err)?,
    })
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn list(&self, filter: &DocumentFilter) -> Result<Vec<ReferenceDocument>, StoreError> {
        let query = match filter.entity_name {
            Some(_) => sqlx::query(
                r#"
                SELECT id, title, content, scope, entity_name, priority, estimated_tokens, page_count, created_at
                FROM reference_documents
                WHERE scope = ? AND entity_name = ? COLLATE NOCASE
                ORDER BY priority DESC, created_at ASC, id ASC
                "#,
            )
            .bind(filter.scope.as_str())
            .bind(filter.entity_name.as_deref()),
            None => sqlx::query(
                r#"
                SELECT id, title, content, scope, entity_name, priority, estimated_tokens, page_count, created_at
                FROM reference_documents
                WHERE scope = ?
                ORDER BY priority DESC, created_at ASC, id ASC
                "#,
            )
            .bind(filter.scope.as_str()),
        };

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        rows.iter().map(decode_document).collect()
    }
}

#[async_trait]
impl SettingsStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        sqlx::query_scalar("SELECT value FROM admin_settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}
