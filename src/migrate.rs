use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    // Create reference documents table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reference_documents (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL UNIQUE,
            content TEXT NOT NULL,
            scope TEXT NOT NULL CHECK (scope IN ('system', 'global', 'entity')),
            entity_name TEXT,
            priority INTEGER NOT NULL DEFAULT 0,
            estimated_tokens INTEGER,
            page_count INTEGER,
            content_hash TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Create admin settings table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admin_settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Create indexes
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reference_documents_scope ON reference_documents(scope, priority DESC)",
    )
    .execute(&pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reference_documents_entity ON reference_documents(entity_name)",
    )
    .execute(&pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reference_documents_created_at ON reference_documents(created_at DESC)",
    )
    .execute(&pool)
    .await?;

    pool.close().await;
    Ok(())
}
