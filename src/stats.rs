//! Knowledge-base statistics overview.
//!
//! Quick summary of what is loaded: document and token counts per
//! scope, settings count, and database size. Used by `refpack stats`
//! to sanity-check loads and settings without dumping any content.

use anyhow::Result;
use sqlx::Row;

use crate::budget::format_number;
use crate::config::Config;
use crate::db;

/// Per-scope breakdown of document and token counts.
struct ScopeStats {
    scope: String,
    doc_count: i64,
    token_sum: i64,
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let total_docs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reference_documents")
        .fetch_one(&pool)
        .await?;

    let total_tokens: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(COALESCE(estimated_tokens, 0)), 0) FROM reference_documents",
    )
    .fetch_one(&pool)
    .await?;

    let settings_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admin_settings")
        .fetch_one(&pool)
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Refpack — Knowledge Base Stats");
    println!("==============================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Documents:   {}", total_docs);
    println!("  Est. tokens: {}", format_number(total_tokens));
    println!("  Settings:    {}", settings_count);

    // Per-scope breakdown
    let scope_rows = sqlx::query(
        r#"
        SELECT
            scope,
            COUNT(*) AS doc_count,
            COALESCE(SUM(COALESCE(estimated_tokens, 0)), 0) AS token_sum
        FROM reference_documents
        GROUP BY scope
        ORDER BY doc_count DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let scope_stats: Vec<ScopeStats> = scope_rows
        .iter()
        .map(|row| ScopeStats {
            scope: row.get("scope"),
            doc_count: row.get("doc_count"),
            token_sum: row.get("token_sum"),
        })
        .collect();

    if !scope_stats.is_empty() {
        println!();
        println!("  By scope:");
        println!("  {:<12} {:>6} {:>14}", "SCOPE", "DOCS", "EST. TOKENS");
        println!("  {}", "-".repeat(34));

        for s in &scope_stats {
            println!(
                "  {:<12} {:>6} {:>14}",
                s.scope,
                s.doc_count,
                format_number(s.token_sum)
            );
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
