//! Administrative commands: document listing/removal and per-function
//! knowledge-base settings.

use anyhow::{bail, Result};

use crate::budget::format_number;
use crate::config::Config;
use crate::db;
use crate::store::sqlite::SqliteStore;

/// `docs list` command: every stored document, newest first.
pub async fn run_docs_list(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let docs = store.list_summaries().await?;

    if docs.is_empty() {
        println!("No documents loaded.");
        pool.close().await;
        return Ok(());
    }

    println!(
        "  {:<36} {:<7} {:<16} {:>5} {:>10}  {:<16} {}",
        "ID", "SCOPE", "ENTITY", "PRIO", "TOKENS", "CREATED", "TITLE"
    );
    println!("  {}", "-".repeat(108));
    for doc in &docs {
        println!(
            "  {:<36} {:<7} {:<16} {:>5} {:>10}  {:<16} {}",
            doc.id,
            doc.scope,
            doc.entity_name.as_deref().unwrap_or("-"),
            doc.priority,
            format_number(doc.estimated_tokens.unwrap_or(0)),
            format_ts_iso(doc.created_at),
            doc.title
        );
    }
    println!();
    println!("  {} document(s)", docs.len());

    pool.close().await;
    Ok(())
}

/// `docs rm` command: delete one document by id.
pub async fn run_docs_rm(config: &Config, id: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let removed = store.delete_document(id).await?;
    if !removed {
        bail!("document not found: {}", id);
    }
    println!("removed {}", id);

    pool.close().await;
    Ok(())
}

/// `settings set` command: write the `<function>_use_kb` /
/// `<function>_tokens` keys the assembler reads.
pub async fn run_settings_set(
    config: &Config,
    function: &str,
    use_kb: Option<bool>,
    tokens: Option<i64>,
) -> Result<()> {
    if use_kb.is_none() && tokens.is_none() {
        bail!("nothing to set: pass --use-kb and/or --tokens");
    }
    if let Some(t) = tokens {
        if t <= 0 {
            bail!("--tokens must be > 0");
        }
    }

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());

    if let Some(enabled) = use_kb {
        let key = format!("{}_use_kb", function);
        store
            .set_setting(&key, if enabled { "true" } else { "false" })
            .await?;
        println!("set {} = {}", key, enabled);
    }
    if let Some(t) = tokens {
        let key = format!("{}_tokens", function);
        store.set_setting(&key, &t.to_string()).await?;
        println!("set {} = {}", key, t);
    }

    pool.close().await;
    Ok(())
}

/// `settings list` command: raw key/value rows.
pub async fn run_settings_list(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let settings = store.list_settings().await?;

    if settings.is_empty() {
        println!("No settings stored.");
        pool.close().await;
        return Ok(());
    }

    println!("  {:<32} {:<12} {}", "KEY", "VALUE", "UPDATED");
    println!("  {}", "-".repeat(64));
    for s in &settings {
        println!(
            "  {:<32} {:<12} {}",
            s.key,
            s.value,
            format_ts_iso(s.updated_at)
        );
    }

    pool.close().await;
    Ok(())
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
