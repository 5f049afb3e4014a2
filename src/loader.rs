//! Document loading.
//!
//! Feeds the knowledge base from local files: a single file or a
//! directory tree filtered through the `[loader]` glob patterns.
//! Content is stored as-is (no extraction here; feed it text), with a
//! token estimate computed at load time so the assembler rarely has to
//! derive one.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::budget::estimate_tokens;
use crate::config::{Config, LoaderConfig};
use crate::db;
use crate::models::{ReferenceDocument, Scope};
use crate::store::sqlite::{SqliteStore, UpsertOutcome};

pub struct LoadOptions {
    /// Title override; single-file loads only. Defaults to the file
    /// name (single file) or the path relative to the load root
    /// (directory loads).
    pub title: Option<String>,
    pub scope: Scope,
    pub entity: Option<String>,
    pub priority: i64,
    /// Page count annotation; single-file loads only.
    pub pages: Option<i64>,
}

pub async fn run_load(config: &Config, path: &Path, opts: LoadOptions) -> Result<()> {
    if opts.scope == Scope::Entity && opts.entity.is_none() {
        bail!("entity scope requires --entity");
    }
    if opts.scope != Scope::Entity && opts.entity.is_some() {
        bail!("--entity only applies to entity scope");
    }
    if !path.exists() {
        bail!("path does not exist: {}", path.display());
    }

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());

    if path.is_dir() {
        load_directory(config, &store, path, &opts).await?;
    } else {
        load_file(config, &store, path, &opts).await?;
    }

    pool.close().await;
    Ok(())
}

async fn load_file(
    config: &Config,
    store: &SqliteStore,
    path: &Path,
    opts: &LoadOptions,
) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    if content.trim().is_empty() {
        bail!("file has no text content: {}", path.display());
    }

    let title = match &opts.title {
        Some(t) => t.clone(),
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string()),
    };

    let doc = build_document(title, content, opts, config.assembly.chars_per_token);
    let outcome = store.upsert_document(&doc).await?;

    println!("load {}", path.display());
    match outcome {
        UpsertOutcome::Added => println!("  added: {}", doc.title),
        UpsertOutcome::Updated => println!("  updated: {}", doc.title),
    }
    println!("  estimated tokens: {}", doc.estimated_tokens.unwrap_or(0));
    println!("ok");
    Ok(())
}

async fn load_directory(
    config: &Config,
    store: &SqliteStore,
    root: &Path,
    opts: &LoadOptions,
) -> Result<()> {
    if opts.title.is_some() {
        bail!("--title applies to single files only");
    }
    if opts.pages.is_some() {
        bail!("--pages applies to single files only");
    }

    let files = collect_files(root, &config.loader)?;

    let mut added = 0u64;
    let mut updated = 0u64;
    let mut skipped = 0u64;

    for file in &files {
        let content = match std::fs::read_to_string(file) {
            Ok(c) => c,
            Err(err) => {
                warn!(path = %file.display(), error = %err, "unreadable file skipped");
                skipped += 1;
                continue;
            }
        };
        if content.trim().is_empty() {
            warn!(path = %file.display(), "empty file skipped");
            skipped += 1;
            continue;
        }

        let relative = file.strip_prefix(root).unwrap_or(file);
        let title = relative.to_string_lossy().to_string();
        let doc = build_document(title, content, opts, config.assembly.chars_per_token);
        match store.upsert_document(&doc).await? {
            UpsertOutcome::Added => added += 1,
            UpsertOutcome::Updated => updated += 1,
        }
    }

    println!("load {}", root.display());
    println!("  files found: {}", files.len());
    println!("  added: {}", added);
    println!("  updated: {}", updated);
    println!("  skipped: {}", skipped);
    println!("ok");
    Ok(())
}

fn build_document(
    title: String,
    content: String,
    opts: &LoadOptions,
    chars_per_token: f64,
) -> ReferenceDocument {
    let estimated = estimate_tokens(&content, chars_per_token);
    ReferenceDocument {
        id: Uuid::new_v4().to_string(),
        title,
        content,
        scope: opts.scope,
        entity_name: opts.entity.clone(),
        priority: opts.priority,
        estimated_tokens: Some(estimated),
        page_count: opts.pages,
        created_at: chrono::Utc::now().timestamp(),
    }
}

fn collect_files(root: &Path, loader: &LoaderConfig) -> Result<Vec<PathBuf>> {
    let include_set = build_globset(&loader.include_globs)?;
    let exclude_set = build_globset(&loader.exclude_globs)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !include_set.is_match(&rel_str) {
            continue;
        }

        files.push(path.to_path_buf());
    }

    // Sort for deterministic ordering
    files.sort();

    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
