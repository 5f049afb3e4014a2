//! Final prompt layout.
//!
//! Combines system instructions, assembled reference context, and the
//! user's input into one labeled prompt string. Sections that have
//! nothing to say are omitted entirely; the user input section is
//! always present.

use std::sync::Arc;

use anyhow::Result;

use crate::assemble::{AssemblerOptions, ContextAssembler};
use crate::config::Config;
use crate::db;
use crate::store::sqlite::SqliteStore;

/// Lay out the full prompt. `system_prompt` and `reference_context`
/// sections appear only when non-empty.
pub fn format_prompt(user_input: &str, reference_context: &str, system_prompt: Option<&str>) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(system) = system_prompt {
        if !system.is_empty() {
            parts.push(format!("=== SYSTEM INSTRUCTIONS ===\n{}\n", system));
        }
    }
    if !reference_context.is_empty() {
        parts.push(format!("=== REFERENCE MATERIALS ===\n{}\n", reference_context));
    }
    parts.push(format!("=== USER INPUT ===\n{}", user_input));
    parts.join("\n")
}

/// `prompt` command: assemble context for a function and print the
/// complete prompt to stdout.
pub async fn run_prompt(
    config: &Config,
    function: &str,
    input: &str,
    system: Option<&str>,
    entity: Option<&str>,
    max_tokens: Option<i64>,
) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = Arc::new(SqliteStore::new(pool.clone()));
    let assembler = ContextAssembler::new(
        store.clone(),
        store,
        AssemblerOptions::from(&config.assembly),
    );
    let assembled = assembler.assemble(function, entity, max_tokens).await;
    println!("{}", format_prompt(input, &assembled.context, system));
    pool.close().await;
    Ok(())
}
