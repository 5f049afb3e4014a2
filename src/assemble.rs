//! Knowledge-base context assembly.
//!
//! The assembler answers one question for a consuming function: given
//! its per-function settings and the documents on file, what reference
//! text should ride along in the prompt? Documents are gathered in
//! three scope tiers (system, then global, then entity-specific),
//! packed into a token budget, and formatted into one labeled blob.
//!
//! The public entry point never fails. Any store or settings problem is
//! logged and degrades to an empty context; the calling feature then
//! proceeds without reference material rather than erroring out.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::budget::{self, format_number, BudgetPolicy, Selection};
use crate::config::{AssemblyConfig, Config};
use crate::db;
use crate::models::{AssembledContext, ReferenceDocument, Scope};
use crate::store::sqlite::SqliteStore;
use crate::store::{DocumentFilter, DocumentStore, SettingsStore, StoreError};

/// Assembly tuning, usually taken from `[assembly]` config.
#[derive(Debug, Clone, Copy)]
pub struct AssemblerOptions {
    /// Budget when neither a per-function setting nor a caller override
    /// supplies one.
    pub default_max_tokens: i64,
    pub min_partial_tokens: i64,
    pub chars_per_token: f64,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        AssemblerOptions {
            default_max_tokens: 200_000,
            min_partial_tokens: 1_000,
            chars_per_token: 3.5,
        }
    }
}

impl From<&AssemblyConfig> for AssemblerOptions {
    fn from(cfg: &AssemblyConfig) -> Self {
        AssemblerOptions {
            default_max_tokens: cfg.default_max_tokens,
            min_partial_tokens: cfg.min_partial_tokens,
            chars_per_token: cfg.chars_per_token,
        }
    }
}

/// Assembles prompt context from the document and settings stores.
pub struct ContextAssembler {
    documents: Arc<dyn DocumentStore>,
    settings: Arc<dyn SettingsStore>,
    options: AssemblerOptions,
}

impl ContextAssembler {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        settings: Arc<dyn SettingsStore>,
        options: AssemblerOptions,
    ) -> Self {
        ContextAssembler {
            documents,
            settings,
            options,
        }
    }

    /// Assemble context for `function`. `entity` additionally pulls in
    /// entity-scoped documents matching the name; `max_tokens_override`
    /// wins over the function's stored token setting.
    ///
    /// Infallible by contract: failures are logged and collapse to
    /// [`AssembledContext::empty`].
    pub async fn assemble(
        &self,
        function: &str,
        entity: Option<&str>,
        max_tokens_override: Option<i64>,
    ) -> AssembledContext {
        match self.try_assemble(function, entity, max_tokens_override).await {
            Ok(assembled) => assembled,
            Err(err) => {
                warn!(function, error = %err, "context assembly failed, returning empty context");
                AssembledContext::empty()
            }
        }
    }

    async fn try_assemble(
        &self,
        function: &str,
        entity: Option<&str>,
        max_tokens_override: Option<i64>,
    ) -> Result<AssembledContext, StoreError> {
        let use_kb_key = format!("{}_use_kb", function);
        let tokens_key = format!("{}_tokens", function);
        let (use_kb, tokens_raw) = tokio::try_join!(
            self.settings.get(&use_kb_key),
            self.settings.get(&tokens_key)
        )?;

        // Only the exact string "false" disables; absent means enabled.
        if use_kb.as_deref() == Some("false") {
            info!(function, "knowledge base disabled, returning empty context");
            return Ok(AssembledContext::empty());
        }

        let configured_tokens = match tokens_raw {
            Some(raw) => Some(raw.trim().parse::<i64>().map_err(|_| {
                StoreError::Malformed(format!(
                    "setting '{}' is not an integer: '{}'",
                    tokens_key, raw
                ))
            })?),
            None => None,
        };
        let max_tokens = max_tokens_override
            .or(configured_tokens)
            .unwrap_or(self.options.default_max_tokens);
        if max_tokens <= 0 {
            return Err(StoreError::Malformed(format!(
                "token budget for '{}' resolved to {}, must be positive",
                function, max_tokens
            )));
        }

        // The three tier fetches are independent; order is imposed at
        // concatenation, not at fetch. The filters must outlive the
        // borrowing futures, so they are bound before the join.
        let system_filter = DocumentFilter::scope(Scope::System);
        let global_filter = DocumentFilter::scope(Scope::Global);
        let entity_filter = entity.map(DocumentFilter::entity);
        let (system_docs, global_docs, entity_docs) = tokio::try_join!(
            self.documents.list(&system_filter),
            self.documents.list(&global_filter),
            async {
                match &entity_filter {
                    Some(filter) => self.documents.list(filter).await,
                    None => Ok(Vec::new()),
                }
            },
        )?;

        let candidates: Vec<ReferenceDocument> = system_docs
            .into_iter()
            .chain(global_docs)
            .chain(entity_docs)
            .filter(|doc| !doc.content.trim().is_empty())
            .collect();

        if candidates.is_empty() {
            info!(function, "no reference documents found");
            return Ok(AssembledContext::empty());
        }

        let candidate_count = candidates.len();
        let policy = BudgetPolicy {
            min_partial_tokens: self.options.min_partial_tokens,
            chars_per_token: self.options.chars_per_token,
        };
        let selection = budget::select_within_budget(candidates, max_tokens, &policy);
        let context = format_context(&selection);

        info!(
            function,
            loaded = selection.docs.len(),
            candidates = candidate_count,
            tokens = selection.total_tokens,
            limit = max_tokens,
            "assembled context"
        );

        Ok(AssembledContext {
            context,
            token_count: selection.total_tokens,
            docs_loaded: selection.docs.len(),
        })
    }
}

/// Render a selection as the final context blob: an optional truncation
/// banner, then one delimited block per document.
fn format_context(selection: &Selection) -> String {
    let mut context = String::new();

    if !selection.warnings.is_empty() {
        context.push_str(&format!(
            "[Document Loading Info: Some documents are shown partially due to size: {}]\n\n",
            selection.warnings.join(", ")
        ));
    }

    let blocks: Vec<String> = selection
        .docs
        .iter()
        .map(|doc| {
            let page_info = match doc.page_count {
                Some(pages) if pages > 0 => format!(
                    " (~{} pages, {} tokens)",
                    format_number(pages),
                    format_number(doc.tokens)
                ),
                _ => String::new(),
            };
            format!("\n=== {}{} ===\n{}\n", doc.title, page_info, doc.content)
        })
        .collect();
    context.push_str(&blocks.join("\n\n"));

    context
}

/// `assemble` command: run the assembler against the configured
/// database and print the context blob to stdout.
pub async fn run_assemble(
    config: &Config,
    function: &str,
    entity: Option<&str>,
    max_tokens: Option<i64>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = Arc::new(SqliteStore::new(pool.clone()));
    let assembler = ContextAssembler::new(
        store.clone(),
        store,
        AssemblerOptions::from(&config.assembly),
    );
    let assembled = assembler.assemble(function, entity, max_tokens).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&assembled)?);
    } else {
        if !quiet && !assembled.context.is_empty() {
            println!("{}", assembled.context);
        }
        eprintln!(
            "assembled {} document(s), ~{} tokens",
            assembled.docs_loaded,
            format_number(assembled.token_count)
        );
    }

    pool.close().await;
    Ok(())
}
