//! Core data models used throughout refpack.
//!
//! These types represent the reference documents, scopes, and assembled
//! context that flow through the loading and assembly pipeline.

use serde::Serialize;

/// Visibility tier of a reference document.
///
/// Tiers impose the concatenation order during assembly: `System`
/// documents come first, then `Global`, then `Entity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    System,
    Global,
    Entity,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::System => "system",
            Scope::Global => "global",
            Scope::Entity => "entity",
        }
    }

    pub fn parse(s: &str) -> Option<Scope> {
        match s {
            "system" => Some(Scope::System),
            "global" => Some(Scope::Global),
            "entity" => Some(Scope::Entity),
            _ => None,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A knowledge-base document stored in SQLite.
#[derive(Debug, Clone)]
pub struct ReferenceDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    pub scope: Scope,
    /// Entity qualifier; only meaningful for `Scope::Entity` documents.
    pub entity_name: Option<String>,
    pub priority: i64,
    /// Stored token estimate. Absent or non-positive values are ignored
    /// and the count is derived from content length instead.
    pub estimated_tokens: Option<i64>,
    /// Page count where the source format has pages (e.g. PDFs).
    pub page_count: Option<i64>,
    pub created_at: i64,
}

impl ReferenceDocument {
    /// Token count used for budgeting: the stored estimate when positive,
    /// otherwise derived from the content at `chars_per_token`.
    pub fn effective_tokens(&self, chars_per_token: f64) -> i64 {
        match self.estimated_tokens {
            Some(t) if t > 0 => t,
            _ => crate::budget::estimate_tokens(&self.content, chars_per_token),
        }
    }
}

/// Lightweight row for admin listings; omits the document body.
#[derive(Debug, Clone)]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    pub scope: Scope,
    pub entity_name: Option<String>,
    pub priority: i64,
    pub estimated_tokens: Option<i64>,
    pub page_count: Option<i64>,
    pub created_at: i64,
}

/// Result of a context assembly run.
///
/// `context` is the formatted text block ready for prompt injection,
/// `token_count` the estimated size of what was packed, and
/// `docs_loaded` how many documents contributed (fully or partially).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssembledContext {
    pub context: String,
    pub token_count: i64,
    pub docs_loaded: usize,
}

impl AssembledContext {
    pub fn empty() -> Self {
        AssembledContext {
            context: String::new(),
            token_count: 0,
            docs_loaded: 0,
        }
    }
}
