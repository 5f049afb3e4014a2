//! Storage abstraction for reference documents and admin settings.
//!
//! The assembler only ever reads; it talks to these two traits so that
//! production code can run against SQLite while tests run against the
//! in-memory store. Errors carry a coarse taxonomy: the caller treats
//! an unreachable store and a record it cannot decode the same way
//! (degrade to an empty context), so two variants are enough.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ReferenceDocument, Scope};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Which slice of the knowledge base to list.
#[derive(Debug, Clone)]
pub struct DocumentFilter {
    pub scope: Scope,
    /// Entity qualifier, matched ASCII case-insensitively. Only
    /// meaningful together with [`Scope::Entity`].
    pub entity_name: Option<String>,
}

impl DocumentFilter {
    pub fn scope(scope: Scope) -> Self {
        DocumentFilter {
            scope,
            entity_name: None,
        }
    }

    pub fn entity(name: &str) -> Self {
        DocumentFilter {
            scope: Scope::Entity,
            entity_name: Some(name.to_string()),
        }
    }
}

/// Read access to stored reference documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List documents matching `filter`, ordered by priority (highest
    /// first); ties resolve by `created_at`, then `id`, so that repeat
    /// listings are stable.
    async fn list(&self, filter: &DocumentFilter) -> Result<Vec<ReferenceDocument>, StoreError>;
}

/// Read access to admin settings. Values are stored as raw strings and
/// interpreted by the caller.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
}
