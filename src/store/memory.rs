//! In-memory store implementation.
//!
//! Backs the assembler in tests and in embedders that do not want a
//! SQLite file. Listing applies the same ordering contract as the
//! SQLite store: priority descending, then `created_at`, then id.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::models::ReferenceDocument;

use super::{DocumentFilter, DocumentStore, SettingsStore, StoreError};

pub struct MemoryStore {
    docs: RwLock<Vec<ReferenceDocument>>,
    settings: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            docs: RwLock::new(Vec::new()),
            settings: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, doc: ReferenceDocument) {
        self.docs.write().unwrap().push(doc);
    }

    pub fn set_setting(&self, key: &str, value: &str) {
        self.settings
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, filter: &DocumentFilter) -> Result<Vec<ReferenceDocument>, StoreError> {
        let docs = self.docs.read().unwrap();
        let mut matched: Vec<ReferenceDocument> = docs
            .iter()
            .filter(|d| d.scope == filter.scope)
            .filter(|d| match &filter.entity_name {
                Some(name) => d
                    .entity_name
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(name)),
                None => true,
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(matched)
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.settings.read().unwrap().get(key).cloned())
    }
}
