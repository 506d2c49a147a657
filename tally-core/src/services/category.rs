//! Category service - read-only listing

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::{Category, TransactionKind};

/// A category with its display label ("Parent" or "Parent > Child")
#[derive(Debug, Clone, Serialize)]
pub struct CategoryEntry {
    pub id: Uuid,
    pub label: String,
    pub kind: TransactionKind,
}

pub struct CategoryService {
    repository: Arc<DuckDbRepository>,
}

impl CategoryService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Categories of a user, sorted by kind then label
    pub fn list(&self, user_id: Uuid) -> Result<Vec<CategoryEntry>> {
        let categories = self.repository.get_categories(user_id)?;
        let names: HashMap<Uuid, &str> = categories.iter().map(|c| (c.id, c.name.as_str())).collect();

        let mut entries: Vec<CategoryEntry> = categories
            .iter()
            .map(|c| {
                let label = match c.parent_id.and_then(|id| names.get(&id)) {
                    Some(parent) => Category::label(parent, Some(&c.name)),
                    None => Category::label(&c.name, None),
                };
                CategoryEntry {
                    id: c.id,
                    label,
                    kind: c.kind,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.kind.as_str().cmp(b.kind.as_str()).then_with(|| a.label.cmp(&b.label)));
        Ok(entries)
    }
}
