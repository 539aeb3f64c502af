use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tally_core::{Document, DocumentId, DocumentKind, DocumentMeta, DomainError, DomainResult, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryType {
    Income,
    Expense,
    Transfer,
}

/// Document: classification attached to every ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(flatten)]
    meta: DocumentMeta,
    name: String,
    category_type: CategoryType,
}

impl Category {
    pub fn new(
        id: DocumentId,
        name: impl Into<String>,
        category_type: CategoryType,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if id.kind() != DocumentKind::Category {
            return Err(DomainError::invalid_id(format!("{id} is not a category id")));
        }
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name_required"));
        }
        Ok(Self {
            meta: DocumentMeta::new(id, actor, at),
            name,
            category_type,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category_type(&self) -> CategoryType {
        self.category_type
    }
}

impl Document for Category {
    const KIND: DocumentKind = DocumentKind::Category;

    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }
}
