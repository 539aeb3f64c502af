use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tally_core::{Document, DocumentId, DocumentKind, DocumentMeta, DomainError, DomainResult, UserId};

/// Document: a stocked product (reference data).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(flatten)]
    meta: DocumentMeta,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sku: Option<String>,
}

impl Product {
    pub fn new(
        id: DocumentId,
        name: impl Into<String>,
        sku: Option<String>,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if id.kind() != DocumentKind::Product {
            return Err(DomainError::invalid_id(format!("{id} is not a product id")));
        }
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name_required"));
        }
        Ok(Self {
            meta: DocumentMeta::new(id, actor, at),
            name,
            sku,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sku(&self) -> Option<&str> {
        self.sku.as_deref()
    }
}

impl Document for Product {
    const KIND: DocumentKind = DocumentKind::Product;

    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }
}
