use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tally_core::{Document, DocumentId, DocumentKind, DocumentMeta, DomainError, DomainResult, UserId};

/// Document: a supplier purchase orders are placed with (reference data).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    #[serde(flatten)]
    meta: DocumentMeta,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    contact: Option<String>,
}

impl Supplier {
    pub fn new(
        id: DocumentId,
        name: impl Into<String>,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if id.kind() != DocumentKind::Supplier {
            return Err(DomainError::invalid_id(format!("{id} is not a supplier id")));
        }
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name_required"));
        }
        Ok(Self {
            meta: DocumentMeta::new(id, actor, at),
            name,
            contact: None,
        })
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> Option<&str> {
        self.contact.as_deref()
    }
}

impl Document for Supplier {
    const KIND: DocumentKind = DocumentKind::Supplier;

    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }
}
