//! Document envelope shared by every stored record.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::id::{DocumentId, DocumentKind, TenantId, UserId};
use crate::revision::Revision;

/// Bookkeeping fields carried by every document.
///
/// `kind` is duplicated from the id into an explicit `type` field so stores can
/// filter on it. The revision is owned by the store and is never part of the
/// serialized body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    pub id: DocumentId,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    #[serde(skip)]
    pub rev: Option<Revision>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: UserId,
    pub updated_by: UserId,
}

impl DocumentMeta {
    /// Metadata for a document that has not been written yet.
    pub fn new(id: DocumentId, actor: UserId, at: DateTime<Utc>) -> Self {
        Self {
            kind: id.kind(),
            id,
            rev: None,
            created_at: at,
            updated_at: at,
            created_by: actor,
            updated_by: actor,
        }
    }

    /// Stamp a mutation.
    pub fn touch(&mut self, actor: UserId, at: DateTime<Utc>) {
        self.updated_at = at;
        self.updated_by = actor;
    }

    pub fn tenant_id(&self) -> TenantId {
        self.id.tenant_id()
    }

    pub fn is_persisted(&self) -> bool {
        self.rev.is_some()
    }
}

/// A closed, explicitly-typed document record.
pub trait Document: Clone + core::fmt::Debug + Serialize + DeserializeOwned {
    /// Kind every instance of this type is stored under.
    const KIND: DocumentKind;

    fn meta(&self) -> &DocumentMeta;

    fn meta_mut(&mut self) -> &mut DocumentMeta;

    fn id(&self) -> &DocumentId {
        &self.meta().id
    }

    fn rev(&self) -> Option<&Revision> {
        self.meta().rev.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_is_not_serialized() {
        let id = DocumentId::generate(TenantId::new(), DocumentKind::Category);
        let mut meta = DocumentMeta::new(id, UserId::new(), Utc::now());
        meta.rev = Some(Revision::initial());

        let body = serde_json::to_value(&meta).unwrap();
        assert!(body.get("rev").is_none());
        assert_eq!(body["type"], "category");

        let back: DocumentMeta = serde_json::from_value(body).unwrap();
        assert!(back.rev.is_none());
        assert_eq!(back.id, meta.id);
    }

    #[test]
    fn touch_updates_only_mutation_stamp() {
        let actor = UserId::new();
        let editor = UserId::new();
        let created = Utc::now();
        let id = DocumentId::generate(TenantId::new(), DocumentKind::Account);
        let mut meta = DocumentMeta::new(id, actor, created);

        let later = created + chrono::Duration::seconds(5);
        meta.touch(editor, later);

        assert_eq!(meta.created_by, actor);
        assert_eq!(meta.created_at, created);
        assert_eq!(meta.updated_by, editor);
        assert_eq!(meta.updated_at, later);
    }
}
