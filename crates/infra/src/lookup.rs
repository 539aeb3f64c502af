//! Reads performed before a saga starts writing.
//!
//! Everything here maps a missing document to [`OperationError::NotFound`]
//! with the resource name, and any other store failure to
//! [`OperationError::Unavailable`].

use tally_accounting::Category;
use tally_core::{Document, DocumentId, TenantId};
use tally_inventory::Product;
use tally_purchasing::Supplier;
use tally_store::{DocumentStore, DocumentStoreExt, StoreError};

use crate::error::{OperationError, OperationResult};

/// Load a document of `tenant_id`, reporting absence as `resource` not found.
///
/// Ids of another tenant or of another kind are reported as absent too.
pub fn load<D, S>(store: &S, tenant_id: TenantId, id: &DocumentId, resource: &str) -> OperationResult<D>
where
    D: Document,
    S: DocumentStore + ?Sized,
{
    if !id.belongs_to(tenant_id) || id.kind() != D::KIND {
        return Err(OperationError::not_found(resource));
    }
    store.fetch(id).map_err(|err| match err {
        StoreError::NotFound(_) => OperationError::not_found(resource),
        other => OperationError::Unavailable(other),
    })
}

/// Like [`load`] but absence is not an error.
pub fn load_optional<D, S>(store: &S, tenant_id: TenantId, id: &DocumentId) -> OperationResult<Option<D>>
where
    D: Document,
    S: DocumentStore + ?Sized,
{
    if !id.belongs_to(tenant_id) || id.kind() != D::KIND {
        return Ok(None);
    }
    Ok(store.fetch_optional(id)?)
}

/// Reference data consulted by the services.
pub trait ReferenceLookup {
    fn category(&self, tenant_id: TenantId, id: &DocumentId) -> OperationResult<Category>;

    fn product(&self, tenant_id: TenantId, id: &DocumentId) -> OperationResult<Product>;

    fn supplier(&self, tenant_id: TenantId, id: &DocumentId) -> OperationResult<Supplier>;
}

impl<S: DocumentStore + ?Sized> ReferenceLookup for S {
    fn category(&self, tenant_id: TenantId, id: &DocumentId) -> OperationResult<Category> {
        load(self, tenant_id, id, "category")
    }

    fn product(&self, tenant_id: TenantId, id: &DocumentId) -> OperationResult<Product> {
        load(self, tenant_id, id, "product")
    }

    fn supplier(&self, tenant_id: TenantId, id: &DocumentId) -> OperationResult<Supplier> {
        load(self, tenant_id, id, "supplier")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tally_accounting::CategoryType;
    use tally_core::{DocumentKind, UserId};
    use tally_store::{Fault, FaultOp, FaultyStore, InMemoryDocumentStore};

    #[test]
    fn lookups_are_tenant_scoped() {
        let store = InMemoryDocumentStore::new();
        let tenant = TenantId::new();
        let mut category = Category::new(
            DocumentId::generate(tenant, DocumentKind::Category),
            "Rent",
            CategoryType::Expense,
            UserId::new(),
            Utc::now(),
        )
        .unwrap();
        store.put(&mut category).unwrap();

        assert_eq!(store.category(tenant, category.id()).unwrap().name(), "Rent");
        assert_eq!(
            store.category(TenantId::new(), category.id()).unwrap_err(),
            OperationError::not_found("category")
        );
        assert_eq!(
            store.product(tenant, category.id()).unwrap_err(),
            OperationError::not_found("product")
        );
    }

    #[test]
    fn store_outage_is_unavailable() {
        let store = FaultyStore::new(InMemoryDocumentStore::new());
        store.inject(Fault::on(FaultOp::Get));
        let tenant = TenantId::new();
        let id = DocumentId::generate(tenant, DocumentKind::Supplier);
        assert!(matches!(
            store.supplier(tenant, &id),
            Err(OperationError::Unavailable(StoreError::Unavailable(_)))
        ));
    }
}
