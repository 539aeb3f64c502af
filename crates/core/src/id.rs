//! Strongly-typed identifiers used across the domain.
//!
//! Every document lives in one tenant-partitioned keyspace and is addressed as
//! `{tenantId}:{kind}:{localId}`. The prefix doubles as the partition key and
//! the type discriminator.

use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a tenant (multi-tenant boundary).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

/// Identifier of a user (actor identity).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_newtype!(TenantId, "TenantId");
impl_uuid_newtype!(UserId, "UserId");

/// Document type discriminator (second segment of a [`DocumentId`]).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Account,
    Transaction,
    Category,
    Stock,
    Batch,
    Product,
    PurchaseOrder,
    ReceivingRecord,
    Supplier,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Account => "account",
            DocumentKind::Transaction => "transaction",
            DocumentKind::Category => "category",
            DocumentKind::Stock => "stock",
            DocumentKind::Batch => "batch",
            DocumentKind::Product => "product",
            DocumentKind::PurchaseOrder => "purchase_order",
            DocumentKind::ReceivingRecord => "receiving_record",
            DocumentKind::Supplier => "supplier",
        }
    }
}

impl core::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "account" => DocumentKind::Account,
            "transaction" => DocumentKind::Transaction,
            "category" => DocumentKind::Category,
            "stock" => DocumentKind::Stock,
            "batch" => DocumentKind::Batch,
            "product" => DocumentKind::Product,
            "purchase_order" => DocumentKind::PurchaseOrder,
            "receiving_record" => DocumentKind::ReceivingRecord,
            "supplier" => DocumentKind::Supplier,
            other => {
                return Err(DomainError::invalid_id(format!(
                    "unknown document kind '{other}'"
                )));
            }
        })
    }
}

/// Fully-qualified document identifier: `{tenantId}:{kind}:{localId}`.
///
/// The local id must be non-empty and may not contain `:`, so the textual form
/// always splits back into exactly three segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId {
    tenant_id: TenantId,
    kind: DocumentKind,
    local_id: String,
}

impl DocumentId {
    pub fn new(
        tenant_id: TenantId,
        kind: DocumentKind,
        local_id: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let local_id = local_id.into();
        if local_id.trim().is_empty() {
            return Err(DomainError::invalid_id(format!("{kind} id cannot be empty")));
        }
        if local_id.contains(':') {
            return Err(DomainError::invalid_id(format!(
                "{kind} id cannot contain ':' ({local_id})"
            )));
        }
        Ok(Self {
            tenant_id,
            kind,
            local_id,
        })
    }

    /// Generate a fresh, time-ordered local id.
    pub fn generate(tenant_id: TenantId, kind: DocumentKind) -> Self {
        Self {
            tenant_id,
            kind,
            local_id: Uuid::now_v7().simple().to_string(),
        }
    }

    /// Same tenant and local id under another kind (e.g. a product's stock document).
    pub fn with_kind(&self, kind: DocumentKind) -> Self {
        Self {
            tenant_id: self.tenant_id,
            kind,
            local_id: self.local_id.clone(),
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn belongs_to(&self, tenant_id: TenantId) -> bool {
        self.tenant_id == tenant_id
    }
}

impl core::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}:{}", self.tenant_id, self.kind, self.local_id)
    }
}

impl FromStr for DocumentId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (Some(tenant), Some(kind), Some(local)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(DomainError::invalid_id(format!("malformed document id '{s}'")));
        };
        DocumentId::new(tenant.parse()?, kind.parse()?, local)
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
