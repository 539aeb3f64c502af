//! Optimistic concurrency tokens.

use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// Opaque per-document revision token, rendered as `{generation}-{tag}`.
///
/// Every successful write produces a new revision. Updates must present the
/// revision they read; a mismatch means someone else wrote in between.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision {
    generation: u64,
    tag: Uuid,
}

impl Revision {
    /// Revision assigned on document creation.
    pub fn initial() -> Self {
        Self {
            generation: 1,
            tag: Uuid::now_v7(),
        }
    }

    /// Revision following this one.
    pub fn next(&self) -> Self {
        Self {
            generation: self.generation + 1,
            tag: Uuid::now_v7(),
        }
    }

    /// Number of writes the document has seen.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Check a caller-presented revision against the stored one.
    pub fn check(&self, presented: &Revision) -> DomainResult<()> {
        if self == presented {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "revision mismatch (expected: {self}, presented: {presented})"
            )))
        }
    }
}

impl core::fmt::Display for Revision {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}-{}", self.generation, self.tag.simple())
    }
}

impl FromStr for Revision {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (generation, tag) = s
            .split_once('-')
            .ok_or_else(|| DomainError::invalid_id(format!("malformed revision '{s}'")))?;
        let generation = generation
            .parse::<u64>()
            .map_err(|e| DomainError::invalid_id(format!("revision generation: {e}")))?;
        let tag = Uuid::from_str(tag)
            .map_err(|e| DomainError::invalid_id(format!("revision tag: {e}")))?;
        Ok(Self { generation, tag })
    }
}

impl Serialize for Revision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Revision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_revision_bumps_generation_and_changes_token() {
        let first = Revision::initial();
        let second = first.next();
        assert_eq!(first.generation(), 1);
        assert_eq!(second.generation(), 2);
        assert_ne!(first, second);
    }

    #[test]
    fn stale_revision_fails_check() {
        let first = Revision::initial();
        let second = first.next();
        assert!(second.check(&second.clone()).is_ok());
        assert!(matches!(second.check(&first), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn textual_form_parses_back() {
        let rev = Revision::initial().next().next();
        let parsed: Revision = rev.to_string().parse().unwrap();
        assert_eq!(parsed, rev);
    }
}
