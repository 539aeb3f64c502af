//! Configuration loading and representation.

use serde::Deserialize;

/// Policy switches for the multi-document operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SagaConfig {
    /// Allow a transfer whose source and destination are the same account.
    pub allow_self_transfer: bool,
    /// Allow stock issues beyond the quantity on hand.
    pub allow_negative_stock: bool,
    /// Emit an audit record after each successful operation.
    pub audit_enabled: bool,
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            allow_self_transfer: false,
            allow_negative_stock: false,
            audit_enabled: true,
        }
    }
}

impl SagaConfig {
    pub const ALLOW_SELF_TRANSFER: &'static str = "TALLY_ALLOW_SELF_TRANSFER";
    pub const ALLOW_NEGATIVE_STOCK: &'static str = "TALLY_ALLOW_NEGATIVE_STOCK";
    pub const AUDIT_ENABLED: &'static str = "TALLY_AUDIT_ENABLED";

    /// Read the configuration from the process environment.
    ///
    /// Unset variables keep their defaults; unparsable ones are logged and
    /// ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| match lookup(key) {
            None => default,
            Some(raw) => parse_flag(&raw).unwrap_or_else(|| {
                tracing::warn!(key, value = %raw, default, "ignoring unparsable boolean setting");
                default
            }),
        };

        Self {
            allow_self_transfer: flag(Self::ALLOW_SELF_TRANSFER, defaults.allow_self_transfer),
            allow_negative_stock: flag(Self::ALLOW_NEGATIVE_STOCK, defaults.allow_negative_stock),
            audit_enabled: flag(Self::AUDIT_ENABLED, defaults.audit_enabled),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
