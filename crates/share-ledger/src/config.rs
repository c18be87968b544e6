use std::path::Path;

use serde::{Deserialize, Serialize};
use share_types::{DEFAULT_ISSUER, DEFAULT_PRICE};

use crate::error::{LedgerError, LedgerResult};

/// What `CreateShare` does when the id is already taken.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatePolicy {
    /// Replace the existing record without checking for it.
    #[default]
    Overwrite,
    /// Fail with `AlreadyExists`.
    RejectExisting,
}

/// Checks applied to the new owner of a transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferPolicy {
    /// Reject an empty or whitespace-only new owner.
    pub require_owner: bool,
    /// Reject a transfer to the share's current owner.
    pub reject_self_transfer: bool,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self {
            require_owner: true,
            reject_self_transfer: false,
        }
    }
}

/// How read-modify-write operations are made safe against concurrent callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConcurrencyMode {
    /// Plain read then write. Isolation is left to the store; on a store
    /// without serializable transactions a concurrent transfer can be lost.
    Substrate,
    /// Commit with a version-stamped compare-and-swap and re-read on
    /// conflict, up to `max_attempts` times.
    CompareAndSwap { max_attempts: u32 },
}

impl Default for ConcurrencyMode {
    fn default() -> Self {
        Self::CompareAndSwap { max_attempts: 3 }
    }
}

/// Configuration for a [`ShareLedger`](crate::ShareLedger).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Owner of newly created shares and the only owner allowed to delete.
    pub issuer: String,
    /// Price assigned by `CreateShare`.
    pub default_price: u64,
    pub create_policy: CreatePolicy,
    pub transfer_policy: TransferPolicy,
    pub concurrency: ConcurrencyMode,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            default_price: DEFAULT_PRICE,
            create_policy: CreatePolicy::default(),
            transfer_policy: TransferPolicy::default(),
            concurrency: ConcurrencyMode::default(),
        }
    }
}

impl LedgerConfig {
    /// Every check enabled: unique ids on create, no empty or self transfers.
    pub fn strict() -> Self {
        Self {
            create_policy: CreatePolicy::RejectExisting,
            transfer_policy: TransferPolicy {
                require_owner: true,
                reject_self_transfer: true,
            },
            ..Default::default()
        }
    }

    /// Parse a TOML document. Missing keys take their default values.
    pub fn from_toml_str(source: &str) -> LedgerResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> LedgerResult<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> LedgerResult<String> {
        toml::to_string(self).map_err(|e| LedgerError::Config(e.to_string()))
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.issuer.trim().is_empty() {
            return Err(LedgerError::Config("issuer must not be empty".into()));
        }
        if let ConcurrencyMode::CompareAndSwap { max_attempts: 0 } = self.concurrency {
            return Err(LedgerError::Config(
                "compare_and_swap needs max_attempts >= 1".into(),
            ));
        }
        Ok(())
    }
}
