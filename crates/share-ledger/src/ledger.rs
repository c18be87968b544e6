use share_store::{CasOutcome, Version, WorldState};
use share_types::{
    validate_share_id, LedgerEntry, Share, ShareRecord, TypeError, RESERVED_KEY_PREFIX,
};
use tracing::{debug, info, warn};

use crate::config::{ConcurrencyMode, CreatePolicy, LedgerConfig};
use crate::error::{LedgerError, LedgerResult};
use crate::genesis;

/// Lower bound of share enumeration: every share id sorts at or above it,
/// every reserved bookkeeping key sorts below.
const SHARE_SCAN_START: &str = "\u{1}";

/// The share ledger service.
///
/// Owns no share state of its own: every operation reads what it needs from
/// the injected [`WorldState`], validates, and writes back. Concurrent
/// callers are safe as long as the store is; read-modify-write operations
/// follow the configured [`ConcurrencyMode`].
pub struct ShareLedger<S> {
    state: S,
    config: LedgerConfig,
}

impl<S: WorldState> ShareLedger<S> {
    /// A ledger over `state` with the default configuration.
    pub fn new(state: S) -> Self {
        Self {
            state,
            config: LedgerConfig::default(),
        }
    }

    /// A ledger over `state` with a validated configuration.
    pub fn with_config(state: S, config: LedgerConfig) -> LedgerResult<Self> {
        config.validate()?;
        Ok(Self { state, config })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn into_state(self) -> S {
        self.state
    }

    // ---- Operations ----

    /// Write the five seed shares.
    ///
    /// Writes are sequential and not transactional: if one fails, the seed
    /// shares written before it stay in the world state.
    pub fn init_ledger(&self) -> LedgerResult<()> {
        for share in genesis::seed_shares() {
            self.state.put_state(&share.id, &encode(&share)?)?;
            info!(id = %share.id, owner = %share.owner, "share initialized");
        }
        Ok(())
    }

    /// Issue a new share owned by the issuer and return its serialized form.
    pub fn create_share(&self, id: &str) -> LedgerResult<String> {
        validate_share_id(id).map_err(|e| invalid_id(id, e))?;

        let share = Share::issue(id, self.config.issuer.as_str(), self.config.default_price);
        let json = share
            .to_json()
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;
        match self.config.create_policy {
            CreatePolicy::Overwrite => self.state.put_state(id, json.as_bytes())?,
            CreatePolicy::RejectExisting => self.insert_new(id, json.as_bytes())?,
        }

        info!(id, owner = %share.owner, price = %share.price, "share created");
        Ok(json)
    }

    /// The stored text of share `id`, without validating its structure.
    pub fn read_share(&self, id: &str) -> LedgerResult<String> {
        match self.state.get_state(id)? {
            Some(bytes) if !bytes.is_empty() => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            _ => Err(not_found(id)),
        }
    }

    /// Returns `true` if a non-empty value is stored at `id`.
    pub fn share_exists(&self, id: &str) -> LedgerResult<bool> {
        Ok(self
            .state
            .get_state(id)?
            .is_some_and(|bytes| !bytes.is_empty()))
    }

    /// Decoded share `id`.
    pub fn share(&self, id: &str) -> LedgerResult<Share> {
        self.load(id).map(|(share, _)| share)
    }

    /// Hand share `id` to `new_owner`, appending the current owner to its
    /// history.
    pub fn transfer_share(&self, id: &str, new_owner: &str) -> LedgerResult<()> {
        let share = self.update(id, |share| {
            self.check_transfer(share, new_owner)?;
            share.transfer_to(new_owner);
            Ok(())
        })?;

        info!(
            id,
            from = share.prev_owners.last().map(String::as_str).unwrap_or_default(),
            to = new_owner,
            transfers = share.transfer_count(),
            "share transferred"
        );
        Ok(())
    }

    /// Retire share `id`. Only allowed while the issuer owns it.
    ///
    /// The final state of the share is kept under a reserved retirement key,
    /// written before the share itself is removed. Under
    /// [`CreatePolicy::RejectExisting`] a retired id is never issued again.
    pub fn delete_share(&self, id: &str) -> LedgerResult<()> {
        if !self.share_exists(id)? {
            return Err(not_found(id));
        }

        match self.config.concurrency {
            ConcurrencyMode::Substrate => {
                let (share, _) = self.load(id)?;
                self.authorize_delete(&share)?;
                self.retire(id, &share)?;
                self.state.delete_state(id)?;
            }
            ConcurrencyMode::CompareAndSwap { max_attempts } => {
                self.delete_checked(id, max_attempts)?;
            }
        }

        info!(id, "share deleted");
        Ok(())
    }

    /// Every `{Key, Record}` pair in the world state, in key order.
    ///
    /// Values that are not shares come back as [`ShareRecord::Raw`] instead
    /// of failing the enumeration.
    pub fn get_all_shares(&self) -> LedgerResult<Vec<LedgerEntry>> {
        let mut entries = Vec::new();
        for item in self.state.range(SHARE_SCAN_START, "")? {
            let kv = item?;
            let record = match Share::from_slice(&kv.value) {
                Ok(share) => ShareRecord::Share(share),
                Err(e) => {
                    warn!(key = %kv.key, error = %e, "value is not a share; returning raw text");
                    ShareRecord::raw(&kv.value)
                }
            };
            entries.push(LedgerEntry::new(kv.key, record));
        }
        debug!(count = entries.len(), "enumerated world state");
        Ok(entries)
    }

    /// [`Self::get_all_shares`] rendered as a JSON array.
    pub fn get_all_shares_json(&self) -> LedgerResult<String> {
        let entries = self.get_all_shares()?;
        serde_json::to_string(&entries).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    // ---- Internals ----

    fn load(&self, id: &str) -> LedgerResult<(Share, Version)> {
        let stored = self
            .state
            .get_versioned(id)?
            .filter(|v| !v.value.is_empty())
            .ok_or_else(|| not_found(id))?;
        let share = Share::from_slice(&stored.value).map_err(|e| LedgerError::Codec {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
        Ok((share, stored.version))
    }

    /// Read, modify, and write back one share under the concurrency mode.
    fn update<F>(&self, id: &str, mut apply: F) -> LedgerResult<Share>
    where
        F: FnMut(&mut Share) -> LedgerResult<()>,
    {
        match self.config.concurrency {
            ConcurrencyMode::Substrate => {
                let (mut share, _) = self.load(id)?;
                apply(&mut share)?;
                self.state.put_state(id, &encode(&share)?)?;
                Ok(share)
            }
            ConcurrencyMode::CompareAndSwap { max_attempts } => {
                for attempt in 1..=max_attempts {
                    let (mut share, version) = self.load(id)?;
                    apply(&mut share)?;
                    match self.state.put_if_version(id, Some(version), &encode(&share)?)? {
                        CasOutcome::Applied => return Ok(share),
                        CasOutcome::Conflict { current } => {
                            debug!(id, attempt, expected = version, ?current, "share changed; retrying");
                        }
                    }
                }
                Err(LedgerError::Conflict {
                    id: id.to_string(),
                    attempts: max_attempts,
                })
            }
        }
    }

    fn delete_checked(&self, id: &str, max_attempts: u32) -> LedgerResult<()> {
        for attempt in 1..=max_attempts {
            let (share, version) = self.load(id)?;
            self.authorize_delete(&share)?;
            self.retire(id, &share)?;
            match self.state.delete_if_version(id, Some(version))? {
                CasOutcome::Applied => return Ok(()),
                CasOutcome::Conflict { current } => {
                    debug!(id, attempt, expected = version, ?current, "share changed; retrying delete");
                }
            }
        }
        Err(LedgerError::Conflict {
            id: id.to_string(),
            attempts: max_attempts,
        })
    }

    fn insert_new(&self, id: &str, value: &[u8]) -> LedgerResult<()> {
        let expected = match self.state.get_versioned(id)? {
            Some(v) if !v.value.is_empty() => return Err(already_exists(id)),
            Some(v) => Some(v.version),
            None => None,
        };
        if self.state.get_state(&retired_key(id))?.is_some() {
            return Err(LedgerError::Retired { id: id.to_string() });
        }
        match self.state.put_if_version(id, expected, value)? {
            CasOutcome::Applied => Ok(()),
            CasOutcome::Conflict { .. } => Err(already_exists(id)),
        }
    }

    fn retire(&self, id: &str, share: &Share) -> LedgerResult<()> {
        self.state.put_state(&retired_key(id), &encode(share)?)?;
        Ok(())
    }

    fn check_transfer(&self, share: &Share, new_owner: &str) -> LedgerResult<()> {
        let policy = &self.config.transfer_policy;
        if policy.require_owner && new_owner.trim().is_empty() {
            return Err(LedgerError::InvalidOwner {
                id: share.id.clone(),
                reason: "new owner must not be empty".into(),
            });
        }
        if policy.reject_self_transfer && share.is_owned_by(new_owner) {
            return Err(LedgerError::InvalidOwner {
                id: share.id.clone(),
                reason: format!("share is already owned by {new_owner}"),
            });
        }
        Ok(())
    }

    fn authorize_delete(&self, share: &Share) -> LedgerResult<()> {
        if !share.is_owned_by(&self.config.issuer) {
            return Err(LedgerError::Unauthorized {
                id: share.id.clone(),
                owner: share.owner.clone(),
                issuer: self.config.issuer.clone(),
            });
        }
        Ok(())
    }
}

fn encode(share: &Share) -> LedgerResult<Vec<u8>> {
    share
        .to_bytes()
        .map_err(|e| LedgerError::Serialization(e.to_string()))
}

/// Reserved key holding the last state of a deleted share.
fn retired_key(id: &str) -> String {
    format!("{RESERVED_KEY_PREFIX}retired{RESERVED_KEY_PREFIX}{id}")
}

fn not_found(id: &str) -> LedgerError {
    LedgerError::NotFound { id: id.to_string() }
}

fn already_exists(id: &str) -> LedgerError {
    LedgerError::AlreadyExists { id: id.to_string() }
}

fn invalid_id(id: &str, err: TypeError) -> LedgerError {
    let reason = match err {
        TypeError::InvalidShareId { reason, .. } => reason,
        other => other.to_string(),
    };
    LedgerError::InvalidShareId {
        id: id.to_string(),
        reason,
    }
}

impl<S> std::fmt::Debug for ShareLedger<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareLedger")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
