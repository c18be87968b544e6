use std::sync::Arc;

use crate::cursor::StateIterator;
use crate::error::StoreResult;

/// Version stamp of a stored value: the store sequence number of the write
/// that produced it.
pub type Version = u64;

/// A stored value together with its version stamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Versioned {
    pub value: Vec<u8>,
    pub version: Version,
}

/// Result of a conditional write or delete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CasOutcome {
    /// The condition held and the mutation was applied.
    Applied,
    /// The key's version did not match; nothing changed.
    Conflict { current: Option<Version> },
}

impl CasOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Key-value world state holding ledger records.
///
/// All implementations must satisfy these invariants:
/// - Single-key operations are atomic with respect to each other.
/// - Versions are drawn from one store-wide, strictly increasing sequence, so
///   a key that is deleted and written again never repeats a version.
/// - Range scans are ordered by key. `start` is inclusive and `end` is
///   exclusive; an empty bound is open, so `range("", "")` covers the whole
///   namespace.
/// - The store never interprets values.
/// - Errors are propagated, never retried.
pub trait WorldState: Send + Sync {
    /// Read the value stored at `key` along with its version stamp.
    ///
    /// Returns `Ok(None)` if the key was never written or has been deleted.
    fn get_versioned(&self, key: &str) -> StoreResult<Option<Versioned>>;

    /// Create or overwrite the value at `key`.
    fn put_state(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Remove `key`. Deleting an absent key is a no-op.
    fn delete_state(&self, key: &str) -> StoreResult<()>;

    /// Open an ordered scan over `[start, end)`.
    fn range(&self, start: &str, end: &str) -> StoreResult<StateIterator>;

    /// Write `value` only if the key's current version equals `expected`.
    ///
    /// `expected == None` means the key must currently be absent.
    fn put_if_version(
        &self,
        key: &str,
        expected: Option<Version>,
        value: &[u8],
    ) -> StoreResult<CasOutcome>;

    /// Delete `key` only if its current version equals `expected`.
    fn delete_if_version(&self, key: &str, expected: Option<Version>) -> StoreResult<CasOutcome>;

    /// Read the value stored at `key`.
    fn get_state(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.get_versioned(key)?.map(|v| v.value))
    }
}

impl<T: WorldState + ?Sized> WorldState for Arc<T> {
    fn get_versioned(&self, key: &str) -> StoreResult<Option<Versioned>> {
        (**self).get_versioned(key)
    }

    fn put_state(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        (**self).put_state(key, value)
    }

    fn delete_state(&self, key: &str) -> StoreResult<()> {
        (**self).delete_state(key)
    }

    fn range(&self, start: &str, end: &str) -> StoreResult<StateIterator> {
        (**self).range(start, end)
    }

    fn put_if_version(
        &self,
        key: &str,
        expected: Option<Version>,
        value: &[u8],
    ) -> StoreResult<CasOutcome> {
        (**self).put_if_version(key, expected, value)
    }

    fn delete_if_version(&self, key: &str, expected: Option<Version>) -> StoreResult<CasOutcome> {
        (**self).delete_if_version(key, expected)
    }

    fn get_state(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get_state(key)
    }
}
