use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::cursor::{CursorTracker, StateIterator};
use crate::error::{StoreError, StoreResult};
use crate::table::StateTable;
use crate::traits::{CasOutcome, Version, Versioned, WorldState};

/// In-memory, `BTreeMap`-based world state.
///
/// Intended for tests and embedding. Values live behind a `RwLock`; range
/// scans copy the requested range out at open time, so a scan never blocks
/// writers and never observes a write made after it was opened.
pub struct InMemoryWorldState {
    table: RwLock<StateTable>,
    cursors: CursorTracker,
}

impl InMemoryWorldState {
    /// Create a new empty world state.
    pub fn new() -> Self {
        Self {
            table: RwLock::new(StateTable::default()),
            cursors: CursorTracker::new(),
        }
    }

    /// Number of live keys.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.len())
    }

    /// Returns `true` if no key is stored.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Sorted list of live keys.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.read()?.keys())
    }

    /// Number of range iterators that have not been released yet.
    pub fn open_cursors(&self) -> usize {
        self.cursors.open_count()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, StateTable>> {
        self.table.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, StateTable>> {
        self.table.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Default for InMemoryWorldState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldState for InMemoryWorldState {
    fn get_versioned(&self, key: &str) -> StoreResult<Option<Versioned>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn put_state(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let version = self.write()?.put(key, value.to_vec());
        debug!(key, version, len = value.len(), "state put");
        Ok(())
    }

    fn delete_state(&self, key: &str) -> StoreResult<()> {
        let mut table = self.write()?;
        if table.get(key).is_some() {
            let version = table.delete(key);
            debug!(key, version, "state delete");
        }
        Ok(())
    }

    fn range(&self, start: &str, end: &str) -> StoreResult<StateIterator> {
        let snapshot = self.read()?.snapshot_range(start, end)?;
        debug!(start, end, count = snapshot.len(), "range opened");
        Ok(StateIterator::from_snapshot(snapshot, self.cursors.open()))
    }

    fn put_if_version(
        &self,
        key: &str,
        expected: Option<Version>,
        value: &[u8],
    ) -> StoreResult<CasOutcome> {
        let mut table = self.write()?;
        let current = table.version_of(key);
        if current != expected {
            return Ok(CasOutcome::Conflict { current });
        }
        let version = table.put(key, value.to_vec());
        debug!(key, version, "state put (conditional)");
        Ok(CasOutcome::Applied)
    }

    fn delete_if_version(&self, key: &str, expected: Option<Version>) -> StoreResult<CasOutcome> {
        let mut table = self.write()?;
        let current = table.version_of(key);
        if current != expected {
            return Ok(CasOutcome::Conflict { current });
        }
        if current.is_some() {
            let version = table.delete(key);
            debug!(key, version, "state delete (conditional)");
        }
        Ok(CasOutcome::Applied)
    }
}

impl std::fmt::Debug for InMemoryWorldState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len().unwrap_or_default();
        f.debug_struct("InMemoryWorldState")
            .field("key_count", &count)
            .field("open_cursors", &self.open_cursors())
            .finish()
    }
}
