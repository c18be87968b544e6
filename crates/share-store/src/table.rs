//! Ordered, versioned key table shared by the in-memory and file backends.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::cursor::KeyValue;
use crate::error::{StoreError, StoreResult};
use crate::traits::{Version, Versioned};

#[derive(Debug)]
pub(crate) struct StateTable {
    entries: BTreeMap<String, Versioned>,
    next_version: Version,
}

impl Default for StateTable {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_version: 1,
        }
    }
}

impl StateTable {
    pub(crate) fn get(&self, key: &str) -> Option<&Versioned> {
        self.entries.get(key)
    }

    pub(crate) fn version_of(&self, key: &str) -> Option<Version> {
        self.entries.get(key).map(|v| v.version)
    }

    /// Sequence number the next mutation will take.
    pub(crate) fn next_version(&self) -> Version {
        self.next_version
    }

    pub(crate) fn put(&mut self, key: &str, value: Vec<u8>) -> Version {
        let version = self.take_version();
        self.entries
            .insert(key.to_string(), Versioned { value, version });
        version
    }

    pub(crate) fn delete(&mut self, key: &str) -> Version {
        let version = self.take_version();
        self.entries.remove(key);
        version
    }

    /// Re-apply a logged put at its recorded version.
    pub(crate) fn restore_put(&mut self, key: String, value: Vec<u8>, version: Version) {
        self.entries.insert(key, Versioned { value, version });
        self.next_version = self.next_version.max(version + 1);
    }

    /// Re-apply a logged delete at its recorded sequence number.
    pub(crate) fn restore_delete(&mut self, key: &str, sequence: Version) {
        self.entries.remove(key);
        self.advance_sequence(sequence);
    }

    /// Ensure the next mutation is numbered after `sequence`.
    pub(crate) fn advance_sequence(&mut self, sequence: Version) {
        self.next_version = self.next_version.max(sequence + 1);
    }

    /// Copy out every entry in `[start, end)`, empty bounds being open.
    pub(crate) fn snapshot_range(&self, start: &str, end: &str) -> StoreResult<Vec<KeyValue>> {
        check_range(start, end)?;
        let lower = if start.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Included(start)
        };
        let upper = if end.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(end)
        };
        Ok(self
            .entries
            .range::<str, _>((lower, upper))
            .map(|(key, v)| KeyValue::new(key.clone(), v.value.clone()))
            .collect())
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &Versioned)> {
        self.entries.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn take_version(&mut self) -> Version {
        let version = self.next_version;
        self.next_version += 1;
        version
    }
}

fn check_range(start: &str, end: &str) -> StoreResult<()> {
    if !start.is_empty() && !end.is_empty() && start > end {
        return Err(StoreError::InvalidRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok(())
}
