use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::StoreResult;

/// One `(key, value)` pair yielded by a range scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Counts the scan cursors a backend currently has open.
#[derive(Clone, Debug, Default)]
pub struct CursorTracker {
    open: Arc<AtomicUsize>,
}

impl CursorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new cursor. The registration ends when the guard drops.
    pub fn open(&self) -> CursorGuard {
        self.open.fetch_add(1, Ordering::AcqRel);
        CursorGuard {
            open: Arc::clone(&self.open),
        }
    }

    /// Number of cursors not yet released.
    pub fn open_count(&self) -> usize {
        self.open.load(Ordering::Acquire)
    }
}

/// Live registration of one scan cursor.
#[derive(Debug)]
pub struct CursorGuard {
    open: Arc<AtomicUsize>,
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::AcqRel);
    }
}

type Entries = Box<dyn Iterator<Item = StoreResult<KeyValue>> + Send>;

/// Lazy, key-ordered result of [`WorldState::range`](crate::WorldState::range).
///
/// The iterator holds a cursor registration. It is released as soon as the
/// iterator yields `None`, when [`StateIterator::close`] is called, or when
/// the iterator is dropped, whichever happens first. After release the
/// iterator yields nothing.
pub struct StateIterator {
    entries: Entries,
    guard: Option<CursorGuard>,
}

impl StateIterator {
    pub fn new<I>(entries: I, guard: CursorGuard) -> Self
    where
        I: Iterator<Item = StoreResult<KeyValue>> + Send + 'static,
    {
        Self {
            entries: Box::new(entries),
            guard: Some(guard),
        }
    }

    /// Iterator over an already materialized snapshot.
    pub fn from_snapshot(snapshot: Vec<KeyValue>, guard: CursorGuard) -> Self {
        Self::new(snapshot.into_iter().map(Ok), guard)
    }

    /// Release the cursor without draining the remaining entries.
    pub fn close(mut self) {
        self.guard.take();
    }

    /// Returns `true` once the cursor has been released.
    pub fn is_closed(&self) -> bool {
        self.guard.is_none()
    }
}

impl Iterator for StateIterator {
    type Item = StoreResult<KeyValue>;

    fn next(&mut self) -> Option<Self::Item> {
        self.guard.as_ref()?;
        let next = self.entries.next();
        if next.is_none() {
            self.guard.take();
        }
        next
    }
}

impl fmt::Debug for StateIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateIterator")
            .field("closed", &self.is_closed())
            .finish()
    }
}
