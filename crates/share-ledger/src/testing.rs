//! World-state wrappers that inject failures and interleaved writes.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use share_store::{
    CasOutcome, CursorTracker, InMemoryWorldState, KeyValue, StateIterator, StoreError,
    StoreResult, Version, Versioned, WorldState,
};
use share_types::Share;

/// In-memory state that fails selected operations.
pub(crate) struct FaultyState {
    inner: InMemoryWorldState,
    puts_allowed: Option<usize>,
    puts_done: AtomicUsize,
    fail_reads: bool,
    fail_deletes: bool,
    scan_items_before_error: Option<usize>,
    cursors: CursorTracker,
}

impl FaultyState {
    pub(crate) fn new() -> Self {
        Self {
            inner: InMemoryWorldState::new(),
            puts_allowed: None,
            puts_done: AtomicUsize::new(0),
            fail_reads: false,
            fail_deletes: false,
            scan_items_before_error: None,
            cursors: CursorTracker::new(),
        }
    }

    /// Let `n` writes through, then fail every write.
    pub(crate) fn fail_puts_after(mut self, n: usize) -> Self {
        self.puts_allowed = Some(n);
        self
    }

    pub(crate) fn fail_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub(crate) fn fail_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    /// Range scans yield `n` entries and then an error.
    pub(crate) fn fail_scan_after(mut self, n: usize) -> Self {
        self.scan_items_before_error = Some(n);
        self
    }

    pub(crate) fn inner(&self) -> &InMemoryWorldState {
        &self.inner
    }

    pub(crate) fn open_cursors(&self) -> usize {
        self.cursors.open_count()
    }

    fn check_put(&self) -> StoreResult<()> {
        let done = self.puts_done.fetch_add(1, Ordering::SeqCst);
        match self.puts_allowed {
            Some(allowed) if done >= allowed => {
                Err(StoreError::Unavailable("injected write failure".into()))
            }
            _ => Ok(()),
        }
    }

    fn check_delete(&self) -> StoreResult<()> {
        if self.fail_deletes {
            return Err(StoreError::Unavailable("injected delete failure".into()));
        }
        Ok(())
    }

    fn check_read(&self) -> StoreResult<()> {
        if self.fail_reads {
            return Err(StoreError::Unavailable("injected read failure".into()));
        }
        Ok(())
    }
}

impl WorldState for FaultyState {
    fn get_versioned(&self, key: &str) -> StoreResult<Option<Versioned>> {
        self.check_read()?;
        self.inner.get_versioned(key)
    }

    fn put_state(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.check_put()?;
        self.inner.put_state(key, value)
    }

    fn delete_state(&self, key: &str) -> StoreResult<()> {
        self.check_delete()?;
        self.inner.delete_state(key)
    }

    fn range(&self, start: &str, end: &str) -> StoreResult<StateIterator> {
        let entries: Vec<KeyValue> = self.inner.range(start, end)?.collect::<StoreResult<_>>()?;
        let mut items: Vec<StoreResult<KeyValue>> = Vec::new();
        match self.scan_items_before_error {
            Some(n) => {
                items.extend(entries.into_iter().take(n).map(Ok));
                items.push(Err(StoreError::Unavailable("injected scan failure".into())));
            }
            None => items.extend(entries.into_iter().map(Ok)),
        }
        Ok(StateIterator::new(items.into_iter(), self.cursors.open()))
    }

    fn put_if_version(
        &self,
        key: &str,
        expected: Option<Version>,
        value: &[u8],
    ) -> StoreResult<CasOutcome> {
        self.check_put()?;
        self.inner.put_if_version(key, expected, value)
    }

    fn delete_if_version(&self, key: &str, expected: Option<Version>) -> StoreResult<CasOutcome> {
        self.check_delete()?;
        self.inner.delete_if_version(key, expected)
    }
}

/// In-memory state where a rival caller transfers one share immediately
/// before each of the next mutations, once armed.
pub(crate) struct RacingState {
    inner: InMemoryWorldState,
    id: String,
    rival: String,
    remaining: AtomicUsize,
    armed: AtomicBool,
}

impl RacingState {
    pub(crate) fn transferring(id: &str, rival: &str, times: usize) -> Self {
        Self {
            inner: InMemoryWorldState::new(),
            id: id.to_string(),
            rival: rival.to_string(),
            remaining: AtomicUsize::new(times),
            armed: AtomicBool::new(false),
        }
    }

    /// Start interleaving from the next mutation on.
    pub(crate) fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    fn race(&self) -> StoreResult<()> {
        if !self.armed.load(Ordering::SeqCst) {
            return Ok(());
        }
        let fire = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !fire {
            return Ok(());
        }
        if let Some(bytes) = self.inner.get_state(&self.id)? {
            let mut share =
                Share::from_slice(&bytes).map_err(|e| StoreError::Serialization(e.to_string()))?;
            share.transfer_to(self.rival.clone());
            let bytes = share
                .to_bytes()
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            self.inner.put_state(&self.id, &bytes)?;
        }
        Ok(())
    }
}

impl WorldState for RacingState {
    fn get_versioned(&self, key: &str) -> StoreResult<Option<Versioned>> {
        self.inner.get_versioned(key)
    }

    fn put_state(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.race()?;
        self.inner.put_state(key, value)
    }

    fn delete_state(&self, key: &str) -> StoreResult<()> {
        self.race()?;
        self.inner.delete_state(key)
    }

    fn range(&self, start: &str, end: &str) -> StoreResult<StateIterator> {
        self.inner.range(start, end)
    }

    fn put_if_version(
        &self,
        key: &str,
        expected: Option<Version>,
        value: &[u8],
    ) -> StoreResult<CasOutcome> {
        self.race()?;
        self.inner.put_if_version(key, expected, value)
    }

    fn delete_if_version(&self, key: &str, expected: Option<Version>) -> StoreResult<CasOutcome> {
        self.race()?;
        self.inner.delete_if_version(key, expected)
    }
}
