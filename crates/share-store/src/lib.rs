//! World-state adapter for the share ledger.
//!
//! This crate is the boundary between the ledger's transition logic and the
//! key-value substrate that actually holds records. It never interprets the
//! bytes it stores; decoding is the ledger's job.
//!
//! # Backends
//!
//! All backends implement the [`WorldState`] trait:
//!
//! - [`InMemoryWorldState`] -- `BTreeMap`-based store for tests and embedding
//! - [`FileWorldState`] -- single-node durable store replayed from a
//!   CRC-framed append log
//!
//! # Design Rules
//!
//! 1. Single-key reads, writes, and deletes are atomic.
//! 2. Every mutation takes the next value of a store-wide sequence; the
//!    sequence number is the key's version stamp.
//! 3. Range scans are ordered by key and hand out a [`StateIterator`] whose
//!    cursor registration is released on exhaustion, close, or drop.
//! 4. No retries. Every backend failure is returned to the caller.

pub mod cursor;
pub mod error;
pub mod file;
pub mod memory;
mod table;
pub mod traits;

pub use cursor::{CursorTracker, KeyValue, StateIterator};
pub use error::{StoreError, StoreResult};
pub use file::{FileStateConfig, FileWorldState, SyncMode};
pub use memory::InMemoryWorldState;
pub use traits::{CasOutcome, Version, Versioned, WorldState};
