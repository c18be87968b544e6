//! Share ledger service.
//!
//! Tracks ownership of tradable shares held in a key-value world state. This
//! crate provides:
//! - [`ShareLedger`], the state-transition logic: seed, create, read,
//!   existence check, transfer, issuer-gated delete, and full enumeration
//! - [`LedgerConfig`] with the create, transfer, and concurrency policies
//! - [`Invocation`], function-name dispatch for ledger-execution hosts
//!
//! The world state is injected; see `share-store` for the adapter trait and
//! the in-memory and file-backed implementations.
//!
//! # Quick Start
//!
//! ```rust
//! use share_ledger::ShareLedger;
//! use share_store::InMemoryWorldState;
//!
//! let ledger = ShareLedger::new(InMemoryWorldState::new());
//! ledger.init_ledger().unwrap();
//! ledger.transfer_share("0", "CEO").unwrap();
//! let share = ledger.share("0").unwrap();
//! assert_eq!(share.prev_owners, vec!["Enterprise"]);
//! ```

pub mod config;
pub mod error;
pub mod genesis;
pub mod invoke;
pub mod ledger;

#[cfg(test)]
mod testing;

pub use config::{ConcurrencyMode, CreatePolicy, LedgerConfig, TransferPolicy};
pub use error::{LedgerError, LedgerResult};
pub use invoke::Invocation;
pub use ledger::ShareLedger;
