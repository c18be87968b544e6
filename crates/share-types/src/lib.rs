//! Foundation types for the share ledger.
//!
//! This crate defines the single entity the ledger tracks, the [`Share`], and
//! the exact JSON layout it is persisted in. Every other crate in the
//! workspace depends on `share-types`.
//!
//! # Key Types
//!
//! - [`Share`] -- one ownership unit with its current owner and owner history
//! - [`DocType`] -- record-kind tag written alongside every share
//! - [`ShareRecord`] -- a decoded share, or the raw text of a value that is not one
//! - [`LedgerEntry`] -- `{Key, Record}` pair produced by full enumeration

pub mod error;
pub mod record;
pub mod share;

pub use error::TypeError;
pub use record::{LedgerEntry, ShareRecord};
pub use share::{validate_share_id, DocType, Share, RESERVED_KEY_PREFIX};

/// Identity of the default issuer of new shares.
pub const DEFAULT_ISSUER: &str = "Enterprise";

/// Price assigned to newly issued shares.
pub const DEFAULT_PRICE: u64 = 1000;
