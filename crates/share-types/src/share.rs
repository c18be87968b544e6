use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::TypeError;

/// Record-kind tag stored in the `docType` field.
///
/// The world state may one day hold other record kinds; the tag lets readers
/// tell shares apart from them. Records written before the tag existed decode
/// as [`DocType::Share`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocType {
    #[default]
    #[serde(rename = "share")]
    Share,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Share => "share",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tradable ownership unit.
///
/// Persisted as UTF-8 JSON with the field names `ID`, `Owner`, `Price`,
/// `prevOwners`, and `docType`. Those names are part of the stored format and
/// must not change.
///
/// `prev_owners` is append-only: [`Share::transfer_to`] is the only mutation
/// and it always pushes the departing owner before replacing it.
///
/// `Price` is any JSON number. Shares issued here always carry a whole
/// number, but records written by other clients may hold fractions and are
/// kept exactly as stored. Fields this type does not know about are carried
/// in `extra` and written back after the known ones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Owner")]
    pub owner: String,
    #[serde(rename = "Price")]
    pub price: Number,
    #[serde(rename = "prevOwners", default)]
    pub prev_owners: Vec<String>,
    #[serde(rename = "docType", default)]
    pub doc_type: DocType,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Share {
    /// A freshly issued share with no owner history.
    pub fn issue(id: impl Into<String>, owner: impl Into<String>, price: u64) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            price: Number::from(price),
            prev_owners: Vec::new(),
            doc_type: DocType::Share,
            extra: Map::new(),
        }
    }

    /// Hand the share to `new_owner`, recording the current owner in history.
    pub fn transfer_to(&mut self, new_owner: impl Into<String>) {
        let previous = std::mem::replace(&mut self.owner, new_owner.into());
        self.prev_owners.push(previous);
    }

    /// Returns `true` if `identity` is the current owner.
    pub fn is_owned_by(&self, identity: &str) -> bool {
        self.owner == identity
    }

    /// Number of completed transfers.
    pub fn transfer_count(&self) -> usize {
        self.prev_owners.len()
    }

    /// Serialize to the persisted JSON text.
    pub fn to_json(&self) -> Result<String, TypeError> {
        serde_json::to_string(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Serialize to the persisted byte form (UTF-8 JSON).
    pub fn to_bytes(&self) -> Result<Vec<u8>, TypeError> {
        serde_json::to_vec(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Decode a share from its persisted byte form.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        serde_json::from_slice(bytes).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}

/// First character of world-state keys that hold ledger bookkeeping rather
/// than shares. Share ids never start with it.
pub const RESERVED_KEY_PREFIX: char = '\u{0}';

/// Validate a share identifier.
///
/// The empty string is reserved: it doubles as the open bound of a range
/// scan, so a share stored under it could not be addressed reliably. Ids
/// starting with [`RESERVED_KEY_PREFIX`] would collide with bookkeeping keys.
pub fn validate_share_id(id: &str) -> Result<(), TypeError> {
    if id.is_empty() {
        return Err(TypeError::InvalidShareId {
            id: id.to_string(),
            reason: "share id must not be empty".into(),
        });
    }
    if id.starts_with(RESERVED_KEY_PREFIX) {
        return Err(TypeError::InvalidShareId {
            id: id.to_string(),
            reason: "share id must not start with a NUL character".into(),
        });
    }
    Ok(())
}
