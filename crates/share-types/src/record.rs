use serde::{Deserialize, Serialize};

use crate::share::Share;

/// A world-state value as seen by full enumeration.
///
/// Values that decode as a [`Share`] are returned structurally; anything
/// else (foreign record kinds, corrupt bytes) is carried as its raw text so
/// one bad value never aborts an enumeration. Serializes untagged: a share
/// renders as a JSON object, a raw value as a JSON string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShareRecord {
    Share(Share),
    Raw(String),
}

impl ShareRecord {
    /// Wrap undecodable bytes, replacing invalid UTF-8 sequences.
    pub fn raw(bytes: &[u8]) -> Self {
        Self::Raw(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn as_share(&self) -> Option<&Share> {
        match self {
            Self::Share(share) => Some(share),
            Self::Raw(_) => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }
}

/// One `{Key, Record}` row of a world-state enumeration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Record")]
    pub record: ShareRecord,
}

impl LedgerEntry {
    pub fn new(key: impl Into<String>, record: ShareRecord) -> Self {
        Self {
            key: key.into(),
            record,
        }
    }
}
