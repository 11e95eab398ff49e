//! Keys and the client-side byte order.
//!
//! Every key is carried internally as one canonical byte sequence. Text and
//! raw-byte forms are accepted at the API boundary through [`Key`] and
//! converted once.
//!
//! [`ByteOrder`] is the only ordering used for client-side sorting. The
//! remote store returns range results in no particular order, so pages are
//! sorted locally before they are handed to callers.

use std::{borrow::Cow, cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

use crate::types::Direction;

/// A key accepted at the API boundary, in text or raw-byte form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// UTF-8 text key.
    Text(String),
    /// Raw byte key.
    Bytes(Vec<u8>),
}

impl Key {
    /// Returns the canonical byte representation.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }

    /// Consumes the key and returns its canonical bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.into_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }

    /// Returns the key length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns true for the empty key (an unbounded range endpoint).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Returns the key as text, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn to_text_lossy(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text),
            Self::Bytes(bytes) => String::from_utf8_lossy(bytes),
        }
    }
}

impl Default for Key {
    fn default() -> Self {
        Self::Bytes(Vec::new())
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text_lossy())
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for Key {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<Vec<u8>> for Key {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for Key {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Key {
    fn from(value: &[u8; N]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<&Key> for Key {
    fn from(value: &Key) -> Self {
        value.clone()
    }
}

/// Total order over byte sequences.
///
/// Unsigned-byte lexicographic comparison; when one sequence is a prefix of
/// the other, the shorter one sorts first.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteOrder;

impl ByteOrder {
    /// Compares two byte sequences.
    #[must_use]
    pub fn compare(a: &[u8], b: &[u8]) -> Ordering {
        for (x, y) in a.iter().zip(b) {
            match x.cmp(y) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        a.len().cmp(&b.len())
    }

    /// Compares two byte sequences as seen by a scan in `direction`.
    #[must_use]
    pub fn compare_directed(a: &[u8], b: &[u8], direction: Direction) -> Ordering {
        match direction {
            Direction::Forward => Self::compare(a, b),
            Direction::Backward => Self::compare(b, a),
        }
    }

    /// Sorts keys ascending for forward scans, descending for backward scans.
    pub fn sort_keys(keys: &mut [Vec<u8>], direction: Direction) {
        keys.sort_by(|a, b| Self::compare_directed(a, b, direction));
    }

    /// Sorts key-value pairs by key, in scan direction.
    pub fn sort_pairs(pairs: &mut [(Vec<u8>, Vec<u8>)], direction: Direction) {
        pairs.sort_by(|a, b| Self::compare_directed(&a.0, &b.0, direction));
    }
}
