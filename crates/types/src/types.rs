//! Core type definitions shared by the client engine.
//!
//! - Schema identifier types (DatabaseId, TableId, QuorumId)
//! - Read consistency levels
//! - Batch modes
//! - Scan direction

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Identifier Types
// ============================================================================

/// Generates a newtype wrapper around a numeric type for type-safe identifiers.
///
/// Each generated type provides:
/// - Standard derives: Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord
/// - Serde with `#[serde(transparent)]` for wire format compatibility
/// - `From<inner>` and `Into<inner>` conversions
/// - `Display` with a semantic prefix (e.g., `table:12`)
/// - `new()` constructor and `value()` accessor
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident, $inner:ty, $prefix:expr
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Creates a new identifier from a raw value.
            #[inline]
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            /// Returns the raw numeric value.
            #[inline]
            pub const fn value(self) -> $inner {
                self.0
            }
        }

        impl From<$inner> for $name {
            #[inline]
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl From<$name> for $inner {
            #[inline]
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", $prefix, self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = <$inner as std::str::FromStr>::Err;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                s.parse::<$inner>().map(Self)
            }
        }
    };
}

define_id!(
    /// Identifier of a database in the cluster schema.
    ///
    /// # Display
    ///
    /// Formats with `db:` prefix: `db:3`.
    DatabaseId, u64, "db"
);

define_id!(
    /// Identifier of a table within a database.
    ///
    /// # Display
    ///
    /// Formats with `table:` prefix: `table:12`.
    TableId, u64, "table"
);

define_id!(
    /// Identifier of a quorum (replica group) owning table shards.
    ///
    /// # Display
    ///
    /// Formats with `quorum:` prefix: `quorum:1`.
    QuorumId, u64, "quorum"
);

// ============================================================================
// Read consistency
// ============================================================================

/// Consistency level applied to reads.
///
/// The level is captured when a read is appended to a batch, so changing it
/// never affects reads that are already batched or in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ConsistencyLevel {
    /// Any replica may answer. Fastest, may be stale.
    Any = 0,
    /// The server uses the client's write sequence marker so a reader always
    /// observes at least its own prior writes, even when served by a replica.
    ReadYourWrites = 1,
    /// Routed to the primary of the owning replica group. Always fresh.
    #[default]
    Strict = 2,
}

impl ConsistencyLevel {
    /// Returns the numeric level used by the wire protocol.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a numeric level, returning `None` for illegal values.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Any),
            1 => Some(Self::ReadYourWrites),
            2 => Some(Self::Strict),
            _ => None,
        }
    }

    /// Returns true if reads at this level must be served by a primary.
    #[must_use]
    pub const fn requires_primary(self) -> bool {
        matches!(self, Self::Strict)
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::ReadYourWrites => write!(f, "read_your_writes"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

// ============================================================================
// Batch mode
// ============================================================================

/// Governs when appended operations are flushed to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Flush automatically when the byte limit would be exceeded.
    #[default]
    Default,
    /// Refuse appends that would exceed the byte limit.
    NoAutoSubmit,
    /// Bypass batching: every operation is submitted alone and synchronously.
    Single,
}

impl fmt::Display for BatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::NoAutoSubmit => write!(f, "no_auto_submit"),
            Self::Single => write!(f, "single"),
        }
    }
}

// ============================================================================
// Scan direction
// ============================================================================

/// Direction of a range scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Ascending byte order.
    #[default]
    Forward,
    /// Descending byte order.
    Backward,
}

impl Direction {
    /// Returns true for [`Direction::Forward`].
    #[must_use]
    pub const fn is_forward(self) -> bool {
        matches!(self, Self::Forward)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_prefixes() {
        assert_eq!(DatabaseId::new(3).to_string(), "db:3");
        assert_eq!(TableId::new(12).to_string(), "table:12");
        assert_eq!(QuorumId::new(1).to_string(), "quorum:1");
    }

    #[test]
    fn test_id_from_str() {
        let id: TableId = "42".parse().unwrap();
        assert_eq!(id.value(), 42);
        assert!("x".parse::<TableId>().is_err());
    }

    #[test]
    fn test_id_serde_transparent() {
        let json = serde_json::to_string(&TableId::new(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn test_consistency_default_is_strict() {
        assert_eq!(ConsistencyLevel::default(), ConsistencyLevel::Strict);
        assert!(ConsistencyLevel::Strict.requires_primary());
        assert!(!ConsistencyLevel::Any.requires_primary());
    }

    #[test]
    fn test_consistency_numeric_roundtrip_and_illegal() {
        for level in
            [ConsistencyLevel::Any, ConsistencyLevel::ReadYourWrites, ConsistencyLevel::Strict]
        {
            assert_eq!(ConsistencyLevel::from_u8(level.as_u8()), Some(level));
        }
        assert_eq!(ConsistencyLevel::from_u8(3), None);
    }

    #[test]
    fn test_batch_mode_default() {
        assert_eq!(BatchMode::default(), BatchMode::Default);
        assert_eq!(BatchMode::NoAutoSubmit.to_string(), "no_auto_submit");
    }

    #[test]
    fn test_direction_default_forward() {
        assert!(Direction::default().is_forward());
        assert!(!Direction::Backward.is_forward());
    }
}
