//! Remote status codes and their classification.
//!
//! Values are fixed for compatibility with every client built against this
//! protocol family. Codes are organized into ranges:
//!
//! | Range      | Class        | Codes                                              |
//! |------------|--------------|----------------------------------------------------|
//! | 0          | Success      | `SUCCESS`                                          |
//! | -1         | Precondition | `API_ERROR`                                        |
//! | -101..-199 | Transport    | `PARTIAL`, `FAILURE`                               |
//! | -201..-299 | Connectivity | `NOMASTER`, `NOCONNECTION`, `NOPRIMARY`            |
//! | -301..-399 | Timeout      | `MASTER_TIMEOUT`, `GLOBAL_TIMEOUT`, `PRIMARY_TIMEOUT` |
//! | -401..-499 | Command      | `NOSERVICE`, `FAILED`, `BADSCHEMA`                 |

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name rendered for numeric codes outside the catalog.
pub const UNKNOWN_STATUS_NAME: &str = "SDBP_UNKNOWN_STATUS";

/// Status code reported by the remote store or by the local engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum StatusCode {
    /// Operation completed.
    Success = 0,
    /// Local misuse, e.g. batch limit exceeded.
    ApiError = -1,
    /// Only part of a batch could be sent before timeout.
    Partial = -101,
    /// None of a batch could be sent.
    Failure = -102,
    /// No cluster master found.
    NoMaster = -201,
    /// Cluster unreachable.
    NoConnection = -202,
    /// No primary found for a replica group.
    NoPrimary = -203,
    /// Master-discovery timeout.
    MasterTimeout = -301,
    /// Overall call timeout.
    GlobalTimeout = -302,
    /// Primary-discovery timeout.
    PrimaryTimeout = -303,
    /// Command not executed by the remote store.
    NoService = -401,
    /// Command executed with a logical failure (key absent, test mismatch).
    Failed = -402,
    /// No database/table selected, or not found.
    BadSchema = -403,
}

/// Coarse classification of a [`StatusCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    /// The operation completed.
    Success,
    /// Local precondition violation; nothing was sent.
    Precondition,
    /// The batch could not be (fully) sent.
    Transport,
    /// The cluster, its master or a primary could not be reached.
    Connectivity,
    /// One of the timeout tiers expired.
    Timeout,
    /// Bytes were exchanged but the remote store rejected or failed the command.
    Command,
}

impl StatusCode {
    /// Returns the numeric code value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Converts a numeric code, returning `None` for values outside the catalog.
    #[must_use]
    pub const fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            -1 => Some(Self::ApiError),
            -101 => Some(Self::Partial),
            -102 => Some(Self::Failure),
            -201 => Some(Self::NoMaster),
            -202 => Some(Self::NoConnection),
            -203 => Some(Self::NoPrimary),
            -301 => Some(Self::MasterTimeout),
            -302 => Some(Self::GlobalTimeout),
            -303 => Some(Self::PrimaryTimeout),
            -401 => Some(Self::NoService),
            -402 => Some(Self::Failed),
            -403 => Some(Self::BadSchema),
            _ => None,
        }
    }

    /// Returns true for [`StatusCode::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true for every negative code.
    #[must_use]
    pub const fn is_error(self) -> bool {
        (self as i32) < 0
    }

    /// Classifies the code.
    #[must_use]
    pub const fn class(self) -> StatusClass {
        match self {
            Self::Success => StatusClass::Success,
            Self::ApiError => StatusClass::Precondition,
            Self::Partial | Self::Failure => StatusClass::Transport,
            Self::NoMaster | Self::NoConnection | Self::NoPrimary => StatusClass::Connectivity,
            Self::MasterTimeout | Self::GlobalTimeout | Self::PrimaryTimeout => StatusClass::Timeout,
            Self::NoService | Self::Failed | Self::BadSchema => StatusClass::Command,
        }
    }

    /// Returns the protocol name of the code, e.g. `SDBP_NOMASTER`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Success => "SDBP_SUCCESS",
            Self::ApiError => "SDBP_API_ERROR",
            Self::Partial => "SDBP_PARTIAL",
            Self::Failure => "SDBP_FAILURE",
            Self::NoMaster => "SDBP_NOMASTER",
            Self::NoConnection => "SDBP_NOCONNECTION",
            Self::NoPrimary => "SDBP_NOPRIMARY",
            Self::MasterTimeout => "SDBP_MASTER_TIMEOUT",
            Self::GlobalTimeout => "SDBP_GLOBAL_TIMEOUT",
            Self::PrimaryTimeout => "SDBP_PRIMARY_TIMEOUT",
            Self::NoService => "SDBP_NOSERVICE",
            Self::Failed => "SDBP_FAILED",
            Self::BadSchema => "SDBP_BADSCHEMA",
        }
    }

    /// Human-readable description, stable enough to show to operators.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Success => "operation completed",
            Self::ApiError => "the operation failed because of a client-side error",
            Self::Partial => "only part of the batch could be sent before a timeout",
            Self::Failure => "none of the batch could be sent",
            Self::NoMaster => "no master was found in the cluster",
            Self::NoConnection => "the cluster could not be reached",
            Self::NoPrimary => "no primary was found for one of the quorums",
            Self::MasterTimeout => "master discovery timed out",
            Self::GlobalTimeout => "the call timed out",
            Self::PrimaryTimeout => "primary discovery timed out",
            Self::NoService => "the command was not executed by the server",
            Self::Failed => "the command failed (key not found or test mismatch)",
            Self::BadSchema => "no database or table selected, or not found",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.name(), self.as_i32())
    }
}

/// Returns the protocol name for any numeric code, including unknown ones.
#[must_use]
pub fn status_name(code: i32) -> &'static str {
    StatusCode::from_i32(code).map_or(UNKNOWN_STATUS_NAME, StatusCode::name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const ALL: [StatusCode; 13] = [
        StatusCode::Success,
        StatusCode::ApiError,
        StatusCode::Partial,
        StatusCode::Failure,
        StatusCode::NoMaster,
        StatusCode::NoConnection,
        StatusCode::NoPrimary,
        StatusCode::MasterTimeout,
        StatusCode::GlobalTimeout,
        StatusCode::PrimaryTimeout,
        StatusCode::NoService,
        StatusCode::Failed,
        StatusCode::BadSchema,
    ];

    #[test]
    fn test_numeric_values_are_stable() {
        assert_eq!(StatusCode::Success.as_i32(), 0);
        assert_eq!(StatusCode::ApiError.as_i32(), -1);
        assert_eq!(StatusCode::Partial.as_i32(), -101);
        assert_eq!(StatusCode::Failure.as_i32(), -102);
        assert_eq!(StatusCode::NoMaster.as_i32(), -201);
        assert_eq!(StatusCode::NoConnection.as_i32(), -202);
        assert_eq!(StatusCode::NoPrimary.as_i32(), -203);
        assert_eq!(StatusCode::MasterTimeout.as_i32(), -301);
        assert_eq!(StatusCode::GlobalTimeout.as_i32(), -302);
        assert_eq!(StatusCode::PrimaryTimeout.as_i32(), -303);
        assert_eq!(StatusCode::NoService.as_i32(), -401);
        assert_eq!(StatusCode::Failed.as_i32(), -402);
        assert_eq!(StatusCode::BadSchema.as_i32(), -403);
    }

    #[test]
    fn test_from_i32_roundtrip() {
        for code in ALL {
            assert_eq!(StatusCode::from_i32(code.as_i32()), Some(code));
        }
        assert_eq!(StatusCode::from_i32(-999), None);
        assert_eq!(StatusCode::from_i32(1), None);
    }

    #[test]
    fn test_only_success_is_not_error() {
        for code in ALL {
            assert_eq!(code.is_error(), code != StatusCode::Success, "{code}");
        }
    }

    #[test]
    fn test_classification() {
        assert_eq!(StatusCode::ApiError.class(), StatusClass::Precondition);
        assert_eq!(StatusCode::Partial.class(), StatusClass::Transport);
        assert_eq!(StatusCode::NoPrimary.class(), StatusClass::Connectivity);
        assert_eq!(StatusCode::PrimaryTimeout.class(), StatusClass::Timeout);
        assert_eq!(StatusCode::BadSchema.class(), StatusClass::Command);
    }

    #[test]
    fn test_names_and_display() {
        assert_eq!(StatusCode::NoMaster.name(), "SDBP_NOMASTER");
        assert_eq!(StatusCode::Failed.to_string(), "SDBP_FAILED (code -402)");
        assert_eq!(status_name(-402), "SDBP_FAILED");
        assert_eq!(status_name(12345), UNKNOWN_STATUS_NAME);
    }

    #[test]
    fn test_every_code_has_message() {
        for code in ALL {
            assert!(!code.message().is_empty());
        }
    }
}
