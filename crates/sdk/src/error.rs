//! SDK error types with status classification.
//!
//! Provides a three-tier error model mirroring the remote status catalog:
//! - **Precondition errors**: batch limit exceeded, invalid configuration
//! - **Connectivity/timeout errors**: no master, no primary, timeout tiers
//! - **Command errors**: the remote store rejected or failed the command
//!
//! Status-derived errors display as `<STATUS_NAME> (code <n>): <context>`.

use shardkv_types::{StatusClass, StatusCode, config::ConfigError};
use snafu::{Location, Snafu};

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, SdkError>;

/// SDK error types with context-rich error messages.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SdkError {
    /// Appending would exceed the batch limit while auto-submit is disabled.
    #[snafu(display(
        "SDBP_API_ERROR (code -1): batch limit exceeded ({requested} bytes requested, limit {limit})"
    ))]
    BatchLimitExceeded {
        /// Configured limit in bytes.
        limit: usize,
        /// Accumulated size the append would have produced.
        requested: usize,
    },

    /// Illegal configuration value.
    #[snafu(display("SDBP_API_ERROR (code -1): invalid configuration: {message}"))]
    Config {
        /// Error description.
        message: String,
    },

    /// The cluster, its master or a primary could not be reached.
    #[snafu(display("{status}: {}", status.message()))]
    Connectivity {
        /// Underlying status.
        status: StatusCode,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// A timeout tier expired.
    #[snafu(display("{status}: {}", status.message()))]
    Timeout {
        /// Underlying status.
        status: StatusCode,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// The batch could not be (fully) sent.
    #[snafu(display("{status}: {}", status.message()))]
    Transport {
        /// Underlying status.
        status: StatusCode,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// The remote store rejected or failed the command.
    #[snafu(display("{status}: {message}"))]
    Command {
        /// Underlying status.
        status: StatusCode,
        /// Contextual description.
        message: String,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// No database/table selected, or the named one does not exist.
    #[snafu(display("SDBP_BADSCHEMA (code -403): {context}"))]
    BadSchema {
        /// Which schema element was missing.
        context: String,
    },

    /// The result was already released.
    #[snafu(display("SDBP_API_ERROR (code -1): result already closed"))]
    ResultClosed,
}

impl SdkError {
    /// Builds the error corresponding to a negative status.
    ///
    /// `context` is used for command-class errors only; the others carry the
    /// status' own description. The recorded location is the caller's.
    #[must_use]
    #[track_caller]
    pub fn from_status(status: StatusCode, context: impl Into<String>) -> Self {
        let location = Location::default();
        match status.class() {
            StatusClass::Connectivity => Self::Connectivity { status, location },
            StatusClass::Timeout => Self::Timeout { status, location },
            StatusClass::Transport => Self::Transport { status, location },
            StatusClass::Precondition => Self::Config { message: context.into() },
            StatusClass::Command if status == StatusCode::BadSchema => {
                Self::BadSchema { context: context.into() }
            },
            StatusClass::Command | StatusClass::Success => {
                Self::Command { status, message: context.into(), location }
            },
        }
    }

    /// Returns the status code this error corresponds to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BatchLimitExceeded { .. } | Self::Config { .. } | Self::ResultClosed => {
                StatusCode::ApiError
            },
            Self::Connectivity { status, .. }
            | Self::Timeout { status, .. }
            | Self::Transport { status, .. }
            | Self::Command { status, .. } => *status,
            Self::BadSchema { .. } => StatusCode::BadSchema,
        }
    }

    /// Where a status-derived error was raised.
    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::Connectivity { location, .. }
            | Self::Timeout { location, .. }
            | Self::Transport { location, .. }
            | Self::Command { location, .. } => Some(location),
            _ => None,
        }
    }

    /// Returns true if no guarantee exists about what the remote store executed.
    ///
    /// Write operations are not idempotent in general, so callers must decide
    /// themselves whether retrying is safe.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. } | Self::Transport { .. })
    }

    /// Returns true if a timeout tier expired.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns true if bytes were exchanged but the command was rejected.
    #[must_use]
    pub fn is_command(&self) -> bool {
        matches!(self, Self::Command { .. } | Self::BadSchema { .. })
    }

    /// Returns true for local precondition violations; nothing was sent.
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::BatchLimitExceeded { .. } | Self::Config { .. } | Self::ResultClosed
        )
    }
}

impl From<ConfigError> for SdkError {
    fn from(err: ConfigError) -> Self {
        Self::Config { message: err.to_string() }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_connectivity() {
        for status in [StatusCode::NoMaster, StatusCode::NoConnection, StatusCode::NoPrimary] {
            let err = SdkError::from_status(status, "ignored");
            assert!(err.is_connectivity(), "{status}");
            assert_eq!(err.status(), status);
        }
    }

    #[test]
    fn test_from_status_timeout() {
        let err = SdkError::from_status(StatusCode::GlobalTimeout, "");
        assert!(err.is_timeout());
        assert!(!err.is_connectivity());
        assert_eq!(err.to_string(), "SDBP_GLOBAL_TIMEOUT (code -302): the call timed out");
    }

    #[test]
    fn test_from_status_partial_is_transport() {
        let err = SdkError::from_status(StatusCode::Partial, "");
        assert!(matches!(err, SdkError::Transport { .. }));
        assert!(err.is_connectivity());
    }

    #[test]
    fn test_from_status_bad_schema_keeps_context() {
        let err = SdkError::from_status(StatusCode::BadSchema, "no table selected");
        assert!(matches!(err, SdkError::BadSchema { .. }));
        assert_eq!(err.to_string(), "SDBP_BADSCHEMA (code -403): no table selected");
        assert!(err.is_command());
    }

    #[test]
    fn test_from_status_noservice_is_command() {
        let err = SdkError::from_status(StatusCode::NoService, "set");
        assert!(err.is_command());
        assert_eq!(err.status(), StatusCode::NoService);
        assert_eq!(err.to_string(), "SDBP_NOSERVICE (code -401): set");
    }

    #[test]
    fn test_batch_limit_is_precondition() {
        let err = SdkError::BatchLimitExceeded { limit: 10, requested: 12 };
        assert!(err.is_precondition());
        assert_eq!(err.status(), StatusCode::ApiError);
        assert!(err.to_string().starts_with("SDBP_API_ERROR (code -1)"));
    }

    #[test]
    fn test_from_status_records_caller_location() {
        let line = line!() + 1;
        let err = SdkError::from_status(StatusCode::NoPrimary, "");
        let location = err.location().expect("status errors carry a location");
        assert!(location.file.ends_with("error.rs"));
        assert_eq!(location.line, line);
        assert!(SdkError::ResultClosed.location().is_none());
    }

    #[test]
    fn test_selector_records_location() {
        let err = CommandSnafu { status: StatusCode::Failed, message: "add" }.build();
        assert!(err.is_command());
        assert!(err.location().is_some());
        assert_eq!(err.to_string(), "SDBP_FAILED (code -402): add");
    }

    #[test]
    fn test_config_error_conversion() {
        let err: SdkError =
            ConfigError::Validation { message: "limit_bytes must be > 0".to_owned() }.into();
        assert!(err.is_precondition());
        assert!(err.to_string().contains("limit_bytes"));
    }
}
