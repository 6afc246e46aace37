//! Error types for the shush system
//!
//! Most of these never leave the core as failures: the registry folds them
//! into [`SubmitAck`](crate::registry::SubmitAck) and
//! [`RegistrationOutcome`](crate::registry::RegistrationOutcome), the
//! dispatcher logs them. The one fatal condition is
//! [`Error::UnrecognizedRequestCode`].
//!
//! Operations that are skipped rather than failed (service not connected,
//! nothing to register) are reported as a
//! [`SkipReason`](crate::registry::SkipReason), not as an error.

use thiserror::Error;

/// Result type alias for shush operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the shush system
#[derive(Error, Debug)]
pub enum Error {
    /// Location or audio-policy authorization is not held
    #[error("Authorization missing: {0}")]
    AuthorizationMissing(String),

    /// The monitoring service refused an add/remove request
    #[error("Region monitoring service rejected {operation}: {detail}")]
    ServiceRejection {
        /// Which request was rejected ("add" or "remove")
        operation: String,
        /// Service-provided status detail
        detail: String,
    },

    /// Security failure raised by the service while submitting a request
    #[error("Security error: {0}")]
    Security(String),

    /// Transition type the dispatcher does not act on
    #[error("Unknown transition type: {0}")]
    UnknownTransition(i32),

    /// Transition delivery carried a monitoring service error code
    #[error("Monitoring service reported error code {0}")]
    MonitoringError(i32),

    /// Authorization result for a request this process never made
    #[error("Unrecognized authorization request code: {0}")]
    UnrecognizedRequestCode(u32),

    /// Place lookup failed
    #[error("Place source error: {0}")]
    PlaceSource(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an authorization error
    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::AuthorizationMissing(msg.into())
    }

    /// Create a service rejection error
    pub fn rejected(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ServiceRejection {
            operation: operation.into(),
            detail: detail.into(),
        }
    }

    /// Create a security error
    pub fn security(msg: impl Into<String>) -> Self {
        Self::Security(msg.into())
    }

    /// Create a place source error
    pub fn place_source(msg: impl Into<String>) -> Self {
        Self::PlaceSource(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error must stop the caller.
    ///
    /// Only an authorization result for an unknown request code qualifies;
    /// it means the integration is wired incorrectly.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnrecognizedRequestCode(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
