//! Error types for directory operations.

use thiserror::Error;

/// Error code the directory uses for invalid link requests.
pub const INVALID_PARAMETER_CODE: &str = "InvalidParameterException";

/// Message fragment the directory returns when two identities are already linked.
pub const MERGE_NOT_SUPPORTED: &str = "Merging is not currently supported";

/// Errors reported by a directory backend.
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// The identities are already linked, or the directory refuses to merge them.
    #[error("Identities already linked: {0}")]
    AlreadyLinked(String),

    /// The directory has no user with the given username.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// The directory answered with a service error.
    #[error("{operation} rejected ({code}): {message}")]
    Rejected {
        /// Directory operation that failed.
        operation: &'static str,
        /// Service error code.
        code: String,
        /// Service error message.
        message: String,
    },

    /// The request could not be built from the given values.
    #[error("{operation} request invalid: {message}")]
    InvalidRequest {
        /// Directory operation being prepared.
        operation: &'static str,
        /// What was wrong with the request.
        message: String,
    },

    /// The request did not produce a directory answer (network, credentials, timeouts).
    #[error("{operation} failed: {message}")]
    Transport {
        /// Directory operation that failed.
        operation: &'static str,
        /// Description of the failure.
        message: String,
    },
}

impl DirectoryError {
    /// Classify a service error returned by `operation`.
    ///
    /// The "merging is not supported" flavour of invalid-parameter errors is how the
    /// directory reports an existing link, so it maps to [`DirectoryError::AlreadyLinked`].
    #[must_use]
    pub fn from_service(operation: &'static str, code: &str, message: &str) -> Self {
        if code == INVALID_PARAMETER_CODE && message.contains(MERGE_NOT_SUPPORTED) {
            return Self::AlreadyLinked(message.to_owned());
        }
        if code == "UserNotFoundException" {
            return Self::UserNotFound(message.to_owned());
        }
        Self::Rejected {
            operation,
            code: code.to_owned(),
            message: message.to_owned(),
        }
    }

    /// Returns true when the error means the link already exists.
    #[must_use]
    pub const fn is_already_linked(&self) -> bool {
        matches!(self, Self::AlreadyLinked(_))
    }
}
