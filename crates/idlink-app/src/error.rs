//! Errors that abort a reconciliation.

use idlink_core::DirectoryError;
use thiserror::Error;

/// Fatal reconciliation failures. The sign-up attempt fails with this error.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// Looking up users by email failed.
    #[error("Failed to look up users with email {email}: {source}")]
    Lookup {
        /// Normalized email used for the lookup.
        email: String,
        /// Directory failure.
        source: DirectoryError,
    },

    /// Users matched the email but none of them carried a username.
    #[error("Username not found for existing directory user with email {email}")]
    CandidateUsernameMissing {
        /// Normalized email used for the lookup.
        email: String,
    },

    /// Creating the native user failed.
    #[error("Failed to create directory user for {email}: {source}")]
    Create {
        /// Normalized email the user was keyed by.
        email: String,
        /// Directory failure.
        source: DirectoryError,
    },

    /// The directory created a user but did not report its username.
    #[error("Username not found after creating directory user for {email}")]
    UsernameMissingAfterCreate {
        /// Normalized email the user was keyed by.
        email: String,
    },

    /// The new user exists but has no password; it is left in place.
    #[error("Failed to set password for created user {username}: {source}")]
    PasswordAssignment {
        /// Username of the created user.
        username: String,
        /// Directory failure.
        source: DirectoryError,
    },

    /// Linking failed for a reason other than an existing link.
    #[error("Failed to link {identity} into {destination}: {source}")]
    Link {
        /// Destination user, as `<provider>_<value>`.
        destination: String,
        /// Source identity, as `<provider>_<subject>`.
        identity: String,
        /// Directory failure.
        source: DirectoryError,
    },

    /// The new user exists with a password but the identity could not be linked into it.
    #[error("Failed to link {identity} into created user {username}: {source}")]
    ProvisionedLink {
        /// Username of the created user.
        username: String,
        /// Source identity, as `<provider>_<subject>`.
        identity: String,
        /// Directory failure.
        source: DirectoryError,
    },
}

impl ReconcileError {
    /// Username of a user this failed reconciliation left behind, if any.
    #[must_use]
    pub fn created_username(&self) -> Option<&str> {
        match self {
            Self::PasswordAssignment { username, .. } | Self::ProvisionedLink { username, .. } => {
                Some(username)
            }
            _ => None,
        }
    }
}
