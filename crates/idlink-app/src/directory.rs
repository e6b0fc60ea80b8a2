//! Directory abstraction used by the reconciliation engine.

use idlink_core::{DirectoryError, DirectoryUser, ProviderUser};
use idlink_store_cognito::CognitoDirectory;

use crate::password::Password;

/// Directory operations the engine depends on.
///
/// The engine holds its directory as an injected value, so callers build the
/// client once and tests substitute a fake.
#[allow(async_fn_in_trait)]
pub trait Directory {
    /// List up to `limit` users whose email equals `email`. No match is an empty list.
    ///
    /// # Errors
    /// Returns a directory error when the lookup fails.
    async fn list_users_by_email(
        &self,
        directory_id: &str,
        email: &str,
        limit: u32,
    ) -> Result<Vec<DirectoryUser>, DirectoryError>;

    /// Fetch one user with its full attribute set.
    ///
    /// # Errors
    /// Returns a directory error when the user cannot be fetched.
    async fn get_user(
        &self,
        directory_id: &str,
        username: &str,
    ) -> Result<DirectoryUser, DirectoryError>;

    /// Create a native user keyed by `email` without sending a welcome notification.
    ///
    /// # Errors
    /// Returns a directory error when creation fails.
    async fn create_native_user(
        &self,
        directory_id: &str,
        email: &str,
    ) -> Result<Option<String>, DirectoryError>;

    /// Assign a permanent password.
    ///
    /// # Errors
    /// Returns a directory error when the password is rejected or the call fails.
    async fn set_permanent_password(
        &self,
        directory_id: &str,
        username: &str,
        password: &Password,
    ) -> Result<(), DirectoryError>;

    /// Link `source` into `destination`.
    ///
    /// # Errors
    /// Returns [`DirectoryError::AlreadyLinked`] for existing links, or another
    /// directory error when the call fails.
    async fn link_identities(
        &self,
        directory_id: &str,
        destination: &ProviderUser,
        source: &ProviderUser,
    ) -> Result<(), DirectoryError>;

    /// Detach a linked `identity` from `target_username`.
    ///
    /// # Errors
    /// Returns a directory error when the call fails.
    async fn disable_linked_identity(
        &self,
        directory_id: &str,
        target_username: &str,
        identity: &ProviderUser,
    ) -> Result<(), DirectoryError>;
}

impl Directory for CognitoDirectory {
    async fn list_users_by_email(
        &self,
        directory_id: &str,
        email: &str,
        limit: u32,
    ) -> Result<Vec<DirectoryUser>, DirectoryError> {
        Self::list_users_by_email(self, directory_id, email, limit).await
    }

    async fn get_user(
        &self,
        directory_id: &str,
        username: &str,
    ) -> Result<DirectoryUser, DirectoryError> {
        Self::get_user(self, directory_id, username).await
    }

    async fn create_native_user(
        &self,
        directory_id: &str,
        email: &str,
    ) -> Result<Option<String>, DirectoryError> {
        Self::create_native_user(self, directory_id, email).await
    }

    async fn set_permanent_password(
        &self,
        directory_id: &str,
        username: &str,
        password: &Password,
    ) -> Result<(), DirectoryError> {
        Self::set_permanent_password(self, directory_id, username, password.expose()).await
    }

    async fn link_identities(
        &self,
        directory_id: &str,
        destination: &ProviderUser,
        source: &ProviderUser,
    ) -> Result<(), DirectoryError> {
        Self::link_identities(self, directory_id, destination, source).await
    }

    async fn disable_linked_identity(
        &self,
        directory_id: &str,
        target_username: &str,
        identity: &ProviderUser,
    ) -> Result<(), DirectoryError> {
        Self::disable_linked_identity(self, directory_id, target_username, identity).await
    }
}
