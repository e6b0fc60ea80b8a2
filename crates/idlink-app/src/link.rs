//! Linking a federated identity into a directory user.

use idlink_core::{LinkOutcome, ProviderUser};
use tracing::{error, info, warn};

use crate::directory::Directory;
use crate::error::ReconcileError;

/// Issues link requests and absorbs "already linked" conflicts.
pub struct LinkOperation<'a, D> {
    directory: &'a D,
    directory_id: &'a str,
}

impl<'a, D: Directory> LinkOperation<'a, D> {
    /// Prepare link requests against `directory_id`.
    #[must_use]
    pub const fn new(directory: &'a D, directory_id: &'a str) -> Self {
        Self {
            directory,
            directory_id,
        }
    }

    /// Link `source` into `destination`.
    ///
    /// An existing link is reported as [`LinkOutcome::Skipped`]. Nothing is retried.
    ///
    /// # Errors
    /// Returns [`ReconcileError::Link`] for any other directory failure.
    pub async fn link(
        &self,
        destination: &ProviderUser,
        source: &ProviderUser,
    ) -> Result<LinkOutcome, ReconcileError> {
        match self
            .directory
            .link_identities(self.directory_id, destination, source)
            .await
        {
            Ok(()) => {
                info!(%destination, %source, "identity linked");
                Ok(LinkOutcome::Linked)
            }
            Err(err) if err.is_already_linked() => {
                warn!(%destination, %source, %err, "link skipped; already linked");
                Ok(LinkOutcome::Skipped)
            }
            Err(err) => {
                error!(%destination, %source, %err, "link failed");
                Err(ReconcileError::Link {
                    destination: destination.to_string(),
                    identity: source.to_string(),
                    source: err,
                })
            }
        }
    }
}
