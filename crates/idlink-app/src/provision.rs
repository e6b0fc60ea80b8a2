//! Creating a native user when no account exists for an email.

use idlink_core::{AccountKind, LinkOutcome, SourceIdentity};
use tracing::{error, info};

use crate::directory::Directory;
use crate::error::ReconcileError;
use crate::link::LinkOperation;
use crate::password::{PasswordGenerator, PasswordPolicy};

/// Result of provisioning a native user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    /// Username the directory assigned.
    pub username: String,
    /// What linking the source identity did.
    pub outcome: LinkOutcome,
}

/// Create user, set password, link: three calls with no rollback between them.
pub struct ProvisioningOperation<'a, D, P> {
    directory: &'a D,
    passwords: &'a P,
    policy: &'a PasswordPolicy,
    directory_id: &'a str,
}

impl<'a, D: Directory, P: PasswordGenerator> ProvisioningOperation<'a, D, P> {
    /// Prepare provisioning against `directory_id`.
    #[must_use]
    pub const fn new(
        directory: &'a D,
        passwords: &'a P,
        policy: &'a PasswordPolicy,
        directory_id: &'a str,
    ) -> Self {
        Self {
            directory,
            passwords,
            policy,
            directory_id,
        }
    }

    /// Create a native user for `email` and link `source` into it.
    ///
    /// # Errors
    /// Fails if creation fails or yields no username, if the password cannot be
    /// set (the created user is left without one), or if linking fails. The last
    /// two name the created user.
    pub async fn provision(
        &self,
        email: &str,
        source: &SourceIdentity,
    ) -> Result<Provisioned, ReconcileError> {
        info!(email, "no existing user for email; creating native user to link into");

        let username = self
            .directory
            .create_native_user(self.directory_id, email)
            .await
            .map_err(|err| ReconcileError::Create {
                email: email.to_owned(),
                source: err,
            })?
            .ok_or_else(|| ReconcileError::UsernameMissingAfterCreate {
                email: email.to_owned(),
            })?;

        let password = self.passwords.generate(self.policy);
        if let Err(err) = self
            .directory
            .set_permanent_password(self.directory_id, &username, &password)
            .await
        {
            error!(%username, %err, "created user left without a password");
            return Err(ReconcileError::PasswordAssignment {
                username,
                source: err,
            });
        }

        let destination = AccountKind::Native.link_destination(&username);
        let outcome = LinkOperation::new(self.directory, self.directory_id)
            .link(&destination, &source.link_source())
            .await
            .map_err(|err| match err {
                ReconcileError::Link {
                    identity, source, ..
                } => {
                    error!(%username, %identity, "created user left unlinked");
                    ReconcileError::ProvisionedLink {
                        username: username.clone(),
                        identity,
                        source,
                    }
                }
                other => other,
            })?;

        info!(%username, %outcome, "native user provisioned");
        Ok(Provisioned { username, outcome })
    }
}
