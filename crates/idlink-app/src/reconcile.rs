//! Reconciliation of federated sign-ups onto a single directory user.

use idlink_core::{
    Candidate, IdentityMatch, LinkOutcome, ProviderUser, SourceIdentity, UserAttribute,
    select_destination,
};
use idlink_trigger::{SignUpEvent, TriggerConfig};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::directory::Directory;
use crate::error::ReconcileError;
use crate::link::LinkOperation;
use crate::password::{PasswordGenerator, PasswordPolicy, RandomPasswordGenerator};
use crate::provision::ProvisioningOperation;

/// Why an event was handed back without touching the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassThroughReason {
    /// The trigger source is not a federated sign-up.
    NotExternalProvider,
    /// Reconciliation is switched off in the configuration.
    Disabled,
    /// The event carries no email to look users up by.
    MissingEmail,
    /// The username does not encode a provider identity.
    UnparseableUsername,
    /// The provider is listed in `trigger.disabled_providers`.
    ProviderDisabled,
}

/// Why `event` would pass through without any directory call, or `None` when it
/// needs reconciling.
#[must_use]
pub fn pass_through_reason(trigger: &TriggerConfig, event: &SignUpEvent) -> Option<PassThroughReason> {
    screen(trigger, event).err()
}

/// Normalized email and source identity of an event that needs reconciling.
fn screen(
    trigger: &TriggerConfig,
    event: &SignUpEvent,
) -> Result<(String, SourceIdentity), PassThroughReason> {
    if !event.trigger_source.is_external_provider() {
        debug!(trigger_source = %event.trigger_source, "not an external provider sign-up; skipping");
        return Err(PassThroughReason::NotExternalProvider);
    }
    if !trigger.enabled {
        info!("reconciliation disabled; skipping");
        return Err(PassThroughReason::Disabled);
    }
    let Some(email) = event.normalized_email() else {
        warn!("no email in requested user attributes; skipping");
        return Err(PassThroughReason::MissingEmail);
    };
    let Some(source) = event.source_identity() else {
        return Err(PassThroughReason::UnparseableUsername);
    };
    if !trigger.is_provider_enabled(&source.provider_name) {
        info!(provider = %source.provider_name, "provider disabled; skipping");
        return Err(PassThroughReason::ProviderDisabled);
    }
    Ok((email, source))
}

/// What a single invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// The event was returned unchanged.
    PassThrough(PassThroughReason),
    /// The identity was reconciled against an existing user.
    Existing {
        /// Username of the destination user.
        destination: String,
        /// What happened to the link.
        outcome: LinkOutcome,
    },
    /// A native user was created and the identity linked into it.
    Provisioned {
        /// Username of the created user.
        username: String,
        /// What happened to the link.
        outcome: LinkOutcome,
    },
}

/// The identity reconciliation engine.
///
/// Each call is independent: the service keeps no state between invocations, and
/// concurrent sign-ups for the same email are settled only by the directory.
pub struct ReconcileService<D, P = RandomPasswordGenerator> {
    directory: D,
    passwords: P,
    trigger: TriggerConfig,
    password_policy: PasswordPolicy,
    lookup_limit: u32,
}

impl<D> ReconcileService<D> {
    /// Engine with the operating system's random password source.
    #[must_use]
    pub fn new(directory: D, config: &AppConfig) -> Self {
        Self::with_passwords(directory, RandomPasswordGenerator, config)
    }
}

impl<D, P> ReconcileService<D, P> {
    /// Engine with an explicit password source.
    #[must_use]
    pub fn with_passwords(directory: D, passwords: P, config: &AppConfig) -> Self {
        Self {
            directory,
            passwords,
            trigger: config.trigger.clone(),
            password_policy: config.password,
            lookup_limit: config.directory.lookup_limit,
        }
    }

    /// Borrow the injected directory.
    #[must_use]
    pub const fn directory(&self) -> &D {
        &self.directory
    }
}

impl<D: Directory, P: PasswordGenerator> ReconcileService<D, P> {
    /// Reconcile `event` and return it, with the response flags set when an
    /// identity was reconciled.
    ///
    /// # Errors
    /// Returns an error when a directory call that cannot be degraded fails.
    pub async fn handle(&self, mut event: SignUpEvent) -> Result<SignUpEvent, ReconcileError> {
        self.reconcile(&mut event).await?;
        Ok(event)
    }

    /// Reconcile `event` in place and report what was done.
    ///
    /// # Errors
    /// Returns an error when a directory call that cannot be degraded fails. The
    /// event is left unfinalized in that case.
    pub async fn reconcile(
        &self,
        event: &mut SignUpEvent,
    ) -> Result<Reconciliation, ReconcileError> {
        let (email, source) = match screen(&self.trigger, event) {
            Ok(inputs) => inputs,
            Err(reason) => return Ok(Reconciliation::PassThrough(reason)),
        };

        let directory_id = event.directory_id.as_str();
        info!(
            provider = %source.provider_name,
            provider_user_id = %source.provider_user_id,
            %email,
            "reconciling external provider sign-up"
        );

        let users = self
            .directory
            .list_users_by_email(directory_id, &email, self.lookup_limit)
            .await
            .map_err(|err| ReconcileError::Lookup {
                email: email.clone(),
                source: err,
            })?;
        debug!(count = users.len(), "existing users for email");

        let reconciliation = if users.is_empty() {
            let provisioned = ProvisioningOperation::new(
                &self.directory,
                &self.passwords,
                &self.password_policy,
                directory_id,
            )
            .provision(&email, &source)
            .await?;
            Reconciliation::Provisioned {
                username: provisioned.username,
                outcome: provisioned.outcome,
            }
        } else {
            let candidates: Vec<Candidate> =
                users.into_iter().filter_map(Candidate::from_user).collect();
            let destination = select_destination(candidates)
                .ok_or_else(|| ReconcileError::CandidateUsernameMissing { email: email.clone() })?;
            info!(destination = %destination.username, "chosen destination user");

            let outcome = self.reconcile_existing(directory_id, &destination, &source).await?;
            Reconciliation::Existing {
                destination: destination.username,
                outcome,
            }
        };

        event.confirm_and_verify();
        Ok(reconciliation)
    }

    async fn reconcile_existing(
        &self,
        directory_id: &str,
        destination: &Candidate,
        source: &SourceIdentity,
    ) -> Result<LinkOutcome, ReconcileError> {
        let attributes = self.full_attributes(directory_id, destination).await;
        let linked = Candidate::linked_identities(&attributes);
        let target = destination.kind.link_destination(&destination.username);
        let link = LinkOperation::new(&self.directory, directory_id);

        match IdentityMatch::classify(&linked, source) {
            IdentityMatch::Exact(_) => {
                info!(destination = %destination.username, "provider already linked with same user id; skipping");
                Ok(LinkOutcome::Skipped)
            }
            IdentityMatch::Unlinked => {
                info!(destination = %destination.username, "no identity for provider; linking");
                link.link(&target, &source.link_source()).await
            }
            IdentityMatch::Stale(stale) => {
                info!(
                    destination = %destination.username,
                    stale_user_id = %stale.user_id,
                    "stale provider mapping found; detaching before relink"
                );
                let stale_identity = ProviderUser::new(&source.provider_name, &stale.user_id);
                if let Err(err) = self
                    .directory
                    .disable_linked_identity(directory_id, &destination.username, &stale_identity)
                    .await
                {
                    warn!(%stale_identity, %err, "failed to detach stale identity; continuing");
                }

                let outcome = link.link(&target, &source.link_source()).await?;
                Ok(match outcome {
                    LinkOutcome::Linked => LinkOutcome::StaleReplaced,
                    other => other,
                })
            }
        }
    }

    /// Full attribute set of `candidate`, or what the lookup returned if the fetch fails.
    async fn full_attributes(&self, directory_id: &str, candidate: &Candidate) -> Vec<UserAttribute> {
        match self.directory.get_user(directory_id, &candidate.username).await {
            Ok(user) => user.attributes,
            Err(err) => {
                warn!(username = %candidate.username, %err, "fetching full user failed; using lookup attributes");
                candidate.attributes.clone()
            }
        }
    }
}
