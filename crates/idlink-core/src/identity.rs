//! Source identities, account classification, and linked-identity matching.

use crate::provider::{
    NATIVE_PROVIDER, SUBJECT_ATTRIBUTE, USERNAME_SEPARATOR, resolve_provider_name, same_provider,
};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Federated identity carried by an external-provider sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceIdentity {
    /// Canonical provider name (e.g. `Google`).
    pub provider_name: String,
    /// Subject id issued by the provider.
    pub provider_user_id: String,
}

impl SourceIdentity {
    /// Parse an external username of the form `<provider>_<providerUserId>`.
    ///
    /// Only the first separator splits; the user id keeps any further separators.
    /// Returns `None` (after logging) when the username cannot be split into a
    /// non-empty provider token and user id.
    #[must_use]
    pub fn parse(external_username: &str) -> Option<Self> {
        let Some((raw_provider, provider_user_id)) =
            external_username.split_once(USERNAME_SEPARATOR)
        else {
            warn!(username = external_username, "unexpected external username format");
            return None;
        };

        let provider_name = resolve_provider_name(raw_provider);
        if provider_name.is_empty() || provider_user_id.is_empty() {
            warn!(username = external_username, "external username lacks provider or user id");
            return None;
        }

        Some(Self {
            provider_name,
            provider_user_id: provider_user_id.to_owned(),
        })
    }

    /// Identifier used as the source side of a link request.
    #[must_use]
    pub fn link_source(&self) -> ProviderUser {
        ProviderUser::subject(&self.provider_name, &self.provider_user_id)
    }
}

impl fmt::Display for SourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{USERNAME_SEPARATOR}{}", self.provider_name, self.provider_user_id)
    }
}

/// Whether a directory account is native or a federated shadow record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountKind {
    /// Account created in the directory itself.
    Native,
    /// Account the directory created for a federated sign-in.
    Federated {
        /// Canonical provider name.
        provider_name: String,
        /// Provider subject id.
        provider_user_id: String,
    },
}

impl AccountKind {
    /// Classify a directory username. Federated usernames carry the provider separator.
    ///
    /// The rule is purely syntactic: a native user keyed by an email that contains
    /// the separator (`first_last@example.com`) classifies as federated. Such
    /// usernames are logged so the misrouted link can be traced.
    #[must_use]
    pub fn classify(username: &str) -> Self {
        match username.split_once(USERNAME_SEPARATOR) {
            None => Self::Native,
            Some((provider, id)) => {
                if looks_like_email(username) {
                    warn!(
                        username,
                        "email-shaped username contains the provider separator; classified as federated"
                    );
                }
                Self::Federated {
                    provider_name: resolve_provider_name(provider),
                    provider_user_id: id.to_owned(),
                }
            }
        }
    }

    /// Returns true for native accounts.
    #[must_use]
    pub const fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }

    /// Identifier used as the destination side of a link request.
    #[must_use]
    pub fn link_destination(&self, username: &str) -> ProviderUser {
        match self {
            Self::Native => ProviderUser::native(username),
            Self::Federated {
                provider_name,
                provider_user_id,
            } => ProviderUser::new(provider_name, provider_user_id),
        }
    }
}

/// One side of a link request as the directory identifies it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderUser {
    /// Provider name (`Cognito` for native accounts).
    pub provider_name: String,
    /// Attribute the value refers to, when the directory needs one.
    pub attribute_name: Option<String>,
    /// Username or provider subject id.
    pub attribute_value: String,
}

impl ProviderUser {
    /// Identifier addressed by provider name and value only.
    #[must_use]
    pub fn new(provider_name: impl Into<String>, attribute_value: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            attribute_name: None,
            attribute_value: attribute_value.into(),
        }
    }

    /// Native directory account.
    #[must_use]
    pub fn native(username: impl Into<String>) -> Self {
        Self::new(NATIVE_PROVIDER, username)
    }

    /// Federated account addressed by its provider subject.
    #[must_use]
    pub fn subject(provider_name: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            attribute_name: Some(SUBJECT_ATTRIBUTE.to_owned()),
            ..Self::new(provider_name, subject)
        }
    }
}

impl fmt::Display for ProviderUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{USERNAME_SEPARATOR}{}", self.provider_name, self.attribute_value)
    }
}

fn looks_like_email(username: &str) -> bool {
    username
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
}

/// Identity previously linked to a directory user, as stored in its `identities` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedIdentity {
    /// Provider the identity belongs to.
    pub provider_name: String,
    /// Provider subject id.
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
    /// Token issuer, when recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// Whether this identity is the user's primary one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
}

fn string_or_number<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number for userId, got {other}"
        ))),
    }
}

/// Decode the JSON list stored in an `identities` attribute.
///
/// Malformed data is logged and treated as an empty list.
#[must_use]
pub fn decode_identities(raw: &str) -> Vec<LinkedIdentity> {
    serde_json::from_str(raw).unwrap_or_else(|err| {
        warn!(%err, "failed to parse identities attribute; treating as empty");
        Vec::new()
    })
}

/// Relationship between an incoming identity and a user's linked identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityMatch<'a> {
    /// No identity for the provider is linked yet.
    Unlinked,
    /// The same provider account is already linked.
    Exact(&'a LinkedIdentity),
    /// The provider is linked under a different subject id.
    Stale(&'a LinkedIdentity),
}

impl<'a> IdentityMatch<'a> {
    /// Classify `source` against the identities already linked to a user.
    ///
    /// An exact subject match anywhere in the list wins over a stale entry for the
    /// same provider.
    #[must_use]
    pub fn classify(linked: &'a [LinkedIdentity], source: &SourceIdentity) -> Self {
        let mut same_provider_entries = linked
            .iter()
            .filter(|identity| same_provider(&identity.provider_name, &source.provider_name))
            .peekable();

        let Some(first) = same_provider_entries.peek().copied() else {
            return Self::Unlinked;
        };
        same_provider_entries
            .find(|identity| identity.user_id == source.provider_user_id)
            .map_or(Self::Stale(first), Self::Exact)
    }
}

/// What a reconciliation did about the link between source and destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkOutcome {
    /// A new link was created.
    Linked,
    /// Nothing to do; the identities were already linked.
    Skipped,
    /// A stale link for the provider was detached and replaced.
    StaleReplaced,
}

impl LinkOutcome {
    /// Stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linked => "linked",
            Self::Skipped => "skipped",
            Self::StaleReplaced => "stale-replaced",
        }
    }
}

impl fmt::Display for LinkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
