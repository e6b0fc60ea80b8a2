//! Trigger sources and the sign-up event contract

use idlink_core::SourceIdentity;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Why the directory invoked the pre sign-up trigger.
///
/// Only [`TriggerSource::ExternalProvider`] is reconciled. Every other source,
/// including ones this crate does not know about, passes through untouched, so
/// unknown wire values are kept verbatim in [`TriggerSource::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TriggerSource {
    /// Self-service sign-up with a native username and password.
    SignUp,

    /// An administrator created the user.
    AdminCreateUser,

    /// First sign-in through a federated identity provider.
    ExternalProvider,

    /// Any other trigger source.
    Other(String),
}

impl TriggerSource {
    /// Wire name of the trigger source.
    #[must_use]
    pub fn wire_name(&self) -> &str {
        match self {
            Self::SignUp => "PreSignUp_SignUp",
            Self::AdminCreateUser => "PreSignUp_AdminCreateUser",
            Self::ExternalProvider => "PreSignUp_ExternalProvider",
            Self::Other(name) => name,
        }
    }

    /// Returns true for federated sign-ups, the only source that is reconciled.
    #[must_use]
    pub const fn is_external_provider(&self) -> bool {
        matches!(self, Self::ExternalProvider)
    }
}

impl From<String> for TriggerSource {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PreSignUp_SignUp" => Self::SignUp,
            "PreSignUp_AdminCreateUser" => Self::AdminCreateUser,
            "PreSignUp_ExternalProvider" => Self::ExternalProvider,
            _ => Self::Other(value),
        }
    }
}

impl From<TriggerSource> for String {
    fn from(source: TriggerSource) -> Self {
        match source {
            TriggerSource::Other(name) => name,
            known => known.wire_name().to_owned(),
        }
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Pre sign-up event, received from and handed back to the directory.
///
/// Fields the engine does not read are kept in `extra` so that an event passed
/// through unchanged serializes back to the same JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpEvent {
    /// Why the trigger fired.
    pub trigger_source: TriggerSource,

    /// Region the directory lives in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Directory (user pool) identifier.
    #[serde(rename = "userPoolId")]
    pub directory_id: String,

    /// Username the directory assigned, `<provider>_<providerUserId>` for federated sign-ups.
    #[serde(rename = "userName", default, skip_serializing_if = "Option::is_none")]
    pub external_username: Option<String>,

    /// Attributes requested for the new user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<SignUpRequest>,

    /// Flags returned to the directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<SignUpResponse>,

    /// Remaining fields (`version`, `callerContext`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SignUpEvent {
    /// Requested email, trimmed and lower-cased. `None` when absent or blank.
    #[must_use]
    pub fn normalized_email(&self) -> Option<String> {
        self.request
            .as_ref()
            .and_then(|request| request.user_attributes.as_ref())
            .and_then(|attributes| attributes.get("email"))
            .map(|email| email.trim().to_lowercase())
            .filter(|email| !email.is_empty())
    }

    /// Federated identity encoded in the username, when it parses.
    #[must_use]
    pub fn source_identity(&self) -> Option<SourceIdentity> {
        self.external_username
            .as_deref()
            .and_then(SourceIdentity::parse)
    }

    /// Tell the directory to confirm the user and verify the email without its own flow.
    pub fn confirm_and_verify(&mut self) {
        let response = self.response.get_or_insert_with(SignUpResponse::default);
        response.auto_confirm_user = Some(true);
        response.auto_verify_email = Some(true);
    }

    /// Returns true when both the confirm and verify-email flags are set.
    #[must_use]
    pub fn is_confirmed_and_verified(&self) -> bool {
        self.response
            .as_ref()
            .is_some_and(|response| {
                response.auto_confirm_user == Some(true) && response.auto_verify_email == Some(true)
            })
    }
}

/// Request part of a [`SignUpEvent`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    /// Requested user attributes (`email`, `given_name`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_attributes: Option<BTreeMap<String, String>>,

    /// Remaining fields (`validationData`, `clientMetadata`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response part of a [`SignUpEvent`].
///
/// Flags absent from the input stay absent on output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResponse {
    /// Confirm the user without the directory's confirmation flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_confirm_user: Option<bool>,

    /// Mark the email verified without the directory's verification flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_verify_email: Option<bool>,

    /// Mark the phone number verified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_verify_phone: Option<bool>,

    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
