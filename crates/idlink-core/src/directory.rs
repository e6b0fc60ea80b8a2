//! Directory user records and destination selection.

use crate::identity::{AccountKind, LinkedIdentity, decode_identities};
use serde::{Deserialize, Serialize};

/// Attribute holding the JSON list of linked identities.
pub const IDENTITIES_ATTRIBUTE: &str = "identities";

/// A single name/value attribute of a directory user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAttribute {
    /// Attribute name.
    pub name: String,
    /// Attribute value; the directory may omit it.
    #[serde(default)]
    pub value: Option<String>,
}

impl UserAttribute {
    /// Build an attribute with a value.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// A user record as returned by the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    /// Username, when the directory returned one.
    #[serde(default)]
    pub username: Option<String>,
    /// Raw attributes in directory order.
    #[serde(default)]
    pub attributes: Vec<UserAttribute>,
}

impl DirectoryUser {
    /// Value of the first attribute called `name`.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        find_attribute(&self.attributes, name)
    }
}

/// A directory user that can receive a link: it has a username and a known kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Directory username.
    pub username: String,
    /// Native or federated, derived once from the username.
    pub kind: AccountKind,
    /// Attributes the lookup returned for this user.
    pub attributes: Vec<UserAttribute>,
}

impl Candidate {
    /// Turn a lookup record into a candidate. Records without a username yield `None`.
    #[must_use]
    pub fn from_user(user: DirectoryUser) -> Option<Self> {
        let username = user.username.filter(|name| !name.is_empty())?;
        Some(Self {
            kind: AccountKind::classify(&username),
            username,
            attributes: user.attributes,
        })
    }

    /// Identities linked to this candidate according to `attributes`.
    #[must_use]
    pub fn linked_identities(attributes: &[UserAttribute]) -> Vec<LinkedIdentity> {
        find_attribute(attributes, IDENTITIES_ATTRIBUTE)
            .filter(|raw| !raw.trim().is_empty())
            .map(decode_identities)
            .unwrap_or_default()
    }
}

/// Pick the account a federated identity should be linked into.
///
/// The first native candidate wins so that federated identities never chain onto
/// another federated shadow record; otherwise the first candidate is used.
#[must_use]
pub fn select_destination(mut candidates: Vec<Candidate>) -> Option<Candidate> {
    let index = candidates
        .iter()
        .position(|candidate| candidate.kind.is_native())
        .unwrap_or(0);
    (index < candidates.len()).then(|| candidates.swap_remove(index))
}

fn find_attribute<'a>(attributes: &'a [UserAttribute], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|attribute| attribute.name == name)
        .and_then(|attribute| attribute.value.as_deref())
}
