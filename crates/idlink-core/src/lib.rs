//! Domain types & pure reconciliation logic for idlink.

/// Directory records and destination selection.
pub mod directory;
/// Errors reported by directory backends.
pub mod error;
/// Source identities, account kinds and linked identities.
pub mod identity;
/// Provider name canonicalization.
pub mod provider;

pub use directory::{Candidate, DirectoryUser, IDENTITIES_ATTRIBUTE, UserAttribute, select_destination};
pub use error::DirectoryError;
pub use identity::{
    AccountKind, IdentityMatch, LinkOutcome, LinkedIdentity, ProviderUser, SourceIdentity,
    decode_identities,
};
pub use provider::{NATIVE_PROVIDER, SUBJECT_ATTRIBUTE, resolve_provider_name, same_provider};
