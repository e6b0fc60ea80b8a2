//! Provider name canonicalization.

/// Provider name the directory uses for its own native accounts.
pub const NATIVE_PROVIDER: &str = "Cognito";

/// Attribute that carries the provider subject when linking a federated source.
pub const SUBJECT_ATTRIBUTE: &str = "Cognito_Subject";

/// Separator between provider token and provider user id in directory usernames.
pub const USERNAME_SEPARATOR: char = '_';

const KNOWN_PROVIDERS: [(&str, &str); 3] = [
    ("google", "Google"),
    ("facebook", "Facebook"),
    ("linkedin", "LinkedIn"),
];

/// Map a raw provider token (e.g. `google`) to the directory's provider name (`Google`).
///
/// Known tokens are matched case-insensitively against a fixed table. Anything
/// else keeps its spelling with the first letter upper-cased, so this never fails;
/// callers decide whether an unknown provider is acceptable.
#[must_use]
pub fn resolve_provider_name(raw: &str) -> String {
    let raw = raw.trim();
    KNOWN_PROVIDERS
        .iter()
        .find(|(token, _)| token.eq_ignore_ascii_case(raw))
        .map_or_else(|| capitalize_first(raw), |(_, name)| (*name).to_owned())
}

/// Case-insensitive comparison of two provider names.
#[must_use]
pub fn same_provider(left: &str, right: &str) -> bool {
    left.to_lowercase() == right.to_lowercase()
}

fn capitalize_first(raw: &str) -> String {
    let mut chars = raw.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
