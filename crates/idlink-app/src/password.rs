//! Permanent passwords for provisioned native users.
//!
//! The directory requires every native user to have a password, even though
//! provisioned users only ever sign in through their federated provider.

use rand::Rng;
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::fmt;

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*()-_=+[]{}<>?";

/// Shortest password length accepted by [`PasswordPolicy`].
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Longest password length accepted by [`PasswordPolicy`].
pub const MAX_PASSWORD_LENGTH: usize = 256;

/// Shape of generated passwords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    /// Number of characters.
    pub length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self { length: 32 }
    }
}

impl PasswordPolicy {
    /// Returns true when the length is within the accepted bounds.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.length >= MIN_PASSWORD_LENGTH && self.length <= MAX_PASSWORD_LENGTH
    }
}

/// A generated password. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    /// Wrap an existing value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The plain-text value, for handing to the directory.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Source of passwords for provisioned users.
pub trait PasswordGenerator {
    /// Produce a password that satisfies `policy`.
    fn generate(&self, policy: &PasswordPolicy) -> Password;
}

/// Generates passwords from the operating system's CSPRNG.
///
/// Every password contains at least one lower-case letter, upper-case letter,
/// digit and symbol.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPasswordGenerator;

impl PasswordGenerator for RandomPasswordGenerator {
    fn generate(&self, policy: &PasswordPolicy) -> Password {
        let mut rng = OsRng;
        let classes = [LOWERCASE, UPPERCASE, DIGITS, SYMBOLS];
        let alphabet = classes.concat();

        let mut chars: Vec<u8> = classes.iter().map(|class| pick(&mut rng, class)).collect();
        while chars.len() < policy.length {
            chars.push(pick(&mut rng, &alphabet));
        }
        chars.shuffle(&mut rng);

        Password(chars.into_iter().map(char::from).collect())
    }
}

fn pick(rng: &mut impl Rng, class: &[u8]) -> u8 {
    class[rng.gen_range(0..class.len())]
}
