//! Configuration loaded from `idlink.toml`.

use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use idlink_store_cognito::CognitoSettings;
use idlink_trigger::TriggerConfig;
use serde::Deserialize;

use crate::password::{MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH, PasswordPolicy};

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "idlink.toml";

/// Largest page the directory's user listing accepts.
pub const MAX_LOOKUP_LIMIT: u32 = 60;

/// Top-level configuration loaded from `idlink.toml`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    /// Directory client settings.
    #[serde(default)]
    pub directory: DirectoryConfig,
    /// Which sign-ups are reconciled.
    #[serde(default)]
    pub trigger: TriggerConfig,
    /// Password generated for provisioned users.
    #[serde(default)]
    pub password: PasswordPolicy,
}

impl AppConfig {
    /// Load configuration from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Parse and validate configuration from TOML text.
    ///
    /// # Errors
    /// Returns an error on malformed TOML or out-of-range values.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let limit = self.directory.lookup_limit;
        if limit == 0 || limit > MAX_LOOKUP_LIMIT {
            bail!("directory.lookup_limit must be between 1 and {MAX_LOOKUP_LIMIT}, got {limit}");
        }
        if !self.password.is_valid() {
            bail!(
                "password.length must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH}, got {}",
                self.password.length
            );
        }
        if self
            .trigger
            .disabled_providers
            .iter()
            .any(|provider| provider.trim().is_empty())
        {
            bail!("trigger.disabled_providers must not contain empty names");
        }
        Ok(())
    }
}

/// Directory connection block.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Region override; the event's region is used when unset.
    pub region: Option<String>,
    /// Endpoint override, e.g. a local emulator.
    pub endpoint_url: Option<String>,
    /// Maximum users fetched per email lookup.
    pub lookup_limit: u32,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            region: None,
            endpoint_url: None,
            lookup_limit: 5,
        }
    }
}

impl DirectoryConfig {
    /// Client settings, falling back to `event_region` when no region is configured.
    #[must_use]
    pub fn cognito_settings(&self, event_region: Option<&str>) -> CognitoSettings {
        CognitoSettings {
            region: self
                .region
                .clone()
                .or_else(|| event_region.map(str::to_owned)),
            endpoint_url: self.endpoint_url.clone(),
        }
    }
}
