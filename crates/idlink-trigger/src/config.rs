//! Trigger configuration

use idlink_core::{resolve_provider_name, same_provider};
use serde::{Deserialize, Serialize};

/// Controls which sign-ups the engine reconciles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Whether reconciliation runs at all; when false every event passes through
    pub enabled: bool,

    /// Providers whose sign-ups pass through without reconciliation
    pub disabled_providers: Vec<String>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            disabled_providers: Vec::new(),
        }
    }
}

impl TriggerConfig {
    /// Check if sign-ups from `provider_name` should be reconciled
    ///
    /// Disabled entries may be raw tokens (`google`) or canonical names (`Google`).
    #[must_use]
    pub fn is_provider_enabled(&self, provider_name: &str) -> bool {
        self.enabled
            && !self
                .disabled_providers
                .iter()
                .any(|disabled| same_provider(&resolve_provider_name(disabled), provider_name))
    }
}
