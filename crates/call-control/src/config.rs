//! Widget configuration

use serde::Deserialize;

use crate::error::{CallControlError, CallControlResult};
use crate::i18n::I18nConfig;
use crate::render::TargetConfig;

/// Configuration recognized at construction
#[derive(Debug, Clone, Default)]
pub struct CallControlConfig {
    /// Targets registered and rendered during construction
    pub render_targets: Vec<TargetConfig>,
    /// Label overrides
    pub i18n: I18nConfig,
    /// Active locale; the translator's current locale when absent
    pub locale: Option<String>,
}

/// Serializable subset of [`CallControlConfig`]
///
/// Mounts are live handles and cannot come from a file, so targets are
/// attached separately with [`CallControlConfig::render_target`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallControlSettings {
    /// Label overrides
    pub i18n: I18nConfig,
    /// Active locale
    pub locale: Option<String>,
}

impl CallControlSettings {
    /// Parse settings from JSON
    pub fn from_json(source: &str) -> CallControlResult<Self> {
        serde_json::from_str(source)
            .map_err(|e| CallControlError::config(format!("Invalid call-control settings: {}", e)))
    }
}

impl CallControlConfig {
    /// Start from serialized settings
    pub fn from_settings(settings: CallControlSettings) -> Self {
        Self {
            render_targets: Vec::new(),
            i18n: settings.i18n,
            locale: settings.locale,
        }
    }

    /// Add a target to register at construction
    pub fn render_target(mut self, target: TargetConfig) -> Self {
        self.render_targets.push(target);
        self
    }

    /// Check caller-supplied values
    pub fn validate(&self) -> CallControlResult<()> {
        if let Some(locale) = &self.locale {
            if locale.trim().is_empty() {
                return Err(CallControlError::config("Locale must not be empty"));
            }
        }

        for (locale, labels) in &self.i18n.resource_bundles {
            if locale.trim().is_empty() {
                return Err(CallControlError::config("Resource bundle locale must not be empty"));
            }
            if labels.keys().any(|key| key.trim().is_empty()) {
                return Err(CallControlError::config(format!(
                    "Resource bundle '{}' contains an empty key",
                    locale
                )));
            }
        }

        Ok(())
    }
}
