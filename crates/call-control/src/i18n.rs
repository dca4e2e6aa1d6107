//! Label bundles and translation
//!
//! Bundles are registered under a namespace and addressed with keys of the
//! form `libwebphone:<namespace>.<key>`.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::types::ActionKey;

/// Locale → key → label
pub type ResourceBundles = BTreeMap<String, BTreeMap<String, String>>;

/// Namespace the widget registers its labels under
pub const NAMESPACE: &str = "callControl";

/// Prefix shared by every message key
pub const KEY_PREFIX: &str = "libwebphone";

/// Locale used when a label is missing in the active locale
pub const FALLBACK_LOCALE: &str = "en";

/// Default English labels for the nine actions
pub fn default_bundles() -> ResourceBundles {
    let labels = [
        (ActionKey::Redial, "Redial"),
        (ActionKey::Cancel, "Cancel"),
        (ActionKey::Hangup, "Hang Up"),
        (ActionKey::Hold, "Hold"),
        (ActionKey::Unhold, "Resume"),
        (ActionKey::Mute, "Mute"),
        (ActionKey::Unmute, "Unmute"),
        (ActionKey::Transfer, "Transfer"),
        (ActionKey::Answer, "Answer"),
    ];

    let en = labels
        .iter()
        .map(|(key, label)| (key.as_str().to_string(), label.to_string()))
        .collect();

    let mut bundles = ResourceBundles::new();
    bundles.insert(FALLBACK_LOCALE.to_string(), en);
    bundles
}

/// Merge `overrides` over `base` key by key; override values win
pub fn merge_bundles(mut base: ResourceBundles, overrides: &ResourceBundles) -> ResourceBundles {
    for (locale, labels) in overrides {
        let target = base.entry(locale.clone()).or_default();
        for (key, label) in labels {
            target.insert(key.clone(), label.clone());
        }
    }
    base
}

/// Fully qualified message key for an action
pub fn message_key(action: ActionKey) -> String {
    format!("{}:{}.{}", KEY_PREFIX, NAMESPACE, action.as_str())
}

/// Default action → message key map used by render targets
pub fn default_key_map() -> BTreeMap<ActionKey, String> {
    ActionKey::ALL
        .iter()
        .map(|key| (*key, message_key(*key)))
        .collect()
}

/// Resolves message keys to labels
pub trait Translator: Send + Sync {
    /// Register bundles for a namespace, merging over anything already there
    fn add_resource_bundles(&self, namespace: &str, bundles: ResourceBundles);
    /// Label for a fully qualified key in the active locale
    fn translate(&self, key: &str) -> String;
    /// Switch the active locale
    fn set_locale(&self, locale: &str);
}

/// In-process translation registry
///
/// Labels are looked up in the active locale, then in `en`, and finally the
/// key itself is returned so a missing label is visible instead of blank.
#[derive(Debug)]
pub struct I18nRegistry {
    locale: RwLock<String>,
    namespaces: RwLock<HashMap<String, ResourceBundles>>,
}

impl I18nRegistry {
    /// Create a registry with the given active locale
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: RwLock::new(locale.into()),
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    /// Register bundles for a namespace, merging over anything already there
    pub fn add_resource_bundles(&self, namespace: &str, bundles: ResourceBundles) {
        let mut namespaces = self.namespaces.write();
        let existing = namespaces.remove(namespace).unwrap_or_default();
        namespaces.insert(namespace.to_string(), merge_bundles(existing, &bundles));
    }

    /// Change the active locale
    pub fn set_locale(&self, locale: impl Into<String>) {
        *self.locale.write() = locale.into();
    }

    /// The active locale
    pub fn locale(&self) -> String {
        self.locale.read().clone()
    }

    /// Copy of the bundles registered for a namespace
    pub fn bundles(&self, namespace: &str) -> Option<ResourceBundles> {
        self.namespaces.read().get(namespace).cloned()
    }

    fn lookup(&self, namespace: &str, locale: &str, key: &str) -> Option<String> {
        self.namespaces
            .read()
            .get(namespace)
            .and_then(|bundles| bundles.get(locale))
            .and_then(|labels| labels.get(key))
            .cloned()
    }
}

impl Default for I18nRegistry {
    fn default() -> Self {
        Self::new(FALLBACK_LOCALE)
    }
}

impl Translator for I18nRegistry {
    fn add_resource_bundles(&self, namespace: &str, bundles: ResourceBundles) {
        I18nRegistry::add_resource_bundles(self, namespace, bundles);
    }

    fn set_locale(&self, locale: &str) {
        I18nRegistry::set_locale(self, locale);
    }

    fn translate(&self, key: &str) -> String {
        let unqualified = key
            .split_once(':')
            .map(|(_, rest)| rest)
            .unwrap_or(key);
        let Some((namespace, label_key)) = unqualified.split_once('.') else {
            return key.to_string();
        };

        let locale = self.locale();
        self.lookup(namespace, &locale, label_key)
            .or_else(|| self.lookup(namespace, FALLBACK_LOCALE, label_key))
            .unwrap_or_else(|| key.to_string())
    }
}

/// Serializable label override set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct I18nConfig {
    /// Locale-keyed label overrides merged over the defaults
    #[serde(default)]
    pub resource_bundles: ResourceBundles,
}
