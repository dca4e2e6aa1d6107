//! Builder pattern for creating call-control widgets

use std::sync::Arc;

use crate::{
    call_control::{CallControl, Collaborators},
    collaborators::{CallRegistry, NoUserAgent, UserAgentProvider},
    config::{CallControlConfig, CallControlSettings},
    error::{CallControlError, CallControlResult},
    events::{EventBus, PhoneEvents},
    i18n::{I18nRegistry, ResourceBundles, Translator},
    render::TargetConfig,
};

/// Builder for a [`CallControl`] widget
///
/// The call registry and event source are required; the user agent defaults
/// to none and labels default to an English [`I18nRegistry`].
pub struct CallControlBuilder {
    calls: Option<Arc<dyn CallRegistry>>,
    user_agents: Arc<dyn UserAgentProvider>,
    events: Option<Arc<dyn PhoneEvents>>,
    i18n: Option<Arc<dyn Translator>>,
    config: CallControlConfig,
}

impl CallControlBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            calls: None,
            user_agents: Arc::new(NoUserAgent),
            events: None,
            i18n: None,
            config: CallControlConfig::default(),
        }
    }

    /// Set the call registry (required)
    pub fn call_registry(mut self, calls: Arc<dyn CallRegistry>) -> Self {
        self.calls = Some(calls);
        self
    }

    /// Set the user agent provider
    pub fn user_agent(mut self, user_agents: Arc<dyn UserAgentProvider>) -> Self {
        self.user_agents = user_agents;
        self
    }

    /// Set the event source (required)
    pub fn events(mut self, events: Arc<dyn PhoneEvents>) -> Self {
        self.events = Some(events);
        self
    }

    /// Use an in-process [`EventBus`] as the event source
    pub fn event_bus(self, bus: Arc<EventBus>) -> Self {
        self.events(bus)
    }

    /// Set the label registry
    pub fn i18n(mut self, i18n: Arc<dyn Translator>) -> Self {
        self.i18n = Some(i18n);
        self
    }

    /// Merge label overrides over the defaults
    pub fn resource_bundles(mut self, bundles: ResourceBundles) -> Self {
        for (locale, labels) in bundles {
            self.config
                .i18n
                .resource_bundles
                .entry(locale)
                .or_default()
                .extend(labels);
        }
        self
    }

    /// Set the active locale
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.config.locale = Some(locale.into());
        self
    }

    /// Apply serialized settings
    pub fn settings(mut self, settings: CallControlSettings) -> Self {
        if settings.locale.is_some() {
            self.config.locale = settings.locale;
        }
        self.resource_bundles(settings.i18n.resource_bundles)
    }

    /// Register a render target at construction
    pub fn render_target(mut self, target: TargetConfig) -> Self {
        self.config.render_targets.push(target);
        self
    }

    /// Build the widget
    pub fn build(self) -> CallControlResult<Arc<CallControl>> {
        self.config.validate()?;

        let calls = self
            .calls
            .ok_or_else(|| CallControlError::config("A call registry is required"))?;
        let events = self
            .events
            .ok_or_else(|| CallControlError::config("An event source is required"))?;

        // The widget applies a configured locale to whichever translator it gets.
        let i18n: Arc<dyn Translator> = self.i18n.unwrap_or_else(|| Arc::new(I18nRegistry::default()));

        let collaborators = Collaborators {
            calls,
            user_agents: self.user_agents,
            events,
            i18n,
        };
        CallControl::new(collaborators, self.config)
    }
}

impl Default for CallControlBuilder {
    fn default() -> Self {
        Self::new()
    }
}
