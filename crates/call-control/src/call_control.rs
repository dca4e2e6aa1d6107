//! The call-control widget
//!
//! Exposes the call actions, keeps every render target in sync with the
//! current call, and routes element triggers back to the actions.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use crate::collaborators::{Call, CallRegistry, UserAgentProvider};
use crate::config::CallControlConfig;
use crate::error::{CallControlError, CallControlResult};
use crate::events::{PhoneEvent, PhoneEvents};
use crate::i18n::{default_bundles, merge_bundles, Translator, NAMESPACE};
use crate::render::{
    mount_all, mount_initial, ActionHandler, RenderTargetEntry, RenderTargetRegistry, TargetConfig, TargetId,
};
use crate::snapshot::build_snapshot;
use crate::types::{ActionKey, CallSnapshot};

type Action = fn(&CallControl);

/// Action key → widget method, shared by every target
const ACTIONS: [(ActionKey, Action); 9] = [
    (ActionKey::Redial, CallControl::redial),
    (ActionKey::Cancel, CallControl::cancel),
    (ActionKey::Hangup, CallControl::hangup),
    (ActionKey::Hold, CallControl::hold),
    (ActionKey::Unhold, CallControl::unhold),
    (ActionKey::Mute, CallControl::mute),
    (ActionKey::Unmute, CallControl::unmute),
    (ActionKey::Transfer, CallControl::transfer),
    (ActionKey::Answer, CallControl::answer),
];

fn action_for(key: ActionKey) -> Action {
    ACTIONS
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, action)| *action)
        .unwrap_or(CallControl::ignore)
}

/// Handles the widget is constructed with
#[derive(Clone)]
pub struct Collaborators {
    /// Source of the current call
    pub calls: Arc<dyn CallRegistry>,
    /// Source of the user agent
    pub user_agents: Arc<dyn UserAgentProvider>,
    /// Lifecycle event subscription
    pub events: Arc<dyn PhoneEvents>,
    /// Label registry
    pub i18n: Arc<dyn Translator>,
}

/// Call-control widget
pub struct CallControl {
    calls: Arc<dyn CallRegistry>,
    user_agents: Arc<dyn UserAgentProvider>,
    events: Arc<dyn PhoneEvents>,
    i18n: Arc<dyn Translator>,
    targets: Mutex<RenderTargetRegistry>,
    pending_renders: AtomicUsize,
    rendering: AtomicBool,
    this: Weak<CallControl>,
}

impl CallControl {
    /// Construct the widget, register its labels and configured targets,
    /// subscribe to the refresh events and announce `callControl.started`
    pub fn new(collaborators: Collaborators, config: CallControlConfig) -> CallControlResult<Arc<Self>> {
        config.validate()?;

        let Collaborators { calls, user_agents, events, i18n } = collaborators;
        i18n.add_resource_bundles(NAMESPACE, merge_bundles(default_bundles(), &config.i18n.resource_bundles));
        if let Some(locale) = config.locale.as_deref() {
            debug!(locale, "applying configured locale");
            i18n.set_locale(locale);
        }

        let widget = Arc::new_cyclic(|this| CallControl {
            calls,
            user_agents,
            events,
            i18n,
            targets: Mutex::new(RenderTargetRegistry::new()),
            pending_renders: AtomicUsize::new(0),
            rendering: AtomicBool::new(false),
            this: this.clone(),
        });

        for target in config.render_targets {
            widget.add_target(target)?;
        }

        for event in PhoneEvent::REFRESH_EVENTS {
            let this = widget.this.clone();
            widget.events.on(
                event,
                Arc::new(move |event: &PhoneEvent| {
                    if let Some(widget) = this.upgrade() {
                        debug!(event = %event, "refreshing call control");
                        widget.update_renders();
                    }
                }),
            );
        }

        info!(targets = widget.targets.lock().len(), "call control started");
        widget.events.emit(PhoneEvent::CallControlStarted);
        Ok(widget)
    }

    /// Dial the last target again
    pub fn redial(&self) {
        let Some(user_agent) = self.user_agents.user_agent() else {
            debug!(action = %ActionKey::Redial, "no user agent, ignoring");
            return;
        };
        report(ActionKey::Redial, user_agent.redial());
    }

    /// Cancel the ringing outbound call
    pub fn cancel(&self) {
        self.with_call(ActionKey::Cancel, |call| call.cancel());
    }

    /// Hang up the current call
    pub fn hangup(&self) {
        self.with_call(ActionKey::Hangup, |call| call.hangup());
    }

    /// Put the current call on hold
    pub fn hold(&self) {
        self.with_call(ActionKey::Hold, |call| call.hold());
    }

    /// Resume the current call
    pub fn unhold(&self) {
        self.with_call(ActionKey::Unhold, |call| call.unhold());
    }

    /// Mute the current call
    pub fn mute(&self) {
        self.with_call(ActionKey::Mute, |call| call.mute());
    }

    /// Unmute the current call
    pub fn unmute(&self) {
        self.with_call(ActionKey::Unmute, |call| call.unmute());
    }

    /// Transfer the current call
    pub fn transfer(&self) {
        self.with_call(ActionKey::Transfer, |call| call.transfer());
    }

    /// Answer the current call
    pub fn answer(&self) {
        self.with_call(ActionKey::Answer, |call| call.answer());
    }

    /// Run the action for `key`
    pub fn perform(&self, key: ActionKey) {
        action_for(key)(self)
    }

    fn ignore(&self) {}

    fn with_call(&self, action: ActionKey, forward: impl FnOnce(&dyn Call) -> anyhow::Result<()>) {
        match self.calls.get_call() {
            Some(call) => report(action, forward(call.as_ref())),
            None => debug!(action = %action, "no current call, ignoring"),
        }
    }

    /// Current presentation snapshot
    pub fn snapshot(&self) -> CallSnapshot {
        build_snapshot(self.calls.as_ref(), self.user_agents.as_ref())
    }

    /// Rebuild the snapshot and re-render every target
    ///
    /// Calls made while a pass is running (from a mount or a collaborator
    /// emitting an event) are queued; each runs as its own full pass after
    /// the current one finishes.
    pub fn update_renders(&self) {
        self.pending_renders.fetch_add(1, Ordering::SeqCst);
        self.drain_renders();
    }

    fn drain_renders(&self) {
        loop {
            let Some(pass) = RenderPass::begin(&self.rendering) else {
                debug!("render pass already running, queued");
                return;
            };

            while self.pending_renders.load(Ordering::SeqCst) > 0 {
                self.pending_renders.fetch_sub(1, Ordering::SeqCst);
                self.render_all();
            }

            drop(pass);
            if self.pending_renders.load(Ordering::SeqCst) == 0 {
                break;
            }
        }
    }

    fn render_all(&self) {
        let snapshot = self.snapshot();
        let pending = self.targets.lock().prepare_all(&snapshot, self.i18n.as_ref());
        let (mounted, report) = mount_all(pending);
        self.targets.lock().commit(mounted);
        if !report.is_clean() {
            warn!(failed = report.failed.len(), "some render targets kept their previous render");
        }
    }

    /// Register a render target and render it with the current snapshot
    ///
    /// Fails with a configuration error if the template does not compile or
    /// the initial mount fails; the target is then not registered. Targets
    /// cannot be added from inside a render pass.
    pub fn add_target(&self, config: TargetConfig) -> CallControlResult<TargetId> {
        let result = {
            let Some(_pass) = RenderPass::begin(&self.rendering) else {
                return Err(CallControlError::internal("render pass in progress, target not added"));
            };
            self.register(config)
        };
        self.drain_renders();

        let id = result?;
        info!(target_id = %id, "render target added");
        Ok(id)
    }

    fn register(&self, config: TargetConfig) -> CallControlResult<TargetId> {
        let snapshot = self.snapshot();
        let (entry, initial) =
            self.targets
                .lock()
                .prepare_target(config, &snapshot, self.i18n.as_ref(), |key| self.bind(key))?;
        mount_initial(&initial)?;
        Ok(self.targets.lock().insert(entry, initial))
    }

    /// Unregister a render target; returns whether it existed
    pub fn remove_target(&self, id: TargetId) -> bool {
        self.targets.lock().remove_target(id)
    }

    /// Fire the action bound to an element id, as a click would
    pub fn trigger(&self, element_id: &str) -> CallControlResult<ActionKey> {
        let (target, key, handler) = self
            .targets
            .lock()
            .handler_for(element_id)
            .ok_or_else(|| CallControlError::UnknownElement {
                element_id: element_id.to_string(),
            })?;

        debug!(target_id = %target, action = %key, "element triggered");
        handler();
        Ok(key)
    }

    /// Inspect a registered target
    pub fn inspect_target<R>(&self, id: TargetId, f: impl FnOnce(&RenderTargetEntry) -> R) -> Option<R> {
        self.targets.lock().get(id).map(f)
    }

    /// Element id of an action on a target
    pub fn element_id(&self, id: TargetId, key: ActionKey) -> Option<String> {
        self.inspect_target(id, |entry| entry.element_id(key).map(str::to_string))
            .flatten()
    }

    /// Last successful markup of a target
    pub fn rendered(&self, id: TargetId) -> Option<String> {
        self.inspect_target(id, |entry| entry.last_render().map(str::to_string))
            .flatten()
    }

    /// Registered targets in registration order
    pub fn target_ids(&self) -> Vec<TargetId> {
        self.targets.lock().ids()
    }

    fn bind(&self, key: ActionKey) -> ActionHandler {
        let this = self.this.clone();
        let action = action_for(key);
        Arc::new(move || {
            if let Some(widget) = this.upgrade() {
                action(&widget);
            }
        })
    }
}

/// Marks a render pass as running until dropped, unwinding included
struct RenderPass<'a>(&'a AtomicBool);

impl<'a> RenderPass<'a> {
    fn begin(flag: &'a AtomicBool) -> Option<Self> {
        (!flag.swap(true, Ordering::SeqCst)).then_some(Self(flag))
    }
}

impl Drop for RenderPass<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn report(action: ActionKey, outcome: anyhow::Result<()>) {
    match outcome {
        Ok(()) => debug!(action = %action, "action forwarded"),
        Err(e) => warn!(action = %action, error = %e, "collaborator rejected action"),
    }
}
