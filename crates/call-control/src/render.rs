//! Render targets and the registry that keeps them in sync
//!
//! Every target owns a compiled template, a label key map, a set of element
//! ids and a table of bound action handlers. Ids and handlers are fixed at
//! registration; a render pass only swaps the snapshot and re-evaluates the
//! template.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{CallControlError, CallControlResult};
use crate::i18n::{default_key_map, Translator};
use crate::template::{Template, DEFAULT_TEMPLATE};
use crate::types::{ActionKey, CallSnapshot};

/// Where rendered markup ends up
///
/// A mount that returns an error keeps whatever it showed before.
pub trait Mount: Send + Sync {
    /// Replace the mounted content with `markup`
    fn mount(&self, markup: &str) -> anyhow::Result<()>;
}

/// Mount that keeps the latest markup in memory
#[derive(Debug, Default)]
pub struct MemoryMount {
    markup: Mutex<Option<String>>,
    mounts: AtomicUsize,
}

impl MemoryMount {
    /// Create an empty mount
    pub fn new() -> Self {
        Self::default()
    }

    /// Markup from the last successful mount
    pub fn markup(&self) -> Option<String> {
        self.markup.lock().clone()
    }

    /// How many times markup was mounted
    pub fn mount_count(&self) -> usize {
        self.mounts.load(Ordering::SeqCst)
    }
}

impl Mount for MemoryMount {
    fn mount(&self, markup: &str) -> anyhow::Result<()> {
        *self.markup.lock() = Some(markup.to_string());
        self.mounts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Identifier of a registered target
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId(u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target-{}", self.0)
    }
}

/// Serializable per-target settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetOptions {
    /// Template source; the default template when absent
    #[serde(default)]
    pub template: Option<String>,
    /// Message key overrides per action
    #[serde(default)]
    pub i18n: BTreeMap<ActionKey, String>,
    /// Element id overrides per action
    #[serde(default)]
    pub element_ids: BTreeMap<ActionKey, String>,
}

/// A mount plus its settings
#[derive(Clone)]
pub struct TargetConfig {
    /// Where markup is mounted
    pub mount: Arc<dyn Mount>,
    /// Template, labels and ids
    pub options: TargetOptions,
}

impl TargetConfig {
    /// Target using the default template, labels and generated ids
    pub fn new(mount: Arc<dyn Mount>) -> Self {
        Self {
            mount,
            options: TargetOptions::default(),
        }
    }

    /// Target with deserialized options
    pub fn with_options(mount: Arc<dyn Mount>, options: TargetOptions) -> Self {
        Self { mount, options }
    }

    /// Use a custom template
    pub fn template(mut self, source: impl Into<String>) -> Self {
        self.options.template = Some(source.into());
        self
    }

    /// Use a custom message key for an action label
    pub fn label_key(mut self, action: ActionKey, key: impl Into<String>) -> Self {
        self.options.i18n.insert(action, key.into());
        self
    }

    /// Pin the element id of an action
    pub fn element_id(mut self, action: ActionKey, id: impl Into<String>) -> Self {
        self.options.element_ids.insert(action, id.into());
        self
    }
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Zero-argument callback bound to an action
pub type ActionHandler = Arc<dyn Fn() + Send + Sync>;

/// A registered render target
pub struct RenderTargetEntry {
    id: TargetId,
    mount: Arc<dyn Mount>,
    template: Template,
    label_keys: BTreeMap<ActionKey, String>,
    element_ids: BTreeMap<ActionKey, String>,
    handlers: BTreeMap<ActionKey, ActionHandler>,
    data: CallSnapshot,
    last_render: Option<String>,
    render_count: usize,
}

impl RenderTargetEntry {
    /// Target id
    pub fn id(&self) -> TargetId {
        self.id
    }

    /// Element id bound to an action
    pub fn element_id(&self, action: ActionKey) -> Option<&str> {
        self.element_ids.get(&action).map(String::as_str)
    }

    /// All element ids of this target
    pub fn element_ids(&self) -> &BTreeMap<ActionKey, String> {
        &self.element_ids
    }

    /// Snapshot of the last render attempt
    pub fn data(&self) -> &CallSnapshot {
        &self.data
    }

    /// Markup from the last successful render
    pub fn last_render(&self) -> Option<&str> {
        self.last_render.as_deref()
    }

    /// Number of successful renders
    pub fn render_count(&self) -> usize {
        self.render_count
    }

    fn context(&self, translator: &dyn Translator) -> Value {
        let labels: Map<String, Value> = self
            .label_keys
            .iter()
            .map(|(action, key)| (action.as_str().to_string(), Value::String(translator.translate(key))))
            .collect();

        let by_id: Map<String, Value> = self
            .element_ids
            .iter()
            .map(|(action, id)| (action.as_str().to_string(), json!({ "elementId": id })))
            .collect();

        json!({
            "data": self.data,
            "i18n": labels,
            "by_id": by_id,
        })
    }

    fn prepare(&mut self, snapshot: &CallSnapshot, translator: &dyn Translator) -> PendingRender {
        self.data = snapshot.clone();
        PendingRender {
            target: self.id,
            mount: self.mount.clone(),
            markup: self.template.render(&self.context(translator)),
        }
    }
}

impl fmt::Debug for RenderTargetEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderTargetEntry")
            .field("id", &self.id)
            .field("element_ids", &self.element_ids)
            .field("data", &self.data)
            .field("render_count", &self.render_count)
            .finish_non_exhaustive()
    }
}

/// Outcome of a fan-out pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    /// Targets rendered successfully
    pub rendered: Vec<TargetId>,
    /// Targets that failed, with the reason
    pub failed: Vec<(TargetId, String)>,
}

impl RenderReport {
    /// Whether every target rendered
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Markup rendered for a target but not yet mounted
///
/// Produced under the registry lock, mounted after it is released so a
/// mount may call back into the widget.
pub struct PendingRender {
    target: TargetId,
    mount: Arc<dyn Mount>,
    markup: String,
}

impl PendingRender {
    /// Target the markup belongs to
    pub fn target(&self) -> TargetId {
        self.target
    }

    /// The rendered markup
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Hand the markup to the target's mount
    pub fn mount(&self) -> CallControlResult<()> {
        self.mount
            .mount(&self.markup)
            .map_err(|e| CallControlError::mount(self.target, e.to_string()))
    }
}

impl fmt::Debug for PendingRender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRender")
            .field("target", &self.target)
            .field("markup", &self.markup)
            .finish_non_exhaustive()
    }
}

/// Mount every pending render in order
///
/// Returns the renders that mounted, ready for [`RenderTargetRegistry::commit`].
/// A failing mount is logged and left out; the rest still mount.
pub fn mount_all(pending: Vec<PendingRender>) -> (Vec<PendingRender>, RenderReport) {
    let mut report = RenderReport::default();
    let mut mounted = Vec::with_capacity(pending.len());

    for render in pending {
        match render.mount() {
            Ok(()) => {
                report.rendered.push(render.target);
                mounted.push(render);
            }
            Err(e) => {
                warn!(target_id = %render.target, error = %e, "render target failed to update");
                report.failed.push((render.target, e.to_string()));
            }
        }
    }

    debug!(rendered = report.rendered.len(), failed = report.failed.len(), "render pass complete");
    (mounted, report)
}

/// Ordered set of render targets
#[derive(Debug, Default)]
pub struct RenderTargetRegistry {
    entries: Vec<RenderTargetEntry>,
    next_id: u64,
}

impl RenderTargetRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a target and render it once with `snapshot`
    ///
    /// `bind` produces the handler for each action; it is called once per
    /// action here and never again for this target. On any error the target
    /// is not registered.
    pub fn add_target(
        &mut self,
        config: TargetConfig,
        snapshot: &CallSnapshot,
        translator: &dyn Translator,
        bind: impl Fn(ActionKey) -> ActionHandler,
    ) -> CallControlResult<TargetId> {
        let (entry, initial) = self.prepare_target(config, snapshot, translator, bind)?;
        mount_initial(&initial)?;
        Ok(self.insert(entry, initial))
    }

    /// Build a target and its initial render without registering it
    ///
    /// Validates the template and element ids against the registered
    /// targets. The caller mounts the render and then calls [`insert`].
    ///
    /// [`insert`]: RenderTargetRegistry::insert
    pub fn prepare_target(
        &mut self,
        config: TargetConfig,
        snapshot: &CallSnapshot,
        translator: &dyn Translator,
        bind: impl Fn(ActionKey) -> ActionHandler,
    ) -> CallControlResult<(RenderTargetEntry, PendingRender)> {
        self.next_id += 1;
        let id = TargetId(self.next_id);
        let TargetConfig { mount, options } = config;

        let template = Template::compile(options.template.as_deref().unwrap_or(DEFAULT_TEMPLATE))?;

        let mut label_keys = default_key_map();
        label_keys.extend(options.i18n);

        let element_ids = assign_element_ids(id, options.element_ids)?;
        if let Some(taken) = element_ids
            .values()
            .find(|candidate| self.entries.iter().any(|entry| entry.element_ids.values().any(|e| e == *candidate)))
        {
            return Err(CallControlError::config(format!(
                "Element id '{}' is already bound by another target",
                taken
            )));
        }

        let handlers = ActionKey::ALL.iter().map(|action| (*action, bind(*action))).collect();

        let mut entry = RenderTargetEntry {
            id,
            mount,
            template,
            label_keys,
            element_ids,
            handlers,
            data: snapshot.clone(),
            last_render: None,
            render_count: 0,
        };
        let initial = entry.prepare(snapshot, translator);
        Ok((entry, initial))
    }

    /// Register a prepared target whose initial render mounted
    pub fn insert(&mut self, mut entry: RenderTargetEntry, initial: PendingRender) -> TargetId {
        let id = entry.id;
        entry.last_render = Some(initial.markup);
        entry.render_count += 1;
        debug!(target_id = %id, "registered render target");
        self.entries.push(entry);
        id
    }

    /// Render every target with `snapshot`, in registration order
    ///
    /// Nothing is mounted here; see [`mount_all`] and [`commit`].
    ///
    /// [`commit`]: RenderTargetRegistry::commit
    pub fn prepare_all(&mut self, snapshot: &CallSnapshot, translator: &dyn Translator) -> Vec<PendingRender> {
        self.entries
            .iter_mut()
            .map(|entry| entry.prepare(snapshot, translator))
            .collect()
    }

    /// Record mounted renders; targets removed in the meantime are skipped
    pub fn commit(&mut self, mounted: Vec<PendingRender>) {
        for render in mounted {
            if let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == render.target) {
                entry.last_render = Some(render.markup);
                entry.render_count += 1;
            }
        }
    }

    /// Re-render every target with `snapshot`, in registration order
    ///
    /// A failing target is logged and keeps its last good markup; the pass
    /// continues with the remaining targets.
    pub fn update_all(&mut self, snapshot: &CallSnapshot, translator: &dyn Translator) -> RenderReport {
        let pending = self.prepare_all(snapshot, translator);
        let (mounted, report) = mount_all(pending);
        self.commit(mounted);
        report
    }

    /// Unregister a target; returns whether it existed
    pub fn remove_target(&mut self, id: TargetId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    /// Handler bound to an element id, with its owner and action
    pub fn handler_for(&self, element_id: &str) -> Option<(TargetId, ActionKey, ActionHandler)> {
        self.entries.iter().find_map(|entry| {
            let (action, _) = entry.element_ids.iter().find(|(_, id)| id.as_str() == element_id)?;
            let handler = entry.handlers.get(action)?.clone();
            Some((entry.id, *action, handler))
        })
    }

    /// Look up a target
    pub fn get(&self, id: TargetId) -> Option<&RenderTargetEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Registered target ids in registration order
    pub fn ids(&self) -> Vec<TargetId> {
        self.entries.iter().map(|entry| entry.id).collect()
    }

    /// Number of registered targets
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no targets are registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Mount a target's first render, failing registration if it does not mount
pub fn mount_initial(initial: &PendingRender) -> CallControlResult<()> {
    initial.mount().map_err(|e| {
        CallControlError::config(format!("Target {} failed its initial render: {}", initial.target, e))
    })
}

fn assign_element_ids(
    target: TargetId,
    overrides: BTreeMap<ActionKey, String>,
) -> CallControlResult<BTreeMap<ActionKey, String>> {
    let mut seen = HashSet::new();
    for (action, id) in &overrides {
        if id.trim().is_empty() {
            return Err(CallControlError::config(format!("Empty element id for action '{}'", action)));
        }
        if !seen.insert(id.as_str()) {
            return Err(CallControlError::config(format!("Duplicate element id '{}'", id)));
        }
    }

    let prefix = uuid::Uuid::new_v4().simple().to_string();
    let ids = ActionKey::ALL
        .iter()
        .map(|action| {
            let id = overrides
                .get(action)
                .cloned()
                .unwrap_or_else(|| format!("lwp-{}-{}-{}", &prefix[..8], target.0, action));
            (*action, id)
        })
        .collect::<BTreeMap<_, _>>();

    let unique: HashSet<&String> = ids.values().collect();
    if unique.len() != ids.len() {
        return Err(CallControlError::config("Element id override collides with a generated id"));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::I18nRegistry;
    use crate::types::CallSummary;

    struct BrokenMount;

    impl Mount for BrokenMount {
        fn mount(&self, _markup: &str) -> anyhow::Result<()> {
            anyhow::bail!("mount point detached")
        }
    }

    fn noop(_: ActionKey) -> ActionHandler {
        Arc::new(|| {})
    }

    #[test]
    fn test_add_target_renders_immediately() {
        let mut registry = RenderTargetRegistry::new();
        let mount = Arc::new(MemoryMount::new());
        let snapshot = CallSnapshot::empty().redial("+15551234");

        let id = registry
            .add_target(TargetConfig::new(mount.clone()), &snapshot, &I18nRegistry::default(), noop)
            .unwrap();

        assert_eq!(mount.mount_count(), 1);
        let entry = registry.get(id).unwrap();
        assert_eq!(entry.render_count(), 1);
        assert_eq!(entry.data(), &snapshot);
        assert!(mount.markup().unwrap().contains("+15551234"));
    }

    #[test]
    fn test_element_ids_stable_across_updates() {
        let mut registry = RenderTargetRegistry::new();
        let mount = Arc::new(MemoryMount::new());
        let i18n = I18nRegistry::default();
        let id = registry
            .add_target(TargetConfig::new(mount.clone()), &CallSnapshot::empty(), &i18n, noop)
            .unwrap();
        let before = registry.get(id).unwrap().element_ids().clone();

        registry.update_all(&CallSnapshot::with_call(CallSummary::established()), &i18n);
        registry.update_all(&CallSnapshot::with_call(CallSummary::ringing_inbound()), &i18n);

        assert_eq!(registry.get(id).unwrap().element_ids(), &before);
        let answer_id = &before[&ActionKey::Answer];
        assert!(mount.markup().unwrap().contains(answer_id.as_str()));
    }

    #[test]
    fn test_handlers_bound_once_per_action() {
        let mut registry = RenderTargetRegistry::new();
        let bound = Arc::new(AtomicUsize::new(0));
        let counter = bound.clone();
        let i18n = I18nRegistry::default();

        registry
            .add_target(
                TargetConfig::new(Arc::new(MemoryMount::new())),
                &CallSnapshot::empty(),
                &i18n,
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    noop(ActionKey::Redial)
                },
            )
            .unwrap();
        registry.update_all(&CallSnapshot::empty(), &i18n);
        registry.update_all(&CallSnapshot::empty(), &i18n);

        assert_eq!(bound.load(Ordering::SeqCst), ActionKey::ALL.len());
    }

    #[test]
    fn test_update_all_reports_rendered_targets() {
        let mut registry = RenderTargetRegistry::new();
        let i18n = I18nRegistry::default();
        let good = Arc::new(MemoryMount::new());
        registry
            .add_target(TargetConfig::new(good.clone()), &CallSnapshot::empty(), &i18n, noop)
            .unwrap();

        let report = registry.update_all(&CallSnapshot::with_call(CallSummary::established()), &i18n);
        assert!(report.is_clean());
        assert_eq!(good.mount_count(), 2);
    }

    #[test]
    fn test_unrenderable_target_rejected_at_registration() {
        let mut registry = RenderTargetRegistry::new();
        let i18n = I18nRegistry::default();

        let broken = registry.add_target(TargetConfig::new(Arc::new(BrokenMount)), &CallSnapshot::empty(), &i18n, noop);
        assert!(matches!(broken, Err(CallControlError::Configuration { .. })));

        let bad_template = registry.add_target(
            TargetConfig::new(Arc::new(MemoryMount::new())).template("{{#data.call}}"),
            &CallSnapshot::empty(),
            &i18n,
            noop,
        );
        assert!(matches!(bad_template, Err(CallControlError::Template { .. })));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_element_id_overrides_validated() {
        let mut registry = RenderTargetRegistry::new();
        let i18n = I18nRegistry::default();
        let mount: Arc<dyn Mount> = Arc::new(MemoryMount::new());

        let duplicate = TargetConfig::new(mount.clone())
            .element_id(ActionKey::Hold, "btn")
            .element_id(ActionKey::Mute, "btn");
        assert!(registry.add_target(duplicate, &CallSnapshot::empty(), &i18n, noop).is_err());

        let pinned = TargetConfig::new(mount.clone()).element_id(ActionKey::Hangup, "hangup-btn");
        let id = registry.add_target(pinned, &CallSnapshot::empty(), &i18n, noop).unwrap();
        assert_eq!(registry.get(id).unwrap().element_id(ActionKey::Hangup), Some("hangup-btn"));

        let clash = TargetConfig::new(mount).element_id(ActionKey::Cancel, "hangup-btn");
        assert!(registry.add_target(clash, &CallSnapshot::empty(), &i18n, noop).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_prepared_renders_commit_only_for_live_targets() {
        let mut registry = RenderTargetRegistry::new();
        let i18n = I18nRegistry::default();
        let kept = Arc::new(MemoryMount::new());
        let dropped = Arc::new(MemoryMount::new());
        let kept_id = registry
            .add_target(TargetConfig::new(kept.clone()), &CallSnapshot::empty(), &i18n, noop)
            .unwrap();
        let dropped_id = registry
            .add_target(TargetConfig::new(dropped.clone()), &CallSnapshot::empty(), &i18n, noop)
            .unwrap();

        let pending = registry.prepare_all(&CallSnapshot::with_call(CallSummary::established()), &i18n);
        assert_eq!(pending.len(), 2);
        assert_eq!(kept.mount_count(), 1);

        let (mounted, report) = mount_all(pending);
        assert!(report.is_clean());
        assert!(registry.remove_target(dropped_id));
        registry.commit(mounted);

        assert_eq!(kept.mount_count(), 2);
        assert_eq!(dropped.mount_count(), 2);
        assert_eq!(registry.get(kept_id).unwrap().render_count(), 2);
        assert_eq!(registry.ids(), vec![kept_id]);
    }

    #[test]
    fn test_failed_mount_keeps_last_good_markup() {
        let mut registry = RenderTargetRegistry::new();
        let i18n = I18nRegistry::default();
        let id = registry
            .add_target(TargetConfig::new(Arc::new(MemoryMount::new())), &CallSnapshot::empty(), &i18n, noop)
            .unwrap();
        let before = registry.get(id).unwrap().last_render().unwrap().to_string();

        let mut pending = registry.prepare_all(&CallSnapshot::with_call(CallSummary::established()), &i18n);
        pending[0].mount = Arc::new(BrokenMount);
        let (mounted, report) = mount_all(pending);
        registry.commit(mounted);

        assert_eq!(report.failed.len(), 1);
        assert_eq!(registry.get(id).unwrap().last_render(), Some(before.as_str()));
        assert_eq!(registry.get(id).unwrap().render_count(), 1);
    }

    #[test]
    fn test_handler_lookup_and_removal() {
        let mut registry = RenderTargetRegistry::new();
        let i18n = I18nRegistry::default();
        let id = registry
            .add_target(TargetConfig::new(Arc::new(MemoryMount::new())), &CallSnapshot::empty(), &i18n, noop)
            .unwrap();
        let mute_id = registry.get(id).unwrap().element_id(ActionKey::Mute).unwrap().to_string();

        let (owner, action, _) = registry.handler_for(&mute_id).unwrap();
        assert_eq!((owner, action), (id, ActionKey::Mute));
        assert!(registry.handler_for("nope").is_none());

        assert!(registry.remove_target(id));
        assert!(registry.handler_for(&mute_id).is_none());
        assert!(!registry.remove_target(id));
    }
}
