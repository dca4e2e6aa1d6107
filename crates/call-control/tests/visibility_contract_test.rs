//! The default template shows exactly the controls `visible_controls` names

use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use webphone_call_control::{
    visible_controls, visible_groups, ActionHandler, ActionKey, CallSnapshot, CallSummary, I18nRegistry,
    MemoryMount, RenderTargetRegistry, TargetConfig,
};

fn summaries() -> impl Strategy<Value = CallSummary> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(progress, established, hold, muted, terminating)| CallSummary {
            progress,
            established,
            hold,
            muted,
            terminating,
        },
    )
}

fn snapshots() -> impl Strategy<Value = CallSnapshot> {
    (proptest::option::of(summaries()), proptest::option::of("[+0-9]{1,12}"))
        .prop_map(|(call, redial)| CallSnapshot { call, redial })
}

fn rendered(snapshot: &CallSnapshot) -> BTreeSet<ActionKey> {
    let mut registry = RenderTargetRegistry::new();
    let mount = Arc::new(MemoryMount::new());
    let id = registry
        .add_target(
            TargetConfig::new(mount.clone()),
            snapshot,
            &I18nRegistry::default(),
            |_| -> ActionHandler { Arc::new(|| {}) },
        )
        .unwrap();

    let markup = mount.markup().unwrap();
    let entry = registry.get(id).unwrap();
    ActionKey::ALL
        .iter()
        .copied()
        .filter(|key| markup.contains(&format!("id=\"{}\"", entry.element_id(*key).unwrap())))
        .collect()
}

proptest! {
    #[test]
    fn template_matches_visibility_rules(snapshot in snapshots()) {
        prop_assert_eq!(rendered(&snapshot), visible_controls(&snapshot));
    }

    #[test]
    fn hold_and_mute_are_exclusive(summary in summaries()) {
        let visible = visible_controls(&CallSnapshot::with_call(summary));
        if summary.established {
            prop_assert!(visible.contains(&ActionKey::Hold) != visible.contains(&ActionKey::Unhold));
            prop_assert!(visible.contains(&ActionKey::Mute) != visible.contains(&ActionKey::Unmute));
            prop_assert_eq!(visible.contains(&ActionKey::Unhold), summary.hold);
            prop_assert_eq!(visible.contains(&ActionKey::Unmute), summary.muted);
            prop_assert!(visible.contains(&ActionKey::Transfer));
        } else {
            prop_assert!(!visible.contains(&ActionKey::Hangup));
            prop_assert!(!visible.contains(&ActionKey::Transfer));
        }
    }

    #[test]
    fn single_phase_calls_show_one_group(summary in summaries(), redial in proptest::option::of("[0-9]{3}")) {
        prop_assume!(!(summary.progress && summary.established));
        let snapshot = CallSnapshot { call: Some(summary), redial };
        prop_assert!(visible_groups(&snapshot).len() <= 1);
        prop_assert!(!visible_controls(&snapshot).contains(&ActionKey::Redial));
    }
}
