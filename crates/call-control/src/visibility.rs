//! Which controls a snapshot shows, independent of any markup
//!
//! The default template encodes the same rules as sections over the
//! snapshot; tests keep the two in agreement.

use std::collections::BTreeSet;

use crate::types::{ActionKey, CallSnapshot};

/// Mutually exclusive groups of controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ControlGroup {
    /// No call, a redial target exists
    Redial,
    /// Outbound call ringing
    Cancel,
    /// Established call: hangup, hold/unhold, mute/unmute, transfer
    InCall,
    /// Inbound call ringing
    Answer,
}

impl ControlGroup {
    /// The group an action key belongs to
    pub fn of(key: ActionKey) -> Self {
        match key {
            ActionKey::Redial => ControlGroup::Redial,
            ActionKey::Cancel => ControlGroup::Cancel,
            ActionKey::Answer => ControlGroup::Answer,
            ActionKey::Hangup
            | ActionKey::Hold
            | ActionKey::Unhold
            | ActionKey::Mute
            | ActionKey::Unmute
            | ActionKey::Transfer => ControlGroup::InCall,
        }
    }
}

/// Controls visible for a snapshot
///
/// - Redial: no call and a non-empty redial target.
/// - Cancel: call in progress and not terminating.
/// - Hangup, Transfer, Hold xor Unhold, Mute xor Unmute: call established.
/// - Answer: call terminating and in progress.
pub fn visible_controls(snapshot: &CallSnapshot) -> BTreeSet<ActionKey> {
    let mut visible = BTreeSet::new();

    let Some(call) = snapshot.call else {
        if snapshot.redial.as_deref().is_some_and(|target| !target.is_empty()) {
            visible.insert(ActionKey::Redial);
        }
        return visible;
    };

    // A ringing inbound call offers Answer only.
    if call.progress && !call.terminating {
        visible.insert(ActionKey::Cancel);
    }

    if call.established {
        visible.insert(ActionKey::Hangup);
        visible.insert(if call.hold { ActionKey::Unhold } else { ActionKey::Hold });
        visible.insert(if call.muted { ActionKey::Unmute } else { ActionKey::Mute });
        visible.insert(ActionKey::Transfer);
    }

    if call.terminating && call.progress {
        visible.insert(ActionKey::Answer);
    }

    visible
}

/// Groups with at least one visible control
pub fn visible_groups(snapshot: &CallSnapshot) -> BTreeSet<ControlGroup> {
    visible_controls(snapshot)
        .into_iter()
        .map(ControlGroup::of)
        .collect()
}
