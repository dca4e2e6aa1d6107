//! Core data types: action keys, call summaries and the presentation snapshot

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CallControlError;

/// A user action exposed by the widget
///
/// The set is closed. Each key maps to a widget method, an i18n message key
/// and a template visibility rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKey {
    /// Dial the last dialed target again
    Redial,
    /// Cancel an outbound call that is still ringing
    Cancel,
    /// Hang up an established call
    Hangup,
    /// Put the call on hold
    Hold,
    /// Resume a held call
    Unhold,
    /// Mute the local microphone
    Mute,
    /// Unmute the local microphone
    Unmute,
    /// Transfer the call
    Transfer,
    /// Answer an inbound ringing call
    Answer,
}

impl ActionKey {
    /// Every action key, in declaration order
    pub const ALL: [ActionKey; 9] = [
        ActionKey::Redial,
        ActionKey::Cancel,
        ActionKey::Hangup,
        ActionKey::Hold,
        ActionKey::Unhold,
        ActionKey::Mute,
        ActionKey::Unmute,
        ActionKey::Transfer,
        ActionKey::Answer,
    ];

    /// Lowercase name used in templates, i18n keys and element ids
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKey::Redial => "redial",
            ActionKey::Cancel => "cancel",
            ActionKey::Hangup => "hangup",
            ActionKey::Hold => "hold",
            ActionKey::Unhold => "unhold",
            ActionKey::Mute => "mute",
            ActionKey::Unmute => "unmute",
            ActionKey::Transfer => "transfer",
            ActionKey::Answer => "answer",
        }
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKey {
    type Err = CallControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| CallControlError::config(format!("Unknown action key: {}", s)))
    }
}

/// Phase flags of a call as reported by the call collaborator
///
/// The flags are not mutually exclusive. The widget copies them verbatim;
/// all interpretation happens in the visibility rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallSummary {
    /// Call is ringing (outbound) or being offered (inbound)
    pub progress: bool,
    /// Media is flowing
    pub established: bool,
    /// Call is on hold
    pub hold: bool,
    /// Local microphone is muted
    pub muted: bool,
    /// Call was received rather than placed
    pub terminating: bool,
}

impl CallSummary {
    /// An outbound call that is ringing
    pub fn ringing_outbound() -> Self {
        Self {
            progress: true,
            ..Default::default()
        }
    }

    /// An inbound call waiting to be answered
    pub fn ringing_inbound() -> Self {
        Self {
            progress: true,
            terminating: true,
            ..Default::default()
        }
    }

    /// An established call, neither held nor muted
    pub fn established() -> Self {
        Self {
            established: true,
            ..Default::default()
        }
    }
}

/// Immutable view-model rebuilt wholesale on every render cycle
///
/// `call` and `redial` are independent: a redial target may exist while a
/// call is up, and a call may exist without any redial target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSnapshot {
    /// Present iff there is a current call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call: Option<CallSummary>,
    /// Last dialed target, present iff the user agent reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redial: Option<String>,
}

impl CallSnapshot {
    /// Snapshot with neither a call nor a redial target
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot for a current call
    pub fn with_call(call: CallSummary) -> Self {
        Self {
            call: Some(call),
            redial: None,
        }
    }

    /// Set the redial target
    pub fn redial(mut self, target: impl Into<String>) -> Self {
        self.redial = Some(target.into());
        self
    }
}
