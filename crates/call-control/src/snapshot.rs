//! Presentation snapshot builder

use crate::collaborators::{CallRegistry, UserAgentProvider};
use crate::types::CallSnapshot;

/// Derive the current presentation snapshot from the collaborators
///
/// Pure per invocation: the result depends only on collaborator state at
/// the time of the call. The call summary is copied as reported.
pub fn build_snapshot(calls: &dyn CallRegistry, user_agents: &dyn UserAgentProvider) -> CallSnapshot {
    let call = calls.get_call().map(|call| call.summary());
    let redial = user_agents.user_agent().and_then(|ua| ua.get_redial());

    CallSnapshot { call, redial }
}
