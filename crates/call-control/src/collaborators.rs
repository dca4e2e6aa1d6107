//! Contracts the widget relies on from the rest of the softphone
//!
//! The widget never owns calls or the user agent. It reaches them only
//! through these traits, handed to it at construction.

use std::sync::Arc;

use crate::types::CallSummary;

/// Anything that can describe its current call phase
pub trait CallSummaryProvider: Send + Sync {
    /// Current phase flags
    fn summary(&self) -> CallSummary;
}

/// A call session the widget can act on
///
/// Each action is forwarded without validation; the call decides whether the
/// transition is legal and reports the outcome through lifecycle events.
pub trait Call: CallSummaryProvider {
    /// Cancel an outbound call before it is answered
    fn cancel(&self) -> anyhow::Result<()>;
    /// Hang up the call
    fn hangup(&self) -> anyhow::Result<()>;
    /// Put the call on hold
    fn hold(&self) -> anyhow::Result<()>;
    /// Resume the call
    fn unhold(&self) -> anyhow::Result<()>;
    /// Mute the local microphone
    fn mute(&self) -> anyhow::Result<()>;
    /// Unmute the local microphone
    fn unmute(&self) -> anyhow::Result<()>;
    /// Transfer the call
    fn transfer(&self) -> anyhow::Result<()>;
    /// Answer an inbound call
    fn answer(&self) -> anyhow::Result<()>;
}

/// The softphone's user agent
pub trait UserAgent: Send + Sync {
    /// Dial the last dialed target again
    fn redial(&self) -> anyhow::Result<()>;
    /// Last dialed target, if any
    fn get_redial(&self) -> Option<String>;
}

/// Registry of calls known to the softphone
pub trait CallRegistry: Send + Sync {
    /// The current (primary) call, if any
    fn get_call(&self) -> Option<Arc<dyn Call>>;
}

/// Source of the user agent, which may not exist yet
pub trait UserAgentProvider: Send + Sync {
    /// The user agent, if one has been created
    fn user_agent(&self) -> Option<Arc<dyn UserAgent>>;
}

impl<T: UserAgent + 'static> UserAgentProvider for Arc<T> {
    fn user_agent(&self) -> Option<Arc<dyn UserAgent>> {
        Some(self.clone() as Arc<dyn UserAgent>)
    }
}

/// Provider for softphones running without a user agent
#[derive(Debug, Default, Clone, Copy)]
pub struct NoUserAgent;

impl UserAgentProvider for NoUserAgent {
    fn user_agent(&self) -> Option<Arc<dyn UserAgent>> {
        None
    }
}
