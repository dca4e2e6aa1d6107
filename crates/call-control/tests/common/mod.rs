//! Shared fakes for the integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use webphone_call_control::{
    ActionKey, Call, CallControl, CallControlBuilder, CallRegistry, CallSummary, CallSummaryProvider, EventBus,
    PhoneEvent, PhoneEvents, TargetId, UserAgent,
};

/// Call that updates its own flags and announces them on the bus
pub struct FakeCall {
    summary: Mutex<CallSummary>,
    bus: Arc<EventBus>,
    pub actions: Mutex<Vec<ActionKey>>,
}

impl FakeCall {
    pub fn new(summary: CallSummary, bus: Arc<EventBus>) -> Arc<Self> {
        Arc::new(Self {
            summary: Mutex::new(summary),
            bus,
            actions: Mutex::new(Vec::new()),
        })
    }

    fn apply(&self, action: ActionKey, change: impl FnOnce(&mut CallSummary), event: PhoneEvent) -> anyhow::Result<()> {
        self.actions.lock().push(action);
        change(&mut *self.summary.lock());
        self.bus.emit(event);
        Ok(())
    }
}

impl CallSummaryProvider for FakeCall {
    fn summary(&self) -> CallSummary {
        *self.summary.lock()
    }
}

impl Call for FakeCall {
    fn cancel(&self) -> anyhow::Result<()> {
        self.apply(ActionKey::Cancel, |s| s.progress = false, PhoneEvent::CallPrimaryTerminated)
    }

    fn hangup(&self) -> anyhow::Result<()> {
        self.apply(ActionKey::Hangup, |s| s.established = false, PhoneEvent::CallPrimaryTerminated)
    }

    fn hold(&self) -> anyhow::Result<()> {
        self.apply(ActionKey::Hold, |s| s.hold = true, PhoneEvent::CallPrimaryHold)
    }

    fn unhold(&self) -> anyhow::Result<()> {
        self.apply(ActionKey::Unhold, |s| s.hold = false, PhoneEvent::CallPrimaryUnhold)
    }

    fn mute(&self) -> anyhow::Result<()> {
        self.apply(ActionKey::Mute, |s| s.muted = true, PhoneEvent::CallPrimaryMuted)
    }

    fn unmute(&self) -> anyhow::Result<()> {
        self.apply(ActionKey::Unmute, |s| s.muted = false, PhoneEvent::CallPrimaryUnmuted)
    }

    fn transfer(&self) -> anyhow::Result<()> {
        self.actions.lock().push(ActionKey::Transfer);
        Ok(())
    }

    fn answer(&self) -> anyhow::Result<()> {
        self.apply(
            ActionKey::Answer,
            |s| {
                s.progress = false;
                s.established = true;
            },
            PhoneEvent::CallPrimaryEstablished,
        )
    }
}

/// Softphone state: the primary call and the last dialed number
pub struct FakePhone {
    pub bus: Arc<EventBus>,
    call: Mutex<Option<Arc<FakeCall>>>,
    redial_target: Mutex<Option<String>>,
    pub redials: AtomicUsize,
}

impl FakePhone {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            bus: Arc::new(EventBus::default()),
            call: Mutex::new(None),
            redial_target: Mutex::new(None),
            redials: AtomicUsize::new(0),
        })
    }

    /// Make `summary` the primary call without announcing it
    pub fn set_call(&self, summary: CallSummary) -> Arc<FakeCall> {
        let call = FakeCall::new(summary, self.bus.clone());
        *self.call.lock() = Some(call.clone());
        call
    }

    pub fn clear_call(&self) {
        *self.call.lock() = None;
    }

    pub fn set_redial(&self, target: &str) {
        *self.redial_target.lock() = Some(target.to_string());
    }
}

impl CallRegistry for FakePhone {
    fn get_call(&self) -> Option<Arc<dyn Call>> {
        self.call.lock().clone().map(|call| call as Arc<dyn Call>)
    }
}

impl UserAgent for FakePhone {
    fn redial(&self) -> anyhow::Result<()> {
        self.redials.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get_redial(&self) -> Option<String> {
        self.redial_target.lock().clone()
    }
}

/// Builder wired to a fake phone
pub fn builder(phone: &Arc<FakePhone>) -> CallControlBuilder {
    CallControlBuilder::new()
        .call_registry(phone.clone())
        .user_agent(Arc::new(phone.clone()))
        .event_bus(phone.bus.clone())
}

/// Mount that can be switched into a failing state
#[derive(Default)]
pub struct FlakyMount {
    failing: AtomicBool,
    markup: Mutex<Option<String>>,
}

impl FlakyMount {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn markup(&self) -> Option<String> {
        self.markup.lock().clone()
    }
}

impl webphone_call_control::Mount for FlakyMount {
    fn mount(&self, markup: &str) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("mount point detached");
        }
        *self.markup.lock() = Some(markup.to_string());
        Ok(())
    }
}

/// Actions whose element id appears in the markup of `target`
pub fn rendered_controls(widget: &CallControl, target: TargetId, markup: &str) -> BTreeSet<ActionKey> {
    ActionKey::ALL
        .iter()
        .copied()
        .filter(|key| {
            let id = widget.element_id(target, *key).expect("element id assigned");
            markup.contains(&format!("id=\"{}\"", id))
        })
        .collect()
}

pub fn keys(list: &[ActionKey]) -> BTreeSet<ActionKey> {
    list.iter().copied().collect()
}

/// Route widget logs to the test output
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("webphone_call_control=debug")
        .with_test_writer()
        .try_init();
}
