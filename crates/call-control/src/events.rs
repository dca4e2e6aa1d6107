//! Event system for the call-control widget
//!
//! Handlers registered with [`EventBus::on`] run synchronously inside
//! [`EventBus::emit`], in subscription order. Async observers can also take a
//! broadcast stream of every emitted event.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Lifecycle events relevant to call control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhoneEvent {
    /// A call became the primary call
    CallPrimaryPromoted,
    /// The primary call is ringing
    CallPrimaryProgress,
    /// The primary call was answered
    CallPrimaryEstablished,
    /// The primary call was put on hold
    CallPrimaryHold,
    /// The primary call was resumed
    CallPrimaryUnhold,
    /// The primary call was muted
    CallPrimaryMuted,
    /// The primary call was unmuted
    CallPrimaryUnmuted,
    /// The primary call ended
    CallPrimaryTerminated,
    /// A call-control widget finished construction
    CallControlStarted,
}

impl PhoneEvent {
    /// Events that trigger a full re-render of every target
    pub const REFRESH_EVENTS: [PhoneEvent; 7] = [
        PhoneEvent::CallPrimaryPromoted,
        PhoneEvent::CallPrimaryProgress,
        PhoneEvent::CallPrimaryEstablished,
        PhoneEvent::CallPrimaryHold,
        PhoneEvent::CallPrimaryUnhold,
        PhoneEvent::CallPrimaryMuted,
        PhoneEvent::CallPrimaryUnmuted,
    ];

    /// Dotted event name
    pub fn as_str(&self) -> &'static str {
        match self {
            PhoneEvent::CallPrimaryPromoted => "call.primary.promoted",
            PhoneEvent::CallPrimaryProgress => "call.primary.progress",
            PhoneEvent::CallPrimaryEstablished => "call.primary.established",
            PhoneEvent::CallPrimaryHold => "call.primary.hold",
            PhoneEvent::CallPrimaryUnhold => "call.primary.unhold",
            PhoneEvent::CallPrimaryMuted => "call.primary.muted",
            PhoneEvent::CallPrimaryUnmuted => "call.primary.unmuted",
            PhoneEvent::CallPrimaryTerminated => "call.primary.terminated",
            PhoneEvent::CallControlStarted => "callControl.started",
        }
    }
}

impl fmt::Display for PhoneEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synchronous event handler
pub type EventHandler = Arc<dyn Fn(&PhoneEvent) + Send + Sync>;

/// Handle returned by [`PhoneEvents::on`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Subscription handle the widget is constructed with
pub trait PhoneEvents: Send + Sync {
    /// Run `handler` every time `event` is emitted
    fn on(&self, event: PhoneEvent, handler: EventHandler) -> SubscriptionId;
    /// Announce an event to every subscriber
    fn emit(&self, event: PhoneEvent);
}

/// Every event a bus emits, for async observers
pub type EventStream = BroadcastStream<PhoneEvent>;

struct Subscription {
    id: SubscriptionId,
    event: PhoneEvent,
    handler: EventHandler,
}

/// In-process event bus
pub struct EventBus {
    handlers: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
    sender: broadcast::Sender<PhoneEvent>,
}

impl EventBus {
    /// Create a new bus whose broadcast side buffers `capacity` events
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            sender,
        }
    }

    /// Remove a handler; returns whether it was registered
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|subscription| subscription.id != id);
        handlers.len() != before
    }

    /// Number of synchronous handlers for an event
    pub fn handler_count(&self, event: PhoneEvent) -> usize {
        self.handlers
            .read()
            .iter()
            .filter(|subscription| subscription.event == event)
            .count()
    }

    /// Observe emitted events asynchronously
    ///
    /// Synchronous handlers run first; the stream sees each event after
    /// they return. A lagging stream yields an error item and skips ahead.
    pub fn subscribe(&self) -> EventStream {
        BroadcastStream::new(self.sender.subscribe())
    }
}

impl PhoneEvents for EventBus {
    fn on(&self, event: PhoneEvent, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push(Subscription { id, event, handler });
        id
    }

    fn emit(&self, event: PhoneEvent) {
        // Handlers may subscribe or emit in turn, so run them unlocked.
        let matching: Vec<EventHandler> = self
            .handlers
            .read()
            .iter()
            .filter(|subscription| subscription.event == event)
            .map(|subscription| subscription.handler.clone())
            .collect();

        tracing::trace!(event = %event, handlers = matching.len(), "emitting event");
        for handler in matching {
            handler(&event);
        }

        // Ignore send errors (no receivers)
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
