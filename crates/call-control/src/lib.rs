//! # Call Control - Softphone Call Actions and Live Renders
//!
//! This crate provides the call-control widget of a softphone:
//! - **Actions**: redial, cancel, hangup, hold/unhold, mute/unmute, transfer, answer
//! - **Render targets**: any number of independently mounted views, each
//!   re-rendered from a fresh call snapshot whenever the primary call changes
//! - **Templates**: a small conditional template language keyed by dotted
//!   paths into the snapshot
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use webphone_call_control::{
//!     Call, CallControlBuilder, CallRegistry, EventBus, MemoryMount, PhoneEvent, PhoneEvents,
//!     TargetConfig,
//! };
//!
//! struct Calls;
//!
//! impl CallRegistry for Calls {
//!     fn get_call(&self) -> Option<Arc<dyn Call>> {
//!         None
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = Arc::new(EventBus::default());
//!     let view = Arc::new(MemoryMount::new());
//!
//!     let widget = CallControlBuilder::new()
//!         .call_registry(Arc::new(Calls))
//!         .event_bus(bus.clone())
//!         .render_target(TargetConfig::new(view.clone()))
//!         .build()?;
//!
//!     // Any primary-call lifecycle event re-renders every target
//!     bus.emit(PhoneEvent::CallPrimaryEstablished);
//!     println!("{}", view.markup().unwrap_or_default());
//!
//!     widget.hangup();
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! 1. **Snapshot**: [`build_snapshot`] derives a [`CallSnapshot`] from the
//!    call registry and user agent
//! 2. **Registry**: [`RenderTargetRegistry`] fans the snapshot out to every
//!    target, keeping element ids and bound handlers fixed
//! 3. **Bridge**: [`CallControl`] subscribes to the primary-call events and
//!    runs one full pass per event
//! 4. **Dispatcher**: action methods forward to the current call or user
//!    agent and do nothing when it is absent
//! 5. **Visibility**: [`visible_controls`] states which controls a snapshot
//!    shows, independent of markup

#![warn(missing_docs)]

pub mod error;
pub mod types;
pub mod collaborators;
pub mod snapshot;
pub mod visibility;
pub mod template;
pub mod i18n;
pub mod events;
pub mod render;
pub mod config;
pub mod builder;
pub mod call_control;

// Re-export main types
pub use error::{CallControlError, CallControlResult};
pub use types::{ActionKey, CallSnapshot, CallSummary};
pub use collaborators::{Call, CallRegistry, CallSummaryProvider, NoUserAgent, UserAgent, UserAgentProvider};
pub use snapshot::build_snapshot;
pub use visibility::{visible_controls, visible_groups, ControlGroup};
pub use template::{Template, DEFAULT_TEMPLATE};
pub use i18n::{I18nConfig, I18nRegistry, ResourceBundles, Translator};
pub use events::{EventBus, EventHandler, EventStream, PhoneEvent, PhoneEvents, SubscriptionId};
pub use render::{
    mount_all, ActionHandler, MemoryMount, Mount, PendingRender, RenderReport, RenderTargetEntry,
    RenderTargetRegistry, TargetConfig, TargetId, TargetOptions,
};
pub use config::{CallControlConfig, CallControlSettings};
pub use builder::CallControlBuilder;
pub use call_control::{CallControl, Collaborators};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
