//! Session orchestration for Nova's remote debugger client.
//!
//! This crate sits between the transport that talks to a remote debuggee and
//! the host UI. It does not speak any wire protocol itself; instead it reacts
//! to an ordered stream of [`SessionEvent`]s and coordinates:
//!
//! - a negotiation timeout that aborts connection attempts which never finish
//!   their handshake ([`NegotiationGuard`]),
//! - typed message routing, currently only script-cache synchronization
//!   ([`MessageRouter`]),
//! - a process-wide freeze/thaw signal used to pause debuggee-visible state
//!   ([`FreezeCoordinator`]),
//! - discovery of network protocol plugins and optional, dynamically loaded
//!   capability modules such as crash reporting ([`PluginRegistry`],
//!   [`plugins::find_optional_capability`]).
//!
//! All collaborators (session, file registry, notification sink, window
//! attention) are injected explicitly; see [`RemoteDebugClient`].

pub mod attention;
pub mod client;
pub mod config;
pub mod error;
pub mod freeze;
pub mod hardening;
pub mod metrics;
pub mod negotiation;
pub mod notify;
pub mod plugins;
pub mod router;
pub mod session;

pub use crate::attention::{BreakpointAttention, WindowAttention, WindowHandle};
pub use crate::client::{RemoteDebugClient, RemoteDebugServices};
pub use crate::config::{init_tracing, LoggingConfig, PluginConfig, RemoteDebugConfig};
pub use crate::error::{
    AttentionError, CapabilityInitError, CapabilityLoadError, ConfigError, DecodeError, RouteError,
};
pub use crate::freeze::{FreezeCoordinator, Subscription};
pub use crate::metrics::{SessionMetrics, SessionMetricsSnapshot};
pub use crate::negotiation::{GuardState, NegotiationGuard, NEGOTIATION_TIMEOUT};
pub use crate::notify::{Notifier, NotificationSink, RecordingSink, Severity, TracingSink};
pub use crate::plugins::{
    CapabilityProvider, NetworkPluginDescriptor, NetworkProtocolPlugin, PluginRegistry,
    StaticCapabilities,
};
pub use crate::router::{
    FileDescriptor, FileRegistry, MessageHandler, MessageRouter, ScriptCacheEntry,
    ScriptCacheHandler, SCRIPT_CACHE_TYPE_CODE,
};
pub use crate::session::{
    ConnectionState, DebugSession, InboundMessage, SessionEvent, SessionHub, SessionObserver,
};
