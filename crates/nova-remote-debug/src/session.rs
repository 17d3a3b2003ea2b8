//! Session lifecycle contract and event fan-out.
//!
//! The transport collaborator owns the actual connection; it reports lifecycle
//! changes by calling [`SessionHub::emit`]. Every registered [`SessionObserver`]
//! sees every event, synchronously and in the same order.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex, RwLock};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionState {
    pub fn is_active(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

/// A received protocol unit. The payload schema is identified by `type_code`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub type_code: u16,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(type_code: u16, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            type_code,
            payload: payload.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Connecting,
    Connected,
    Disconnected,
    DataReady(InboundMessage),
    BreakpointHit,
}

impl SessionEvent {
    fn name(&self) -> &'static str {
        match self {
            SessionEvent::Connecting => "connecting",
            SessionEvent::Connected => "connected",
            SessionEvent::Disconnected => "disconnected",
            SessionEvent::DataReady(_) => "data_ready",
            SessionEvent::BreakpointHit => "breakpoint_hit",
        }
    }
}

/// Commands the orchestration layer can issue to the live connection.
pub trait DebugSession: Send + Sync {
    /// Tear down the current connection. The transport is expected to report
    /// the result through a `Disconnected` event.
    fn disconnect(&self);
}

pub trait SessionObserver: Send + Sync {
    fn on_session_event(&self, event: &SessionEvent);
}

/// Fans session lifecycle events out to observers and tracks the session's
/// connection state.
pub struct SessionHub {
    // Held across the state change and delivery so every observer sees events
    // in the order the state changed. Re-entrant for same-thread follow-up events.
    emission: ReentrantMutex<()>,
    state: Mutex<ConnectionState>,
    observers: RwLock<Vec<Arc<dyn SessionObserver>>>,
}

impl fmt::Debug for SessionHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHub")
            .field("state", &*self.state.lock())
            .field("observers", &self.observers.read().len())
            .finish()
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHub {
    pub fn new() -> Self {
        Self {
            emission: ReentrantMutex::new(()),
            state: Mutex::new(ConnectionState::Idle),
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, observer: Arc<dyn SessionObserver>) {
        self.observers.write().push(observer);
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Record `event` and deliver it to every observer.
    ///
    /// Observers run on the calling thread. Concurrent emitters are serialized,
    /// so an event is delivered to every observer before the next one is
    /// applied. A panicking observer is logged and skipped; the remaining
    /// observers still receive the event.
    pub fn emit(&self, event: SessionEvent) {
        let _emission = self.emission.lock();
        self.apply(&event);

        // Snapshot so observers may subscribe more observers (or emit follow-up
        // events, e.g. `Disconnected` from inside `disconnect()`) without
        // deadlocking on the observer list.
        let observers: Vec<_> = self.observers.read().iter().cloned().collect();
        for observer in observers {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                observer.on_session_event(&event)
            }));
            if result.is_err() {
                tracing::error!(
                    target = "nova.remote_debug",
                    event = event.name(),
                    "session observer panicked; continuing with remaining observers"
                );
            }
        }
    }

    fn apply(&self, event: &SessionEvent) {
        let mut state = self.state.lock();
        let current = *state;
        let next = match event {
            SessionEvent::Connecting => {
                if current.is_active() {
                    tracing::warn!(
                        target = "nova.remote_debug",
                        %current,
                        "connect requested while a session is still active"
                    );
                }
                ConnectionState::Connecting
            }
            SessionEvent::Connected => ConnectionState::Connected,
            SessionEvent::Disconnected => ConnectionState::Disconnected,
            SessionEvent::DataReady(_) | SessionEvent::BreakpointHit => return,
        };
        tracing::debug!(
            target = "nova.remote_debug",
            from = %current,
            to = %next,
            "session state changed"
        );
        *state = next;
    }
}
