//! Aborts connection attempts that never finish negotiating.
//!
//! A timer is armed on every `Connecting` event and disarmed on `Connected` or
//! `Disconnected`. If it elapses first, the guard reports the timeout and asks
//! the session to disconnect. The timer runs as a tokio task; before acting it
//! re-checks the guard state under the same mutex used for transitions, so a
//! timer that was cancelled (or superseded by a newer attempt) never fires.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::metrics::SessionMetrics;
use crate::notify::Notifier;
use crate::session::{DebugSession, SessionEvent, SessionObserver};

/// How long a connection attempt may stay in `Connecting`.
pub const NEGOTIATION_TIMEOUT: Duration = Duration::from_secs(5);

const TIMEOUT_MESSAGE: &str = "negotiating connection timed out";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardState {
    Idle,
    Connecting,
    Connected,
    Disconnected,
}

struct ArmedTimer {
    attempt: u64,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ArmedTimer {
    fn stop(self) {
        self.token.cancel();
        self.handle.abort();
    }
}

struct GuardInner {
    state: GuardState,
    attempt: u64,
    timer: Option<ArmedTimer>,
    connecting_since: Option<Instant>,
}

impl GuardInner {
    fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop();
        }
    }
}

struct Shared {
    session: Arc<dyn DebugSession>,
    notifier: Notifier,
    inner: Mutex<GuardInner>,
}

pub struct NegotiationGuard {
    shared: Arc<Shared>,
    runtime: Handle,
    timeout: Duration,
    metrics: Arc<SessionMetrics>,
}

impl fmt::Debug for NegotiationGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NegotiationGuard")
            .field("state", &self.state())
            .field("armed", &self.is_armed())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl NegotiationGuard {
    /// `runtime` is where negotiation timers are scheduled.
    pub fn new(session: Arc<dyn DebugSession>, notifier: Notifier, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                session,
                notifier,
                inner: Mutex::new(GuardInner {
                    state: GuardState::Idle,
                    attempt: 0,
                    timer: None,
                    connecting_since: None,
                }),
            }),
            runtime,
            timeout: NEGOTIATION_TIMEOUT,
            metrics: Arc::new(SessionMetrics::new()),
        }
    }

    /// Override [`NEGOTIATION_TIMEOUT`] for this guard.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<SessionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn state(&self) -> GuardState {
        self.shared.inner.lock().state
    }

    pub fn is_armed(&self) -> bool {
        self.shared.inner.lock().timer.is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn begin_attempt(&self) {
        let mut inner = self.shared.inner.lock();
        inner.stop_timer();
        inner.attempt = inner.attempt.wrapping_add(1);
        inner.state = GuardState::Connecting;
        inner.connecting_since = Some(Instant::now());

        let attempt = inner.attempt;
        let token = CancellationToken::new();
        let token_for_task = token.clone();
        let shared = Arc::downgrade(&self.shared);
        let metrics = Arc::clone(&self.metrics);
        let timeout = self.timeout;

        let handle = self.runtime.spawn(async move {
            tokio::select! {
                _ = token_for_task.cancelled() => {}
                _ = tokio::time::sleep(timeout) => on_timer_elapsed(shared, attempt, &metrics),
            }
        });

        inner.timer = Some(ArmedTimer {
            attempt,
            token,
            handle,
        });
        drop(inner);

        self.metrics.record_negotiation_started();
        tracing::debug!(
            target = "nova.remote_debug",
            attempt,
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "negotiation timer armed"
        );
    }

    fn finish_attempt(&self, next: GuardState) {
        let mut inner = self.shared.inner.lock();
        inner.stop_timer();
        let started = inner.connecting_since.take();
        let was_connecting = inner.state == GuardState::Connecting;
        inner.state = next;
        drop(inner);

        if was_connecting && next == GuardState::Connected {
            if let Some(started) = started {
                self.metrics.record_negotiation_completed(started.elapsed());
            }
        }
    }
}

fn on_timer_elapsed(shared: Weak<Shared>, attempt: u64, metrics: &SessionMetrics) {
    let Some(shared) = shared.upgrade() else {
        return;
    };

    let fire = {
        let mut inner = shared.inner.lock();
        let current = inner.timer.as_ref().map(|timer| timer.attempt) == Some(attempt);
        if current && inner.state == GuardState::Connecting {
            inner.state = GuardState::Disconnected;
            inner.connecting_since = None;
            // This task is the timer; just forget the handle.
            inner.timer = None;
            true
        } else {
            false
        }
    };
    if !fire {
        return;
    }

    metrics.record_negotiation_timeout();
    tracing::warn!(target = "nova.remote_debug", attempt, "{TIMEOUT_MESSAGE}");
    shared.notifier.error(TIMEOUT_MESSAGE);

    let session = &shared.session;
    if std::panic::catch_unwind(AssertUnwindSafe(|| session.disconnect())).is_err() {
        tracing::error!(
            target = "nova.remote_debug",
            attempt,
            "session panicked while disconnecting after negotiation timeout"
        );
    }
}

impl SessionObserver for NegotiationGuard {
    fn on_session_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Connecting => self.begin_attempt(),
            SessionEvent::Connected => self.finish_attempt(GuardState::Connected),
            SessionEvent::Disconnected => self.finish_attempt(GuardState::Disconnected),
            SessionEvent::DataReady(_) | SessionEvent::BreakpointHit => {}
        }
    }
}

impl Drop for NegotiationGuard {
    fn drop(&mut self) {
        self.shared.inner.lock().stop_timer();
    }
}
