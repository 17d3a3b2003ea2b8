//! Process-wide freeze/thaw signal.
//!
//! Freezing pauses debuggee-visible state (for example, it stops variable
//! inspectors from refreshing) independently of the network connection. The
//! coordinator is the one piece of the orchestration layer that is called from
//! arbitrary threads, so every operation, including the `frozen()` read, runs
//! under the same lock for its whole duration.
//!
//! The lock is re-entrant: a `Freezing`/`Thawing` handler may call
//! [`FreezeCoordinator::frozen`] and observes the value from *before* the
//! transition. A `freeze()`/`thaw()` issued from inside a handler is ignored.

use std::cell::Cell;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, ReentrantMutex};

type Handler = Arc<dyn Fn() + Send + Sync + 'static>;

/// Identifies a registered `Freezing` or `Thawing` handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Transition {
    Freezing,
    Thawing,
}

impl Transition {
    fn name(self) -> &'static str {
        match self {
            Transition::Freezing => "freezing",
            Transition::Thawing => "thawing",
        }
    }
}

#[derive(Default)]
struct Subscribers {
    freezing: Vec<(Subscription, Handler)>,
    thawing: Vec<(Subscription, Handler)>,
}

#[derive(Default)]
struct FreezeState {
    frozen: Cell<bool>,
    raising: Cell<bool>,
}

pub struct FreezeCoordinator {
    state: ReentrantMutex<FreezeState>,
    subscribers: Mutex<Subscribers>,
    next_id: AtomicU64,
}

impl fmt::Debug for FreezeCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FreezeCoordinator")
            .field("frozen", &self.frozen())
            .finish_non_exhaustive()
    }
}

impl Default for FreezeCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Commits the target state when dropped, so the flag is updated even if
/// raising the notification unwinds.
struct CommitOnDrop<'a> {
    state: &'a FreezeState,
    value: bool,
}

impl Drop for CommitOnDrop<'_> {
    fn drop(&mut self) {
        self.state.frozen.set(self.value);
        self.state.raising.set(false);
    }
}

impl FreezeCoordinator {
    pub fn new() -> Self {
        Self {
            state: ReentrantMutex::new(FreezeState::default()),
            subscribers: Mutex::new(Subscribers::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Returns the process-wide coordinator.
    pub fn global() -> &'static FreezeCoordinator {
        static GLOBAL: OnceLock<FreezeCoordinator> = OnceLock::new();
        GLOBAL.get_or_init(FreezeCoordinator::new)
    }

    pub fn frozen(&self) -> bool {
        self.state.lock().frozen.get()
    }

    /// Raise `Freezing` and mark the coordinator frozen. No-op when already frozen.
    pub fn freeze(&self) {
        self.transition(Transition::Freezing, true);
    }

    /// Raise `Thawing` and clear the frozen flag. No-op when not frozen.
    pub fn thaw(&self) {
        self.transition(Transition::Thawing, false);
    }

    pub fn on_freezing(&self, handler: impl Fn() + Send + Sync + 'static) -> Subscription {
        let id = self.alloc_subscription();
        self.subscribers
            .lock()
            .freezing
            .push((id, Arc::new(handler)));
        id
    }

    pub fn on_thawing(&self, handler: impl Fn() + Send + Sync + 'static) -> Subscription {
        let id = self.alloc_subscription();
        self.subscribers
            .lock()
            .thawing
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove a handler. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.freezing.len() + subscribers.thawing.len();
        subscribers.freezing.retain(|(id, _)| *id != subscription);
        subscribers.thawing.retain(|(id, _)| *id != subscription);
        before != subscribers.freezing.len() + subscribers.thawing.len()
    }

    fn alloc_subscription(&self) -> Subscription {
        Subscription(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn transition(&self, transition: Transition, target: bool) {
        let state = self.state.lock();
        if state.raising.get() {
            tracing::debug!(
                target = "nova.remote_debug",
                transition = transition.name(),
                "ignoring freeze state change requested by a freeze subscriber"
            );
            return;
        }
        if state.frozen.get() == target {
            return;
        }

        state.raising.set(true);
        let _commit = CommitOnDrop {
            state: &state,
            value: target,
        };

        let handlers: Vec<Handler> = {
            let subscribers = self.subscribers.lock();
            let list = match transition {
                Transition::Freezing => &subscribers.freezing,
                Transition::Thawing => &subscribers.thawing,
            };
            list.iter().map(|(_, handler)| Arc::clone(handler)).collect()
        };

        for handler in handlers {
            if std::panic::catch_unwind(AssertUnwindSafe(|| handler())).is_err() {
                tracing::error!(
                    target = "nova.remote_debug",
                    transition = transition.name(),
                    "freeze subscriber panicked; state change still committed"
                );
            }
        }

        tracing::debug!(
            target = "nova.remote_debug",
            transition = transition.name(),
            "freeze state changed"
        );
    }
}
