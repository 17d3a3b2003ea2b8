//! Wires the orchestration components to one debug session.

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::attention::{BreakpointAttention, WindowAttention};
use crate::metrics::SessionMetrics;
use crate::negotiation::NegotiationGuard;
use crate::notify::{NotificationSink, Notifier};
use crate::plugins::PluginRegistry;
use crate::router::{FileRegistry, MessageRouter, ScriptCacheHandler, SCRIPT_CACHE_TYPE_CODE};
use crate::session::{DebugSession, SessionEvent, SessionHub};

/// Host collaborators the client depends on.
#[derive(Clone)]
pub struct RemoteDebugServices {
    pub session: Arc<dyn DebugSession>,
    pub files: Arc<dyn FileRegistry>,
    pub sink: Arc<dyn NotificationSink>,
    pub attention: Arc<dyn WindowAttention>,
}

pub struct RemoteDebugClient {
    hub: Arc<SessionHub>,
    guard: Arc<NegotiationGuard>,
    router: Arc<MessageRouter>,
    plugins: PluginRegistry,
    notifier: Notifier,
    metrics: Arc<SessionMetrics>,
}

impl fmt::Debug for RemoteDebugClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteDebugClient")
            .field("hub", &self.hub)
            .field("guard", &self.guard)
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}

impl RemoteDebugClient {
    /// `runtime` schedules the negotiation timers.
    pub fn new(services: RemoteDebugServices, runtime: Handle) -> Self {
        let RemoteDebugServices {
            session,
            files,
            sink,
            attention,
        } = services;

        let notifier = Notifier::new(sink);
        let metrics = Arc::new(SessionMetrics::new());

        let guard = Arc::new(
            NegotiationGuard::new(session, notifier.clone(), runtime)
                .with_metrics(Arc::clone(&metrics)),
        );

        let router = Arc::new(MessageRouter::new().with_metrics(Arc::clone(&metrics)));
        let script_cache = ScriptCacheHandler::new(files, notifier.clone())
            .with_metrics(Arc::clone(&metrics));
        if let Err(err) = router.route(SCRIPT_CACHE_TYPE_CODE, Arc::new(script_cache)) {
            tracing::error!(
                target = "nova.remote_debug",
                error = %err,
                "failed to route script cache messages"
            );
        }

        let hub = Arc::new(SessionHub::new());
        hub.subscribe(guard.clone());
        hub.subscribe(router.clone());
        hub.subscribe(Arc::new(BreakpointAttention::new(attention)));

        Self {
            hub,
            guard,
            router,
            plugins: PluginRegistry::new(notifier.clone()),
            notifier,
            metrics,
        }
    }

    /// Report a session event; shorthand for `self.hub().emit(event)`.
    pub fn emit(&self, event: SessionEvent) {
        self.hub.emit(event);
    }

    pub fn hub(&self) -> &Arc<SessionHub> {
        &self.hub
    }

    pub fn guard(&self) -> &NegotiationGuard {
        &self.guard
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn metrics(&self) -> &Arc<SessionMetrics> {
        &self.metrics
    }
}
