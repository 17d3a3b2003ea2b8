//! Dispatch of inbound typed messages.
//!
//! Routing is an exact match on [`InboundMessage::type_code`]. Codes without a
//! route are ignored here; other layers may consume them. The only handler
//! wired by default is [`ScriptCacheHandler`], which keeps the host project in
//! sync with scripts the debuggee reports as cached.

use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{DecodeError, RouteError};
use crate::metrics::SessionMetrics;
use crate::notify::Notifier;
use crate::session::{InboundMessage, SessionEvent, SessionObserver};

/// Wire type code of script-cache notifications.
pub const SCRIPT_CACHE_TYPE_CODE: u16 = 0x0106;

pub trait MessageHandler: Send + Sync {
    fn handle(&self, message: &InboundMessage);
}

/// Opaque handle returned by the project when a file is registered.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileDescriptor {
    pub path: PathBuf,
}

/// Project-side file management.
pub trait FileRegistry: Send + Sync {
    /// Directory relative script paths are resolved against.
    fn asset_root(&self) -> PathBuf;

    fn resolve(&self, relative_path: &str, asset_root: &Path) -> PathBuf {
        asset_root.join(relative_path)
    }

    fn register_file(&self, path: &Path) -> FileDescriptor;
}

/// Payload of a script-cache message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptCacheEntry {
    pub relative_script_path: String,
}

impl ScriptCacheEntry {
    /// The payload is the UTF-8 script path relative to the asset root. Trailing
    /// NULs and surrounding whitespace are not part of the path.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(payload).map_err(|_| DecodeError::InvalidUtf8)?;
        let path = text.trim_end_matches('\0').trim();
        if path.is_empty() {
            return Err(DecodeError::Empty);
        }
        Ok(Self {
            relative_script_path: path.to_owned(),
        })
    }

    pub fn absolute_path(&self, files: &dyn FileRegistry) -> PathBuf {
        let root = files.asset_root();
        files.resolve(&self.relative_script_path, &root)
    }
}

/// Registers scripts reported by the debuggee with the host project.
///
/// Holds no per-message state, so back-to-back dispatch is safe.
pub struct ScriptCacheHandler {
    files: Arc<dyn FileRegistry>,
    notifier: Notifier,
    metrics: Arc<SessionMetrics>,
}

impl ScriptCacheHandler {
    pub fn new(files: Arc<dyn FileRegistry>, notifier: Notifier) -> Self {
        Self {
            files,
            notifier,
            metrics: Arc::new(SessionMetrics::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<SessionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }
}

impl MessageHandler for ScriptCacheHandler {
    fn handle(&self, message: &InboundMessage) {
        let entry = match ScriptCacheEntry::decode(&message.payload) {
            Ok(entry) => entry,
            Err(err) => {
                self.notifier
                    .error(&format!("Invalid script cache message: {err}"));
                return;
            }
        };

        let absolute = entry.absolute_path(self.files.as_ref());
        if !absolute.exists() {
            self.metrics.record_missing_script();
            self.notifier.error(&format!(
                "Cached script not found: {} (resolved to {})",
                entry.relative_script_path,
                absolute.display()
            ));
            return;
        }

        let _ = self.files.register_file(&absolute);
        tracing::debug!(
            target = "nova.remote_debug",
            path = %absolute.display(),
            "registered cached script"
        );
    }
}

pub struct MessageRouter {
    routes: RwLock<HashMap<u16, Arc<dyn MessageHandler>>>,
    connected: AtomicBool,
    metrics: Arc<SessionMetrics>,
}

impl fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codes: Vec<_> = self.routes.read().keys().copied().collect();
        codes.sort_unstable();
        f.debug_struct("MessageRouter")
            .field("routes", &codes)
            .field("connected", &self.connected.load(Ordering::Acquire))
            .finish()
    }
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageRouter {
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
            connected: AtomicBool::new(false),
            metrics: Arc::new(SessionMetrics::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<SessionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn route(
        &self,
        type_code: u16,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), RouteError> {
        let mut routes = self.routes.write();
        if routes.contains_key(&type_code) {
            return Err(RouteError::DuplicateTypeCode { type_code });
        }
        routes.insert(type_code, handler);
        Ok(())
    }

    pub fn is_routed(&self, type_code: u16) -> bool {
        self.routes.read().contains_key(&type_code)
    }

    /// Dispatch `message` to the handler routed for its type code.
    pub fn on_data_ready(&self, message: &InboundMessage) {
        let handler = self.routes.read().get(&message.type_code).cloned();
        let Some(handler) = handler else {
            self.metrics.record_message_unrouted();
            tracing::trace!(
                target = "nova.remote_debug",
                type_code = message.type_code,
                "no route for message"
            );
            return;
        };

        self.metrics.record_message_routed();
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| handler.handle(message)));
        if result.is_err() {
            tracing::error!(
                target = "nova.remote_debug",
                type_code = message.type_code,
                "message handler panicked; message dropped"
            );
        }
    }
}

impl SessionObserver for MessageRouter {
    fn on_session_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Connected => self.connected.store(true, Ordering::Release),
            SessionEvent::Connecting | SessionEvent::Disconnected => {
                self.connected.store(false, Ordering::Release)
            }
            SessionEvent::DataReady(message) => {
                if self.connected.load(Ordering::Acquire) {
                    self.on_data_ready(message);
                } else {
                    // Type codes only carry meaning on a negotiated connection.
                    tracing::debug!(
                        target = "nova.remote_debug",
                        type_code = message.type_code,
                        "dropping message received outside a connected session"
                    );
                }
            }
            SessionEvent::BreakpointHit => {}
        }
    }
}
