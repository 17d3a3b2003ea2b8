//! User-facing status output.
//!
//! The host UI owns the actual output window; orchestration code only ever sees
//! a [`NotificationSink`]. Sinks are fire-and-forget: [`Notifier`] wraps every
//! call so that a misbehaving sink can never unwind into the caller.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(name)
    }
}

/// Output channel for status lines shown to the user.
///
/// Implementations must not block indefinitely.
pub trait NotificationSink: Send + Sync {
    fn out_line(&self, severity: Severity, text: &str);
}

/// Cloneable handle used by orchestration code to emit status lines.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// A notifier that only forwards to `tracing`.
    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingSink))
    }

    pub fn out_line(&self, severity: Severity, text: &str) {
        let sink = &self.sink;
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| sink.out_line(severity, text)));
        if result.is_err() {
            tracing::debug!(
                target = "nova.remote_debug",
                %severity,
                "notification sink panicked; line dropped"
            );
        }
    }

    pub fn info(&self, text: &str) {
        self.out_line(Severity::Info, text);
    }

    pub fn warn(&self, text: &str) {
        self.out_line(Severity::Warning, text);
    }

    pub fn error(&self, text: &str) {
        self.out_line(Severity::Error, text);
    }
}

/// Production sink that mirrors status lines into the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn out_line(&self, severity: Severity, text: &str) {
        match severity {
            Severity::Info => tracing::info!(target = "nova.remote_debug", "{text}"),
            Severity::Warning => tracing::warn!(target = "nova.remote_debug", "{text}"),
            Severity::Error => tracing::error!(target = "nova.remote_debug", "{text}"),
        }
    }
}

/// In-memory sink that keeps every line it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<(Severity, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Severity, String)> {
        self.lines.lock().clone()
    }

    pub fn lines_with(&self, severity: Severity) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, line)| line.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl NotificationSink for RecordingSink {
    fn out_line(&self, severity: Severity, text: &str) {
        self.lines.lock().push((severity, text.to_owned()));
    }
}
