//! Flashes the host window when the debuggee stops on a breakpoint.
//!
//! Purely a UX nicety: every failure on this path is swallowed.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::error::AttentionError;
use crate::session::{SessionEvent, SessionObserver};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

/// Host UI window operations.
pub trait WindowAttention: Send + Sync {
    fn main_window(&self) -> Option<WindowHandle>;
    fn is_foreground(&self, window: WindowHandle) -> Result<bool, AttentionError>;
    fn request_attention(&self, window: WindowHandle) -> Result<(), AttentionError>;
}

pub struct BreakpointAttention {
    ui: Arc<dyn WindowAttention>,
}

impl BreakpointAttention {
    pub fn new(ui: Arc<dyn WindowAttention>) -> Self {
        Self { ui }
    }

    fn try_flash(&self) -> Result<bool, AttentionError> {
        let window = self.ui.main_window().ok_or(AttentionError::NoWindow)?;
        if self.ui.is_foreground(window)? {
            return Ok(false);
        }
        self.ui.request_attention(window)?;
        Ok(true)
    }

    /// Request attention for the main window unless it is already in front.
    pub fn on_breakpoint_hit(&self) {
        match std::panic::catch_unwind(AssertUnwindSafe(|| self.try_flash())) {
            Ok(Ok(flashed)) => {
                tracing::trace!(target = "nova.remote_debug", flashed, "breakpoint attention")
            }
            Ok(Err(err)) => tracing::debug!(
                target = "nova.remote_debug",
                error = %err,
                "failed to flash main window"
            ),
            Err(_) => tracing::debug!(
                target = "nova.remote_debug",
                "window attention collaborator panicked"
            ),
        }
    }
}

impl SessionObserver for BreakpointAttention {
    fn on_session_event(&self, event: &SessionEvent) {
        if matches!(event, SessionEvent::BreakpointHit) {
            self.on_breakpoint_hit();
        }
    }
}
