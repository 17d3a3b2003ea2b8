use std::sync::OnceLock;
use std::time::Duration;

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

// Negotiation latency is recorded in microseconds.
const LATENCY_SIGFIG: u8 = 3;
// Anything slower than a minute is clamped; the negotiation timeout is far below that.
const MAX_LATENCY_US: u64 = 60 * 1_000_000;

/// Counters and a negotiation latency histogram for one debugger client.
///
/// Recording is a single mutex acquisition; the histogram is allocated up front.
#[derive(Debug)]
pub struct SessionMetrics {
    inner: Mutex<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    negotiations_started: u64,
    negotiations_completed: u64,
    negotiation_timeouts: u64,
    messages_routed: u64,
    messages_unrouted: u64,
    missing_scripts: u64,
    negotiation_latency_us: Histogram<u64>,
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn new_histogram() -> Histogram<u64> {
    static BOUNDS_ERROR_LOGGED: OnceLock<()> = OnceLock::new();

    Histogram::<u64>::new_with_bounds(1, MAX_LATENCY_US, LATENCY_SIGFIG).unwrap_or_else(|err| {
        if BOUNDS_ERROR_LOGGED.set(()).is_ok() {
            tracing::debug!(
                target = "nova.remote_debug",
                error = %err,
                "failed to construct bounded latency histogram; falling back to unbounded histogram"
            );
        }
        Histogram::<u64>::new(LATENCY_SIGFIG).expect("histogram")
    })
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsInner {
                negotiations_started: 0,
                negotiations_completed: 0,
                negotiation_timeouts: 0,
                messages_routed: 0,
                messages_unrouted: 0,
                missing_scripts: 0,
                negotiation_latency_us: new_histogram(),
            }),
        }
    }

    pub fn record_negotiation_started(&self) {
        let mut inner = self.inner.lock();
        inner.negotiations_started = inner.negotiations_started.saturating_add(1);
    }

    pub fn record_negotiation_completed(&self, latency: Duration) {
        static RECORD_ERROR_LOGGED: OnceLock<()> = OnceLock::new();

        let micros = latency.as_micros().min(u128::from(MAX_LATENCY_US)) as u64;
        let micros = micros.max(1);

        let mut inner = self.inner.lock();
        inner.negotiations_completed = inner.negotiations_completed.saturating_add(1);
        if let Err(err) = inner.negotiation_latency_us.record(micros) {
            if RECORD_ERROR_LOGGED.set(()).is_ok() {
                tracing::debug!(
                    target = "nova.remote_debug",
                    micros,
                    error = %err,
                    "failed to record negotiation latency sample"
                );
            }
        }
    }

    pub fn record_negotiation_timeout(&self) {
        let mut inner = self.inner.lock();
        inner.negotiation_timeouts = inner.negotiation_timeouts.saturating_add(1);
    }

    pub fn record_message_routed(&self) {
        let mut inner = self.inner.lock();
        inner.messages_routed = inner.messages_routed.saturating_add(1);
    }

    pub fn record_message_unrouted(&self) {
        let mut inner = self.inner.lock();
        inner.messages_unrouted = inner.messages_unrouted.saturating_add(1);
    }

    pub fn record_missing_script(&self) {
        let mut inner = self.inner.lock();
        inner.missing_scripts = inner.missing_scripts.saturating_add(1);
    }

    pub fn snapshot(&self) -> SessionMetricsSnapshot {
        let inner = self.inner.lock();
        let hist = &inner.negotiation_latency_us;
        let latency_us = if hist.is_empty() {
            LatencySummary {
                p50_us: 0,
                p95_us: 0,
                max_us: 0,
            }
        } else {
            LatencySummary {
                p50_us: hist.value_at_quantile(0.50),
                p95_us: hist.value_at_quantile(0.95),
                max_us: hist.max(),
            }
        };

        SessionMetricsSnapshot {
            negotiations_started: inner.negotiations_started,
            negotiations_completed: inner.negotiations_completed,
            negotiation_timeouts: inner.negotiation_timeouts,
            messages_routed: inner.messages_routed,
            messages_unrouted: inner.messages_unrouted,
            missing_scripts: inner.missing_scripts,
            negotiation_latency_us: latency_us,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetricsSnapshot {
    pub negotiations_started: u64,
    pub negotiations_completed: u64,
    pub negotiation_timeouts: u64,
    pub messages_routed: u64,
    pub messages_unrouted: u64,
    pub missing_scripts: u64,
    pub negotiation_latency_us: LatencySummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencySummary {
    pub p50_us: u64,
    pub p95_us: u64,
    pub max_us: u64,
}
