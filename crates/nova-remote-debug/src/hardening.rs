use std::backtrace::Backtrace;
use std::sync::{Arc, OnceLock};

use crate::config::{init_tracing, RemoteDebugConfig};
use crate::plugins::{
    find_optional_capability, CrashReport, CrashReporter, LoadedCapability, UsageTelemetry,
};

/// Optional modules found at startup. Either may be absent.
#[derive(Debug, Default)]
pub struct OptionalModules {
    pub crash_reporter: Option<Arc<LoadedCapability<dyn CrashReporter>>>,
    pub usage_telemetry: Option<LoadedCapability<dyn UsageTelemetry>>,
}

impl OptionalModules {
    /// Forward a usage event to the telemetry module, if one was loaded.
    pub fn record_event(&self, name: &str, properties: &[(&str, &str)]) {
        if let Some(telemetry) = &self.usage_telemetry {
            telemetry.record_event(name, properties);
        }
    }
}

static CRASH_REPORTER: OnceLock<Arc<LoadedCapability<dyn CrashReporter>>> = OnceLock::new();

/// Initialize structured logging and look for optional modules.
///
/// When a crash reporter module is present, a panic hook is installed that
/// forwards every panic to it after running the previously installed hook.
/// Request handlers should still isolate panics locally; the hook is a
/// last-resort record of what went wrong.
pub fn init(config: &RemoteDebugConfig) -> OptionalModules {
    let _ = init_tracing(&config.logging);

    let locator = config.plugins.locator();
    let crash_reporter = config
        .plugins
        .crash_reporter_module()
        .and_then(|name| find_optional_capability::<dyn CrashReporter>(&locator, name))
        .map(Arc::new);
    let usage_telemetry = config
        .plugins
        .usage_telemetry_module()
        .and_then(|name| find_optional_capability::<dyn UsageTelemetry>(&locator, name));

    if let Some(reporter) = &crash_reporter {
        install_panic_hook(reporter.clone(), config.logging.include_backtrace);
    }

    OptionalModules {
        crash_reporter,
        usage_telemetry,
    }
}

fn install_panic_hook(reporter: Arc<LoadedCapability<dyn CrashReporter>>, include_backtrace: bool) {
    if CRASH_REPORTER.set(reporter.clone()).is_err() {
        tracing::debug!(
            target = "nova.remote_debug",
            "crash reporter panic hook already installed"
        );
        return;
    }

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        previous(info);

        let report = CrashReport {
            message: panic_message(info),
            location: info.location().map(|loc| format!("{loc}")),
            backtrace: include_backtrace.then(|| Backtrace::force_capture().to_string()),
        };
        tracing::error!(
            target = "nova.remote_debug",
            panic_message = %report.message,
            location = report.location.as_deref().unwrap_or("<unknown>"),
            "panic"
        );
        reporter.report_crash(&report);
    }));
}

fn panic_message(info: &std::panic::PanicHookInfo<'_>) -> String {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "panic payload (non-string)".to_owned()
    }
}
