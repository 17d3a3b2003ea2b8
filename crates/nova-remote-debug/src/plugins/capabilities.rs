//! Contracts implemented by optional, dynamically loaded modules.
//!
//! A module exports one capability through [`export_capability!`](crate::export_capability),
//! which emits the capability's entry-point symbol together with the ABI
//! version symbol the loader checks first. Host and module must be built by the
//! same compiler: the entry point hands over a boxed trait object.

use crate::error::CapabilityInitError;

/// ABI revision of the entry-point contract below.
pub const PLUGIN_ABI_VERSION: u32 = 1;

/// `extern "C" fn() -> u32` returning the module's [`PLUGIN_ABI_VERSION`].
pub const PLUGIN_ABI_SYMBOL: &[u8] = b"nova_remote_debug_plugin_abi_version";

pub trait OptionalCapability: Send + Sync {
    /// Called once after instantiation; an error discards the module.
    fn initialize(&mut self) -> Result<(), CapabilityInitError>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CrashReport {
    pub message: String,
    pub location: Option<String>,
    pub backtrace: Option<String>,
}

pub trait CrashReporter: OptionalCapability {
    fn report_crash(&self, report: &CrashReport);
}

pub trait UsageTelemetry: OptionalCapability {
    fn record_event(&self, name: &str, properties: &[(&str, &str)]);
}

/// Export a capability implementation from a `cdylib`.
///
/// ```ignore
/// nova_remote_debug::export_capability!(CrashReporter => MyReporter::default());
/// ```
///
/// A module exports at most one capability.
#[macro_export]
macro_rules! export_capability {
    (CrashReporter => $ctor:expr) => {
        $crate::export_capability!(
            @entry nova_remote_debug_crash_reporter,
            dyn $crate::plugins::CrashReporter,
            $ctor
        );
    };
    (UsageTelemetry => $ctor:expr) => {
        $crate::export_capability!(
            @entry nova_remote_debug_usage_telemetry,
            dyn $crate::plugins::UsageTelemetry,
            $ctor
        );
    };
    (@entry $symbol:ident, $object:ty, $ctor:expr) => {
        #[no_mangle]
        pub extern "C" fn nova_remote_debug_plugin_abi_version() -> u32 {
            $crate::plugins::PLUGIN_ABI_VERSION
        }

        #[no_mangle]
        pub extern "C" fn $symbol() -> *mut ::std::ffi::c_void {
            $crate::export_capability!(@instantiate $object, $ctor)
        }
    };
    (@instantiate $object:ty, $ctor:expr) => {{
        // Unwinding out of an `extern "C"` fn aborts; report a panic as null.
        let created = ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| {
            ::std::boxed::Box::new($ctor) as ::std::boxed::Box<$object>
        }));
        match created {
            Ok(instance) => ::std::boxed::Box::into_raw(::std::boxed::Box::new(instance)).cast(),
            Err(_) => ::std::ptr::null_mut(),
        }
    }};
}
