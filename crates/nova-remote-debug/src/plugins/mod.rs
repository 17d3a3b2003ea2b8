//! Network protocol plugins and optional capability modules.
//!
//! Network protocol plugins are compiled into the host and handed to
//! [`PluginRegistry::discover`] through a [`CapabilityProvider`]. Optional
//! modules (crash reporting, usage telemetry) are not linked at all; they are
//! looked up at runtime with [`find_optional_capability`] and may be absent.

mod capabilities;
mod loader;
mod registry;

pub use capabilities::{
    CrashReport, CrashReporter, OptionalCapability, UsageTelemetry, PLUGIN_ABI_SYMBOL,
    PLUGIN_ABI_VERSION,
};
pub use loader::{
    find_optional_capability, try_load_capability, Capability, LoadedCapability, ModuleLocator,
};
pub use registry::{
    CapabilityProvider, NetworkPluginDescriptor, NetworkProtocolPlugin, PluginRegistry,
    StaticCapabilities,
};
