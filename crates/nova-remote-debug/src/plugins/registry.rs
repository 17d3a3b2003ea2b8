use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::notify::Notifier;

/// An alternate wire protocol the client can speak to a debuggee.
pub trait NetworkProtocolPlugin: Send + Sync {
    /// Stable protocol identifier, e.g. `"tcp"`.
    fn protocol_name(&self) -> &str;
    fn display_name(&self) -> &str;
}

#[derive(Clone)]
pub struct NetworkPluginDescriptor {
    pub protocol_name: String,
    pub display_name: String,
    pub plugin: Arc<dyn NetworkProtocolPlugin>,
}

impl fmt::Debug for NetworkPluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkPluginDescriptor")
            .field("protocol_name", &self.protocol_name)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

/// Source of pluggable implementations handed to the registry at startup.
pub trait CapabilityProvider {
    fn network_protocols(&self) -> Vec<Arc<dyn NetworkProtocolPlugin>>;
}

/// Build-time list of compiled-in plugins.
#[derive(Default, Clone)]
pub struct StaticCapabilities {
    network_protocols: Vec<Arc<dyn NetworkProtocolPlugin>>,
}

impl StaticCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_network_protocol(mut self, plugin: Arc<dyn NetworkProtocolPlugin>) -> Self {
        self.network_protocols.push(plugin);
        self
    }
}

impl CapabilityProvider for StaticCapabilities {
    fn network_protocols(&self) -> Vec<Arc<dyn NetworkProtocolPlugin>> {
        self.network_protocols.clone()
    }
}

type InitializedHandler = Arc<dyn Fn(&[NetworkPluginDescriptor]) + Send + Sync + 'static>;

/// Holds the discovered network protocol plugins.
///
/// The descriptor collection is published once by [`PluginRegistry::discover`]
/// and is read-only afterwards.
pub struct PluginRegistry {
    notifier: Notifier,
    descriptors: OnceLock<Arc<[NetworkPluginDescriptor]>>,
    on_initialized: Mutex<Vec<InitializedHandler>>,
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("descriptors", &self.descriptors.get())
            .finish_non_exhaustive()
    }
}

impl PluginRegistry {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            notifier,
            descriptors: OnceLock::new(),
            on_initialized: Mutex::new(Vec::new()),
        }
    }

    /// Register a handler for the one-time `Initialized` event.
    pub fn on_initialized(
        &self,
        handler: impl Fn(&[NetworkPluginDescriptor]) + Send + Sync + 'static,
    ) {
        self.on_initialized.lock().push(Arc::new(handler));
    }

    pub fn is_initialized(&self) -> bool {
        self.descriptors.get().is_some()
    }

    /// Discovered plugins, or an empty slice before [`PluginRegistry::discover`].
    pub fn descriptors(&self) -> &[NetworkPluginDescriptor] {
        self.descriptors.get().map(|d| &d[..]).unwrap_or(&[])
    }

    pub fn find_protocol(&self, protocol_name: &str) -> Option<&NetworkPluginDescriptor> {
        self.descriptors()
            .iter()
            .find(|descriptor| descriptor.protocol_name == protocol_name)
    }

    /// Enumerate the provider's network protocol plugins.
    ///
    /// Only the first call does any work; later calls return the collection
    /// computed then. `Initialized` is raised exactly once, after the
    /// collection has been published.
    pub fn discover(&self, provider: &dyn CapabilityProvider) -> Arc<[NetworkPluginDescriptor]> {
        let mut first = false;
        let descriptors = self
            .descriptors
            .get_or_init(|| {
                first = true;
                self.enumerate(provider)
            })
            .clone();

        if first {
            self.raise_initialized(&descriptors);
        } else {
            tracing::debug!(
                target = "nova.remote_debug",
                "plugin registry already initialized; skipping discovery"
            );
        }
        descriptors
    }

    fn enumerate(&self, provider: &dyn CapabilityProvider) -> Arc<[NetworkPluginDescriptor]> {
        let plugins = match std::panic::catch_unwind(AssertUnwindSafe(|| {
            provider.network_protocols()
        })) {
            Ok(plugins) => plugins,
            Err(_) => {
                tracing::error!(
                    target = "nova.remote_debug",
                    "capability provider panicked while enumerating network protocols"
                );
                Vec::new()
            }
        };

        plugins
            .into_iter()
            .map(|plugin| {
                let descriptor = NetworkPluginDescriptor {
                    protocol_name: plugin.protocol_name().to_owned(),
                    display_name: plugin.display_name().to_owned(),
                    plugin,
                };
                self.notifier.info(&format!(
                    "{} plugin loaded: {}",
                    descriptor.protocol_name, descriptor.display_name
                ));
                descriptor
            })
            .collect()
    }

    fn raise_initialized(&self, descriptors: &[NetworkPluginDescriptor]) {
        let handlers: Vec<_> = self.on_initialized.lock().iter().cloned().collect();
        for handler in handlers {
            if std::panic::catch_unwind(AssertUnwindSafe(|| handler(descriptors))).is_err() {
                tracing::error!(
                    target = "nova.remote_debug",
                    "plugin registry `Initialized` handler panicked"
                );
            }
        }
    }
}
