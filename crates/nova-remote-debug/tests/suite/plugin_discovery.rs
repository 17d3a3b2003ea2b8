use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nova_remote_debug::{NetworkProtocolPlugin, Severity, StaticCapabilities};

use super::support::harness;

struct Protocol {
    name: &'static str,
    display: &'static str,
}

impl NetworkProtocolPlugin for Protocol {
    fn protocol_name(&self) -> &str {
        self.name
    }

    fn display_name(&self) -> &str {
        self.display
    }
}

fn protocol(name: &'static str, display: &'static str) -> Arc<dyn NetworkProtocolPlugin> {
    Arc::new(Protocol { name, display })
}

#[tokio::test]
async fn discovery_runs_once_per_client() {
    let h = harness();
    let plugins = h.client.plugins();
    let initialized = Arc::new(AtomicUsize::new(0));
    plugins.on_initialized({
        let initialized = initialized.clone();
        move |descriptors| {
            assert_eq!(descriptors.len(), 1);
            initialized.fetch_add(1, Ordering::SeqCst);
        }
    });

    let first = plugins.discover(&StaticCapabilities::new().with_network_protocol(protocol(
        "adb",
        "Android Debug Bridge",
    )));
    let second = plugins.discover(
        &StaticCapabilities::new()
            .with_network_protocol(protocol("tcp", "Direct TCP"))
            .with_network_protocol(protocol("ws", "WebSocket")),
    );

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second[0].protocol_name, "adb");
    assert_eq!(initialized.load(Ordering::SeqCst), 1);
    assert!(plugins.find_protocol("tcp").is_none());
    assert_eq!(
        h.sink.lines_with(Severity::Info),
        vec!["adb plugin loaded: Android Debug Bridge".to_string()]
    );
}
