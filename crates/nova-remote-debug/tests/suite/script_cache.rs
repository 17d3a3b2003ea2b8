use nova_remote_debug::{InboundMessage, Severity, SessionEvent, SCRIPT_CACHE_TYPE_CODE};

use super::support::harness;

fn script_cache(relative: &str) -> SessionEvent {
    SessionEvent::DataReady(InboundMessage::new(
        SCRIPT_CACHE_TYPE_CODE,
        relative.as_bytes().to_vec(),
    ))
}

#[tokio::test]
async fn cached_script_is_registered_once() {
    let h = harness();
    let script = h.project.write_script("scripts/main.lua");

    h.client.emit(SessionEvent::Connecting);
    h.client.emit(SessionEvent::Connected);
    h.client.emit(script_cache("scripts/main.lua"));

    assert_eq!(h.project.registered(), vec![script]);
    assert!(h.sink.lines_with(Severity::Error).is_empty());
    assert_eq!(h.client.metrics().snapshot().messages_routed, 1);
}

#[tokio::test]
async fn missing_script_reports_one_error() {
    let h = harness();

    h.client.emit(SessionEvent::Connecting);
    h.client.emit(SessionEvent::Connected);
    h.client.emit(script_cache("scripts/gone.lua"));

    assert!(h.project.registered().is_empty());
    let errors = h.sink.lines_with(Severity::Error);
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].contains("scripts/gone.lua"), "{errors:?}");
    assert_eq!(h.client.metrics().snapshot().missing_scripts, 1);
}

#[tokio::test]
async fn messages_outside_a_connected_session_are_dropped() {
    let h = harness();
    h.project.write_script("boot.lua");

    h.client.emit(script_cache("boot.lua"));
    h.client.emit(SessionEvent::Connecting);
    h.client.emit(script_cache("boot.lua"));
    assert!(h.project.registered().is_empty());

    h.client.emit(SessionEvent::Connected);
    h.client.emit(script_cache("boot.lua"));
    assert_eq!(h.project.registered(), vec![h.project.root().join("boot.lua")]);

    h.client.emit(SessionEvent::Disconnected);
    h.client.emit(script_cache("boot.lua"));
    assert_eq!(h.project.registered().len(), 1);
}

#[tokio::test]
async fn unrouted_type_codes_are_ignored() {
    let h = harness();

    h.client.emit(SessionEvent::Connecting);
    h.client.emit(SessionEvent::Connected);
    h.client
        .emit(SessionEvent::DataReady(InboundMessage::new(0x7fff, b"opaque".to_vec())));

    assert!(h.project.registered().is_empty());
    assert!(h.sink.lines().is_empty());
    assert_eq!(h.client.metrics().snapshot().messages_unrouted, 1);
    assert!(h.client.router().is_routed(SCRIPT_CACHE_TYPE_CODE));
}
