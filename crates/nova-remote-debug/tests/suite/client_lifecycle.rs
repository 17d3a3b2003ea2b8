use std::sync::atomic::Ordering;
use std::time::Duration;

use nova_remote_debug::{ConnectionState, GuardState, Severity, SessionEvent, NEGOTIATION_TIMEOUT};

use super::support::harness;

#[tokio::test(start_paused = true)]
async fn stalled_negotiation_is_aborted_once() {
    let h = harness();

    h.client.emit(SessionEvent::Connecting);
    assert_eq!(h.client.hub().state(), ConnectionState::Connecting);

    tokio::time::sleep(NEGOTIATION_TIMEOUT - Duration::from_millis(100)).await;
    assert_eq!(h.session.disconnects(), 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.session.disconnects(), 1);
    assert_eq!(h.client.hub().state(), ConnectionState::Disconnected);
    assert_eq!(h.client.guard().state(), GuardState::Disconnected);
    assert_eq!(
        h.sink.lines_with(Severity::Error),
        vec!["negotiating connection timed out".to_string()]
    );

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.session.disconnects(), 1);
    assert_eq!(h.client.metrics().snapshot().negotiation_timeouts, 1);
}

#[tokio::test(start_paused = true)]
async fn negotiation_completing_in_time_keeps_the_session() {
    let h = harness();

    h.client.emit(SessionEvent::Connecting);
    tokio::time::sleep(Duration::from_secs(1)).await;
    h.client.emit(SessionEvent::Connected);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.session.disconnects(), 0);
    assert_eq!(h.client.hub().state(), ConnectionState::Connected);
    assert!(h.sink.lines().is_empty());

    let snapshot = h.client.metrics().snapshot();
    assert_eq!(snapshot.negotiations_started, 1);
    assert_eq!(snapshot.negotiations_completed, 1);
    assert_eq!(snapshot.negotiation_timeouts, 0);
}

#[tokio::test(start_paused = true)]
async fn reconnect_after_timeout_gets_a_fresh_deadline() {
    let h = harness();

    h.client.emit(SessionEvent::Connecting);
    tokio::time::sleep(NEGOTIATION_TIMEOUT + Duration::from_millis(10)).await;
    assert_eq!(h.session.disconnects(), 1);

    h.client.emit(SessionEvent::Connecting);
    tokio::time::sleep(Duration::from_secs(4)).await;
    h.client.emit(SessionEvent::Connected);
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(h.session.disconnects(), 1);
    assert_eq!(h.client.guard().state(), GuardState::Connected);
}

#[tokio::test]
async fn breakpoint_hit_requests_attention() {
    let h = harness();

    h.client.emit(SessionEvent::Connecting);
    h.client.emit(SessionEvent::Connected);
    h.client.emit(SessionEvent::BreakpointHit);

    assert_eq!(h.window.requests.load(Ordering::SeqCst), 1);
}
