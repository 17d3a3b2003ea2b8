use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use nova_remote_debug::{
    ConnectionState, InboundMessage, MessageHandler, MessageRouter, SessionEvent, SessionHub,
    SessionObserver,
};
use parking_lot::Mutex;

/// Parks the emitting thread on `Connected` until released.
struct StallOnConnected {
    entered: Mutex<Option<mpsc::Sender<()>>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl SessionObserver for StallOnConnected {
    fn on_session_event(&self, event: &SessionEvent) {
        if matches!(event, SessionEvent::Connected) {
            if let Some(entered) = self.entered.lock().take() {
                let _ = entered.send(());
            }
            let _ = self.release.lock().recv();
        }
    }
}

#[derive(Default)]
struct CountingHandler {
    handled: AtomicUsize,
}

impl MessageHandler for CountingHandler {
    fn handle(&self, _message: &InboundMessage) {
        self.handled.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn concurrent_emitters_are_delivered_in_state_order() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();

    let hub = Arc::new(SessionHub::new());
    hub.subscribe(Arc::new(StallOnConnected {
        entered: Mutex::new(Some(entered_tx)),
        release: Mutex::new(release_rx),
    }));
    let router = Arc::new(MessageRouter::new());
    let handler = Arc::new(CountingHandler::default());
    router.route(7, handler.clone()).expect("route");
    hub.subscribe(router.clone());

    hub.emit(SessionEvent::Connecting);

    let transport = thread::spawn({
        let hub = hub.clone();
        move || hub.emit(SessionEvent::Connected)
    });
    entered_rx.recv().expect("connected delivery started");

    let timer = thread::spawn({
        let hub = hub.clone();
        move || hub.emit(SessionEvent::Disconnected)
    });
    // Give the second emitter time to reach the hub while the first is parked.
    thread::sleep(Duration::from_millis(50));
    release_tx.send(()).expect("release transport");

    transport.join().expect("transport thread");
    timer.join().expect("timer thread");

    assert_eq!(hub.state(), ConnectionState::Disconnected);

    hub.emit(SessionEvent::DataReady(InboundMessage::new(7, b"late".to_vec())));
    assert_eq!(handler.handled.load(Ordering::SeqCst), 0);
}
