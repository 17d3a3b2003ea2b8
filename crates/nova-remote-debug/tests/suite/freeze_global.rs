use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use nova_remote_debug::FreezeCoordinator;

#[test]
fn global_coordinator_is_shared_across_threads() {
    let coordinator = FreezeCoordinator::global();
    assert!(std::ptr::eq(coordinator, FreezeCoordinator::global()));

    let freezes = Arc::new(AtomicUsize::new(0));
    let thaws = Arc::new(AtomicUsize::new(0));
    let on_freeze = coordinator.on_freezing({
        let freezes = freezes.clone();
        move || {
            freezes.fetch_add(1, Ordering::SeqCst);
        }
    });
    let on_thaw = coordinator.on_thawing({
        let thaws = thaws.clone();
        move || {
            thaws.fetch_add(1, Ordering::SeqCst);
        }
    });

    let workers: Vec<_> = (0..8)
        .map(|_| thread::spawn(|| FreezeCoordinator::global().freeze()))
        .collect();
    for worker in workers {
        worker.join().expect("freeze thread");
    }
    assert!(coordinator.frozen());
    assert_eq!(freezes.load(Ordering::SeqCst), 1);

    thread::spawn(|| FreezeCoordinator::global().thaw())
        .join()
        .expect("thaw thread");
    assert!(!coordinator.frozen());
    assert_eq!(thaws.load(Ordering::SeqCst), 1);

    assert!(coordinator.unsubscribe(on_freeze));
    assert!(coordinator.unsubscribe(on_thaw));
}
