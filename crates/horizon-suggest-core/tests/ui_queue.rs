//! Integration tests for the UI queue: clocks, scheduler and signals together.

use std::sync::Arc;
use std::time::Duration;

use horizon_suggest_core::{ManualClock, ScheduledTaskId, SharedTaskScheduler, Signal};
use parking_lot::Mutex;

fn queue() -> (ManualClock, Arc<SharedTaskScheduler>) {
    let clock = ManualClock::new();
    let queue = Arc::new(SharedTaskScheduler::with_clock(Arc::new(clock.clone())));
    (clock, queue)
}

#[test]
fn debounce_built_from_signal_and_queue_coalesces_bursts() {
    let (clock, queue) = queue();
    let edits = Arc::new(Signal::<String>::new());
    let latest = Arc::new(Mutex::new(String::new()));
    let pending = Arc::new(Mutex::new(None::<ScheduledTaskId>));
    let fired = Arc::new(Mutex::new(Vec::new()));

    {
        let queue = queue.clone();
        let latest = latest.clone();
        let pending = pending.clone();
        let fired = fired.clone();
        edits.connect(move |text| {
            *latest.lock() = text.clone();
            if let Some(id) = pending.lock().take() {
                let _ = queue.cancel(id);
            }
            let latest = latest.clone();
            let fired = fired.clone();
            let id = queue.schedule_once(Duration::from_millis(200), move || {
                fired.lock().push(latest.lock().clone());
            });
            *pending.lock() = Some(id);
        });
    }

    edits.emit("a".into());
    clock.advance(Duration::from_millis(50));
    queue.process_ready();
    edits.emit("ab".into());
    clock.advance(Duration::from_millis(50));
    queue.process_ready();
    edits.emit("abc".into());

    clock.advance(Duration::from_millis(199));
    assert_eq!(queue.process_ready(), 0);
    clock.advance(Duration::from_millis(1));
    assert_eq!(queue.process_ready(), 1);

    assert_eq!(*fired.lock(), vec!["abc".to_string()]);
    assert_eq!(clock.elapsed(), Duration::from_millis(300));
}

#[test]
fn repeating_tick_runs_at_fixed_cadence_until_cancelled() {
    let (clock, queue) = queue();
    let ticks = Arc::new(Mutex::new(0));

    let ticks_clone = ticks.clone();
    let tick = queue.schedule_repeating(Duration::from_millis(16), move || {
        *ticks_clone.lock() += 1;
    });

    for _ in 0..10 {
        clock.advance(Duration::from_millis(16));
        queue.process_ready();
    }
    assert_eq!(*ticks.lock(), 10);

    queue.cancel(tick).unwrap();
    clock.advance(Duration::from_millis(160));
    queue.process_ready();
    assert_eq!(*ticks.lock(), 10);
    assert_eq!(queue.active_count(), 0);
}
