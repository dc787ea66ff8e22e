//! End-to-end popup scenarios on the headless host.

use std::sync::Arc;
use std::time::Duration;

use horizon_suggest::headless::HeadlessHost;
use horizon_suggest::lifecycle::REPOSITION_INTERVAL;
use horizon_suggest::{
    ListChangeNotifier, MinCharactersRule, Rect, Size, SuggestError, Suggestive,
    SuggestionWindow, SuggestionWindowBuilder,
};
use parking_lot::Mutex;

fn builder(host: &HeadlessHost) -> SuggestionWindowBuilder {
    SuggestionWindow::builder(
        host.anchor.clone(),
        host.content.clone(),
        host.surface.clone(),
        host.scheduler.clone(),
    )
    .back_registry(host.back.clone())
}

/// Records every query with the clock reading at the time of the call.
fn recording(
    host: &HeadlessHost,
    builder: SuggestionWindowBuilder,
) -> (SuggestionWindow, Arc<Mutex<Vec<(Duration, String)>>>) {
    let queries = Arc::new(Mutex::new(Vec::new()));
    let queries_clone = queries.clone();
    let clock = host.clock.clone();
    let window = builder
        .on_query(move |text| queries_clone.lock().push((clock.elapsed(), text.to_string())))
        .build()
        .unwrap();
    (window, queries)
}

#[test]
fn throttled_burst_fires_once_with_latest_text() {
    let host = HeadlessHost::new();
    let (window, queries) = recording(
        &host,
        builder(&host).query_throttle(Duration::from_millis(200)),
    );

    host.anchor.set_text("rus");
    host.advance(Duration::from_millis(50));
    host.anchor.set_text("rust");
    host.advance(Duration::from_millis(50));
    host.anchor.set_text("rust-");
    assert!(window.is_showing());

    host.advance(Duration::from_millis(150));
    // Edited without an event; the query still reads the live text.
    host.anchor.set_text_silently("rust-lang");
    assert!(queries.lock().is_empty());

    host.advance(Duration::from_millis(49));
    assert!(queries.lock().is_empty());
    host.advance(Duration::from_millis(1));

    assert_eq!(
        *queries.lock(),
        vec![(Duration::from_millis(300), "rust-lang".to_string())]
    );
    assert!(!window.has_pending_query());
}

#[test]
fn min_characters_gate_uses_strict_comparison() {
    let host = HeadlessHost::new();
    let (window, queries) = recording(&host, builder(&host).min_characters(3));

    for text in ["a", "ab", "abc"] {
        host.anchor.set_text(text);
        assert!(!window.is_showing(), "shown at {text:?}");
        assert_eq!(host.surface.record().show_count, 0);
    }

    host.anchor.set_text("abcd");
    assert!(window.is_showing());
    assert_eq!(host.surface.record().show_count, 1);
    let texts: Vec<String> = queries.lock().iter().map(|(_, text)| text.clone()).collect();
    assert_eq!(texts, vec!["abcd".to_string()]);
}

#[test]
fn min_characters_at_least_rule() {
    let host = HeadlessHost::new();
    let (window, queries) = recording(
        &host,
        builder(&host)
            .min_characters(3)
            .min_characters_rule(MinCharactersRule::AtLeast),
    );

    host.anchor.set_text("abc");
    assert!(window.is_showing());
    assert_eq!(queries.lock().len(), 1);
}

#[test]
fn clearing_text_dismisses_and_stops_tick() {
    let host = HeadlessHost::new();
    let (window, _queries) = recording(&host, builder(&host));

    host.anchor.set_text("rust");
    assert!(window.is_showing());
    assert_eq!(host.scheduler.active_count(), 1);

    host.anchor.set_text("");
    assert!(!window.is_showing());
    assert_eq!(host.surface.record().dismiss_count, 1);
    assert_eq!(host.scheduler.active_count(), 0);

    let updates = host.surface.record().update_count;
    host.advance(REPOSITION_INTERVAL * 5);
    assert_eq!(host.surface.record().update_count, updates);

    // A relayout while hidden has no visible effect...
    window.request_layout();
    host.run_pending();
    assert!(!window.is_showing());
    assert_eq!(host.surface.record().update_count, updates);
    assert_eq!(host.content.measure_count(), 1);

    // ...until the next show, which re-measures.
    host.anchor.set_text("rust");
    assert!(window.is_showing());
    assert_eq!(host.content.measure_count(), 2);
}

#[test]
fn double_request_layout_leaves_one_pending() {
    let host = HeadlessHost::new();
    let (window, _queries) = recording(&host, builder(&host));
    window.show().unwrap();
    let updates = host.surface.record().update_count;

    window.request_layout();
    window.request_layout();
    // The repositioning tick plus a single relayout.
    assert_eq!(host.scheduler.active_count(), 2);

    assert_eq!(host.run_pending(), 1);
    assert_eq!(host.surface.record().update_count, updates + 1);
    assert_eq!(host.scheduler.active_count(), 1);
}

#[test]
fn popup_follows_anchor_while_showing() {
    let host = HeadlessHost::new();
    let (window, _queries) = recording(&host, builder(&host));
    window.show().unwrap();
    let start = window.window_rect().unwrap();

    // The keyboard pushes the field up in steps.
    for step in 1..=5 {
        host.anchor.move_by(0, -20);
        host.advance(REPOSITION_INTERVAL);
        assert_eq!(window.window_rect(), Some(start.offset(0, -20 * step)));
        assert_eq!(host.surface.record().rect, start.offset(0, -20 * step));
    }
}

#[test]
fn popup_flips_above_when_anchor_moves_low() {
    let host = HeadlessHost::new();
    let (window, _queries) = recording(&host, builder(&host));
    window.show().unwrap();
    assert_eq!(window.window_rect().unwrap().top, 520);

    host.anchor.set_rect(Rect::new(100, 1500, 980, 1620));
    host.advance(REPOSITION_INTERVAL);

    let rect = window.window_rect().unwrap();
    assert_eq!(rect.bottom, 1500);
    assert_eq!(rect.height(), 500);
}

#[test]
fn back_press_dismisses() {
    let host = HeadlessHost::new();
    let (window, _queries) = recording(&host, builder(&host));
    let dismissed = Arc::new(Mutex::new(0));
    let dismissed_clone = dismissed.clone();
    window.dismissed().connect(move |_| *dismissed_clone.lock() += 1);

    window.show().unwrap();
    assert!(host.back.press_back());
    assert!(!window.is_showing());
    assert_eq!(*dismissed.lock(), 1);
    assert_eq!(host.scheduler.active_count(), 0);
}

#[test]
fn focus_loss_hides() {
    let host = HeadlessHost::new();
    let (window, _queries) = recording(&host, builder(&host));

    host.anchor.set_text("rust");
    host.anchor.set_focused(false);
    assert!(!window.is_showing());

    host.anchor.set_focused(true);
    assert!(!window.is_showing());
}

#[test]
fn outside_touch_dismisses() {
    let host = HeadlessHost::new();
    let (window, _queries) = recording(&host, builder(&host));
    window.show().unwrap();

    host.surface.dismiss_externally();
    assert!(!window.is_showing());
    assert_eq!(host.scheduler.active_count(), 0);
    assert_eq!(host.back.handler_count(), 0);
}

#[test]
fn shown_signal_carries_rect() {
    let host = HeadlessHost::new();
    let (window, _queries) = recording(&host, builder(&host));
    let shown = Arc::new(Mutex::new(Vec::new()));
    let shown_clone = shown.clone();
    window.shown().connect(move |rect| shown_clone.lock().push(*rect));

    window.show().unwrap();
    window.show().unwrap();
    assert_eq!(*shown.lock(), vec![Rect::new(240, 520, 840, 1020)]);
}

#[test]
fn list_changes_resize_popup() {
    let host = HeadlessHost::new();
    let results = Arc::new(ListChangeNotifier::new());

    let results_clone = results.clone();
    let content = host.content.clone();
    let window = Suggestive::list(
        host.anchor.clone(),
        host.content.clone(),
        host.surface.clone(),
        host.scheduler.clone(),
        results.clone(),
    )
    .on_query(move |text| {
        // One 40px row per character typed.
        let rows = text.chars().count() as i32;
        content.set_natural_size(Size::new(600, rows * 40));
        results_clone.notify_reset();
    })
    .build()
    .unwrap();

    host.anchor.set_text("ab");
    host.run_pending();
    assert_eq!(window.window_rect().map(|r| r.height()), Some(80));

    host.anchor.set_text("abcd");
    host.run_pending();
    assert_eq!(window.window_rect().map(|r| r.height()), Some(160));

    results.notify_range_changed(0, 1);
    results.notify_range_moved(0, 2, 1);
    assert!(window.lifecycle().has_pending_layout());
    assert_eq!(host.run_pending(), 1);
}

#[test]
fn detached_anchor_fails_fast() {
    let host = HeadlessHost::new();
    let (window, queries) = recording(&host, builder(&host));

    host.anchor.detach();
    assert_eq!(window.show(), Err(SuggestError::AnchorDetached));

    // Typing still queries, the popup just cannot appear.
    host.anchor.set_text("rust");
    assert!(!window.is_showing());
    assert_eq!(queries.lock().len(), 1);
}

#[test]
fn anchor_detached_while_showing_dismisses() {
    let host = HeadlessHost::new();
    let (window, _queries) = recording(&host, builder(&host));
    window.show().unwrap();

    host.anchor.detach();
    host.advance(REPOSITION_INTERVAL);
    assert!(!window.is_showing());
    assert!(!host.surface.record().showing);
}

#[test]
fn dropping_window_stops_everything() {
    let host = HeadlessHost::new();
    let (window, queries) = recording(
        &host,
        builder(&host).query_throttle(Duration::from_millis(100)),
    );
    host.anchor.set_text("rust");
    window.request_layout();
    assert_eq!(host.scheduler.active_count(), 3);

    drop(window);
    assert_eq!(host.scheduler.active_count(), 0);
    assert_eq!(host.back.handler_count(), 0);
    assert!(!host.surface.has_dismiss_hook());

    host.anchor.set_text("rust-lang");
    host.advance(Duration::from_millis(500));
    assert!(queries.lock().is_empty());
}
