//! Horizon Suggest Headless Demo
//!
//! Types a few words into a headless text field, lets the keyboard push the
//! field up and prints where the suggestion popup ends up.
//!
//! Run with: cargo run -p horizon-suggest --example headless_demo
//! Set `RUST_LOG=horizon_suggest=trace` to see every reposition.

use std::sync::Arc;
use std::time::Duration;

use horizon_suggest::headless::HeadlessHost;
use horizon_suggest::lifecycle::REPOSITION_INTERVAL;
use horizon_suggest::{ListChangeNotifier, PopupSettings, Size, Suggestive};
use tracing_subscriber::EnvFilter;

const WORDS: &[&str] = &[
    "rust", "rustc", "rustdoc", "rustfmt", "rustup", "ruby", "runtime", "rune",
];

const SETTINGS: &str = r##"
min_characters = 1
query_throttle_ms = 150

[background]
kind = "rounded"
color = "#FAFAFA"
radius = 12.0

[margins]
top = 4
bottom = 4
vertical_safe = 8
"##;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("horizon_suggest=debug")),
        )
        .init();

    let host = HeadlessHost::new();
    let results = Arc::new(ListChangeNotifier::new());
    let settings = PopupSettings::from_toml_str(SETTINGS)?;

    let content = host.content.clone();
    let results_clone = results.clone();
    let window = Suggestive::list(
        host.anchor.clone(),
        host.content.clone(),
        host.surface.clone(),
        host.scheduler.clone(),
        results.clone(),
    )
    .settings(settings)
    .back_registry(host.back.clone())
    .on_query(move |text| {
        let matches: Vec<&str> = WORDS.iter().copied().filter(|w| w.starts_with(text)).collect();
        println!("query {text:?} -> {matches:?}");
        content.set_natural_size(Size::new(600, 48 * matches.len() as i32));
        results_clone.notify_reset();
    })
    .build()?;

    for text in ["r", "ru", "rus", "rust"] {
        host.anchor.set_text(text);
        host.advance(Duration::from_millis(40));
    }
    host.advance(Duration::from_millis(150));
    host.run_pending();
    println!("popup at {:?}", window.window_rect());

    // The keyboard slides in and pushes the field up.
    for _ in 0..10 {
        host.anchor.move_by(0, -24);
        host.advance(REPOSITION_INTERVAL);
    }
    println!("after keyboard: {:?}", window.window_rect());

    host.back.press_back();
    println!("after back press: showing = {}", window.is_showing());
    Ok(())
}
