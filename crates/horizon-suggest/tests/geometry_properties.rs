//! Properties of the popup geometry over a range of layouts.

use std::sync::Arc;

use horizon_suggest::geometry::{
    available_space, clamp_to_available, place_window, resolve_placement, GeometryConfig,
    GeometryState,
};
use horizon_suggest::headless::{HeadlessAnchor, HeadlessContent, HeadlessRoot};
use horizon_suggest::{Gravity, Insets, Margins, PreferredPosition, Rect, Size, VerticalPlacement};

const FRAME: Rect = Rect::new(0, 0, 1080, 1920);
const INSETS: Insets = Insets::new(0, 63, 0, 126);
const GRAVITIES: [Gravity; 3] = [Gravity::Start, Gravity::End, Gravity::Center];

fn margin_sets() -> Vec<Margins> {
    vec![
        Margins::default(),
        Margins::new(8, 4, 8, 4),
        Margins::new(0, 30, 25, 10).with_vertical_safe(12),
        Margins::uniform(16).with_vertical_safe(48),
    ]
}

#[test]
fn best_fit_goes_above_only_past_the_middle() {
    for top in (0..1900).step_by(20) {
        let anchor = Rect::new(100, top, 980, top + 100);
        for margins in margin_sets() {
            let placement = resolve_placement(PreferredPosition::BestFit, anchor, FRAME, margins.top);
            let expected = if top + margins.top > FRAME.height() / 2 {
                VerticalPlacement::Above
            } else {
                VerticalPlacement::Below
            };
            assert_eq!(placement, expected, "top={top} margins={margins:?}");
            assert_eq!(
                resolve_placement(PreferredPosition::BestFit, anchor, FRAME, margins.top),
                placement
            );
        }
    }
}

#[test]
fn size_stays_within_available_space() {
    let contents = [Size::new(50, 40), Size::new(600, 500), Size::new(3000, 5000)];

    for top in (100..1800).step_by(100) {
        let anchor = Rect::new(120, top, 900, top + 96);
        for margins in margin_sets() {
            for constrain in [true, false] {
                let placement =
                    resolve_placement(PreferredPosition::BestFit, anchor, FRAME, margins.top);
                let space = available_space(placement, anchor, FRAME, INSETS, margins, constrain);

                for content in contents {
                    let size = clamp_to_available(content, space);
                    for gravity in GRAVITIES {
                        let rect = place_window(size, placement, anchor, FRAME, margins, gravity, constrain);
                        let context = format!("top={top} {margins:?} constrain={constrain} {content:?} {gravity:?}");

                        assert!(rect.width() >= 0, "{context}");
                        assert!(rect.height() >= 0, "{context}");
                        assert!(rect.width() <= space.width.max(0), "{context}");
                        assert!(rect.height() <= space.safe_height.max(0), "{context}");
                    }
                }
            }
        }
    }
}

#[test]
fn constrained_wide_content_spans_the_anchor() {
    for width in [301, 480, 777, 880] {
        let anchor = Rect::new(90, 400, 90 + width, 520);
        let placement = VerticalPlacement::Below;
        let space = available_space(placement, anchor, FRAME, INSETS, Margins::default(), true);
        let size = clamp_to_available(Size::new(2000, 300), space);

        for gravity in GRAVITIES {
            let rect = place_window(size, placement, anchor, FRAME, Margins::default(), gravity, true);
            assert_eq!(rect.width(), anchor.width(), "{gravity:?}");
            assert_eq!((rect.left, rect.right), (anchor.left, anchor.right), "{gravity:?}");
        }
    }
}

#[test]
fn recompute_is_idempotent() {
    let root = Arc::new(HeadlessRoot::new(FRAME, INSETS));
    let anchor = HeadlessAnchor::new(Rect::new(60, 1300, 1020, 1420), root);
    let content = HeadlessContent::new(Size::new(900, 700));

    for margins in margin_sets() {
        for gravity in GRAVITIES {
            let mut state = GeometryState::new(GeometryConfig {
                preferred_position: PreferredPosition::BestFit,
                gravity,
                constrain_to_anchor_bounds: false,
                margins,
            });
            state.set_stable_insets(INSETS);

            let first = state.recompute(&anchor, &content).unwrap();
            let second = state.recompute(&anchor, &content).unwrap();
            assert_eq!(first, second);
            assert_eq!(state.determined_position(), VerticalPlacement::Above);
        }
    }
}

#[test]
fn measurement_is_cached_until_requested() {
    let root = Arc::new(HeadlessRoot::new(FRAME, INSETS));
    let anchor = HeadlessAnchor::new(Rect::new(100, 400, 980, 520), root);
    let content = HeadlessContent::new(Size::new(600, 500));
    let mut state = GeometryState::new(GeometryConfig::default());

    state.recompute(&anchor, &content).unwrap();
    state.recompute(&anchor, &content).unwrap();
    assert_eq!(content.measure_count(), 1);

    state.config_mut().margins = Margins::uniform(20);
    state.recompute(&anchor, &content).unwrap();
    assert_eq!(content.measure_count(), 1);

    state.request_layout();
    state.recompute(&anchor, &content).unwrap();
    assert_eq!(content.measure_count(), 2);
    assert!(!state.is_layout_requested());
}

#[test]
fn fill_available_takes_the_offered_space() {
    use horizon_suggest::ContentSizing;

    let root = Arc::new(HeadlessRoot::new(FRAME, INSETS));
    let anchor = HeadlessAnchor::new(Rect::new(100, 400, 980, 520), root);
    let content = HeadlessContent::new(Size::new(200, 100));
    content.set_sizing(ContentSizing::FillAvailable, ContentSizing::Natural);

    let mut state = GeometryState::new(GeometryConfig {
        constrain_to_anchor_bounds: true,
        margins: Margins::new(10, 0, 10, 0),
        ..GeometryConfig::default()
    });
    state.recompute(&anchor, &content).unwrap();

    assert_eq!(state.view_dimensions(), Size::new(860, 100));
    assert_eq!(content.last_constraints(), Some((860, 1920 - 400)));
}
