//! Editing workflow integration tests.
//!
//! Drives an `EditorSession` the way a UI would:
//! - Seeding a deck from a plan
//! - Selecting, dragging and deselecting layers
//! - Stickers, alignment and background loads
//! - Deck persistence

use std::collections::HashSet;

use carousel_core::stickers;
use carousel_core::{
    EditorSession, HorizontalAlign, ImageAsset, Layer, LayerId, LayerKind, LayerPatch, Page, Plan,
    PointerEvent, SeedPolicy, SlideDeck, SurfaceOutcome, VerticalAlign,
};

fn plan() -> Plan {
    let pages = vec![
        Page::new(1, "Today's Expression", "Break the ice"),
        Page::new(2, "Expression", "Break the ice\n어색함을 깨다"),
        Page::new(3, "Example 01", "She told a joke to break the ice."),
        Page::new(4, "Example 02", "Games are a great way to break the ice."),
        Page::new(5, "Summary", "Summary: start a conversation"),
    ];
    Plan::new(pages).expect("valid plan")
}

fn body_id() -> LayerId {
    LayerId::new("body")
}

// ==========================================================================
// Selection
// ==========================================================================

#[test]
fn test_select_then_click_empty_never_moves_anything() {
    let mut session = EditorSession::from_plan(plan(), SeedPolicy::PageText);
    let before = session.deck.to_json().expect("json");

    let outcome = session.handle_pointer(&PointerEvent::down(500.0, 600.0));
    assert_eq!(outcome, SurfaceOutcome::Selected(body_id()));
    assert_eq!(session.surface.transform_target(&session.deck), Some(body_id()));

    let outcome = session.handle_pointer(&PointerEvent::down(540.0, 1300.0));
    assert_eq!(outcome, SurfaceOutcome::Deselected);
    session.handle_pointer(&PointerEvent::moved(700.0, 1320.0));
    session.handle_pointer(&PointerEvent::up(700.0, 1320.0));

    assert!(session.surface.selected_id().is_none());
    assert!(session.surface.transform_target(&session.deck).is_none());
    assert_eq!(session.deck.to_json().expect("json"), before);
    assert!(!session.has_local_changes);
}

#[test]
fn test_drag_then_switch_slides() {
    let mut session = EditorSession::from_plan(plan(), SeedPolicy::PageText);

    session.handle_pointer(&PointerEvent::down(500.0, 600.0));
    session.handle_pointer(&PointerEvent::moved(520.0, 640.0));
    session.handle_pointer(&PointerEvent::moved(540.0, 700.0));
    let outcome = session.handle_pointer(&PointerEvent::up(540.0, 700.0));
    assert!(matches!(outcome, SurfaceOutcome::Committed { .. }));
    assert!(session.has_local_changes);

    let body = session.deck.slide(0).and_then(|s| s.layer(&body_id())).expect("body");
    assert!((body.x - 120.0).abs() < 1e-3);
    assert!((body.y - 655.0).abs() < 1e-3);

    assert!(session.switch_slide(2));
    assert!(session.surface.selected_id().is_none());
    // The other slide's body was not touched.
    let other = session.deck.slide(2).and_then(|s| s.layer(&body_id())).expect("body");
    assert!((other.x - 80.0).abs() < 1e-3);
}

// ==========================================================================
// Layer editing
// ==========================================================================

#[test]
fn test_catalog_stickers_get_unique_ids() {
    let mut session = EditorSession::from_plan(plan(), SeedPolicy::PageText);
    let mut ids = HashSet::new();
    for sticker in stickers::catalog().iter().cycle().take(30) {
        let id = session.add_sticker(sticker.asset.clone()).expect("sticker");
        assert!(ids.insert(id));
    }
    let slide = session.deck.slide(0).expect("slide");
    let all: HashSet<_> = slide.layers().iter().map(|l| l.id.clone()).collect();
    assert_eq!(all.len(), slide.layers().len());
}

#[test]
fn test_unknown_layer_update_is_ignored() {
    let mut deck = SlideDeck::from_plan(&plan(), SeedPolicy::PageText);
    let before = deck.to_json().expect("json");
    assert!(!deck.update_layer(0, &LayerId::new("ghost"), &LayerPatch::position(1.0, 1.0)));
    assert!(!deck.update_layer(7, &body_id(), &LayerPatch::position(1.0, 1.0)));
    assert_eq!(deck.to_json().expect("json"), before);
}

#[test]
fn test_alignment_round() {
    let mut deck = SlideDeck::from_plan(&plan(), SeedPolicy::PageText);
    deck.add_layer(1, Layer::text(LayerId::new("note"), 300.0, 300.0, "tap to edit", 48.0))
        .expect("add");
    let id = LayerId::new("note");

    for mode in [HorizontalAlign::Right, HorizontalAlign::Center, HorizontalAlign::Left] {
        deck.align_text_horiz(1, &id, mode);
        let once = deck.slide(1).and_then(|s| s.layer(&id)).cloned();
        assert!(!deck.align_text_horiz(1, &id, mode));
        assert_eq!(deck.slide(1).and_then(|s| s.layer(&id)).cloned(), once);
    }
    for mode in [VerticalAlign::Bottom, VerticalAlign::Middle, VerticalAlign::Top] {
        deck.align_text_vert(1, &id, mode);
        assert!(!deck.align_text_vert(1, &id, mode));
    }

    let layer = deck.slide(1).and_then(|s| s.layer(&id)).expect("note");
    assert!((layer.x - 80.0).abs() < 1e-3);
    assert!((layer.y - 120.0).abs() < 1e-3);
    assert!(matches!(layer.kind, LayerKind::Text { .. }));
}

// ==========================================================================
// Backgrounds and persistence
// ==========================================================================

#[test]
fn test_last_requested_background_wins() {
    let mut deck = SlideDeck::from_plan(&plan(), SeedPolicy::Empty);
    let slow = deck.begin_background_load(4).expect("ticket");
    let fast = deck.begin_background_load(4).expect("ticket");

    let latest = ImageAsset::png(b"latest");
    assert!(deck.complete_background_load(fast, latest.clone()));
    assert!(!deck.complete_background_load(slow, ImageAsset::png(b"stale")));
    assert_eq!(deck.slide(4).and_then(|s| s.background.clone()), Some(latest));
}

#[test]
fn test_deck_survives_json_round_trip() {
    let mut session = EditorSession::from_plan(plan(), SeedPolicy::PageText);
    let star = stickers::sticker("star").expect("star");
    session.add_sticker(star.asset.clone()).expect("sticker");
    session.toggle_legibility_band();

    let json = session.deck.to_json().expect("json");
    let restored = SlideDeck::from_json(&json).expect("restore");
    assert_eq!(restored.len(), 5);
    for i in 0..5 {
        assert_eq!(restored.slide(i), session.deck.slide(i));
    }
    assert_eq!(restored.slide(0).map(|s| s.legibility_band), Some(true));
}
