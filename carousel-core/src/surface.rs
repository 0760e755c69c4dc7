//! Interactive editing surface - selection, dragging and transform handles.
//!
//! The surface never owns layers. It keeps the selected layer's id as a
//! lookup key into the [`SlideDeck`] and resolves it on demand, so a layer
//! that disappears simply reads back as "nothing selected".
//!
//! Drags are previewed visually and committed once, on release.

use serde::{Deserialize, Serialize};

use crate::layer::{estimate_text_width, Bounds, LayerKind};
use crate::{EditableSlide, Layer, LayerId, LayerPatch, PointerEvent, PointerPhase, SlideDeck, Viewport};

/// In-flight drag of the selected layer.
#[derive(Debug, Clone, PartialEq)]
struct DragState {
    layer_id: LayerId,
    grab_dx: f32,
    grab_dy: f32,
    current: (f32, f32),
    movable: bool,
    moved: bool,
}

/// Result of feeding a pointer event to the surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOutcome {
    /// A layer was hit and is now selected.
    Selected(LayerId),
    /// Empty canvas was hit; nothing is selected.
    Deselected,
    /// The selected layer is being dragged; position is visual only.
    DragPreview {
        /// Dragged layer.
        layer_id: LayerId,
        /// Preview X position.
        x: f32,
        /// Preview Y position.
        y: f32,
    },
    /// A drag finished and the new position was written to the deck.
    Committed {
        /// Moved layer.
        layer_id: LayerId,
        /// Committed X position.
        x: f32,
        /// Committed Y position.
        y: f32,
    },
    /// The event had no effect.
    Ignored,
}

/// Result of a transform-handle gesture (resize/rotate).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformChange {
    /// Horizontal scale relative to the current size.
    pub scale_x: f32,
    /// Vertical scale relative to the current size.
    pub scale_y: f32,
    /// Absolute rotation in degrees.
    pub rotation: f32,
}

/// Selection overlay drawn above every layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionOverlay {
    /// Selected layer.
    pub layer_id: LayerId,
    /// Unrotated bounds of the layer.
    pub bounds: Bounds,
    /// Layer rotation in degrees.
    pub rotation: f32,
}

/// What the surface currently shows: the slide with any drag preview
/// applied, plus the selection overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceView {
    /// Slide as displayed.
    pub slide: EditableSlide,
    /// Overlay for the selected layer, if any.
    pub overlay: Option<SelectionOverlay>,
}

/// Pointer-driven selection state over the active slide.
#[derive(Debug, Clone, Default)]
pub struct CanvasSurface {
    active_slide: usize,
    selected: Option<LayerId>,
    drag: Option<DragState>,
    viewport: Viewport,
}

impl CanvasSurface {
    /// A surface showing the first slide with nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom viewport mapping.
    #[must_use]
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// Current viewport mapping.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Replace the viewport mapping (e.g. on window resize).
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Index of the slide being edited.
    #[must_use]
    pub fn active_slide(&self) -> usize {
        self.active_slide
    }

    /// Selected layer id, as recorded.
    #[must_use]
    pub fn selected_id(&self) -> Option<&LayerId> {
        self.selected.as_ref()
    }

    /// Selected layer resolved against the deck; `None` if it vanished.
    #[must_use]
    pub fn selected_layer<'a>(&self, deck: &'a SlideDeck) -> Option<&'a Layer> {
        let id = self.selected.as_ref()?;
        deck.slide(self.active_slide)?.layer(id)
    }

    /// Layer the transform handle is attached to. The handle follows the
    /// selection and detaches when the layer no longer exists.
    #[must_use]
    pub fn transform_target(&self, deck: &SlideDeck) -> Option<LayerId> {
        self.selected_layer(deck).map(|l| l.id.clone())
    }

    /// Whether a drag is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag.as_ref().is_some_and(|d| d.moved)
    }

    /// Select a layer on the active slide. Returns `false` if the id is not
    /// on that slide.
    pub fn select(&mut self, deck: &SlideDeck, layer_id: &LayerId) -> bool {
        let exists = deck
            .slide(self.active_slide)
            .is_some_and(|slide| slide.contains(layer_id));
        if exists {
            tracing::debug!(slide = self.active_slide, layer = %layer_id, "layer selected");
            self.selected = Some(layer_id.clone());
        }
        exists
    }

    /// Clear the selection and drop any drag.
    pub fn deselect(&mut self) {
        if self.selected.take().is_some() {
            tracing::debug!(slide = self.active_slide, "selection cleared");
        }
        self.drag = None;
    }

    /// Show another slide. Selection never carries across slides, so it is
    /// cleared even when the index is out of range.
    pub fn switch_slide(&mut self, deck: &SlideDeck, index: usize) -> bool {
        self.deselect();
        if index < deck.len() {
            self.active_slide = index;
            true
        } else {
            tracing::warn!(index, slides = deck.len(), "switch to unknown slide ignored");
            false
        }
    }

    /// Drop a selection whose layer no longer exists.
    pub fn prune(&mut self, deck: &SlideDeck) {
        if self.selected.is_some() && self.selected_layer(deck).is_none() {
            self.deselect();
        }
    }

    /// Feed a pointer event.
    pub fn handle_pointer(&mut self, deck: &mut SlideDeck, event: &PointerEvent) -> SurfaceOutcome {
        let (fx, fy) = self.viewport.to_frame(event.x, event.y);

        match event.phase {
            PointerPhase::Down => self.pointer_down(deck, fx, fy),
            PointerPhase::Move => self.pointer_move(fx, fy),
            PointerPhase::Up => self.pointer_up(deck),
            PointerPhase::Cancel => {
                self.drag = None;
                SurfaceOutcome::Ignored
            }
        }
    }

    fn pointer_down(&mut self, deck: &SlideDeck, fx: f32, fy: f32) -> SurfaceOutcome {
        let hit = deck
            .slide(self.active_slide)
            .and_then(|slide| slide.layer_at(fx, fy));

        match hit {
            Some(layer) => {
                let id = layer.id.clone();
                self.drag = Some(DragState {
                    layer_id: id.clone(),
                    grab_dx: fx - layer.x,
                    grab_dy: fy - layer.y,
                    current: (layer.x, layer.y),
                    movable: layer.draggable,
                    moved: false,
                });
                tracing::debug!(slide = self.active_slide, layer = %id, "layer selected");
                self.selected = Some(id.clone());
                SurfaceOutcome::Selected(id)
            }
            None => {
                self.deselect();
                SurfaceOutcome::Deselected
            }
        }
    }

    fn pointer_move(&mut self, fx: f32, fy: f32) -> SurfaceOutcome {
        match &mut self.drag {
            Some(drag) if drag.movable => {
                drag.current = (fx - drag.grab_dx, fy - drag.grab_dy);
                drag.moved = true;
                SurfaceOutcome::DragPreview {
                    layer_id: drag.layer_id.clone(),
                    x: drag.current.0,
                    y: drag.current.1,
                }
            }
            _ => SurfaceOutcome::Ignored,
        }
    }

    fn pointer_up(&mut self, deck: &mut SlideDeck) -> SurfaceOutcome {
        let Some(drag) = self.drag.take() else {
            return SurfaceOutcome::Ignored;
        };
        if !(drag.moved && drag.movable) {
            return SurfaceOutcome::Ignored;
        }

        let (x, y) = drag.current;
        if deck.update_layer(self.active_slide, &drag.layer_id, &LayerPatch::position(x, y)) {
            SurfaceOutcome::Committed {
                layer_id: drag.layer_id,
                x,
                y,
            }
        } else {
            SurfaceOutcome::Ignored
        }
    }

    /// Commit a transform-handle gesture on the selected layer as a single
    /// patch. Text layers scale their box width and font size; stickers and
    /// rectangles scale their size.
    pub fn commit_transform(&mut self, deck: &mut SlideDeck, change: TransformChange) -> bool {
        let Some(layer) = self.selected_layer(deck) else {
            return false;
        };

        let mut patch = LayerPatch {
            rotation: Some(change.rotation),
            ..LayerPatch::default()
        };
        match &layer.kind {
            LayerKind::Text { font_size, .. } => {
                patch.width = Some(estimate_text_width(layer) * change.scale_x);
                patch.font_size = Some(font_size * change.scale_y);
            }
            LayerKind::Sticker { width, height, .. } | LayerKind::Rect { width, height, .. } => {
                patch.width = Some(width * change.scale_x);
                patch.height = Some(height * change.scale_y);
            }
        }

        let id = layer.id.clone();
        deck.update_layer(self.active_slide, &id, &patch)
    }

    /// The active slide as it should appear right now.
    #[must_use]
    pub fn view(&self, deck: &SlideDeck) -> Option<SurfaceView> {
        let mut slide = deck.slide(self.active_slide)?.clone();

        if let Some(drag) = self.drag.as_ref().filter(|d| d.moved && d.movable) {
            if let Some(layer) = slide.layer_mut(&drag.layer_id) {
                (layer.x, layer.y) = drag.current;
            }
        }

        let overlay = self
            .selected
            .as_ref()
            .and_then(|id| slide.layer(id))
            .map(|layer| SelectionOverlay {
                layer_id: layer.id.clone(),
                bounds: layer.bounds(),
                rotation: layer.rotation.unwrap_or(0.0),
            });

        Some(SurfaceView { slide, overlay })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ImageAsset, Page, Plan, SeedPolicy};

    fn deck() -> SlideDeck {
        let pages = (1..=5)
            .map(|n| Page::new(n, format!("Label {n}"), format!("Content {n}")))
            .collect();
        let mut deck = SlideDeck::from_plan(&Plan::new(pages).expect("plan"), SeedPolicy::Empty);
        deck.add_layer(0, Layer::rect("a".into(), 100.0, 100.0, 200.0, 200.0, "#f00"))
            .expect("add");
        deck.add_layer(0, Layer::rect("b".into(), 250.0, 250.0, 200.0, 200.0, "#0f0"))
            .expect("add");
        deck
    }

    #[test]
    fn test_initial_state() {
        let surface = CanvasSurface::new();
        assert_eq!(surface.active_slide(), 0);
        assert!(surface.selected_id().is_none());
    }

    #[test]
    fn test_click_selects_topmost() {
        let mut deck = deck();
        let mut surface = CanvasSurface::new();
        let outcome = surface.handle_pointer(&mut deck, &PointerEvent::down(275.0, 275.0));
        assert_eq!(outcome, SurfaceOutcome::Selected("b".into()));
        assert_eq!(surface.transform_target(&deck), Some("b".into()));
    }

    #[test]
    fn test_click_empty_deselects_without_moving() {
        let mut deck = deck();
        let before = deck.slide(0).cloned();
        let mut surface = CanvasSurface::new();

        surface.handle_pointer(&mut deck, &PointerEvent::down(150.0, 150.0));
        assert_eq!(surface.selected_id(), Some(&"a".into()));

        let outcome = surface.handle_pointer(&mut deck, &PointerEvent::down(900.0, 1200.0));
        assert_eq!(outcome, SurfaceOutcome::Deselected);
        assert_eq!(surface.handle_pointer(&mut deck, &PointerEvent::moved(950.0, 1250.0)), SurfaceOutcome::Ignored);
        assert_eq!(surface.handle_pointer(&mut deck, &PointerEvent::up(950.0, 1250.0)), SurfaceOutcome::Ignored);

        assert!(surface.selected_id().is_none());
        assert!(surface.transform_target(&deck).is_none());
        assert_eq!(deck.slide(0).cloned(), before);
    }

    #[test]
    fn test_drag_commits_only_on_release() {
        let mut deck = deck();
        let mut surface = CanvasSurface::new();

        surface.handle_pointer(&mut deck, &PointerEvent::down(110.0, 110.0));
        let preview = surface.handle_pointer(&mut deck, &PointerEvent::moved(160.0, 130.0));
        assert_eq!(
            preview,
            SurfaceOutcome::DragPreview {
                layer_id: "a".into(),
                x: 150.0,
                y: 120.0
            }
        );

        let stored = deck.slide(0).and_then(|s| s.layer(&"a".into())).expect("a");
        assert!((stored.x - 100.0).abs() < f32::EPSILON, "drag frame must not commit");
        let view = surface.view(&deck).expect("view");
        let shown = view.slide.layer(&"a".into()).expect("a");
        assert!((shown.x - 150.0).abs() < f32::EPSILON);

        let outcome = surface.handle_pointer(&mut deck, &PointerEvent::up(160.0, 130.0));
        assert_eq!(
            outcome,
            SurfaceOutcome::Committed {
                layer_id: "a".into(),
                x: 150.0,
                y: 120.0
            }
        );
        let stored = deck.slide(0).and_then(|s| s.layer(&"a".into())).expect("a");
        assert!((stored.x - 150.0).abs() < f32::EPSILON);
        assert!((stored.y - 120.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_cancel_discards_drag() {
        let mut deck = deck();
        let mut surface = CanvasSurface::new();
        surface.handle_pointer(&mut deck, &PointerEvent::down(110.0, 110.0));
        surface.handle_pointer(&mut deck, &PointerEvent::moved(500.0, 500.0));
        surface.handle_pointer(&mut deck, &PointerEvent::new(PointerPhase::Cancel, 500.0, 500.0));
        assert_eq!(surface.handle_pointer(&mut deck, &PointerEvent::up(500.0, 500.0)), SurfaceOutcome::Ignored);
        let stored = deck.slide(0).and_then(|s| s.layer(&"a".into())).expect("a");
        assert!((stored.x - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_locked_layer_selects_but_does_not_move() {
        let mut deck = deck();
        deck.update_layer(
            0,
            &"a".into(),
            &LayerPatch {
                draggable: Some(false),
                ..LayerPatch::default()
            },
        );
        let mut surface = CanvasSurface::new();
        assert_eq!(
            surface.handle_pointer(&mut deck, &PointerEvent::down(110.0, 110.0)),
            SurfaceOutcome::Selected("a".into())
        );
        assert_eq!(surface.handle_pointer(&mut deck, &PointerEvent::moved(300.0, 300.0)), SurfaceOutcome::Ignored);
        assert_eq!(surface.handle_pointer(&mut deck, &PointerEvent::up(300.0, 300.0)), SurfaceOutcome::Ignored);
    }

    #[test]
    fn test_switch_slide_clears_selection() {
        let mut deck = deck();
        let mut surface = CanvasSurface::new();
        surface.handle_pointer(&mut deck, &PointerEvent::down(110.0, 110.0));
        assert!(surface.switch_slide(&deck, 3));
        assert_eq!(surface.active_slide(), 3);
        assert!(surface.selected_id().is_none());

        assert!(!surface.select(&deck, &"missing".into()));
        assert!(!surface.switch_slide(&deck, 17));
        assert_eq!(surface.active_slide(), 3);
    }

    #[test]
    fn test_selection_tolerates_removed_layer() {
        let mut deck = deck();
        let mut surface = CanvasSurface::new();
        surface.handle_pointer(&mut deck, &PointerEvent::down(110.0, 110.0));
        deck.remove_layer(0, &"a".into());
        assert!(surface.selected_layer(&deck).is_none());
        assert!(surface.view(&deck).expect("view").overlay.is_none());
        surface.prune(&deck);
        assert!(surface.selected_id().is_none());
    }

    #[test]
    fn test_viewport_mapping_for_hit_testing() {
        let mut deck = deck();
        let mut surface = CanvasSurface::new().with_viewport(Viewport {
            scale: 0.5,
            offset_x: 10.0,
            offset_y: 10.0,
        });
        // Frame (110, 110) is viewport (65, 65).
        assert_eq!(
            surface.handle_pointer(&mut deck, &PointerEvent::down(65.0, 65.0)),
            SurfaceOutcome::Selected("a".into())
        );
    }

    #[test]
    fn test_commit_transform_scales_sticker() {
        let mut deck = deck();
        let id = deck
            .add_sticker(0, ImageAsset::svg("<svg xmlns=\"http://www.w3.org/2000/svg\"/>"))
            .expect("sticker");
        let mut surface = CanvasSurface::new();
        assert!(surface.select(&deck, &id));
        assert!(surface.commit_transform(
            &mut deck,
            TransformChange {
                scale_x: 2.0,
                scale_y: 0.5,
                rotation: 15.0
            }
        ));
        let layer = deck.slide(0).and_then(|s| s.layer(&id)).expect("sticker");
        assert_eq!(layer.rotation, Some(15.0));
        match layer.kind {
            LayerKind::Sticker { width, height, .. } => {
                assert!((width - 440.0).abs() < 1e-3);
                assert!((height - 110.0).abs() < 1e-3);
            }
            _ => panic!("kind changed"),
        }
    }

    #[test]
    fn test_overlay_tracks_selection() {
        let mut deck = deck();
        let mut surface = CanvasSurface::new();
        surface.handle_pointer(&mut deck, &PointerEvent::down(300.0, 300.0));
        let view = surface.view(&deck).expect("view");
        let overlay = view.overlay.expect("overlay");
        assert_eq!(overlay.layer_id, "b".into());
        assert!((overlay.bounds.width - 200.0).abs() < f32::EPSILON);
    }
}
