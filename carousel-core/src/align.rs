//! Quick alignment of text layers against fixed frame anchors.

use serde::{Deserialize, Serialize};

use crate::layer::{estimate_text_height, estimate_text_width, LayerKind, SAFE_MARGIN_X};
use crate::layout::{FRAME_HEIGHT, FRAME_WIDTH};
use crate::{Layer, TextAlign};

/// Top safe margin for vertical alignment.
pub const SAFE_MARGIN_TOP: f32 = 120.0;

/// Bottom safe margin for vertical alignment (clears the page number).
pub const SAFE_MARGIN_BOTTOM: f32 = 160.0;

/// Horizontal alignment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlign {
    /// Left edge on the left margin.
    Left,
    /// Centered on the frame.
    Center,
    /// Right edge on the right margin.
    Right,
}

impl From<HorizontalAlign> for TextAlign {
    fn from(mode: HorizontalAlign) -> Self {
        match mode {
            HorizontalAlign::Left => Self::Left,
            HorizontalAlign::Center => Self::Center,
            HorizontalAlign::Right => Self::Right,
        }
    }
}

/// Vertical alignment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    /// Top edge on the top margin.
    Top,
    /// Centered on the frame.
    Middle,
    /// Bottom edge on the bottom margin.
    Bottom,
}

/// Move a text layer so its box lands on the margin or center, and set its
/// `align` to match. Returns whether the layer changed.
///
/// Non-text layers are left untouched.
pub fn align_text_horiz(layer: &mut Layer, mode: HorizontalAlign) -> bool {
    if !layer.is_text() {
        return false;
    }

    let width = estimate_text_width(layer);
    let x = match mode {
        HorizontalAlign::Left => SAFE_MARGIN_X,
        HorizontalAlign::Center => (FRAME_WIDTH - width) / 2.0,
        HorizontalAlign::Right => FRAME_WIDTH - SAFE_MARGIN_X - width,
    };

    let mut changed = (layer.x - x).abs() > f32::EPSILON;
    layer.x = x;
    if let LayerKind::Text { align, .. } = &mut layer.kind {
        let target = TextAlign::from(mode);
        changed |= *align != target;
        *align = target;
    }
    changed
}

/// Move a text layer to the top margin, vertical center or bottom margin.
/// Returns whether the layer changed.
///
/// Non-text layers are left untouched.
pub fn align_text_vert(layer: &mut Layer, mode: VerticalAlign) -> bool {
    if !layer.is_text() {
        return false;
    }

    let height = estimate_text_height(layer);
    let y = match mode {
        VerticalAlign::Top => SAFE_MARGIN_TOP,
        VerticalAlign::Middle => (FRAME_HEIGHT - height) / 2.0,
        VerticalAlign::Bottom => FRAME_HEIGHT - SAFE_MARGIN_BOTTOM - height,
    };

    let changed = (layer.y - y).abs() > f32::EPSILON;
    layer.y = y;
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_layer() -> Layer {
        Layer::text("body".into(), 333.0, 444.0, "Read the room\nbefore speaking", 60.0)
    }

    #[test]
    fn test_horizontal_alignment_is_idempotent() {
        for mode in [HorizontalAlign::Left, HorizontalAlign::Center, HorizontalAlign::Right] {
            let mut layer = text_layer();
            align_text_horiz(&mut layer, mode);
            let once = layer.clone();
            let changed = align_text_horiz(&mut layer, mode);
            assert!(!changed, "{mode:?} changed on second application");
            assert_eq!(layer, once);
        }
    }

    #[test]
    fn test_vertical_alignment_is_idempotent() {
        for mode in [VerticalAlign::Top, VerticalAlign::Middle, VerticalAlign::Bottom] {
            let mut layer = text_layer();
            align_text_vert(&mut layer, mode);
            let once = layer.clone();
            assert!(!align_text_vert(&mut layer, mode));
            assert_eq!(layer, once);
        }
    }

    #[test]
    fn test_horizontal_positions() {
        let mut layer = text_layer();
        let width = estimate_text_width(&layer);

        align_text_horiz(&mut layer, HorizontalAlign::Left);
        assert!((layer.x - SAFE_MARGIN_X).abs() < 1e-3);

        align_text_horiz(&mut layer, HorizontalAlign::Right);
        assert!((layer.x + width - (FRAME_WIDTH - SAFE_MARGIN_X)).abs() < 1e-3);

        align_text_horiz(&mut layer, HorizontalAlign::Center);
        assert!((layer.x + width / 2.0 - FRAME_WIDTH / 2.0).abs() < 1e-3);
        assert!(matches!(
            layer.kind,
            LayerKind::Text {
                align: TextAlign::Center,
                ..
            }
        ));
    }

    #[test]
    fn test_vertical_middle_centers_box() {
        let mut layer = text_layer();
        align_text_vert(&mut layer, VerticalAlign::Middle);
        let height = estimate_text_height(&layer);
        assert!((layer.y + height / 2.0 - FRAME_HEIGHT / 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_non_text_layers_are_ignored() {
        let mut rect = Layer::rect("r".into(), 10.0, 20.0, 100.0, 100.0, "#000");
        let before = rect.clone();
        assert!(!align_text_horiz(&mut rect, HorizontalAlign::Center));
        assert!(!align_text_vert(&mut rect, VerticalAlign::Bottom));
        assert_eq!(rect, before);
    }
}
