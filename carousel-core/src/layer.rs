//! Slide layers - the building blocks of an editable slide.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::layout::{ApproxMeasure, FontSpec, TextMeasure, FRAME_WIDTH};
use crate::ImageAsset;

/// Horizontal safe margin used by alignment and width estimates.
pub const SAFE_MARGIN_X: f32 = 80.0;

/// Narrowest width a text box is ever estimated at.
pub const MIN_TEXT_WIDTH: f32 = 40.0;

/// Multiplier applied to font size when no explicit line height is set.
pub const DEFAULT_LINE_HEIGHT: f32 = 1.0;

/// Identifier of a layer, unique within its slide and never reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    /// Use a fixed, caller-chosen id (seeded layers).
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id with the given prefix, e.g. `stk-<uuid>`.
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{prefix}-{}", Uuid::new_v4().simple()))
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Text alignment within a text layer's box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Left-aligned.
    #[default]
    Left,
    /// Centered.
    Center,
    /// Right-aligned.
    Right,
}

impl TextAlign {
    /// Fraction of the box width at which the text anchor sits.
    #[must_use]
    pub fn anchor_fraction(self) -> f32 {
        match self {
            Self::Left => 0.0,
            Self::Center => 0.5,
            Self::Right => 1.0,
        }
    }
}

/// Font style of a text layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    /// Regular.
    #[default]
    Normal,
    /// Bold.
    Bold,
    /// Italic.
    Italic,
}

/// Kind-specific layer content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LayerKind {
    /// A block of text.
    Text {
        /// Box width; text wraps inside it when set.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<f32>,
        /// Alignment within the box.
        #[serde(default)]
        align: TextAlign,
        /// Font size in pixels.
        font_size: f32,
        /// Font style.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        font_style: Option<FontStyle>,
        /// Text color (CSS color string).
        fill: String,
        /// Line height as a multiple of font size.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line_height: Option<f32>,
        /// Text content.
        text: String,
    },

    /// A decorative image.
    Sticker {
        /// Drawn width.
        width: f32,
        /// Drawn height.
        height: f32,
        /// Encoded image.
        data_url: ImageAsset,
    },

    /// A filled rectangle.
    Rect {
        /// Width.
        width: f32,
        /// Height.
        height: f32,
        /// Fill color (CSS color string).
        fill: String,
        /// Corner radius.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        corner_radius: Option<f32>,
    },
}

/// Axis-aligned bounds in frame coordinates (before rotation).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

/// A positioned layer on a slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Unique identifier within the slide.
    pub id: LayerId,
    /// X position (pixels from left).
    pub x: f32,
    /// Y position (pixels from top).
    pub y: f32,
    /// Rotation in degrees about the layer origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,
    /// Opacity (0.0 to 1.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    /// Whether the layer can be dragged on the canvas.
    #[serde(default = "default_draggable")]
    pub draggable: bool,
    /// Kind-specific content.
    #[serde(flatten)]
    pub kind: LayerKind,
}

fn default_draggable() -> bool {
    true
}

impl Layer {
    /// Create a draggable layer at the given position.
    #[must_use]
    pub fn new(id: LayerId, x: f32, y: f32, kind: LayerKind) -> Self {
        Self {
            id,
            x,
            y,
            rotation: None,
            opacity: None,
            draggable: true,
            kind,
        }
    }

    /// Create a text layer.
    #[must_use]
    pub fn text(id: LayerId, x: f32, y: f32, text: impl Into<String>, font_size: f32) -> Self {
        Self::new(
            id,
            x,
            y,
            LayerKind::Text {
                width: None,
                align: TextAlign::Left,
                font_size,
                font_style: None,
                fill: "#ffffff".to_string(),
                line_height: None,
                text: text.into(),
            },
        )
    }

    /// Create a sticker layer.
    #[must_use]
    pub fn sticker(id: LayerId, x: f32, y: f32, width: f32, height: f32, asset: ImageAsset) -> Self {
        Self::new(
            id,
            x,
            y,
            LayerKind::Sticker {
                width,
                height,
                data_url: asset,
            },
        )
    }

    /// Create a rectangle layer.
    #[must_use]
    pub fn rect(id: LayerId, x: f32, y: f32, width: f32, height: f32, fill: impl Into<String>) -> Self {
        Self::new(
            id,
            x,
            y,
            LayerKind::Rect {
                width,
                height,
                fill: fill.into(),
                corner_radius: None,
            },
        )
    }

    /// Whether this is a text layer.
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, LayerKind::Text { .. })
    }

    /// Short kind name for logs.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            LayerKind::Text { .. } => "text",
            LayerKind::Sticker { .. } => "sticker",
            LayerKind::Rect { .. } => "rect",
        }
    }

    /// Unrotated bounds, using width/height estimates for text.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        let (width, height) = match &self.kind {
            LayerKind::Text { .. } => (estimate_text_width(self), estimate_text_height(self)),
            LayerKind::Sticker { width, height, .. } | LayerKind::Rect { width, height, .. } => {
                (*width, *height)
            }
        };
        Bounds {
            x: self.x,
            y: self.y,
            width,
            height,
        }
    }

    /// Check whether a frame-space point hits this layer, honouring
    /// rotation about the layer origin.
    #[must_use]
    pub fn contains_point(&self, px: f32, py: f32) -> bool {
        let (mut lx, mut ly) = (px - self.x, py - self.y);
        if let Some(deg) = self.rotation.filter(|r| r.abs() > f32::EPSILON) {
            let (sin, cos) = (-deg.to_radians()).sin_cos();
            (lx, ly) = (lx * cos - ly * sin, lx * sin + ly * cos);
        }
        let b = self.bounds();
        lx >= 0.0 && lx <= b.width && ly >= 0.0 && ly <= b.height
    }

    /// Apply a patch, preserving id and kind. Fields that do not apply to
    /// this kind are ignored.
    pub fn apply(&mut self, patch: &LayerPatch) {
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(rotation) = patch.rotation {
            self.rotation = Some(rotation);
        }
        if let Some(opacity) = patch.opacity {
            self.opacity = Some(opacity.clamp(0.0, 1.0));
        }
        if let Some(draggable) = patch.draggable {
            self.draggable = draggable;
        }

        match &mut self.kind {
            LayerKind::Text {
                width,
                align,
                font_size,
                font_style,
                fill,
                line_height,
                text,
            } => {
                if let Some(w) = patch.width {
                    *width = Some(w);
                }
                if let Some(a) = patch.align {
                    *align = a;
                }
                if let Some(s) = patch.font_size {
                    *font_size = s;
                }
                if let Some(s) = patch.font_style {
                    *font_style = Some(s);
                }
                if let Some(f) = &patch.fill {
                    fill.clone_from(f);
                }
                if let Some(l) = patch.line_height {
                    *line_height = Some(l);
                }
                if let Some(t) = &patch.text {
                    text.clone_from(t);
                }
            }
            LayerKind::Sticker { width, height, .. } => {
                if let Some(w) = patch.width {
                    *width = w;
                }
                if let Some(h) = patch.height {
                    *height = h;
                }
            }
            LayerKind::Rect {
                width,
                height,
                fill,
                corner_radius,
            } => {
                if let Some(w) = patch.width {
                    *width = w;
                }
                if let Some(h) = patch.height {
                    *height = h;
                }
                if let Some(f) = &patch.fill {
                    fill.clone_from(f);
                }
                if let Some(r) = patch.corner_radius {
                    *corner_radius = Some(r);
                }
            }
        }
    }
}

/// Partial update for a layer. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerPatch {
    /// New X position.
    pub x: Option<f32>,
    /// New Y position.
    pub y: Option<f32>,
    /// New rotation in degrees.
    pub rotation: Option<f32>,
    /// New opacity.
    pub opacity: Option<f32>,
    /// New draggable flag.
    pub draggable: Option<bool>,
    /// New width (text box, sticker, rect).
    pub width: Option<f32>,
    /// New height (sticker, rect).
    pub height: Option<f32>,
    /// New text alignment.
    pub align: Option<TextAlign>,
    /// New font size.
    pub font_size: Option<f32>,
    /// New font style.
    pub font_style: Option<FontStyle>,
    /// New fill color.
    pub fill: Option<String>,
    /// New line height multiple.
    pub line_height: Option<f32>,
    /// New text content.
    pub text: Option<String>,
    /// New corner radius.
    pub corner_radius: Option<f32>,
}

impl LayerPatch {
    /// A patch that only moves the layer.
    #[must_use]
    pub fn position(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Font used to estimate a text layer's extent.
#[must_use]
pub fn layer_font(font_size: f32, font_style: Option<FontStyle>) -> FontSpec {
    match font_style {
        Some(FontStyle::Bold) => FontSpec::bold(font_size),
        _ => FontSpec::normal(font_size),
    }
}

/// Estimated rendered width of a text layer.
///
/// Uses the explicit box width when set; otherwise approximates from the
/// longest line, clamped between [`MIN_TEXT_WIDTH`] and the frame width
/// inside the safe margins. Non-text layers report their own width.
#[must_use]
pub fn estimate_text_width(layer: &Layer) -> f32 {
    match &layer.kind {
        LayerKind::Text {
            width: Some(w), ..
        } => *w,
        LayerKind::Text {
            width: None,
            font_size,
            font_style,
            text,
            ..
        } => {
            let font = layer_font(*font_size, *font_style);
            let widest = text
                .lines()
                .map(|line| ApproxMeasure.measure(line, &font))
                .fold(0.0_f32, f32::max);
            widest.clamp(MIN_TEXT_WIDTH, FRAME_WIDTH - 2.0 * SAFE_MARGIN_X)
        }
        LayerKind::Sticker { width, .. } | LayerKind::Rect { width, .. } => *width,
    }
}

/// Estimated rendered height of a text layer (line count × line height).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn estimate_text_height(layer: &Layer) -> f32 {
    match &layer.kind {
        LayerKind::Text {
            font_size,
            line_height,
            text,
            ..
        } => {
            let lines = text.lines().count().max(1) as f32;
            lines * font_size * line_height.unwrap_or(DEFAULT_LINE_HEIGHT)
        }
        LayerKind::Sticker { height, .. } | LayerKind::Rect { height, .. } => *height,
    }
}
