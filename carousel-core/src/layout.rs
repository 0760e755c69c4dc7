//! Layout primitives - text wrapping, block centering, rounded rectangles and
//! cover fitting.
//!
//! Everything here is a pure function of its inputs plus the active
//! [`TextMeasure`] implementation. Rendering backends supply a font-backed
//! measurer; [`ApproxMeasure`] gives deterministic estimates for hit testing,
//! alignment and tests.

use serde::{Deserialize, Serialize};

/// Width of the output frame in pixels.
pub const FRAME_WIDTH: f32 = 1080.0;

/// Height of the output frame in pixels (4:5 portrait).
pub const FRAME_HEIGHT: f32 = 1350.0;

/// Default font family for all carousel text.
pub const DEFAULT_FONT_FAMILY: &str = "sans-serif";

/// Font weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    /// Regular weight.
    #[default]
    Normal,
    /// Bold weight.
    Bold,
}

impl FontWeight {
    /// CSS/SVG keyword for this weight.
    #[must_use]
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Bold => "bold",
        }
    }
}

/// The font a piece of text is measured and drawn with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    /// Font family name (CSS generic families allowed).
    pub family: String,
    /// Font size in pixels.
    pub size: f32,
    /// Font weight.
    pub weight: FontWeight,
}

impl FontSpec {
    /// A bold font of the given size in the default family.
    #[must_use]
    pub fn bold(size: f32) -> Self {
        Self {
            family: DEFAULT_FONT_FAMILY.to_string(),
            size,
            weight: FontWeight::Bold,
        }
    }

    /// A regular font of the given size in the default family.
    #[must_use]
    pub fn normal(size: f32) -> Self {
        Self {
            family: DEFAULT_FONT_FAMILY.to_string(),
            size,
            weight: FontWeight::Normal,
        }
    }

    /// Replace the font family.
    #[must_use]
    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = family.into();
        self
    }
}

/// A font-metrics context that reports rendered text width.
pub trait TextMeasure {
    /// Rendered width of `text` in pixels when drawn with `font`.
    fn measure(&self, text: &str, font: &FontSpec) -> f32;
}

/// Per-character width estimate.
///
/// Advances are fractions of the font size: narrow punctuation, regular
/// Latin, wide Latin capitals/digits, and full-width CJK/Hangul. The estimate
/// is additive, so the width of a prefix never exceeds the width of the whole.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxMeasure;

impl ApproxMeasure {
    /// Advance of a single character as a fraction of the font size.
    #[must_use]
    pub fn advance_factor(c: char) -> f32 {
        if is_wide(c) {
            1.0
        } else if c.is_whitespace() || matches!(c, 'i' | 'l' | 'j' | '.' | ',' | '\'' | '!' | '|' | ':' | ';') {
            0.28
        } else if c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, 'm' | 'w' | '@') {
            0.62
        } else {
            0.52
        }
    }
}

impl TextMeasure for ApproxMeasure {
    fn measure(&self, text: &str, font: &FontSpec) -> f32 {
        let weight = match font.weight {
            FontWeight::Normal => 1.0,
            FontWeight::Bold => 1.06,
        };
        text.chars().map(Self::advance_factor).sum::<f32>() * font.size * weight
    }
}

fn is_wide(c: char) -> bool {
    matches!(
        u32::from(c),
        0x1100..=0x115F
            | 0x2E80..=0xA4CF
            | 0xAC00..=0xD7A3
            | 0xF900..=0xFAFF
            | 0xFE30..=0xFE4F
            | 0xFF00..=0xFF60
            | 0xFFE0..=0xFFE6
            | 0x1F300..=0x1FAFF
            | 0x20000..=0x3FFFD
    )
}

/// Wrap `text` into lines no wider than `max_width`.
///
/// Explicit line breaks start a new line group. Within a paragraph words are
/// packed greedily; a line is flushed as soon as the next word would push it
/// past `max_width`. The first word of a line is always placed, so a single
/// word wider than `max_width` occupies its own line instead of looping.
pub fn wrap_text<M>(measure: &M, font: &FontSpec, text: &str, max_width: f32) -> Vec<String>
where
    M: TextMeasure + ?Sized,
{
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if line.is_empty() {
                line.push_str(word);
                continue;
            }
            let candidate = format!("{line} {word}");
            if measure.measure(&candidate, font) > max_width {
                lines.push(std::mem::replace(&mut line, word.to_string()));
            } else {
                line = candidate;
            }
        }
        lines.push(line);
    }

    lines
}

/// Baseline of the first line of a block centered on `anchor_y`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn first_baseline(line_count: usize, anchor_y: f32, line_height: f32) -> f32 {
    let total_height = line_count as f32 * line_height;
    anchor_y - total_height / 2.0 + line_height / 2.0
}

/// A block of lines laid out vertically around an anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    /// Lines in reading order.
    pub lines: Vec<String>,
    /// Distance between consecutive baselines.
    pub line_height: f32,
    /// Baseline of the first line.
    pub first_baseline: f32,
}

impl TextBlock {
    /// Center `lines` vertically around `anchor_y`.
    #[must_use]
    pub fn centered(lines: Vec<String>, anchor_y: f32, line_height: f32) -> Self {
        let first_baseline = first_baseline(lines.len(), anchor_y, line_height);
        Self {
            lines,
            line_height,
            first_baseline,
        }
    }

    /// Total block height.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height
    }

    /// Baseline of the last line, if any.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn last_baseline(&self) -> Option<f32> {
        let count = self.lines.len();
        (count > 0).then(|| self.first_baseline + (count - 1) as f32 * self.line_height)
    }

    /// Lines paired with their baselines.
    #[allow(clippy::cast_precision_loss)]
    pub fn positioned(&self) -> impl Iterator<Item = (&str, f32)> {
        self.lines
            .iter()
            .enumerate()
            .map(|(i, line)| (line.as_str(), self.first_baseline + i as f32 * self.line_height))
    }
}

/// A single path segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    /// Start a new subpath.
    MoveTo(f32, f32),
    /// Straight line to a point.
    LineTo(f32, f32),
    /// Quadratic curve through a control point.
    QuadTo {
        /// Control point X.
        cx: f32,
        /// Control point Y.
        cy: f32,
        /// End point X.
        x: f32,
        /// End point Y.
        y: f32,
    },
    /// Close the subpath.
    Close,
}

/// Closed rounded-rectangle path with quadratic corners.
///
/// The radius is clamped to half the shorter side so a pill never
/// self-intersects.
#[must_use]
pub fn round_rect(x: f32, y: f32, width: f32, height: f32, radius: f32) -> Vec<PathCommand> {
    let r = radius.max(0.0).min(width / 2.0).min(height / 2.0);
    let right = x + width;
    let bottom = y + height;

    vec![
        PathCommand::MoveTo(x + r, y),
        PathCommand::LineTo(right - r, y),
        PathCommand::QuadTo { cx: right, cy: y, x: right, y: y + r },
        PathCommand::LineTo(right, bottom - r),
        PathCommand::QuadTo { cx: right, cy: bottom, x: right - r, y: bottom },
        PathCommand::LineTo(x + r, bottom),
        PathCommand::QuadTo { cx: x, cy: bottom, x, y: bottom - r },
        PathCommand::LineTo(x, y + r),
        PathCommand::QuadTo { cx: x, cy: y, x: x + r, y },
        PathCommand::Close,
    ]
}

/// Serialize path commands as SVG path data.
#[must_use]
pub fn svg_path_data(commands: &[PathCommand]) -> String {
    let parts: Vec<String> = commands
        .iter()
        .map(|command| match *command {
            PathCommand::MoveTo(x, y) => format!("M{x} {y}"),
            PathCommand::LineTo(x, y) => format!("L{x} {y}"),
            PathCommand::QuadTo { cx, cy, x, y } => format!("Q{cx} {cy} {x} {y}"),
            PathCommand::Close => "Z".to_string(),
        })
        .collect();
    parts.join(" ")
}

/// Where an image is drawn inside the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Left edge (may be negative when cropped).
    pub x: f32,
    /// Top edge (may be negative when cropped).
    pub y: f32,
    /// Drawn width.
    pub width: f32,
    /// Drawn height.
    pub height: f32,
}

/// Scale an image to cover the frame, preserving aspect ratio and centering
/// the overflow.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn cover_fit(image_width: u32, image_height: u32, frame_width: f32, frame_height: f32) -> Placement {
    if image_width == 0 || image_height == 0 {
        return Placement {
            x: 0.0,
            y: 0.0,
            width: frame_width,
            height: frame_height,
        };
    }

    let image_ratio = image_width as f32 / image_height as f32;
    let frame_ratio = frame_width / frame_height;

    if image_ratio > frame_ratio {
        let width = frame_height * image_ratio;
        Placement {
            x: (frame_width - width) / 2.0,
            y: 0.0,
            width,
            height: frame_height,
        }
    } else {
        let height = frame_width / image_ratio;
        Placement {
            x: 0.0,
            y: (frame_height - height) / 2.0,
            width: frame_width,
            height,
        }
    }
}
