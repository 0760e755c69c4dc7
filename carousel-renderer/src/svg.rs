//! SVG scene building blocks.
//!
//! Every writer appends to a `String` with `write!`. Writes to a `String`
//! cannot fail, so their results are discarded.

use std::fmt::Write;

use carousel_core::layout::{svg_path_data, PathCommand, Placement};
use carousel_core::{FontSpec, ImageAsset};

/// Id of the drop-shadow filter declared by [`write_shadow_filter`].
pub const SHADOW_FILTER_ID: &str = "text-shadow";

/// Horizontal anchor of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    /// `x` is the left edge.
    Start,
    /// `x` is the center.
    Middle,
    /// `x` is the right edge.
    End,
}

impl TextAnchor {
    fn as_svg(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Middle => "middle",
            Self::End => "end",
        }
    }
}

/// How a text run is drawn.
#[derive(Debug, Clone)]
pub struct TextStyle<'a> {
    /// Font.
    pub font: &'a FontSpec,
    /// Fill color (any CSS color).
    pub fill: &'a str,
    /// Horizontal anchor.
    pub anchor: TextAnchor,
    /// Italic face.
    pub italic: bool,
    /// Apply the shared drop shadow.
    pub shadow: bool,
}

impl<'a> TextStyle<'a> {
    /// Centered, unshadowed text.
    #[must_use]
    pub fn centered(font: &'a FontSpec, fill: &'a str) -> Self {
        Self {
            font,
            fill,
            anchor: TextAnchor::Middle,
            italic: false,
            shadow: false,
        }
    }

    /// Use a different anchor.
    #[must_use]
    pub fn anchored(mut self, anchor: TextAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Draw with the drop shadow.
    #[must_use]
    pub fn shadowed(mut self) -> Self {
        self.shadow = true;
        self
    }
}

/// Escape special XML characters.
#[must_use]
pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Open an SVG document whose user space is `width` x `height` and whose
/// pixel size is that times `scale`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn open_document(svg: &mut String, width: f32, height: f32, scale: f32) {
    let out_w = (width * scale).round().max(1.0) as u32;
    let out_h = (height * scale).round().max(1.0) as u32;
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{out_w}\" height=\"{out_h}\" viewBox=\"0 0 {width} {height}\">",
    );
}

/// Close the document opened by [`open_document`].
pub fn close_document(svg: &mut String) {
    svg.push_str("</svg>");
}

/// Declare the text drop shadow: blur 10, offset (2, 2), black at 80%.
pub fn write_shadow_filter(svg: &mut String) {
    let _ = write!(
        svg,
        "<defs><filter id=\"{SHADOW_FILTER_ID}\" x=\"-20%\" y=\"-20%\" width=\"140%\" height=\"140%\"><feDropShadow dx=\"2\" dy=\"2\" stdDeviation=\"5\" flood-color=\"#000000\" flood-opacity=\"0.8\"/></filter></defs>",
    );
}

/// Fill a rectangle.
pub fn write_rect(svg: &mut String, x: f32, y: f32, width: f32, height: f32, fill: &str) {
    let fill = escape_xml(fill);
    let _ = write!(
        svg,
        "<rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" fill=\"{fill}\"/>",
    );
}

/// Fill a path.
pub fn write_path(svg: &mut String, commands: &[PathCommand], fill: &str) {
    let d = svg_path_data(commands);
    let fill = escape_xml(fill);
    let _ = write!(svg, "<path d=\"{d}\" fill=\"{fill}\"/>");
}

/// Draw an image stretched over a placement rectangle.
pub fn write_image(svg: &mut String, placement: &Placement, asset: &ImageAsset) {
    let href = escape_xml(asset.as_str());
    let _ = write!(
        svg,
        "<image x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" preserveAspectRatio=\"none\" href=\"{href}\"/>",
        placement.x, placement.y, placement.width, placement.height,
    );
}

/// Draw a single line of text vertically centered on `y`.
pub fn write_text(svg: &mut String, x: f32, y: f32, text: &str, style: &TextStyle<'_>) {
    let family = escape_xml(&style.font.family);
    let fill = escape_xml(style.fill);
    let _ = write!(
        svg,
        "<text x=\"{x}\" y=\"{y}\" font-family=\"{family}\" font-size=\"{}\" font-weight=\"{}\" fill=\"{fill}\" text-anchor=\"{}\" dominant-baseline=\"central\"",
        style.font.size,
        style.font.weight.as_css(),
        style.anchor.as_svg(),
    );
    if style.italic {
        svg.push_str(" font-style=\"italic\"");
    }
    if style.shadow {
        let _ = write!(svg, " filter=\"url(#{SHADOW_FILTER_ID})\"");
    }
    let _ = write!(svg, ">{}</text>", escape_xml(text));
}
