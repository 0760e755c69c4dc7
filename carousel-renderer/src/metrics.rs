//! Font-backed text measurement.

use std::sync::Arc;

use carousel_core::{ApproxMeasure, FontSpec, TextMeasure};
use usvg::fontdb::Database;

use crate::raster::{svg_options, Rasterizer};
use crate::svg::escape_xml;

/// Measures text by laying it out with the same font database the
/// rasterizer draws with.
///
/// Falls back to [`ApproxMeasure`] when the text produces no outline, which
/// happens when no installed face covers it.
#[derive(Clone)]
pub struct FontMeasure {
    fontdb: Arc<Database>,
}

impl std::fmt::Debug for FontMeasure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontMeasure")
            .field("faces", &self.fontdb.len())
            .finish()
    }
}

impl FontMeasure {
    /// Measure against a font database.
    #[must_use]
    pub fn new(fontdb: Arc<Database>) -> Self {
        Self { fontdb }
    }

    /// Share the rasterizer's fonts.
    #[must_use]
    pub fn for_rasterizer(rasterizer: &Rasterizer) -> Self {
        Self::new(Arc::clone(rasterizer.fontdb()))
    }

    fn outline_width(&self, text: &str, font: &FontSpec) -> Option<f32> {
        let svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"1\" height=\"1\"><text x=\"0\" y=\"0\" font-family=\"{}\" font-size=\"{}\" font-weight=\"{}\">{}</text></svg>",
            escape_xml(&font.family),
            font.size,
            font.weight.as_css(),
            escape_xml(text),
        );
        let opt = svg_options(&self.fontdb, &font.family);
        let tree = usvg::Tree::from_str(&svg, &opt).ok()?;
        let width = tree.root().abs_bounding_box().width();
        (width > 0.0).then_some(width)
    }
}

impl TextMeasure for FontMeasure {
    fn measure(&self, text: &str, font: &FontSpec) -> f32 {
        if text.trim().is_empty() {
            return ApproxMeasure.measure(text, font);
        }
        self.outline_width(text, font)
            .unwrap_or_else(|| ApproxMeasure.measure(text, font))
    }
}
