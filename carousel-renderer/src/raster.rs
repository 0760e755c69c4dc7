//! SVG rasterization through usvg/resvg into tiny-skia pixmaps.
//!
//! All rendering in this crate goes through an SVG intermediate. The
//! [`Rasterizer`] owns the font database so that text measured for layout
//! and text drawn into pixels resolve to the same faces.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use carousel_core::layout::DEFAULT_FONT_FAMILY;
use carousel_core::ImageAsset;
use usvg::fontdb::{Database, Family, Query, Stretch, Style, Weight};

use crate::error::{RenderError, RenderResult};

/// System font database, loaded once per process.
#[must_use]
pub fn system_fonts() -> Arc<Database> {
    static FONTS: OnceLock<Arc<Database>> = OnceLock::new();
    Arc::clone(FONTS.get_or_init(|| {
        let mut db = Database::new();
        db.load_system_fonts();
        bind_generic_families(&mut db);
        tracing::debug!(faces = db.len(), "system fonts loaded");
        Arc::new(db)
    }))
}

/// Point every generic family that resolves to nothing at an installed face.
///
/// fontdb maps `sans-serif` to Arial, `serif` to Times New Roman and
/// `monospace` to Courier New. Without those faces usvg drops text nodes.
pub fn bind_generic_families(db: &mut Database) {
    let Some(fallback) = fallback_family(db) else {
        tracing::warn!("font database is empty, text will not render");
        return;
    };

    let resolves = |db: &Database, family: Family<'_>| {
        db.query(&Query {
            families: &[family],
            ..Query::default()
        })
        .is_some()
    };

    if !resolves(db, Family::SansSerif) {
        tracing::debug!(family = %fallback, "binding sans-serif");
        db.set_sans_serif_family(fallback.clone());
    }
    if !resolves(db, Family::Serif) {
        db.set_serif_family(fallback.clone());
    }
    if !resolves(db, Family::Monospace) {
        db.set_monospace_family(fallback);
    }
}

/// An installed sans family if there is one, else any installed family.
fn fallback_family(db: &Database) -> Option<String> {
    let families = || {
        db.faces()
            .filter_map(|face| face.families.first().map(|(name, _)| name.clone()))
    };
    families()
        .find(|name| name.contains("Sans") && !name.contains("Mono"))
        .or_else(|| families().next())
}

/// Font selection that never gives up while the database has a face.
///
/// Requested families are tried first, then the generic families, then
/// whatever face comes first.
fn font_resolver() -> usvg::FontResolver<'static> {
    usvg::FontResolver {
        select_font: Box::new(|font, fontdb| {
            let mut families: Vec<Family<'_>> = font
                .families()
                .iter()
                .map(|family| match family {
                    usvg::FontFamily::Serif => Family::Serif,
                    usvg::FontFamily::SansSerif => Family::SansSerif,
                    usvg::FontFamily::Cursive => Family::Cursive,
                    usvg::FontFamily::Fantasy => Family::Fantasy,
                    usvg::FontFamily::Monospace => Family::Monospace,
                    usvg::FontFamily::Named(name) => Family::Name(name),
                })
                .collect();
            families.extend([Family::SansSerif, Family::Serif, Family::Monospace]);

            let stretch = match font.stretch() {
                usvg::FontStretch::UltraCondensed => Stretch::UltraCondensed,
                usvg::FontStretch::ExtraCondensed => Stretch::ExtraCondensed,
                usvg::FontStretch::Condensed => Stretch::Condensed,
                usvg::FontStretch::SemiCondensed => Stretch::SemiCondensed,
                usvg::FontStretch::Normal => Stretch::Normal,
                usvg::FontStretch::SemiExpanded => Stretch::SemiExpanded,
                usvg::FontStretch::Expanded => Stretch::Expanded,
                usvg::FontStretch::ExtraExpanded => Stretch::ExtraExpanded,
                usvg::FontStretch::UltraExpanded => Stretch::UltraExpanded,
            };
            let style = match font.style() {
                usvg::FontStyle::Normal => Style::Normal,
                usvg::FontStyle::Italic => Style::Italic,
                usvg::FontStyle::Oblique => Style::Oblique,
            };

            let query = Query {
                families: &families,
                weight: Weight(font.weight()),
                stretch,
                style,
            };
            fontdb
                .query(&query)
                .or_else(|| fontdb.faces().next().map(|face| face.id))
        }),
        select_fallback: usvg::FontResolver::default_fallback_selector(),
    }
}

/// Parse options sharing `fontdb`, with the fallback font resolver.
pub(crate) fn svg_options(fontdb: &Arc<Database>, font_family: &str) -> usvg::Options<'static> {
    usvg::Options {
        font_family: font_family.to_string(),
        fontdb: Arc::clone(fontdb),
        font_resolver: font_resolver(),
        ..usvg::Options::default()
    }
}

/// Turns SVG documents into pixels.
#[derive(Clone)]
pub struct Rasterizer {
    fontdb: Arc<Database>,
    font_family: String,
}

impl std::fmt::Debug for Rasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rasterizer")
            .field("faces", &self.fontdb.len())
            .field("font_family", &self.font_family)
            .finish()
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer {
    /// A rasterizer using the system fonts.
    #[must_use]
    pub fn new() -> Self {
        Self::with_fontdb(system_fonts())
    }

    /// A rasterizer using a specific font database.
    #[must_use]
    pub fn with_fontdb(fontdb: Arc<Database>) -> Self {
        Self {
            fontdb,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
        }
    }

    /// System fonts plus every font file found in `dirs`.
    #[must_use]
    pub fn with_font_dirs<P: AsRef<Path>>(dirs: &[P]) -> Self {
        let mut db = (*system_fonts()).clone();
        for dir in dirs {
            let before = db.len();
            db.load_fonts_dir(dir.as_ref());
            tracing::debug!(dir = %dir.as_ref().display(), added = db.len() - before, "font directory loaded");
        }
        bind_generic_families(&mut db);
        Self::with_fontdb(Arc::new(db))
    }

    /// Family used when a document names none.
    #[must_use]
    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    /// Shared font database.
    #[must_use]
    pub fn fontdb(&self) -> &Arc<Database> {
        &self.fontdb
    }

    /// Default font family.
    #[must_use]
    pub fn font_family(&self) -> &str {
        &self.font_family
    }

    /// Parse an SVG document.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Scene`] if the document is malformed.
    pub fn parse(&self, svg: &str) -> RenderResult<usvg::Tree> {
        let opt = svg_options(&self.fontdb, &self.font_family);
        usvg::Tree::from_str(svg, &opt).map_err(|e| RenderError::Scene(format!("SVG parsing failed: {e}")))
    }

    /// Rasterize an SVG document at its declared pixel size.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be parsed or no pixmap of
    /// that size can be allocated.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn rasterize(&self, svg: &str) -> RenderResult<tiny_skia::Pixmap> {
        let tree = self.parse(svg)?;

        let px_w = tree.size().width().ceil() as u32;
        let px_h = tree.size().height().ceil() as u32;

        let mut pixmap = tiny_skia::Pixmap::new(px_w.max(1), px_h.max(1))
            .ok_or_else(|| RenderError::Raster(format!("Failed to create {px_w}x{px_h} pixmap")))?;

        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        Ok(pixmap)
    }

    /// Rasterize to PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if rasterization or encoding fails.
    pub fn render_png(&self, svg: &str) -> RenderResult<Vec<u8>> {
        self.rasterize(svg)?
            .encode_png()
            .map_err(|e| RenderError::Export(format!("PNG encoding failed: {e}")))
    }

    /// Rasterize to a PNG data URL.
    ///
    /// # Errors
    ///
    /// Returns an error if rasterization or encoding fails.
    pub fn render_asset(&self, svg: &str) -> RenderResult<ImageAsset> {
        self.render_png(svg).map(|png| ImageAsset::png(&png))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10" viewBox="0 0 10 5"><rect width="10" height="5" fill="#ff0000"/></svg>"##;

    #[test]
    fn test_rasterize_uses_declared_size() {
        let pixmap = Rasterizer::new().rasterize(SQUARE).expect("rasterize");
        assert_eq!((pixmap.width(), pixmap.height()), (20, 10));
        let first = &pixmap.data()[0..4];
        assert_eq!(first, &[255, 0, 0, 255]);
    }

    #[test]
    fn test_render_asset_is_png() {
        let asset = Rasterizer::new().render_asset(SQUARE).expect("asset");
        assert_eq!(asset.mime_type(), "image/png");
        let bytes = asset.decode_bytes().expect("decode");
        assert_eq!(&bytes[0..4], &[137, 80, 78, 71]);
    }

    #[test]
    fn test_generic_families_bound_to_installed_face() {
        let db = system_fonts();
        if db.is_empty() {
            return;
        }
        let query = Query {
            families: &[Family::SansSerif],
            ..Query::default()
        };
        assert!(db.query(&query).is_some());
    }

    #[test]
    fn test_text_renders_with_generic_family() {
        let rasterizer = Rasterizer::new();
        if rasterizer.fontdb().is_empty() {
            return;
        }
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="60"><rect width="200" height="60" fill="#000000"/><text x="10" y="45" font-family="sans-serif" font-size="40" fill="#ffffff">Ice</text></svg>"##;
        let pixmap = rasterizer.rasterize(svg).expect("rasterize");
        let bright = pixmap.pixels().iter().filter(|p| p.red() > 200).count();
        assert!(bright > 0);
    }

    #[test]
    fn test_unknown_family_falls_back() {
        let rasterizer = Rasterizer::new();
        if rasterizer.fontdb().is_empty() {
            return;
        }
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="60"><text x="10" y="45" font-family="No Such Face" font-size="40">Ice</text></svg>"##;
        let tree = rasterizer.parse(svg).expect("parse");
        assert!(tree.root().abs_bounding_box().width() > 0.0);
    }

    #[test]
    fn test_malformed_svg_is_scene_error() {
        let err = Rasterizer::new().rasterize("<svg").expect_err("must fail");
        assert!(matches!(err, RenderError::Scene(_)));
    }
}
