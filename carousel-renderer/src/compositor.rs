//! Static slide compositor.
//!
//! Turns one [`Page`] plus an optional background into a flat 1080×1350
//! PNG. The layout is fixed per page position:
//!
//! ```text
//! page 1    quoted content (110px, wrapped) + indigo label pill below
//! page 2    label pill, primary line (75px), secondary block (37px)
//! page 3-4  label pill, content wrapped at 850px (75px)
//! page 5    label pill, content without its summary marker (60px)
//! all       watermark top right, page number bottom left
//! ```
//!
//! Compositing never fails outright: if the scene cannot be rasterized the
//! caller gets the source image back untouched.

use std::sync::Arc;

use carousel_core::layout::{cover_fit, round_rect, wrap_text, TextBlock, DEFAULT_FONT_FAMILY};
use carousel_core::{FontSpec, ImageAsset, Page, PageRole, TextMeasure, FRAME_HEIGHT, FRAME_WIDTH};
use serde::{Deserialize, Serialize};

use crate::error::RenderResult;
use crate::image::asset_dimensions;
use crate::metrics::FontMeasure;
use crate::raster::Rasterizer;
use crate::svg::{self, TextAnchor, TextStyle};

/// Watermark handle used when a page does not carry its own.
pub const DEFAULT_WATERMARK: &str = "@samcho0127";

/// Size every page position derives its body text from.
const STANDARD_FONT_SIZE: f32 = 75.0;

/// Configuration for the static compositor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// Watermark handle drawn top right.
    pub watermark: String,
    /// Font family for every text run.
    pub font_family: String,
    /// Fill shown where no background image covers the frame.
    pub fallback_color: String,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            watermark: DEFAULT_WATERMARK.to_string(),
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            fallback_color: carousel_core::slide::DEFAULT_BG_COLOR.to_string(),
        }
    }
}

/// Renders pages onto backgrounds.
pub struct Compositor {
    config: CompositorConfig,
    rasterizer: Rasterizer,
    measure: Arc<dyn TextMeasure + Send + Sync>,
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("config", &self.config)
            .field("rasterizer", &self.rasterizer)
            .finish_non_exhaustive()
    }
}

impl Compositor {
    /// A compositor measuring text with the rasterizer's fonts.
    #[must_use]
    pub fn new(config: CompositorConfig, rasterizer: Rasterizer) -> Self {
        let measure = Arc::new(FontMeasure::for_rasterizer(&rasterizer));
        Self {
            config,
            rasterizer,
            measure,
        }
    }

    /// Default configuration and system fonts.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(CompositorConfig::default(), Rasterizer::new())
    }

    /// Replace the text measurer.
    #[must_use]
    pub fn with_measure(mut self, measure: Arc<dyn TextMeasure + Send + Sync>) -> Self {
        self.measure = measure;
        self
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Composite a page. On any rendering failure the background is
    /// returned unchanged; `None` only when there was no background and
    /// nothing could be rendered.
    #[must_use]
    pub fn composite(&self, page: &Page, background: Option<&ImageAsset>) -> Option<ImageAsset> {
        match self.try_composite(page, background) {
            Ok(asset) => Some(asset),
            Err(e) => {
                tracing::warn!(page = page.page_number, error = %e, "compositing failed, returning source");
                background.cloned()
            }
        }
    }

    /// Composite a page, surfacing rendering errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the scene cannot be rasterized or encoded.
    pub fn try_composite(&self, page: &Page, background: Option<&ImageAsset>) -> RenderResult<ImageAsset> {
        let scene = self.scene_svg(page, background);
        let asset = self.rasterizer.render_asset(&scene)?;
        tracing::debug!(page = page.page_number, "page composited");
        Ok(asset)
    }

    /// The SVG scene for a page.
    #[must_use]
    pub fn scene_svg(&self, page: &Page, background: Option<&ImageAsset>) -> String {
        let mut out = String::with_capacity(8192);
        svg::open_document(&mut out, FRAME_WIDTH, FRAME_HEIGHT, 1.0);
        svg::write_shadow_filter(&mut out);
        out.push_str(
            "<defs><linearGradient id=\"shade\" x1=\"0\" y1=\"0\" x2=\"0\" y2=\"1\">\
             <stop offset=\"0\" stop-color=\"#000000\" stop-opacity=\"0.6\"/>\
             <stop offset=\"0.5\" stop-color=\"#000000\" stop-opacity=\"0.3\"/>\
             <stop offset=\"1\" stop-color=\"#000000\" stop-opacity=\"0.8\"/>\
             </linearGradient></defs>",
        );

        svg::write_rect(&mut out, 0.0, 0.0, FRAME_WIDTH, FRAME_HEIGHT, &self.config.fallback_color);
        if let Some(asset) = background {
            match asset_dimensions(asset, &self.rasterizer) {
                Ok((w, h)) => {
                    svg::write_image(&mut out, &cover_fit(w, h, FRAME_WIDTH, FRAME_HEIGHT), asset);
                }
                Err(e) => {
                    tracing::warn!(page = page.page_number, error = %e, "background unreadable, using fallback fill");
                }
            }
        }
        svg::write_rect(&mut out, 0.0, 0.0, FRAME_WIDTH, FRAME_HEIGHT, "url(#shade)");

        match page.role() {
            PageRole::Intro => self.write_intro(&mut out, page),
            role => {
                self.write_label_pill(&mut out, page);
                match role {
                    PageRole::Expression => self.write_expression(&mut out, page),
                    PageRole::Summary => {
                        let size = (STANDARD_FONT_SIZE * 0.8).floor();
                        self.write_wrapped_body(&mut out, page.summary_text(), size);
                    }
                    _ => self.write_wrapped_body(&mut out, &page.content, STANDARD_FONT_SIZE),
                }
            }
        }

        self.write_footer(&mut out, page);
        svg::close_document(&mut out);
        out
    }

    fn font(&self, size: f32) -> FontSpec {
        FontSpec::bold(size).with_family(self.config.font_family.clone())
    }

    fn write_block(out: &mut String, block: &TextBlock, font: &FontSpec) {
        let style = TextStyle::centered(font, "#ffffff").shadowed();
        for (line, y) in block.positioned() {
            svg::write_text(out, FRAME_WIDTH / 2.0, y, line, &style);
        }
    }

    fn write_intro(&self, out: &mut String, page: &Page) {
        let cx = FRAME_WIDTH / 2.0;
        let cy = FRAME_HEIGHT / 2.0;

        let font = self.font(110.0);
        let quoted = format!("\"{}\"", page.content);
        let lines = wrap_text(self.measure.as_ref(), &font, &quoted, 900.0);
        Self::write_block(out, &TextBlock::centered(lines, cy - 40.0, 130.0), &font);

        let label = page.label.to_uppercase();
        let label_font = self.font(36.0);
        let width = self.measure.measure(&label, &label_font) + 60.0;
        svg::write_path(
            out,
            &round_rect(cx - width / 2.0, cy + 100.0, width, 60.0, 30.0),
            "rgba(79,70,229,0.9)",
        );
        svg::write_text(out, cx, cy + 130.0, &label, &TextStyle::centered(&label_font, "#ffffff"));
    }

    fn write_label_pill(&self, out: &mut String, page: &Page) {
        let cx = FRAME_WIDTH / 2.0;
        let cy = FRAME_HEIGHT / 2.0;

        let label = page.label.to_uppercase();
        let font = self.font(28.0);
        let width = self.measure.measure(&label, &font) + 30.0;
        svg::write_path(
            out,
            &round_rect(cx - width / 2.0, cy - 250.0, width, 45.0, 10.0),
            "rgba(0,0,0,0.4)",
        );
        svg::write_text(out, cx, cy - 227.0, &label, &TextStyle::centered(&font, "#818cf8"));
    }

    fn write_expression(&self, out: &mut String, page: &Page) {
        let cy = FRAME_HEIGHT / 2.0;
        let (primary, secondary) = page.split_content();

        let font = self.font(STANDARD_FONT_SIZE);
        Self::write_block(out, &TextBlock::centered(vec![primary.to_string()], cy - 40.0, STANDARD_FONT_SIZE), &font);

        if let Some(secondary) = secondary {
            let size = (STANDARD_FONT_SIZE * 0.5).floor();
            let font = self.font(size);
            let lines = secondary.lines().map(str::to_string).collect();
            Self::write_block(out, &TextBlock::centered(lines, cy + 60.0, size * 1.4), &font);
        }
    }

    fn write_wrapped_body(&self, out: &mut String, text: &str, size: f32) {
        let font = self.font(size);
        let lines = wrap_text(self.measure.as_ref(), &font, text, 850.0);
        Self::write_block(out, &TextBlock::centered(lines, FRAME_HEIGHT / 2.0, size * 1.4), &font);
    }

    fn write_footer(&self, out: &mut String, page: &Page) {
        let handle = page.watermark.as_deref().unwrap_or(&self.config.watermark);
        let font = self.font(24.0);
        svg::write_text(
            out,
            FRAME_WIDTH - 50.0,
            60.0,
            handle,
            &TextStyle::centered(&font, "rgba(255,255,255,0.5)").anchored(TextAnchor::End),
        );

        let font = self.font(28.0);
        svg::write_text(
            out,
            50.0,
            FRAME_HEIGHT - 60.0,
            &format!("{:02}", page.page_number),
            &TextStyle::centered(&font, "rgba(255,255,255,0.3)").anchored(TextAnchor::Start),
        );
    }
}

#[cfg(test)]
mod tests {
    use carousel_core::ApproxMeasure;

    use super::*;
    use crate::image::{load_asset, solid_color_asset};

    fn compositor() -> Compositor {
        Compositor::with_defaults().with_measure(Arc::new(ApproxMeasure))
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    /// Near-white pixels in rows `top..bottom`.
    fn bright_pixels(asset: &ImageAsset, top: u32, bottom: u32) -> usize {
        let texture = load_asset(asset).expect("decode");
        (top..bottom.min(texture.height))
            .flat_map(|y| (0..texture.width).map(move |x| (x, y)))
            .filter_map(|(x, y)| texture.pixel(x, y))
            .filter(|[r, g, b, _]| *r > 200 && *g > 200 && *b > 200)
            .count()
    }

    #[test]
    fn test_intro_layout() {
        let page = Page::new(1, "Today's Expression", "Break the ice");
        let svg = compositor().scene_svg(&page, None);
        assert!(svg.contains("&quot;Break the ice&quot;"));
        assert!(svg.contains("font-size=\"110\""));
        assert!(svg.contains("TODAY&apos;S EXPRESSION"));
        assert!(svg.contains("rgba(79,70,229,0.9)"));
        assert!(!svg.contains("#818cf8"));
        assert!(svg.contains(">@samcho0127</text>"));
        assert!(svg.contains(">01</text>"));
    }

    #[test]
    fn test_expression_splits_content() {
        let page = Page::new(2, "Expression", "Break the ice\n어색함을 깨다");
        let svg = compositor().scene_svg(&page, None);
        assert!(svg.contains("font-size=\"75\""));
        assert!(svg.contains("font-size=\"37\""));
        assert!(svg.contains(">Break the ice</text>"));
        assert!(svg.contains(">어색함을 깨다</text>"));
        assert!(svg.contains("#818cf8"));
    }

    #[test]
    fn test_example_wraps_long_content() {
        let page = Page::new(
            3,
            "Example 01",
            "She told a silly joke at the start of the meeting to break the ice with everyone",
        );
        let svg = compositor().scene_svg(&page, None);
        let lines = wrap_text(
            &ApproxMeasure,
            &FontSpec::bold(75.0),
            &page.content,
            850.0,
        );
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(svg.contains(&format!(">{line}</text>")));
        }
        // Body lines carry the shadow; label and footer do not.
        assert_eq!(count(&svg, "url(#text-shadow)"), lines.len());
    }

    #[test]
    fn test_summary_strips_marker_and_shrinks() {
        let page = Page::new(5, "Summary", "Summary: break the ice = start talking");
        let svg = compositor().scene_svg(&page, None);
        assert!(svg.contains("font-size=\"60\""));
        assert!(!svg.contains(">Summary:"));
        assert!(svg.contains("break the ice"));
    }

    #[test]
    fn test_page_watermark_overrides_config() {
        let mut page = Page::new(4, "Example 02", "Games help");
        page.watermark = Some("@someone_else".to_string());
        let svg = compositor().scene_svg(&page, None);
        assert!(svg.contains(">@someone_else</text>"));
        assert!(!svg.contains(DEFAULT_WATERMARK));
    }

    #[test]
    fn test_composite_output_size() {
        let background = solid_color_asset(400, 300, [200, 40, 40, 255]).expect("bg");
        let page = Page::new(3, "Example 01", "Break the ice");
        let out = compositor().composite(&page, Some(&background)).expect("composited");
        let texture = load_asset(&out).expect("decode");
        assert_eq!((texture.width, texture.height), (1080, 1350));
    }

    #[test]
    fn test_missing_background_uses_fallback_fill() {
        let page = Page::new(3, "Example 01", "x");
        let out = compositor().composite(&page, None).expect("composited");
        let texture = load_asset(&out).expect("decode");
        // Bottom-right corner: fallback fill darkened by the 80% gradient stop.
        let [r, g, b, a] = texture.pixel(1079, 1349).expect("pixel");
        assert_eq!(a, 255);
        assert!(r < 20 && g < 20 && b < 40);
    }

    #[test]
    fn test_unreadable_background_still_composites() {
        let junk = ImageAsset::png(b"not an image");
        let page = Page::new(2, "Expression", "Hello");
        let out = compositor().composite(&page, Some(&junk)).expect("composited");
        assert_ne!(out, junk);
    }

    #[test]
    fn test_body_text_reaches_the_pixels() {
        if crate::raster::system_fonts().is_empty() {
            return;
        }
        let compositor = compositor();
        let written = compositor
            .composite(&Page::new(3, "Example 01", "Break the ice with a joke"), None)
            .expect("composited");
        assert!(bright_pixels(&written, 550, 800) > 0);

        let blank = compositor
            .composite(&Page::new(3, "Example 01", ""), None)
            .expect("composited");
        assert_eq!(bright_pixels(&blank, 550, 800), 0);
    }
}
