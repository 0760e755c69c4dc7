//! Editable slide export.
//!
//! Renders an [`EditableSlide`] (background, legibility band, layers and
//! optionally the selection overlay) to an SVG intermediate and rasterizes
//! it through resvg/tiny-skia. Exports run at 2× by default.

use std::fmt::Write;
use std::sync::Arc;

use carousel_core::layer::{estimate_text_width, layer_font, DEFAULT_LINE_HEIGHT};
use carousel_core::layout::{cover_fit, round_rect, wrap_text, Placement};
use carousel_core::{
    EditableSlide, FontStyle, ImageAsset, Layer, LayerKind, SelectionOverlay, SurfaceView, TextAlign,
    TextMeasure, FRAME_HEIGHT, FRAME_WIDTH,
};
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};
use crate::image::asset_dimensions;
use crate::metrics::FontMeasure;
use crate::raster::Rasterizer;
use crate::svg::{self, escape_xml, TextAnchor, TextStyle};

/// Height of the legibility band, centered on the frame.
pub const BAND_HEIGHT: f32 = 520.0;

/// Fill of the legibility band.
pub const BAND_FILL: &str = "rgba(0,0,0,0.45)";

/// Stroke color of the selection overlay.
pub const SELECTION_STROKE: &str = "#4f46e5";

const HANDLE_SIZE: f32 = 14.0;

/// Configuration for slide export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Supersampling factor (2.0 renders 2160×2700).
    pub scale: f32,
    /// Fixed wait after switching slides before sampling pixels.
    pub settle_delay_ms: u64,
    /// Wait between consecutive downloads in a batch.
    pub throttle_ms: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            scale: 2.0,
            settle_delay_ms: 250,
            throttle_ms: 250,
        }
    }
}

/// A named file ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// File name, e.g. `carousel_slide_03.png`.
    pub filename: String,
    /// Encoded image.
    pub asset: ImageAsset,
}

/// File name for an exported page.
#[must_use]
pub fn download_filename(page_number: u32) -> String {
    format!("carousel_slide_{page_number:02}.png")
}

/// Renders editable slides.
pub struct SlideExporter {
    config: ExportConfig,
    rasterizer: Rasterizer,
    measure: Arc<dyn TextMeasure + Send + Sync>,
}

impl std::fmt::Debug for SlideExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlideExporter")
            .field("config", &self.config)
            .field("rasterizer", &self.rasterizer)
            .finish_non_exhaustive()
    }
}

impl SlideExporter {
    /// Create a new exporter with the given configuration.
    #[must_use]
    pub fn new(config: ExportConfig, rasterizer: Rasterizer) -> Self {
        let measure = Arc::new(FontMeasure::for_rasterizer(&rasterizer));
        Self {
            config,
            rasterizer,
            measure,
        }
    }

    /// Create an exporter with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ExportConfig::default(), Rasterizer::new())
    }

    /// Replace the text measurer used to wrap boxed text layers.
    #[must_use]
    pub fn with_measure(mut self, measure: Arc<dyn TextMeasure + Send + Sync>) -> Self {
        self.measure = measure;
        self
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export a slide as a named PNG. The selection overlay is never part
    /// of an export.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or encoding fails.
    pub fn export_slide(&self, slide: &EditableSlide) -> RenderResult<Download> {
        let png = self.render_to_png(slide)?;
        Ok(Download {
            filename: download_filename(slide.page_number),
            asset: ImageAsset::png(&png),
        })
    }

    /// Render a slide to PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or encoding fails.
    pub fn render_to_png(&self, slide: &EditableSlide) -> RenderResult<Vec<u8>> {
        let svg = self.render_to_svg(slide, None);
        self.rasterizer
            .render_png(&svg)
            .map_err(|e| RenderError::Export(format!("slide {}: {e}", slide.page_number)))
    }

    /// Render what the editing surface currently shows, overlay included.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or encoding fails.
    pub fn render_view(&self, view: &SurfaceView) -> RenderResult<ImageAsset> {
        let svg = self.render_to_svg(&view.slide, view.overlay.as_ref());
        self.rasterizer.render_asset(&svg)
    }

    /// Render a slide to an SVG string in frame coordinates.
    #[must_use]
    pub fn render_to_svg(&self, slide: &EditableSlide, overlay: Option<&SelectionOverlay>) -> String {
        let mut out = String::with_capacity(4096);
        svg::open_document(&mut out, FRAME_WIDTH, FRAME_HEIGHT, self.config.scale);

        svg::write_rect(&mut out, 0.0, 0.0, FRAME_WIDTH, FRAME_HEIGHT, slide.fill_color());
        if let Some(background) = &slide.background {
            match asset_dimensions(background, &self.rasterizer) {
                Ok((w, h)) => svg::write_image(&mut out, &cover_fit(w, h, FRAME_WIDTH, FRAME_HEIGHT), background),
                Err(e) => {
                    tracing::warn!(page = slide.page_number, error = %e, "background unreadable, using fill");
                }
            }
        }

        if slide.legibility_band {
            svg::write_rect(
                &mut out,
                0.0,
                (FRAME_HEIGHT - BAND_HEIGHT) / 2.0,
                FRAME_WIDTH,
                BAND_HEIGHT,
                BAND_FILL,
            );
        }

        for layer in slide.layers() {
            self.write_layer(&mut out, layer);
        }

        if let Some(overlay) = overlay {
            write_overlay(&mut out, overlay);
        }

        svg::close_document(&mut out);
        out
    }

    fn write_layer(&self, out: &mut String, layer: &Layer) {
        open_group(out, layer.x, layer.y, layer.rotation, layer.opacity);

        match &layer.kind {
            LayerKind::Text {
                width,
                align,
                font_size,
                font_style,
                fill,
                line_height,
                text,
            } => {
                let font = layer_font(*font_size, *font_style);
                let step = font_size * line_height.unwrap_or(DEFAULT_LINE_HEIGHT);
                let lines: Vec<String> = match width {
                    Some(w) => wrap_text(self.measure.as_ref(), &font, text, *w),
                    None => text.split('\n').map(str::to_string).collect(),
                };
                // Unboxed text aligns within its estimated hit box.
                let box_width = estimate_text_width(layer);
                let (anchor, x) = match align {
                    TextAlign::Left => (TextAnchor::Start, 0.0),
                    TextAlign::Center => (TextAnchor::Middle, box_width / 2.0),
                    TextAlign::Right => (TextAnchor::End, box_width),
                };
                let style = TextStyle {
                    font: &font,
                    fill,
                    anchor,
                    italic: *font_style == Some(FontStyle::Italic),
                    shadow: false,
                };
                let mut y = step / 2.0;
                for line in &lines {
                    svg::write_text(out, x, y, line, &style);
                    y += step;
                }
            }
            LayerKind::Sticker {
                width,
                height,
                data_url,
            } => {
                let placement = Placement {
                    x: 0.0,
                    y: 0.0,
                    width: *width,
                    height: *height,
                };
                svg::write_image(out, &placement, data_url);
            }
            LayerKind::Rect {
                width,
                height,
                fill,
                corner_radius,
            } => match corner_radius.filter(|r| *r > 0.0) {
                Some(r) => svg::write_path(out, &round_rect(0.0, 0.0, *width, *height, r), fill),
                None => svg::write_rect(out, 0.0, 0.0, *width, *height, fill),
            },
        }

        out.push_str("</g>");
    }
}

fn open_group(out: &mut String, x: f32, y: f32, rotation: Option<f32>, opacity: Option<f32>) {
    let _ = write!(out, "<g transform=\"translate({x} {y})");
    if let Some(r) = rotation.filter(|r| r.abs() > f32::EPSILON) {
        let _ = write!(out, " rotate({r})");
    }
    out.push('"');
    if let Some(o) = opacity {
        let _ = write!(out, " opacity=\"{o}\"");
    }
    out.push('>');
}

fn write_overlay(out: &mut String, overlay: &SelectionOverlay) {
    let b = &overlay.bounds;
    open_group(out, b.x, b.y, Some(overlay.rotation), None);
    let stroke = escape_xml(SELECTION_STROKE);
    let _ = write!(
        out,
        "<rect x=\"-4\" y=\"-4\" width=\"{}\" height=\"{}\" fill=\"none\" stroke=\"{stroke}\" stroke-width=\"3\"/>",
        b.width + 8.0,
        b.height + 8.0,
    );
    let half = HANDLE_SIZE / 2.0;
    for (hx, hy) in [(0.0, 0.0), (b.width, 0.0), (0.0, b.height), (b.width, b.height)] {
        let _ = write!(
            out,
            "<rect x=\"{}\" y=\"{}\" width=\"{HANDLE_SIZE}\" height=\"{HANDLE_SIZE}\" fill=\"#ffffff\" stroke=\"{stroke}\" stroke-width=\"2\"/>",
            hx - half,
            hy - half,
        );
    }
    out.push_str("</g>");
}
