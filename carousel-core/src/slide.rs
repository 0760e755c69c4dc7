//! Editable slides and the deck that owns them.
//!
//! The deck is the only writer of slide state. Each slide sits behind an
//! [`Arc`] and is cloned on write, so a renderer holding a snapshot never
//! observes a partially applied mutation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::align::{align_text_horiz, align_text_vert, HorizontalAlign, VerticalAlign};
use crate::layer::{estimate_text_height, FontStyle, LayerKind, SAFE_MARGIN_X};
use crate::layout::{FRAME_HEIGHT, FRAME_WIDTH};
use crate::{CarouselError, CarouselResult, ImageAsset, Layer, LayerId, LayerPatch, Page, PageRole, Plan, TextAlign};

/// Fill used when a slide has neither a background image nor a color.
pub const DEFAULT_BG_COLOR: &str = "#0b1220";

/// Where new stickers are placed.
pub const STICKER_ANCHOR: (f32, f32) = (200.0, 500.0);

/// Edge length of a new sticker.
pub const STICKER_SIZE: f32 = 220.0;

/// How a deck seeds layers from plan pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedPolicy {
    /// Start every slide without layers.
    #[default]
    Empty,
    /// Seed a label and a body text layer from the page.
    PageText,
}

/// One editable slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditableSlide {
    /// Page this slide renders.
    pub page_number: u32,
    /// Background image, once generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<ImageAsset>,
    /// Solid fill used while no background is present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<String>,
    /// Whether the translucent mid-frame band is painted under the layers.
    #[serde(default)]
    pub legibility_band: bool,
    layers: Vec<Layer>,
}

impl EditableSlide {
    /// An empty slide for a page.
    #[must_use]
    pub fn new(page_number: u32) -> Self {
        Self {
            page_number,
            background: None,
            bg_color: None,
            legibility_band: false,
            layers: Vec::new(),
        }
    }

    /// A slide seeded from a page.
    #[must_use]
    pub fn seeded(page: &Page, policy: SeedPolicy) -> Self {
        let mut slide = Self::new(page.page_number);
        if policy == SeedPolicy::PageText {
            for layer in page_text_layers(page) {
                slide.layers.push(layer);
            }
        }
        slide
    }

    /// Layers in paint order (last is on top).
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Layer by id.
    #[must_use]
    pub fn layer(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| &l.id == id)
    }

    /// Whether a layer with this id exists.
    #[must_use]
    pub fn contains(&self, id: &LayerId) -> bool {
        self.layer(id).is_some()
    }

    /// Solid fill shown when no background image is set.
    #[must_use]
    pub fn fill_color(&self) -> &str {
        self.bg_color.as_deref().unwrap_or(DEFAULT_BG_COLOR)
    }

    /// Topmost draggable-or-not layer containing a frame-space point.
    #[must_use]
    pub fn layer_at(&self, x: f32, y: f32) -> Option<&Layer> {
        self.layers.iter().rev().find(|l| l.contains_point(x, y))
    }

    pub(crate) fn layer_mut(&mut self, id: &LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| &l.id == id)
    }
}

fn page_text_layers(page: &Page) -> Vec<Layer> {
    let cy = FRAME_HEIGHT / 2.0;
    let mut label = centered_text("label", page.label.to_uppercase(), 28.0, None, cy - 250.0);
    label.apply(&LayerPatch {
        fill: Some("#818cf8".to_string()),
        ..LayerPatch::default()
    });

    match page.role() {
        PageRole::Intro => vec![
            label,
            centered_text("body", format!("\"{}\"", page.content), 110.0, Some(1.4), cy - 120.0),
        ],
        PageRole::Expression => {
            let (primary, secondary) = page.split_content();
            let mut body = centered_text("body", primary, 75.0, None, 0.0);
            body.y = cy - 40.0 - estimate_text_height(&body) / 2.0;
            let mut layers = vec![label, body];
            if let Some(secondary) = secondary {
                let mut meaning = centered_text("secondary", secondary, 37.0, Some(1.4), 0.0);
                meaning.y = cy + 60.0 - estimate_text_height(&meaning) / 2.0;
                layers.push(meaning);
            }
            layers
        }
        PageRole::Example => vec![label, centered_text("body", page.content.as_str(), 75.0, Some(1.4), cy - 120.0)],
        PageRole::Summary => vec![label, centered_text("body", page.summary_text(), 60.0, Some(1.4), cy - 120.0)],
    }
}

/// Bold text spanning the safe area, centered within it.
fn centered_text(id: &str, text: impl Into<String>, font_size: f32, line_height: Option<f32>, y: f32) -> Layer {
    let mut layer = Layer::text(LayerId::new(id), SAFE_MARGIN_X, y, text, font_size);
    layer.apply(&LayerPatch {
        width: Some(FRAME_WIDTH - 2.0 * SAFE_MARGIN_X),
        align: Some(TextAlign::Center),
        font_style: Some(FontStyle::Bold),
        line_height,
        ..LayerPatch::default()
    });
    layer
}

/// Proof of a background request; only the latest ticket for a slide may
/// complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundTicket {
    /// Slide the request belongs to.
    pub slide_index: usize,
    sequence: u64,
}

/// The ordered slide collection for a session.
#[derive(Debug, Clone, Default)]
pub struct SlideDeck {
    slides: Vec<Arc<EditableSlide>>,
    load_sequence: Vec<u64>,
}

impl SlideDeck {
    /// Build a deck from slides.
    #[must_use]
    pub fn new(slides: Vec<EditableSlide>) -> Self {
        let load_sequence = vec![0; slides.len()];
        Self {
            slides: slides.into_iter().map(Arc::new).collect(),
            load_sequence,
        }
    }

    /// One slide per plan page, seeded once.
    #[must_use]
    pub fn from_plan(plan: &Plan, policy: SeedPolicy) -> Self {
        Self::new(
            plan.pages()
                .iter()
                .map(|page| EditableSlide::seeded(page, policy))
                .collect(),
        )
    }

    /// Number of slides.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    /// Whether the deck is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Slide by index.
    #[must_use]
    pub fn slide(&self, index: usize) -> Option<&EditableSlide> {
        self.slides.get(index).map(AsRef::as_ref)
    }

    /// Shared, immutable snapshot of a slide.
    #[must_use]
    pub fn snapshot(&self, index: usize) -> Option<Arc<EditableSlide>> {
        self.slides.get(index).cloned()
    }

    /// All slides in order.
    pub fn slides(&self) -> impl Iterator<Item = &EditableSlide> {
        self.slides.iter().map(AsRef::as_ref)
    }

    fn slide_mut(&mut self, index: usize) -> Option<&mut EditableSlide> {
        self.slides.get_mut(index).map(Arc::make_mut)
    }

    /// Append a layer.
    ///
    /// # Errors
    ///
    /// Returns [`CarouselError::SlideNotFound`] for a bad index and
    /// [`CarouselError::DuplicateLayer`] if the id is already used.
    pub fn add_layer(&mut self, slide_index: usize, layer: Layer) -> CarouselResult<LayerId> {
        let slide = self
            .slide(slide_index)
            .ok_or(CarouselError::SlideNotFound(slide_index))?;
        if slide.contains(&layer.id) {
            return Err(CarouselError::DuplicateLayer(layer.id.to_string()));
        }

        let id = layer.id.clone();
        if let Some(slide) = self.slide_mut(slide_index) {
            tracing::debug!(slide_index, layer = %id, kind = layer.kind_name(), "layer added");
            slide.layers.push(layer);
        }
        Ok(id)
    }

    /// Append a sticker at the default anchor and return its new id.
    ///
    /// # Errors
    ///
    /// Returns [`CarouselError::SlideNotFound`] for a bad index.
    pub fn add_sticker(&mut self, slide_index: usize, asset: ImageAsset) -> CarouselResult<LayerId> {
        let slide = self
            .slide(slide_index)
            .ok_or(CarouselError::SlideNotFound(slide_index))?;
        let mut id = LayerId::generate("stk");
        while slide.contains(&id) {
            id = LayerId::generate("stk");
        }
        let (x, y) = STICKER_ANCHOR;
        self.add_layer(
            slide_index,
            Layer::sticker(id, x, y, STICKER_SIZE, STICKER_SIZE, asset),
        )
    }

    /// Merge a patch into a layer. Unknown slides or ids are ignored and the
    /// slide is left untouched. Returns whether a layer was updated.
    pub fn update_layer(&mut self, slide_index: usize, layer_id: &LayerId, patch: &LayerPatch) -> bool {
        let known = self
            .slide(slide_index)
            .is_some_and(|slide| slide.contains(layer_id));
        if !known {
            tracing::debug!(slide_index, layer = %layer_id, "update for unknown layer ignored");
            return false;
        }

        if let Some(layer) = self
            .slide_mut(slide_index)
            .and_then(|slide| slide.layer_mut(layer_id))
        {
            layer.apply(patch);
        }
        true
    }

    /// Remove a layer. Ids are never reused, so a stale selection can only
    /// miss, never point at a different layer.
    pub fn remove_layer(&mut self, slide_index: usize, layer_id: &LayerId) -> Option<Layer> {
        let position = self
            .slide(slide_index)?
            .layers
            .iter()
            .position(|l| &l.id == layer_id)?;
        let slide = self.slide_mut(slide_index)?;
        tracing::debug!(slide_index, layer = %layer_id, "layer removed");
        Some(slide.layers.remove(position))
    }

    /// Flip the legibility band. Returns the new state, or `None` for an
    /// unknown slide.
    pub fn toggle_legibility_band(&mut self, slide_index: usize) -> Option<bool> {
        let slide = self.slide_mut(slide_index)?;
        slide.legibility_band = !slide.legibility_band;
        Some(slide.legibility_band)
    }

    /// Set the fallback fill color.
    pub fn set_bg_color(&mut self, slide_index: usize, color: impl Into<String>) -> bool {
        match self.slide_mut(slide_index) {
            Some(slide) => {
                slide.bg_color = Some(color.into());
                true
            }
            None => false,
        }
    }

    /// Horizontally align a text layer. Returns whether anything changed.
    pub fn align_text_horiz(&mut self, slide_index: usize, layer_id: &LayerId, mode: HorizontalAlign) -> bool {
        self.realign(slide_index, layer_id, |layer| align_text_horiz(layer, mode))
    }

    /// Vertically align a text layer. Returns whether anything changed.
    pub fn align_text_vert(&mut self, slide_index: usize, layer_id: &LayerId, mode: VerticalAlign) -> bool {
        self.realign(slide_index, layer_id, |layer| align_text_vert(layer, mode))
    }

    fn realign(&mut self, slide_index: usize, layer_id: &LayerId, op: impl FnOnce(&mut Layer) -> bool) -> bool {
        let Some(mut layer) = self
            .slide(slide_index)
            .and_then(|slide| slide.layer(layer_id))
            .cloned()
        else {
            return false;
        };
        if !op(&mut layer) {
            return false;
        }

        let (x, y) = (layer.x, layer.y);
        let align = match layer.kind {
            LayerKind::Text { align, .. } => Some(align),
            _ => None,
        };
        self.update_layer(
            slide_index,
            layer_id,
            &LayerPatch {
                x: Some(x),
                y: Some(y),
                align,
                ..LayerPatch::default()
            },
        )
    }

    /// Start a background load for a slide. Any earlier outstanding ticket
    /// for the same slide becomes stale.
    ///
    /// # Errors
    ///
    /// Returns [`CarouselError::SlideNotFound`] for a bad index.
    pub fn begin_background_load(&mut self, slide_index: usize) -> CarouselResult<BackgroundTicket> {
        let counter = self
            .load_sequence
            .get_mut(slide_index)
            .ok_or(CarouselError::SlideNotFound(slide_index))?;
        *counter += 1;
        Ok(BackgroundTicket {
            slide_index,
            sequence: *counter,
        })
    }

    /// Complete a background load. Stale tickets are discarded; returns
    /// whether the background was applied.
    pub fn complete_background_load(&mut self, ticket: BackgroundTicket, asset: ImageAsset) -> bool {
        let current = self.load_sequence.get(ticket.slide_index).copied();
        if current != Some(ticket.sequence) {
            tracing::debug!(
                slide_index = ticket.slide_index,
                sequence = ticket.sequence,
                "stale background load discarded"
            );
            return false;
        }
        match self.slide_mut(ticket.slide_index) {
            Some(slide) => {
                slide.background = Some(asset);
                true
            }
            None => false,
        }
    }

    /// Serialize all slides to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CarouselResult<String> {
        let slides: Vec<&EditableSlide> = self.slides().collect();
        serde_json::to_string(&slides).map_err(CarouselError::Serialization)
    }

    /// Restore a deck from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or a slide repeats a layer id.
    pub fn from_json(json: &str) -> CarouselResult<Self> {
        let slides: Vec<EditableSlide> = serde_json::from_str(json)?;
        for slide in &slides {
            let mut seen = std::collections::HashSet::new();
            if let Some(dup) = slide.layers.iter().find(|l| !seen.insert(&l.id)) {
                return Err(CarouselError::DuplicateLayer(dup.id.to_string()));
            }
        }
        Ok(Self::new(slides))
    }
}
