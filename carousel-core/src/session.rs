//! Editor session state.

use crate::slide::SeedPolicy;
use crate::surface::{CanvasSurface, SurfaceOutcome, TransformChange};
use crate::{
    CarouselResult, ContentProducer, ImageAsset, ImageSet, Layer, LayerId, LayerPatch, Plan, PointerEvent,
    SlideDeck,
};

/// Everything one editing session owns: the plan it was seeded from, the
/// slide deck and the interactive surface.
#[derive(Debug, Clone)]
pub struct EditorSession {
    plan: Plan,
    /// Slides being edited.
    pub deck: SlideDeck,
    /// Selection and drag state.
    pub surface: CanvasSurface,
    /// Whether anything was edited since the session was seeded.
    pub has_local_changes: bool,
}

impl EditorSession {
    /// Seed a session from a plan. Layers are created once here and never
    /// re-derived from the plan afterwards.
    #[must_use]
    pub fn from_plan(plan: Plan, seed: SeedPolicy) -> Self {
        let deck = SlideDeck::from_plan(&plan, seed);
        tracing::debug!(slides = deck.len(), ?seed, "editor session seeded");
        Self {
            plan,
            deck,
            surface: CanvasSurface::new(),
            has_local_changes: false,
        }
    }

    /// Fetch the plan from a producer, seed the deck, then fill in whatever
    /// backgrounds the producer can supply. A failed image request leaves
    /// the slides on their solid fill.
    ///
    /// # Errors
    ///
    /// Returns the producer's error if the text plan cannot be obtained.
    pub async fn generate(producer: &dyn ContentProducer, seed: SeedPolicy) -> CarouselResult<Self> {
        let plan = producer.text_plan().await?;
        let mut session = Self::from_plan(plan, seed);

        let tickets = (0..session.deck.len())
            .map(|i| session.deck.begin_background_load(i))
            .collect::<CarouselResult<Vec<_>>>()?;

        match producer.images(&session.plan).await {
            Ok(images) => {
                for ticket in tickets {
                    let page_number = session.deck.slide(ticket.slide_index).map(|s| s.page_number);
                    if let Some(asset) = page_number.and_then(|n| images.get(n)) {
                        session.deck.complete_background_load(ticket, asset.clone());
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "image generation failed, keeping solid backgrounds");
            }
        }
        Ok(session)
    }

    /// The plan this session was seeded from.
    #[must_use]
    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Apply a set of backgrounds keyed by page number. Returns how many
    /// slides received one.
    pub fn apply_images(&mut self, images: &ImageSet) -> usize {
        let mut applied = 0;
        for index in 0..self.deck.len() {
            let Some(page_number) = self.deck.slide(index).map(|s| s.page_number) else {
                continue;
            };
            let Some(asset) = images.get(page_number) else {
                continue;
            };
            if let Ok(ticket) = self.deck.begin_background_load(index) {
                if self.deck.complete_background_load(ticket, asset.clone()) {
                    applied += 1;
                }
            }
        }
        applied
    }

    /// Feed a pointer event to the surface.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> SurfaceOutcome {
        let outcome = self.surface.handle_pointer(&mut self.deck, event);
        if matches!(outcome, SurfaceOutcome::Committed { .. }) {
            self.has_local_changes = true;
        }
        outcome
    }

    /// Show another slide, clearing the selection.
    pub fn switch_slide(&mut self, index: usize) -> bool {
        self.surface.switch_slide(&self.deck, index)
    }

    /// Add a sticker to the active slide and select it.
    ///
    /// # Errors
    ///
    /// Returns an error if the active slide does not exist.
    pub fn add_sticker(&mut self, asset: ImageAsset) -> CarouselResult<LayerId> {
        let id = self.deck.add_sticker(self.surface.active_slide(), asset)?;
        self.surface.select(&self.deck, &id);
        self.has_local_changes = true;
        Ok(id)
    }

    /// Patch the selected layer. Returns `false` when nothing is selected.
    pub fn update_selected(&mut self, patch: &LayerPatch) -> bool {
        let Some(id) = self.surface.selected_id().cloned() else {
            return false;
        };
        let updated = self.deck.update_layer(self.surface.active_slide(), &id, patch);
        self.has_local_changes |= updated;
        updated
    }

    /// Apply a transform-handle gesture to the selected layer.
    pub fn commit_transform(&mut self, change: TransformChange) -> bool {
        let updated = self.surface.commit_transform(&mut self.deck, change);
        self.has_local_changes |= updated;
        updated
    }

    /// Delete the selected layer.
    pub fn remove_selected(&mut self) -> Option<Layer> {
        let id = self.surface.selected_id().cloned()?;
        let removed = self.deck.remove_layer(self.surface.active_slide(), &id);
        self.surface.prune(&self.deck);
        if removed.is_some() {
            self.has_local_changes = true;
        }
        removed
    }

    /// Flip the legibility band on the active slide.
    pub fn toggle_legibility_band(&mut self) -> Option<bool> {
        let state = self.deck.toggle_legibility_band(self.surface.active_slide());
        self.has_local_changes |= state.is_some();
        state
    }
}
