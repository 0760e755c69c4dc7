//! Error types for carousel operations.

use thiserror::Error;

/// Result type for carousel operations.
pub type CarouselResult<T> = Result<T, CarouselError>;

/// Errors that can occur in carousel operations.
///
/// Layer mutations addressed by an unknown id are not errors; they are
/// absorbed as no-ops so stale UI events can be replayed safely.
#[derive(Debug, Error)]
pub enum CarouselError {
    /// Slide index outside the deck.
    #[error("Slide not found: {0}")]
    SlideNotFound(usize),

    /// A layer id is already used on the slide.
    #[error("Duplicate layer id: {0}")]
    DuplicateLayer(String),

    /// The plan violates the page invariants.
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// The generation pipeline reported a failure.
    #[error("Pipeline error ({code}): {message}")]
    Pipeline {
        /// Machine-readable error code from the pipeline envelope.
        code: String,
        /// Human-readable message.
        message: String,
    },

    /// An asset reference could not be interpreted.
    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    /// Plan or deck serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
