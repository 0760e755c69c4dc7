//! Renderer error types.

use carousel_core::CarouselError;
use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur during rendering and export.
#[derive(Debug, Error)]
pub enum RenderError {
    /// An image asset could not be loaded or decoded.
    #[error("Failed to load resource: {0}")]
    Resource(String),

    /// The generated SVG scene could not be parsed.
    #[error("Scene error: {0}")]
    Scene(String),

    /// No pixel surface could be created.
    #[error("Rasterization failed: {0}")]
    Raster(String),

    /// Encoding the rendered surface failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// Slide index outside the deck.
    #[error("Slide not found: {0}")]
    SlideNotFound(usize),

    /// A download sink could not accept a file.
    #[error("Download failed: {0}")]
    Sink(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the carousel core.
    #[error(transparent)]
    Core(#[from] CarouselError),
}
