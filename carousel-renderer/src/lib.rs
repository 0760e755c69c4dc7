//! # Carousel Renderer
//!
//! Turns carousel pages and editable slides into 1080×1350 PNGs.
//!
//! ## Rendering Path
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Compositor (static)  │ SlideExporter (edit) │
//! ├──────────────────────┴──────────────────────┤
//! │        SVG scene (text, images, paths)      │
//! ├─────────────────────────────────────────────┤
//! │   usvg parse → resvg render → tiny-skia     │
//! ├─────────────────────────────────────────────┤
//! │   ExportPipeline → DownloadSink (files)     │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod compositor;
pub mod error;
pub mod export;
pub mod image;
pub mod metrics;
pub mod pipeline;
pub mod raster;
pub mod svg;

pub use compositor::{Compositor, CompositorConfig, DEFAULT_WATERMARK};
pub use error::{RenderError, RenderResult};
pub use export::{download_filename, Download, ExportConfig, SlideExporter};
pub use metrics::FontMeasure;
pub use pipeline::{
    CollectingSink, DirectorySink, DownloadSink, ExportPipeline, ExportReport, FixedDelayBarrier,
    RenderBarrier, RenderSignal, SignalBarrier,
};
pub use raster::{system_fonts, Rasterizer};

/// Carousel renderer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
