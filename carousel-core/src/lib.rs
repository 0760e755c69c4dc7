//! # Carousel Core
//!
//! Slide content model, editable layers and the interactive selection
//! surface for five-frame carousel posts. Rendering lives in
//! `carousel-renderer`; nothing here touches pixels.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                carousel-core                │
//! ├─────────────────────────────────────────────┤
//! │  Content Model   │  Layer Model             │
//! │  - Plan / Pages  │  - Text / Sticker / Rect │
//! │  - Image sets    │  - Patches, alignment    │
//! │  - Producer seam │  - Copy-on-write deck    │
//! ├─────────────────────────────────────────────┤
//! │  Canvas Surface  │  Layout Primitives       │
//! │  - Selection     │  - Word wrap             │
//! │  - Drag commit   │  - Rounded rects         │
//! │  - Viewport map  │  - Cover fit             │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod align;
pub mod asset;
pub mod content;
pub mod error;
pub mod event;
pub mod layer;
pub mod layout;
pub mod session;
pub mod slide;
pub mod stickers;
pub mod surface;

pub use align::{HorizontalAlign, VerticalAlign};
pub use asset::ImageAsset;
pub use content::{
    strip_summary_marker, Candidate, ContentProducer, EngineOutput, ImageSet, Page, PageRole, Plan,
    StaticContent, PAGES_PER_PLAN,
};
pub use error::{CarouselError, CarouselResult};
pub use event::{PointerEvent, PointerPhase, PointerSource, Viewport};
pub use layer::{Bounds, FontStyle, Layer, LayerId, LayerKind, LayerPatch, TextAlign};
pub use layout::{ApproxMeasure, FontSpec, FontWeight, TextMeasure, FRAME_HEIGHT, FRAME_WIDTH};
pub use session::EditorSession;
pub use slide::{BackgroundTicket, EditableSlide, SeedPolicy, SlideDeck};
pub use stickers::Sticker;
pub use surface::{CanvasSurface, SelectionOverlay, SurfaceOutcome, SurfaceView, TransformChange};

/// Carousel core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
