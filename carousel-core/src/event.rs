//! Pointer input for the editing surface.

use serde::{Deserialize, Serialize};

use crate::layout::{FRAME_HEIGHT, FRAME_WIDTH};

/// Phase of a pointer interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Button pressed / finger down.
    Down,
    /// Pointer moved.
    Move,
    /// Button released / finger up.
    Up,
    /// Interaction cancelled (e.g. pointer left the window).
    Cancel,
}

/// Input device that produced the event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerSource {
    /// Mouse or trackpad.
    #[default]
    Mouse,
    /// Touch screen (tap).
    Touch,
}

/// A pointer event in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Phase of this event.
    pub phase: PointerPhase,
    /// X position in viewport pixels.
    pub x: f32,
    /// Y position in viewport pixels.
    pub y: f32,
    /// Producing device.
    #[serde(default)]
    pub source: PointerSource,
    /// Timestamp in milliseconds since surface start.
    #[serde(default)]
    pub timestamp_ms: u64,
}

impl PointerEvent {
    /// Create a mouse event.
    #[must_use]
    pub fn new(phase: PointerPhase, x: f32, y: f32) -> Self {
        Self {
            phase,
            x,
            y,
            source: PointerSource::Mouse,
            timestamp_ms: 0,
        }
    }

    /// Pointer pressed.
    #[must_use]
    pub fn down(x: f32, y: f32) -> Self {
        Self::new(PointerPhase::Down, x, y)
    }

    /// Pointer moved.
    #[must_use]
    pub fn moved(x: f32, y: f32) -> Self {
        Self::new(PointerPhase::Move, x, y)
    }

    /// Pointer released.
    #[must_use]
    pub fn up(x: f32, y: f32) -> Self {
        Self::new(PointerPhase::Up, x, y)
    }

    /// Set the producing device.
    #[must_use]
    pub fn with_source(mut self, source: PointerSource) -> Self {
        self.source = source;
        self
    }
}

/// Mapping between the on-screen editing viewport and the fixed export
/// frame.
///
/// `viewport = frame * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Display scale (1.0 = frame pixels).
    pub scale: f32,
    /// Horizontal offset of the frame inside the viewport.
    pub offset_x: f32,
    /// Vertical offset of the frame inside the viewport.
    pub offset_y: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl Viewport {
    /// Scale the frame to fit a display area, centered.
    #[must_use]
    pub fn fit(display_width: f32, display_height: f32) -> Self {
        let scale = (display_width / FRAME_WIDTH)
            .min(display_height / FRAME_HEIGHT)
            .max(f32::EPSILON);
        Self {
            scale,
            offset_x: (display_width - FRAME_WIDTH * scale) / 2.0,
            offset_y: (display_height - FRAME_HEIGHT * scale) / 2.0,
        }
    }

    /// Convert viewport coordinates to frame coordinates.
    #[must_use]
    pub fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.offset_x) / self.scale, (y - self.offset_y) / self.scale)
    }

    /// Convert frame coordinates to viewport coordinates.
    #[must_use]
    pub fn to_viewport(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.scale + self.offset_x, y * self.scale + self.offset_y)
    }
}
