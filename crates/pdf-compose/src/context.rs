//! Coordinate spaces shared by rendering and interaction
//!
//! Three spaces meet here: device pixels on the displayed surface (top-left
//! origin), logical canvas points (top-left origin, sheet-sized), and output
//! document points (bottom-left origin). The first two are related through a
//! [`RenderContext`]; the flip to output space lives with the exporters.

use crate::render::ensure_surface;
use crate::types::{Result, SheetSize};

/// A pointer position in device pixels, relative to the displayed surface's
/// top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DevicePoint {
    pub x: f32,
    pub y: f32,
}

impl DevicePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A position in logical canvas points
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CanvasPoint {
    pub x: f32,
    pub y: f32,
}

/// How a logical canvas is currently shown
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    pub logical_width: f32,
    pub logical_height: f32,
    /// Size of the surface as displayed, in device pixels
    pub display_width: f32,
    pub display_height: f32,
    /// Backing-store pixels per logical point for rasterised previews
    pub device_scale: f32,
}

impl RenderContext {
    pub fn new(sheet: SheetSize, display_width: f32, display_height: f32, device_scale: f32) -> Self {
        Self {
            logical_width: sheet.width_pt,
            logical_height: sheet.height_pt,
            display_width,
            display_height,
            device_scale,
        }
    }

    /// Displayed at exactly its logical size
    pub fn unscaled(sheet: SheetSize) -> Self {
        Self::new(sheet, sheet.width_pt, sheet.height_pt, 1.0)
    }

    /// Logical points per displayed pixel, horizontally
    pub fn scale_x(&self) -> f32 {
        ratio(self.logical_width, self.display_width)
    }

    /// Logical points per displayed pixel, vertically
    pub fn scale_y(&self) -> f32 {
        ratio(self.logical_height, self.display_height)
    }

    pub fn to_canvas(&self, point: DevicePoint) -> CanvasPoint {
        CanvasPoint {
            x: point.x * self.scale_x(),
            y: point.y * self.scale_y(),
        }
    }

    /// Backing raster size for a preview of this canvas
    pub fn surface_size(&self) -> Result<(u32, u32)> {
        ensure_surface(
            self.logical_width * self.device_scale,
            self.logical_height * self.device_scale,
        )
    }
}

// A collapsed display (zero or non-finite size) maps one-to-one
fn ratio(logical: f32, displayed: f32) -> f32 {
    if displayed.is_finite() && displayed > 0.0 {
        logical / displayed
    } else {
        1.0
    }
}
