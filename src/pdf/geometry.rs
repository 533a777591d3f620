//! Widget geometry and the PDF-point to signing-UI coordinate transform

use crate::config::GeometryConfig;
use serde::Serialize;

/// Rectangle in PDF point space (origin bottom-left)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from a `/Rect` array `[x1 y1 x2 y2]`, whose corners may be
    /// given in any order.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }

    /// Corners `[llx lly urx ury]` for writing back into a `/Rect`
    pub fn corners(&self) -> [f64; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }
}

/// Page dimensions in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// Rectangle in pixel space (origin top-left)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Convert a widget rectangle into page-relative pixels.
///
/// At the default 72 DPI the conversion factor is 1 and this is a pure
/// vertical flip.
pub fn to_anchor_pixels(rect: &Rect, page: &PageSize, config: &GeometryConfig) -> PixelRect {
    let factor = 72.0 / config.resolution;
    PixelRect {
        x: rect.x * factor,
        y: page.height - rect.y * factor - rect.height * factor,
        width: rect.width * factor,
        height: rect.height * factor,
    }
}

/// Anchor position expected by the signing UI.
///
/// The axis factors are empirical calibration constants and must not be
/// folded into the DPI factor.
pub fn anchor_position(rect: &Rect, page: &PageSize, config: &GeometryConfig) -> (f64, f64) {
    let pixels = to_anchor_pixels(rect, page, config);
    (pixels.x * config.factor_x, pixels.y * config.factor_y)
}
