//! Pixel surface abstraction used to carve the clear zone and place the logo.
//!
//! Rounded rectangles are an optional capability: a surface that cannot draw
//! them reports so through [`Surface::supports_rounded_rect`] and gets a plain
//! rectangle instead.

use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_ellipse_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;
use tracing::warn;

use crate::options::{ClearZoneShape, LogoOptions};

/// Half-open pixel box: covers `x0 <= x < x1`, `y0 <= y < y1`.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct ClearZone {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl ClearZone {
    pub const fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub const fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub const fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    pub const fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub const fn contains(&self, other: &ClearZone) -> bool {
        self.x0 <= other.x0 && self.y0 <= other.y0 && other.x1 <= self.x1 && other.y1 <= self.y1
    }

    fn rect(&self) -> Rect {
        Rect::at(self.x0 as i32, self.y0 as i32).of_size(self.width(), self.height())
    }
}

/// Drawing operations the compositor needs from a pixel buffer.
pub trait Surface {
    fn dimensions(&self) -> (u32, u32);

    fn fill_rect(&mut self, zone: ClearZone, color: Rgba<u8>);

    /// Fills the ellipse inscribed in `zone`.
    fn fill_ellipse(&mut self, zone: ClearZone, color: Rgba<u8>);

    fn supports_rounded_rect(&self) -> bool {
        false
    }

    fn fill_rounded_rect(&mut self, zone: ClearZone, _radius: u32, color: Rgba<u8>) {
        self.fill_rect(zone, color);
    }

    /// Alpha-composites `image` with its top-left corner at `(x, y)`.
    fn overlay(&mut self, image: &RgbaImage, x: u32, y: u32);
}

impl Surface for RgbaImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn fill_rect(&mut self, zone: ClearZone, color: Rgba<u8>) {
        if zone.is_empty() {
            return;
        }
        draw_filled_rect_mut(self, zone.rect(), color);
    }

    fn fill_ellipse(&mut self, zone: ClearZone, color: Rgba<u8>) {
        if zone.is_empty() {
            return;
        }
        // Center and radii on pixel centers keep the ellipse inside the box.
        let cx = (zone.x0 + zone.x1 - 1) / 2;
        let cy = (zone.y0 + zone.y1 - 1) / 2;
        let rx = (zone.width() - 1) / 2;
        let ry = (zone.height() - 1) / 2;
        draw_filled_ellipse_mut(self, (cx as i32, cy as i32), rx as i32, ry as i32, color);
    }

    fn supports_rounded_rect(&self) -> bool {
        true
    }

    fn fill_rounded_rect(&mut self, zone: ClearZone, radius: u32, color: Rgba<u8>) {
        if zone.is_empty() {
            return;
        }
        let (w, h) = (zone.width(), zone.height());
        let r = radius.min((w.min(h) - 1) / 2);
        if r == 0 {
            return self.fill_rect(zone, color);
        }

        // Two overlapping bands plus a disc in each corner.
        let (x0, y0) = (zone.x0 as i32, zone.y0 as i32);
        let (x1, y1) = (zone.x1 as i32 - 1, zone.y1 as i32 - 1);
        let ri = r as i32;
        draw_filled_rect_mut(self, Rect::at(x0, y0 + ri).of_size(w, h - 2 * r), color);
        draw_filled_rect_mut(self, Rect::at(x0 + ri, y0).of_size(w - 2 * r, h), color);
        for center in [(x0 + ri, y0 + ri), (x1 - ri, y0 + ri), (x0 + ri, y1 - ri), (x1 - ri, y1 - ri)] {
            draw_filled_circle_mut(self, center, ri, color);
        }
    }

    fn overlay(&mut self, image: &RgbaImage, x: u32, y: u32) {
        imageops::overlay(self, image, i64::from(x), i64::from(y));
    }
}

/// Paints the clear zone in `color` with the shape chosen in `options`.
pub fn draw_clear_zone<S: Surface + ?Sized>(
    surface: &mut S,
    zone: ClearZone,
    options: &LogoOptions,
    color: Rgba<u8>,
) {
    match options.shape {
        ClearZoneShape::Circle => surface.fill_ellipse(zone, color),
        ClearZoneShape::RoundedRectangle if surface.supports_rounded_rect() => {
            surface.fill_rounded_rect(zone, options.corner_radius, color)
        }
        ClearZoneShape::RoundedRectangle => {
            warn!("surface cannot draw rounded rectangles, using a plain rectangle");
            surface.fill_rect(zone, color)
        }
    }
}
