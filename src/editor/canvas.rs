//! Drawing surfaces.
//!
//! The block editor only needs lines and rectangles, drawn either normally or
//! in exclusive-or mode. XOR drawing is what makes the interactive outlines
//! work: drawing the same geometry twice with the same colour restores every
//! pixel, so the ghost can be erased without remembering what was under it.

use serde::{Deserialize, Serialize};

use crate::model::{Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    /// Overwrite pixels.
    Copy,
    /// Exclusive-or the colour into pixels.
    Xor,
}

/// Packed `0x00RRGGBB` colour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Color = Color(0x000000);
    pub const WHITE: Color = Color(0xFFFFFF);
    pub const GREEN: Color = Color(0x00C000);
    pub const BROWN: Color = Color(0x804000);
    pub const GHOST: Color = Color(0x808080);
}

/// Something the editor can render outlines and items onto.
pub trait Canvas {
    fn draw_line(&mut self, from: Point, to: Point, mode: DrawMode, color: Color);

    /// Rectangle outline. Every pixel of the outline is touched exactly once.
    fn draw_rect(&mut self, rect: Rect, mode: DrawMode, color: Color);

    fn fill_rect(&mut self, rect: Rect, mode: DrawMode, color: Color);
}

/// Headless surface that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCanvas;

impl Canvas for NullCanvas {
    fn draw_line(&mut self, _: Point, _: Point, _: DrawMode, _: Color) {}
    fn draw_rect(&mut self, _: Rect, _: DrawMode, _: Color) {}
    fn fill_rect(&mut self, _: Rect, _: DrawMode, _: Color) {}
}

/// In-memory raster in model coordinates, clipped to `width × height`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelCanvas {
    width: i32,
    height: i32,
    pixels: Vec<u32>,
}

impl PixelCanvas {
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        Self {
            width: width as i32,
            height: height as i32,
            pixels: vec![background.0; width as usize * height as usize],
        }
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        self.index(x, y).map(|i| Color(self.pixels[i]))
    }

    /// Number of pixels differing from `color`.
    pub fn count_not(&self, color: Color) -> usize {
        self.pixels.iter().filter(|&&p| p != color.0).count()
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        (x >= 0 && y >= 0 && x < self.width && y < self.height)
            .then(|| (y * self.width + x) as usize)
    }

    fn plot(&mut self, x: i32, y: i32, mode: DrawMode, color: Color) {
        if let Some(i) = self.index(x, y) {
            match mode {
                DrawMode::Copy => self.pixels[i] = color.0,
                DrawMode::Xor => self.pixels[i] ^= color.0,
            }
        }
    }
}

impl Canvas for PixelCanvas {
    fn draw_line(&mut self, from: Point, to: Point, mode: DrawMode, color: Color) {
        // Bresenham, endpoints included, each pixel plotted once.
        let (mut x, mut y) = (from.x, from.y);
        let dx = (to.x - from.x).abs();
        let dy = -(to.y - from.y).abs();
        let sx = if from.x < to.x { 1 } else { -1 };
        let sy = if from.y < to.y { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.plot(x, y, mode, color);
            if x == to.x && y == to.y {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn draw_rect(&mut self, rect: Rect, mode: DrawMode, color: Color) {
        let (min, max) = rect.normalized();
        for x in min.x..=max.x {
            self.plot(x, min.y, mode, color);
            if max.y != min.y {
                self.plot(x, max.y, mode, color);
            }
        }
        if max.x != min.x {
            for y in (min.y + 1)..max.y {
                self.plot(min.x, y, mode, color);
                self.plot(max.x, y, mode, color);
            }
        } else {
            for y in (min.y + 1)..max.y {
                self.plot(min.x, y, mode, color);
            }
        }
    }

    fn fill_rect(&mut self, rect: Rect, mode: DrawMode, color: Color) {
        let (min, max) = rect.normalized();
        for y in min.y..=max.y {
            for x in min.x..=max.x {
                self.plot(x, y, mode, color);
            }
        }
    }
}
