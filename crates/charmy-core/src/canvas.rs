//! Drawing targets handed to drawing frameworks.

use crate::error::{CharmyError, Result};

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLUE: Color = Color::rgb(0, 0, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// How a rectangle is painted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    /// Background fill, `None` leaves the interior untouched.
    pub background: Option<Color>,
    /// Border stroke, `None` draws no border.
    pub border: Option<Color>,
    pub border_width: f32,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            background: Some(Color::BLUE),
            border: None,
            border_width: 1.0,
        }
    }
}

impl Paint {
    pub fn fill(color: Color) -> Self {
        Self {
            background: Some(color),
            ..Self::default()
        }
    }

    pub fn with_border(mut self, color: Color, width: f32) -> Self {
        self.border = Some(color);
        self.border_width = width;
        self
    }
}

/// A CPU pixel surface, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl Canvas {
    /// Largest pixel count a canvas may hold, a 16384x16384 surface.
    pub const MAX_PIXELS: usize = 1 << 28;

    /// A transparent canvas. Fails with [`CharmyError::CanvasTooLarge`] past
    /// [`MAX_PIXELS`](Self::MAX_PIXELS).
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let count = (width as usize)
            .checked_mul(height as usize)
            .filter(|count| *count <= Self::MAX_PIXELS)
            .ok_or(CharmyError::CanvasTooLarge { width, height })?;

        Ok(Self {
            width,
            height,
            pixels: vec![Color::TRANSPARENT; count],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x < self.width && y < self.height {
            Some(self.pixels[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    /// Write one pixel; out-of-bounds writes are clipped.
    pub fn put_pixel(&mut self, x: u32, y: u32, color: Color) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = color;
        }
    }

    pub fn clear(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    /// Resize, discarding the previous content. On error the canvas is unchanged.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if (width, height) != (self.width, self.height) {
            *self = Canvas::new(width, height)?;
        }
        Ok(())
    }
}
