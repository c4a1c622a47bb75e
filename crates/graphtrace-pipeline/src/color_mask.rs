//! Colour raster restricted to edge pixels.

use image::{Rgb, RgbImage};

use crate::edge::EdgeMask;
use crate::types::Dimensions;

/// Source colours at edge pixels, black elsewhere, in tracer
/// orientation (vertically flipped, row 0 is the source's bottom row).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorMask(RgbImage);

impl ColorMask {
    /// Keep the colour of every `pixels` entry that sits under an edge
    /// of `edges`.
    ///
    /// `pixels` is in source orientation; `edges` in tracer orientation.
    #[must_use]
    pub fn build(pixels: &RgbImage, edges: &EdgeMask) -> Self {
        let (width, height) = pixels.dimensions();
        Self(RgbImage::from_fn(width, height, |x, y| {
            if edges.is_edge(i64::from(x), i64::from(y)) {
                *pixels.get_pixel(x, height - 1 - y)
            } else {
                Rgb([0, 0, 0])
            }
        }))
    }

    /// Wrap a raster that is already in tracer orientation.
    #[must_use]
    pub const fn from_flipped(image: RgbImage) -> Self {
        Self(image)
    }

    /// Mask dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.0.width(),
            height: self.0.height(),
        }
    }

    /// Colour at `(row, col)`, or `None` outside the raster.
    #[must_use]
    pub fn color_at(&self, row: isize, col: isize) -> Option<[u8; 3]> {
        let row = u32::try_from(row).ok()?;
        let col = u32::try_from(col).ok()?;
        if row >= self.0.height() || col >= self.0.width() {
            return None;
        }
        Some(self.0.get_pixel(col, row).0)
    }
}
