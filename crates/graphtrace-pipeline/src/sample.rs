//! Nearest-colour sampling on the colour mask.
//!
//! The search walks a fixed square spiral that starts one pixel up and
//! to the left of the target and runs east, south, west, then north,
//! widening by two after each revolution. It stops after two
//! revolutions (26 positions), at the first non-black pixel, or as soon
//! as the walk steps outside the image.

use crate::color_mask::ColorMask;

/// Colour used when the search finds nothing usable.
pub const FALLBACK_COLOR: &str = "#000000";

/// Number of full revolutions the spiral makes.
const REVOLUTIONS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leg {
    East,
    South,
    West,
    North,
}

/// Positions visited by the nearest-colour search, in order, as
/// `(row, col)`.
#[derive(Debug, Clone)]
pub struct SpiralWalk {
    target: (isize, isize),
    row: isize,
    col: isize,
    bound: isize,
    revolutions: u32,
    leg: Leg,
}

impl SpiralWalk {
    /// Start a walk around `(row, col)`.
    #[must_use]
    pub const fn new(row: isize, col: isize) -> Self {
        Self {
            target: (row, col),
            row: row - 1,
            col: col - 1,
            bound: 1,
            revolutions: 0,
            leg: Leg::East,
        }
    }
}

impl Iterator for SpiralWalk {
    type Item = (isize, isize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.revolutions >= REVOLUTIONS {
            return None;
        }
        let here = (self.row, self.col);
        let (ty, tx) = self.target;
        match self.leg {
            Leg::East => {
                self.col += 1;
                if self.col - tx + 1 >= self.bound {
                    self.leg = Leg::South;
                }
            }
            Leg::South => {
                self.row += 1;
                if self.row - ty + 1 >= self.bound {
                    self.leg = Leg::West;
                }
            }
            Leg::West => {
                self.col -= 1;
                if tx - self.col - 1 >= self.bound {
                    self.leg = Leg::North;
                }
            }
            Leg::North => {
                self.row -= 1;
                if ty - self.row - 1 >= self.bound {
                    self.leg = Leg::East;
                    self.bound += 2;
                    self.revolutions += 1;
                }
            }
        }
        Some(here)
    }
}

/// Result of a nearest-colour search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// First non-black pixel in spiral order.
    Found([u8; 3]),
    /// Every position was in bounds and black.
    NotFound,
    /// The walk left the image at `(row, col)` before finding a colour.
    OutOfBounds {
        /// Row of the first out-of-range position.
        row: isize,
        /// Column of the first out-of-range position.
        col: isize,
    },
}

/// Search `mask` around `(row, col)` for the nearest non-black pixel.
#[must_use]
pub fn nearest_color(mask: &ColorMask, row: isize, col: isize) -> SampleOutcome {
    for (r, c) in SpiralWalk::new(row, col) {
        match mask.color_at(r, c) {
            None => return SampleOutcome::OutOfBounds { row: r, col: c },
            Some(rgb) if rgb != [0, 0, 0] => return SampleOutcome::Found(rgb),
            Some(_) => {}
        }
    }
    SampleOutcome::NotFound
}

/// Nearest colour as `#rrggbb`, falling back to [`FALLBACK_COLOR`].
///
/// Leaving the image is logged at `warn`; it never fails.
#[must_use]
pub fn sample_hex(mask: &ColorMask, row: isize, col: isize) -> String {
    match nearest_color(mask, row, col) {
        SampleOutcome::Found(rgb) => hex_color(rgb),
        SampleOutcome::NotFound => FALLBACK_COLOR.to_owned(),
        SampleOutcome::OutOfBounds { row: r, col: c } => {
            tracing::warn!(
                row,
                col,
                stopped_row = r,
                stopped_col = c,
                "colour search left the image, using fallback"
            );
            FALLBACK_COLOR.to_owned()
        }
    }
}

/// Format an RGB triple as lowercase `#rrggbb`.
#[must_use]
pub fn hex_color([r, g, b]: [u8; 3]) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn mask_with(w: u32, h: u32, pixels: &[((u32, u32), [u8; 3])]) -> ColorMask {
        let mut img = RgbImage::new(w, h);
        for &((row, col), rgb) in pixels {
            img.put_pixel(col, row, Rgb(rgb));
        }
        ColorMask::from_flipped(img)
    }

    #[test]
    fn spiral_visits_26_distinct_positions() {
        let walk: Vec<_> = SpiralWalk::new(0, 0).collect();
        assert_eq!(walk.len(), 26);
        let mut unique = walk.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 26);
    }

    #[test]
    fn spiral_order_starts_up_and_left() {
        let walk: Vec<_> = SpiralWalk::new(10, 20).take(7).collect();
        assert_eq!(
            walk,
            vec![
                (9, 19),
                (9, 20),
                (10, 20),
                (10, 19),
                (10, 18),
                (9, 18),
                (8, 18),
            ]
        );
    }

    #[test]
    fn spiral_ends_at_far_corner() {
        assert_eq!(SpiralWalk::new(0, 0).last(), Some((-3, -4)));
    }

    #[test]
    fn first_hit_in_spiral_order_wins() {
        // Offset (2, 2) is visited 15th, (-2, 1) 10th.
        let mask = mask_with(
            30,
            30,
            &[((12, 12), [255, 0, 0]), ((8, 11), [0, 0, 255])],
        );
        assert_eq!(nearest_color(&mask, 10, 10), SampleOutcome::Found([0, 0, 255]));
    }

    #[test]
    fn target_pixel_itself_is_third() {
        let mask = mask_with(
            30,
            30,
            &[((10, 10), [1, 2, 3]), ((9, 9), [0, 0, 0])],
        );
        assert_eq!(nearest_color(&mask, 10, 10), SampleOutcome::Found([1, 2, 3]));
    }

    #[test]
    fn pixel_outside_search_pattern_is_not_found() {
        // (0, 3) relative to the target is never visited.
        let mask = mask_with(30, 30, &[((10, 13), [9, 9, 9])]);
        assert_eq!(nearest_color(&mask, 10, 10), SampleOutcome::NotFound);
        assert_eq!(sample_hex(&mask, 10, 10), FALLBACK_COLOR);
    }

    #[test]
    fn leaving_the_image_falls_back_to_black() {
        let mask = mask_with(5, 5, &[((0, 0), [255, 255, 255])]);
        assert_eq!(
            nearest_color(&mask, 0, 0),
            SampleOutcome::OutOfBounds { row: -1, col: -1 }
        );
        assert_eq!(sample_hex(&mask, 0, 0), "#000000");
    }

    #[test]
    fn hit_before_leaving_the_image_is_returned() {
        // Target on the bottom-right corner; (row, col) itself is hit
        // before the walk steps out.
        let mask = mask_with(5, 5, &[((4, 4), [10, 20, 30])]);
        assert_eq!(sample_hex(&mask, 4, 4), "#0a141e");
    }

    #[test]
    fn hex_is_lowercase_and_padded() {
        assert_eq!(hex_color([0xAB, 0x0C, 0xFF]), "#ab0cff");
        assert_eq!(hex_color([0, 0, 0]), "#000000");
    }
}
