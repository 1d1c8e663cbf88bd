//! Background classification masks.
//!
//! A pixel is background when its color channels satisfy a predicate. The basic
//! remover uses a single conjunctive white test; the aggressive remover unions
//! three predicates so that shaded halos and light gray paper are caught too.

use image::{Rgba, RgbaImage};

/// Pixel written over every background pixel: white, fully transparent.
pub const TRANSPARENT_WHITE: Rgba<u8> = Rgba([255, 255, 255, 0]);

/// Parameters of the low-saturation, high-brightness ("near gray") predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrayMaskParams {
    /// Channel spread `max(R,G,B) - min(R,G,B)` must be strictly below this.
    pub max_spread: u8,
    /// Mean of R, G, B must be strictly above this.
    pub min_mean: u8,
}

impl Default for GrayMaskParams {
    fn default() -> Self {
        Self {
            max_spread: 15,
            min_mean: 230,
        }
    }
}

/// Whether all three color channels are at or above `threshold`.
///
/// This is a per-channel AND, not a brightness average: pure red never
/// qualifies no matter how bright its mean is.
#[inline]
#[must_use]
pub fn is_white(px: &Rgba<u8>, threshold: u8) -> bool {
    px[0] >= threshold && px[1] >= threshold && px[2] >= threshold
}

/// Whether the pixel is a bright, nearly colorless gray.
#[inline]
#[must_use]
pub fn is_near_gray(px: &Rgba<u8>, params: GrayMaskParams) -> bool {
    let [r, g, b, _] = px.0;
    let spread = r.max(g).max(b) - r.min(g).min(b);
    // mean > min_mean  <=>  sum > 3 * min_mean, without leaving integers
    let sum = u16::from(r) + u16::from(g) + u16::from(b);
    spread < params.max_spread && sum > 3 * u16::from(params.min_mean)
}

/// A boolean grid with the dimensions of its source image.
///
/// `true` marks a background pixel that must become transparent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl BackgroundMask {
    /// Evaluate `predicate` on every pixel of `image`.
    pub fn from_fn<F>(image: &RgbaImage, predicate: F) -> Self
    where
        F: FnMut(&Rgba<u8>) -> bool,
    {
        Self {
            width: image.width(),
            height: image.height(),
            bits: image.pixels().map(predicate).collect(),
        }
    }

    /// Mask of pixels whose channels are all at or above `threshold`.
    #[must_use]
    pub fn white(image: &RgbaImage, threshold: u8) -> Self {
        Self::from_fn(image, |px| is_white(px, threshold))
    }

    /// Union of the plain-white, edge-white and near-gray masks.
    #[must_use]
    pub fn aggressive(
        image: &RgbaImage,
        white_threshold: u8,
        edge_threshold: u8,
        gray: GrayMaskParams,
    ) -> Self {
        let plain = Self::white(image, white_threshold);
        let edge = Self::white(image, edge_threshold);
        let near_gray = Self::from_fn(image, |px| is_near_gray(px, gray));
        plain.union(&edge).union(&near_gray)
    }

    /// Logical OR of two masks of equal dimensions.
    ///
    /// # Panics
    ///
    /// Panics if the masks were built from images of different sizes.
    #[must_use]
    pub fn union(mut self, other: &Self) -> Self {
        assert_eq!(
            (self.width, self.height),
            (other.width, other.height),
            "mask dimensions differ"
        );
        for (a, &b) in self.bits.iter_mut().zip(&other.bits) {
            *a |= b;
        }
        self
    }

    /// Whether the pixel at `(x, y)` is background.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.bits[(y as usize) * (self.width as usize) + x as usize]
    }

    /// Number of background pixels.
    #[must_use]
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Overwrite every background pixel of `image` with [`TRANSPARENT_WHITE`].
    ///
    /// Returns the number of pixels changed to transparent.
    ///
    /// # Panics
    ///
    /// Panics if `image` does not have the mask's dimensions.
    pub fn apply(&self, image: &mut RgbaImage) -> usize {
        assert_eq!(
            image.dimensions(),
            (self.width, self.height),
            "mask and image dimensions differ"
        );
        let mut cleared = 0;
        for (px, &background) in image.pixels_mut().zip(&self.bits) {
            if background {
                *px = TRANSPARENT_WHITE;
                cleared += 1;
            }
        }
        cleared
    }
}
