//! Bounding box and margin-aware cropping.

use image::{imageops, RgbaImage};

/// A half-open pixel rectangle: columns `left..right`, rows `top..bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// First column inside the rectangle.
    pub left: u32,
    /// First row inside the rectangle.
    pub top: u32,
    /// One past the last column.
    pub right: u32,
    /// One past the last row.
    pub bottom: u32,
}

impl Rect {
    /// Rectangle width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    /// Rectangle height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    /// Grow by `margin` on every side, clamped to `[0, width) x [0, height)`.
    #[must_use]
    pub fn expand(self, margin: u32, width: u32, height: u32) -> Self {
        Self {
            left: self.left.saturating_sub(margin),
            top: self.top.saturating_sub(margin),
            right: self.right.saturating_add(margin).min(width),
            bottom: self.bottom.saturating_add(margin).min(height),
        }
    }
}

/// Minimal rectangle containing every pixel with non-zero alpha.
///
/// Returns `None` when the image is fully transparent.
#[must_use]
pub fn content_bounds(image: &RgbaImage) -> Option<Rect> {
    let mut bounds: Option<Rect> = None;
    for (x, y, px) in image.enumerate_pixels() {
        if px[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => Rect {
                left: x,
                top: y,
                right: x + 1,
                bottom: y + 1,
            },
            Some(r) => Rect {
                left: r.left.min(x),
                top: r.top.min(y),
                right: r.right.max(x + 1),
                bottom: r.bottom.max(y + 1),
            },
        });
    }
    bounds
}

/// Crop rectangle for `image`: content bounds expanded by `margin`.
#[must_use]
pub fn crop_rect(image: &RgbaImage, margin: u32) -> Option<Rect> {
    content_bounds(image).map(|r| r.expand(margin, image.width(), image.height()))
}

/// Trim `image` to its content plus `margin`.
///
/// A fully transparent image is returned unchanged.
#[must_use]
pub fn trim(image: RgbaImage, margin: u32) -> RgbaImage {
    match crop_rect(&image, margin) {
        Some(rect) => {
            log::debug!(
                "cropping {}x{} to {}x{} at ({}, {})",
                image.width(),
                image.height(),
                rect.width(),
                rect.height(),
                rect.left,
                rect.top
            );
            imageops::crop_imm(&image, rect.left, rect.top, rect.width(), rect.height())
                .to_image()
        }
        None => {
            log::debug!("no opaque content, keeping full frame");
            image
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn with_opaque(width: u32, height: u32, points: &[(u32, u32)]) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 0]));
        for &(x, y) in points {
            img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
        }
        img
    }

    #[test]
    fn bounds_are_half_open() {
        let img = with_opaque(10, 8, &[(2, 3), (6, 5)]);
        let r = content_bounds(&img).unwrap();
        assert_eq!(
            r,
            Rect {
                left: 2,
                top: 3,
                right: 7,
                bottom: 6
            }
        );
        assert_eq!((r.width(), r.height()), (5, 3));
    }

    #[test]
    fn transparent_image_has_no_bounds() {
        let img = with_opaque(4, 4, &[]);
        assert!(content_bounds(&img).is_none());
        assert_eq!(trim(img, 2).dimensions(), (4, 4));
    }

    #[test]
    fn partial_alpha_counts_as_content() {
        let mut img = with_opaque(5, 5, &[]);
        img.put_pixel(1, 1, Rgba([9, 9, 9, 1]));
        assert_eq!(content_bounds(&img).map(|r| (r.left, r.top)), Some((1, 1)));
    }

    #[test]
    fn margin_is_clamped_to_image() {
        let img = with_opaque(10, 10, &[(0, 0), (9, 1)]);
        let r = crop_rect(&img, 3).unwrap();
        assert_eq!(
            r,
            Rect {
                left: 0,
                top: 0,
                right: 10,
                bottom: 5
            }
        );
        assert!(r.left <= r.right && r.right <= img.width());
        assert!(r.top <= r.bottom && r.bottom <= img.height());
    }

    #[test]
    fn trim_never_expands() {
        let img = with_opaque(7, 3, &[(3, 1)]);
        let out = trim(img, 100);
        assert_eq!(out.dimensions(), (7, 3));

        let img = with_opaque(7, 3, &[(3, 1)]);
        let out = trim(img, 0);
        assert_eq!(out.dimensions(), (1, 1));
        assert_eq!(out.get_pixel(0, 0)[3], 255);
    }
}
