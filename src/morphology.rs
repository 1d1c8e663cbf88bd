//! Morphological cleanup of isolated opaque pixels.
//!
//! After masking, JPEG noise can leave specks of one or two opaque pixels in an
//! otherwise transparent background. A binary opening (erosion followed by
//! dilation) of the opaque mask removes them while preserving contiguous regions.

use image::{GrayImage, Luma, RgbaImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// Shape of the 3x3 structuring element used by the opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StructuringElement {
    /// Full 3x3 square (8-connected). Rectangular regions survive unchanged.
    #[default]
    Square,
    /// 3x3 cross (4-connected). Also rounds off the corners of regions.
    Cross,
}

impl StructuringElement {
    fn norm(self) -> Norm {
        match self {
            Self::Square => Norm::LInf,
            Self::Cross => Norm::L1,
        }
    }
}

/// Build a binary mask that is 255 where the pixel has any opacity.
#[must_use]
pub fn opaque_mask(image: &RgbaImage) -> GrayImage {
    let mut mask = GrayImage::new(image.width(), image.height());
    for (src, dst) in image.pixels().zip(mask.pixels_mut()) {
        *dst = Luma([if src[3] > 0 { 255 } else { 0 }]);
    }
    mask
}

/// One iteration of binary opening of the opaque mask.
#[must_use]
pub fn open_mask(mask: &GrayImage, element: StructuringElement) -> GrayImage {
    morphology::open(mask, element.norm(), 1)
}

/// Clear alpha on opaque pixels that do not survive an opening of the opaque mask.
///
/// RGB values are left untouched. Returns the number of pixels cleared.
pub fn remove_specks(image: &mut RgbaImage, element: StructuringElement) -> usize {
    let opaque = opaque_mask(image);
    let opened = open_mask(&opaque, element);

    let mut cleared = 0;
    for ((px, before), after) in image.pixels_mut().zip(opaque.pixels()).zip(opened.pixels()) {
        if before[0] > 0 && after[0] == 0 {
            px[3] = 0;
            cleared += 1;
        }
    }
    cleared
}
