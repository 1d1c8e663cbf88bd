//! Background removal pipelines and per-file processing.

use std::fs;
use std::path::{Path, PathBuf};

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, ImageReader, RgbaImage};

use crate::crop;
use crate::error::{Error, Result};
use crate::mask::{BackgroundMask, GrayMaskParams};
use crate::morphology::{self, StructuringElement};

/// Options for the basic remover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicOptions {
    /// Pixels with R, G and B all at or above this become transparent.
    pub white_threshold: u8,
    /// Pixels kept around the content when trimming.
    pub margin: u32,
}

impl Default for BasicOptions {
    fn default() -> Self {
        Self {
            white_threshold: 230,
            margin: 2,
        }
    }
}

/// Options for the aggressive remover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggressiveOptions {
    /// Threshold of the plain-white mask.
    pub white_threshold: u8,
    /// Threshold of the edge-white mask.
    pub edge_threshold: u8,
    /// Pixels kept around the content when trimming.
    pub margin: u32,
    /// Gaussian blur sigma applied before classification, `None` to skip.
    pub blur_sigma: Option<f32>,
    /// Near-gray predicate parameters.
    pub gray: GrayMaskParams,
    /// Structuring element of the speck-removing opening.
    pub structuring_element: StructuringElement,
}

impl Default for AggressiveOptions {
    fn default() -> Self {
        Self {
            white_threshold: 220,
            edge_threshold: 240,
            margin: 0,
            blur_sigma: Some(0.5),
            gray: GrayMaskParams::default(),
            structuring_element: StructuringElement::default(),
        }
    }
}

impl AggressiveOptions {
    /// Check that the options can be applied to an image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOption`] if the blur sigma is not a positive finite number.
    pub fn validate(&self) -> Result<()> {
        match self.blur_sigma {
            Some(sigma) if !(sigma.is_finite() && sigma > 0.0) => Err(Error::InvalidOption(
                format!("blur sigma must be positive, got {sigma}"),
            )),
            _ => Ok(()),
        }
    }
}

/// Which background remover to run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Remover {
    /// Single white-threshold mask, then trim.
    Basic(BasicOptions),
    /// Blur, union of three masks, speck cleanup, then trim.
    Aggressive(AggressiveOptions),
}

impl Remover {
    /// Run the remover on an in-memory image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOption`] if the aggressive options are invalid.
    pub fn apply(&self, image: RgbaImage) -> Result<RgbaImage> {
        match self {
            Self::Basic(opts) => Ok(remove_background(image, opts)),
            Self::Aggressive(opts) => remove_background_aggressive(&image, opts),
        }
    }
}

/// Dimensions before and after processing a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trimmed {
    /// Input width and height.
    pub input: (u32, u32),
    /// Output width and height.
    pub output: (u32, u32),
}

/// Make near-white pixels transparent and trim to the remaining content.
#[must_use]
pub fn remove_background(mut image: RgbaImage, opts: &BasicOptions) -> RgbaImage {
    let mask = BackgroundMask::white(&image, opts.white_threshold);
    let cleared = mask.apply(&mut image);
    log::debug!(
        "cleared {cleared} background pixels at threshold {}",
        opts.white_threshold
    );
    crop::trim(image, opts.margin)
}

/// Stronger removal for images with anti-aliased or JPEG-artifact edges.
///
/// The returned pixels come from the blurred image.
///
/// # Errors
///
/// Returns [`Error::InvalidOption`] if `opts` fails [`AggressiveOptions::validate`].
pub fn remove_background_aggressive(
    image: &RgbaImage,
    opts: &AggressiveOptions,
) -> Result<RgbaImage> {
    opts.validate()?;

    let mut work = match opts.blur_sigma {
        Some(sigma) => imageproc::filter::gaussian_blur_f32(image, sigma),
        None => image.clone(),
    };

    let mask = BackgroundMask::aggressive(
        &work,
        opts.white_threshold,
        opts.edge_threshold,
        opts.gray,
    );
    let cleared = mask.apply(&mut work);
    let specks = morphology::remove_specks(&mut work, opts.structuring_element);
    log::debug!("cleared {cleared} background pixels and {specks} isolated pixels");

    Ok(crop::trim(work, opts.margin))
}

/// Load an image from disk as RGBA, synthesizing opaque alpha when absent.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the file cannot be opened or decoded.
pub fn load_rgba(path: &Path) -> Result<RgbaImage> {
    let decode = |source| Error::Decode {
        path: path.to_path_buf(),
        source,
    };
    let reader = ImageReader::open(path)
        .and_then(ImageReader::with_guessed_format)
        .map_err(|e| decode(image::ImageError::IoError(e)))?;
    Ok(reader.decode().map_err(decode)?.to_rgba8())
}

/// Encode `image` as a size-optimized PNG and write it to `path`.
///
/// The file is written only after encoding succeeds; a failed write removes
/// whatever was partially written.
///
/// # Errors
///
/// Returns [`Error::Encode`] if encoding fails or [`Error::Io`] if writing fails.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<()> {
    let mut buf = Vec::new();
    PngEncoder::new_with_quality(&mut buf, CompressionType::Best, FilterType::Adaptive)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|source| Error::Encode {
            path: path.to_path_buf(),
            source,
        })?;

    if let Err(e) = fs::write(path, &buf) {
        if path.exists() {
            if let Err(cleanup) = fs::remove_file(path) {
                log::warn!("failed to remove partial output {}: {cleanup}", path.display());
            }
        }
        return Err(e.into());
    }
    Ok(())
}

/// Load, clean and save a single file.
///
/// # Errors
///
/// Returns the first decode, option, encode or write error. No output is
/// left behind on failure.
pub fn process_file(input: &Path, output: &Path, remover: &Remover) -> Result<Trimmed> {
    let image = load_rgba(input)?;
    let input_dims = image.dimensions();
    let cleaned = remover.apply(image)?;
    save_png(&cleaned, output)?;
    Ok(Trimmed {
        input: input_dims,
        output: cleaned.dimensions(),
    })
}

/// Whether `path` has extension `ext`, compared case-insensitively.
#[must_use]
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Sibling output path: `card.jpg` becomes `card.png` for target `png`.
#[must_use]
pub fn output_path_for(input: &Path, target_ext: &str) -> PathBuf {
    input.with_extension(target_ext)
}

/// Temporary sibling used while rewriting in place: `card.png` becomes `card.tmp.png`.
#[must_use]
pub fn temp_path_for(path: &Path) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let ext = path.extension().unwrap_or_default().to_string_lossy();
    path.with_file_name(format!("{stem}.tmp.{ext}"))
}

/// Whether `path` is a leftover temporary file from an interrupted rewrite.
#[must_use]
pub fn is_temp_file(path: &Path) -> bool {
    Path::new(path.file_stem().unwrap_or_default())
        .extension()
        .is_some_and(|e| e == "tmp")
}

/// Output path for a single-file run.
///
/// `card.jpg` becomes `card.png`; a PNG input becomes `card_cleaned.png` so it is
/// never overwritten.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    if has_extension(input, "png") {
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        input.with_file_name(format!("{stem}_cleaned.png"))
    } else {
        output_path_for(input, "png")
    }
}
