//! Remove near-white backgrounds from card scans and trim them to their content.
//!
//! Background pixels are classified per channel, made transparent, and the
//! image is cropped to the bounding box of what remains (plus a margin). The
//! result is written as a size-optimized PNG.
//!
//! # Quick Start
//!
//! ```no_run
//! use card_image_cleaner::{remove_background, BasicOptions};
//!
//! let img = image::open("card.jpg").unwrap().to_rgba8();
//! let cleaned = remove_background(img, &BasicOptions::default());
//! card_image_cleaner::save_png(&cleaned, "card.png".as_ref()).unwrap();
//! ```
//!
//! # Aggressive removal
//!
//! Scans with JPEG artifacts or shaded edges can be run through
//! [`remove_background_aggressive`], which blurs slightly, unions three
//! background predicates and drops isolated opaque specks before trimming.
//!
//! # Batch passes
//!
//! [`batch::run_basic_pass`] converts a directory of scans to PNGs, skipping
//! those already converted. [`batch::run_aggressive_pass`] rewrites existing
//! PNGs in place through a temporary file.

#![deny(missing_docs)]

pub mod batch;
pub mod crop;
mod engine;
pub mod error;
pub mod mask;
pub mod morphology;

pub use engine::{
    default_output_path, has_extension, is_temp_file, load_rgba, output_path_for, process_file,
    remove_background, remove_background_aggressive, save_png, temp_path_for, AggressiveOptions,
    BasicOptions, Remover, Trimmed,
};
pub use error::{Error, Result};
