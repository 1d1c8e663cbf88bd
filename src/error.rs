//! Error types for the card-image-cleaner crate.

use std::path::PathBuf;

/// Errors that can occur while cleaning card images.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input file could not be read or is not a valid raster.
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        /// File that failed to decode.
        path: PathBuf,
        /// Underlying decoder error.
        source: image::ImageError,
    },

    /// The output image could not be encoded.
    #[error("failed to encode {}: {source}", path.display())]
    Encode {
        /// Destination that was being encoded.
        path: PathBuf,
        /// Underlying encoder error.
        source: image::ImageError,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The card image directory does not exist.
    #[error("card image directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// The directory holds no files with the expected extension.
    #[error("no {extension} files found in {}", dir.display())]
    NoMatchingFiles {
        /// Directory that was scanned.
        dir: PathBuf,
        /// Extension that was searched for.
        extension: String,
    },

    /// A processed temporary file could not be moved over its original.
    #[error("failed to replace {}: {source}", path.display())]
    Replace {
        /// File that should have been replaced.
        path: PathBuf,
        /// Underlying filesystem error.
        source: std::io::Error,
    },

    /// A processing option is out of range.
    #[error("invalid option: {0}")]
    InvalidOption(String),
}

impl Error {
    /// Whether this error ends a whole batch run rather than a single file.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingDirectory(_) | Self::NoMatchingFiles { .. } | Self::InvalidOption(_)
        )
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let io_err = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io_err.to_string().contains("gone"));

        let missing = Error::MissingDirectory(PathBuf::from("public/card_image"));
        assert!(missing.to_string().contains("public/card_image"));

        let empty = Error::NoMatchingFiles {
            dir: PathBuf::from("cards"),
            extension: "jpg".to_string(),
        };
        let msg = empty.to_string();
        assert!(msg.contains("jpg"));
        assert!(msg.contains("cards"));

        let replace = Error::Replace {
            path: PathBuf::from("a.png"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = replace.to_string();
        assert!(msg.contains("a.png"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn configuration_errors_are_classified() {
        assert!(Error::MissingDirectory(PathBuf::from("x")).is_configuration());
        assert!(Error::InvalidOption("sigma".to_string()).is_configuration());
        assert!(!Error::Io(std::io::Error::other("boom")).is_configuration());
    }
}
