//! The error type returned by the pipeline and the pixel buffer constructors.

use thiserror::Error;

/// Errors that abort a processing request without producing output.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The Game Boy Color can only hold a limited number of background palettes.
    #[error("cannot use {requested} palettes in Game Boy Color mode, the maximum is {max}")]
    TooManyPalettes {
        /// The number of palettes implied by the palette grid.
        requested: u32,
        /// The maximum number of palettes supported.
        max: u32,
    },

    /// The length of a pixel vector does not match the given dimensions.
    #[error("pixel buffer length {len} does not match dimensions {width}x{height}")]
    DimensionMismatch {
        /// The number of pixels provided.
        len: usize,
        /// The requested width.
        width: u32,
        /// The requested height.
        height: u32,
    },

    /// The source image or the requested output has no pixels.
    #[error("image dimensions cannot be zero")]
    ZeroDimension,

    /// A palette size of zero or above [`MAX_COLORS`](crate::MAX_COLORS).
    #[error("palette size must be between 1 and {max}, got {value}")]
    InvalidPaletteSize {
        /// The rejected palette size.
        value: u16,
        /// The maximum supported palette size.
        max: u8,
    },

    /// Failure while encoding or decoding an image file.
    #[cfg(feature = "image")]
    #[error(transparent)]
    Image(#[from] image::ImageError),
}
