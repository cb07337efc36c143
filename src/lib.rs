//! A library for reducing images to small color palettes and pixel-art style output.
//!
//! `pixquant` clusters the colors of an image with a frequency-weighted k-means,
//! optionally limits the bit depth of the resulting palette, and substitutes every output pixel
//! with its nearest palette color. In tiled mode, one palette is computed for each region of a
//! grid laid over the image, and every output tile picks whichever palette represents it best.
//! Tiled results can be encoded into Game Boy Color tile, palette and map data.
//!
//! # Features
//! - `threads`: exposes parallel versions of the pipeline via [`rayon`].
//! - `image`: enables integration with the [`image`] crate.
//!
//! # Example
//! ```
//! # use pixquant::{process, Mode, PaletteSize, PixelBuffer, Pixel, ProcessOptions};
//! # fn main() -> Result<(), pixquant::ProcessError> {
//! let source = PixelBuffer::filled(64, 64, Pixel::new(200, 40, 40, 255))?;
//!
//! let options = ProcessOptions::new()
//!     .palette_size(PaletteSize::from_clamped(4))
//!     .fidelity(6)
//!     .output_size(32, 32)
//!     .mode(Mode::Default);
//!
//! let result = process(&source, &options)?;
//! assert_eq!(result.image.width(), 32);
//! # Ok(())
//! # }
//! ```
//!
//! For Game Boy Color output, start from [`ProcessOptions::game_boy_color`]
//! and pass the result to [`gbc::encode`].

#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::pedantic,
    clippy::cargo,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,
    clippy::unwrap_in_result,
    clippy::expect_used,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice,
    missing_docs,
    clippy::missing_docs_in_private_items,
    rustdoc::all,
    clippy::float_cmp_const,
    clippy::lossy_float_literal
)]
#![allow(
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::many_single_char_names,
    clippy::missing_panics_doc,
    clippy::unreadable_literal,
    clippy::wildcard_imports
)]

mod api;
mod color_counts;
mod error;
mod nearest;
mod traits;
mod types;

pub mod gbc;
pub mod kmeans;
pub mod requantize;
pub mod select;

pub use api::*;
pub use color_counts::*;
pub use error::ProcessError;
pub use requantize::RgbBits;
pub use traits::*;
pub use types::*;

/// The maximum supported number of palette colors is `255`,
/// which leaves room for the transparency entry inside a `u8` index.
pub const MAX_COLORS: u8 = u8::MAX;

/// Pixels with an alpha value below this threshold are treated as fully transparent.
pub const ALPHA_THRESHOLD: u8 = 127;
