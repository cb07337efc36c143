//! Contains various types needed across the crate.

use crate::{ProcessError, MAX_COLORS};
use palette::{cast, Srgba};
use std::{fmt::Display, num::NonZeroU8, ops::Deref};
#[cfg(feature = "image")]
use {
    image::{ImageFormat, RgbImage, RgbaImage},
    palette::{
        cast::{ComponentsAs, IntoComponents},
        Srgb, WithAlpha,
    },
    std::path::Path,
};

/// A single 8-bit RGBA color.
pub type Pixel = Srgba<u8>;

/// The fully transparent color appended to palettes of images that contain transparency.
pub const TRANSPARENT: Pixel = Pixel::new(0, 0, 0, 0);

/// A row-major 2D array of [`Pixel`]s.
///
/// Each stage of the pipeline produces a new [`PixelBuffer`] instead of modifying its input.
///
/// # Examples
/// ```
/// # use pixquant::{Pixel, PixelBuffer};
/// # fn main() -> Result<(), pixquant::ProcessError> {
/// let pixels = vec![Pixel::new(0, 0, 0, 255); 6];
/// let buffer = PixelBuffer::new(3, 2, pixels)?;
/// assert_eq!(buffer.get(2, 1), Some(Pixel::new(0, 0, 0, 255)));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// The width of the image in pixels.
    width: u32,
    /// The height of the image in pixels.
    height: u32,
    /// The pixels in row-major order.
    pixels: Vec<Pixel>,
}

impl PixelBuffer {
    /// Creates a new [`PixelBuffer`].
    ///
    /// Returns an error if the length of `pixels` is not equal to `width * height`.
    pub fn new(width: u32, height: u32, pixels: Vec<Pixel>) -> Result<Self, ProcessError> {
        if pixels.len() == width as usize * height as usize {
            Ok(Self::new_unchecked(width, height, pixels))
        } else {
            Err(ProcessError::DimensionMismatch {
                len: pixels.len(),
                width,
                height,
            })
        }
    }

    /// Creates a new [`PixelBuffer`] without checking the length of `pixels`.
    pub(crate) fn new_unchecked(width: u32, height: u32, pixels: Vec<Pixel>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize);
        Self { width, height, pixels }
    }

    /// Creates a [`PixelBuffer`] where every pixel is `color`.
    pub fn filled(width: u32, height: u32, color: Pixel) -> Result<Self, ProcessError> {
        Self::new(width, height, vec![color; width as usize * height as usize])
    }

    /// Returns the width of the image.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the image.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Returns `(width, height)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether or not the image has no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Returns the pixels in row-major order.
    #[must_use]
    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Consumes the buffer and returns its pixels.
    #[must_use]
    pub fn into_pixels(self) -> Vec<Pixel> {
        self.pixels
    }

    /// Returns the pixel at `(x, y)` or `None` if it is out of bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<Pixel> {
        if x < self.width && y < self.height {
            Some(self.pixels[self.index(x, y)])
        } else {
            None
        }
    }

    /// The index into `pixels` of the pixel at `(x, y)`.
    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Copies out the rectangle starting at `(x, y)` with the given size.
    ///
    /// The rectangle is clipped to the bounds of the image.
    #[must_use]
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Self {
        let x = x.min(self.width);
        let y = y.min(self.height);
        let width = width.min(self.width - x);
        let height = height.min(self.height - y);

        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for row in y..(y + height) {
            let start = self.index(x, row);
            pixels.extend_from_slice(&self.pixels[start..(start + width as usize)]);
        }

        Self::new_unchecked(width, height, pixels)
    }

    /// Copies `tile` into this buffer with its top left corner at `(x, y)`.
    ///
    /// Parts of `tile` that fall outside of the image are ignored.
    pub fn paste(&mut self, x: u32, y: u32, tile: &PixelBuffer) {
        let width = tile.width.min(self.width.saturating_sub(x)) as usize;
        for row in 0..tile.height.min(self.height.saturating_sub(y)) {
            let dst = self.index(x, y + row);
            let src = tile.index(0, row);
            self.pixels[dst..(dst + width)].copy_from_slice(&tile.pixels[src..(src + width)]);
        }
    }

    /// Enlarges the image by an integer `factor`, turning every pixel into a `factor`x`factor` block.
    ///
    /// A factor of `0` is treated as `1`.
    #[must_use]
    pub fn upscale(&self, factor: u32) -> Self {
        let factor = factor.max(1);
        if factor == 1 {
            return self.clone();
        }

        let width = self.width * factor;
        let height = self.height * factor;
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for row in self.pixels.chunks_exact(self.width.max(1) as usize) {
            let start = pixels.len();
            for &pixel in row {
                pixels.extend(std::iter::repeat(pixel).take(factor as usize));
            }
            for _ in 1..factor {
                pixels.extend_from_within(start..(start + width as usize));
            }
        }

        Self::new_unchecked(width, height, pixels)
    }
}

#[cfg(feature = "image")]
impl From<&RgbaImage> for PixelBuffer {
    fn from(image: &RgbaImage) -> Self {
        let pixels: &[Pixel] = image.as_raw().as_slice().components_as();
        Self::new_unchecked(image.width(), image.height(), pixels.to_vec())
    }
}

#[cfg(feature = "image")]
impl From<&RgbImage> for PixelBuffer {
    fn from(image: &RgbImage) -> Self {
        let pixels: &[Srgb<u8>] = image.as_raw().as_slice().components_as();
        let pixels = pixels.iter().map(|srgb| srgb.with_alpha(u8::MAX)).collect();
        Self::new_unchecked(image.width(), image.height(), pixels)
    }
}

#[cfg(feature = "image")]
impl PixelBuffer {
    /// Converts the buffer into an [`RgbaImage`].
    pub fn into_rgba_image(self) -> Result<RgbaImage, ProcessError> {
        let Self { width, height, pixels } = self;
        let len = pixels.len();
        RgbaImage::from_raw(width, height, pixels.into_components()).ok_or(
            ProcessError::DimensionMismatch { len, width, height },
        )
    }

    /// Upscales the image by `upscale` (see [`PixelBuffer::upscale`]) and saves it as a PNG file.
    pub fn save_png(&self, path: impl AsRef<Path>, upscale: u32) -> Result<(), ProcessError> {
        let image = self.upscale(upscale).into_rgba_image()?;
        image.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}

/// This type is used to specify the number of colors to include in a palette.
///
/// This is a simple new type wrapper around a nonzero `u8`,
/// so the maximum palette size is [`MAX_COLORS`].
///
/// # Examples
/// ```
/// # use pixquant::PaletteSize;
/// # fn main() -> Result<(), pixquant::ProcessError> {
/// let size = PaletteSize::try_from(16u16)?;
/// let size = PaletteSize::from_clamped(1024);
/// assert_eq!(size, PaletteSize::MAX);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PaletteSize(NonZeroU8);

impl PaletteSize {
    /// The maximum supported palette size (given by [`MAX_COLORS`]).
    pub const MAX: Self = Self(NonZeroU8::MAX);

    /// Creates a new [`PaletteSize`], returning `None` if `value` is zero.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        match NonZeroU8::new(value) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Creates a [`PaletteSize`] by clamping the given `u16` to `1..=MAX_COLORS`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_clamped(value: u16) -> Self {
        if value == 0 {
            Self(NonZeroU8::MIN)
        } else if value >= MAX_COLORS as u16 {
            Self::MAX
        } else {
            match NonZeroU8::new(value as u8) {
                Some(value) => Self(value),
                None => Self(NonZeroU8::MIN),
            }
        }
    }

    /// Gets the inner value.
    #[must_use]
    pub const fn into_inner(self) -> u8 {
        self.0.get()
    }

    /// Gets the inner value as a `usize` for `Vec` lengths.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0.get() as usize
    }
}

impl From<NonZeroU8> for PaletteSize {
    fn from(value: NonZeroU8) -> Self {
        Self(value)
    }
}

impl From<PaletteSize> for u8 {
    fn from(val: PaletteSize) -> Self {
        val.into_inner()
    }
}

impl TryFrom<u16> for PaletteSize {
    type Error = ProcessError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or(ProcessError::InvalidPaletteSize { value, max: MAX_COLORS })
    }
}

impl Display for PaletteSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.into_inner())
    }
}

/// An ordered list of palette colors.
///
/// Palettes produced by [`kmeans::cluster`](crate::kmeans::cluster) hold exactly `k` colors,
/// plus one trailing [`TRANSPARENT`] entry if the clustered pixels contained transparency.
/// The colors are not guaranteed to be unique.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct Palette(Vec<Pixel>);

impl Palette {
    /// Creates a new [`Palette`] from a list of colors.
    #[must_use]
    pub fn new(colors: Vec<Pixel>) -> Self {
        Self(colors)
    }

    /// Creates a new [`Palette`] from component arrays.
    #[must_use]
    pub fn from_arrays(colors: Vec<[u8; 4]>) -> Self {
        Self(cast::from_array_vec(colors))
    }

    /// Returns the colors of the palette.
    #[must_use]
    pub fn colors(&self) -> &[Pixel] {
        &self.0
    }

    /// Consumes the palette and returns its colors.
    #[must_use]
    pub fn into_inner(self) -> Vec<Pixel> {
        self.0
    }

    /// Whether or not the palette contains the [`TRANSPARENT`] color.
    #[must_use]
    pub fn has_transparency(&self) -> bool {
        self.0.contains(&TRANSPARENT)
    }
}

impl Deref for Palette {
    type Target = [Pixel];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Pixel>> for Palette {
    fn from(colors: Vec<Pixel>) -> Self {
        Self(colors)
    }
}

impl From<Palette> for Vec<Pixel> {
    fn from(palette: Palette) -> Self {
        palette.into_inner()
    }
}

/// The color channels that take part in nearest color comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Channels {
    /// Compare red, green and blue only.
    #[default]
    Rgb,
    /// Compare red, green, blue and alpha.
    Rgba,
}

impl Channels {
    /// Alpha only matters if the palette carries the transparency entry.
    #[must_use]
    pub fn for_palette(palette: &Palette) -> Self {
        if palette.has_transparency() {
            Self::Rgba
        } else {
            Self::Rgb
        }
    }

    /// Like [`Channels::for_palette`], but for a set of candidate palettes.
    #[must_use]
    pub fn for_palettes(palettes: &[Palette]) -> Self {
        if palettes.iter().any(Palette::has_transparency) {
            Self::Rgba
        } else {
            Self::Rgb
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tests::*;

    #[test]
    fn dimension_mismatch() {
        let result = PixelBuffer::new(3, 3, vec![rgb(0, 0, 0); 8]);
        assert!(matches!(
            result,
            Err(ProcessError::DimensionMismatch { len: 8, width: 3, height: 3 })
        ));
    }

    #[test]
    fn crop_and_paste_are_inverse() {
        let image = test_image_64();
        let tile = image.crop(8, 16, 8, 8);
        assert_eq!(tile.dimensions(), (8, 8));
        assert_eq!(tile.get(0, 0), image.get(8, 16));
        assert_eq!(tile.get(7, 7), image.get(15, 23));

        let mut blank = PixelBuffer::filled(64, 64, TRANSPARENT).unwrap();
        blank.paste(8, 16, &tile);
        assert_eq!(blank.crop(8, 16, 8, 8), tile);
        assert_eq!(blank.get(7, 16), Some(TRANSPARENT));
    }

    #[test]
    fn crop_is_clipped() {
        let image = test_image_64();
        let tile = image.crop(60, 60, 8, 8);
        assert_eq!(tile.dimensions(), (4, 4));
    }

    #[test]
    fn upscale_repeats_pixels() {
        let image = bands(2, 1, &[rgb(255, 0, 0), rgb(0, 0, 255)]);
        let big = image.upscale(3);
        assert_eq!(big.dimensions(), (6, 3));
        for y in 0..3 {
            for x in 0..3 {
                assert_eq!(big.get(x, y), Some(rgb(255, 0, 0)));
                assert_eq!(big.get(x + 3, y), Some(rgb(0, 0, 255)));
            }
        }
        assert_eq!(image.upscale(0), image);
    }

    #[test]
    fn palette_size_bounds() {
        assert!(PaletteSize::try_from(0u16).is_err());
        assert!(PaletteSize::try_from(256u16).is_err());
        assert_eq!(PaletteSize::try_from(255u16).unwrap(), PaletteSize::MAX);
        assert_eq!(PaletteSize::from_clamped(0).into_inner(), 1);
        assert_eq!(PaletteSize::from_clamped(7).into_inner(), 7);
    }

    #[test]
    fn transparency_detection() {
        let opaque = Palette::new(vec![rgb(0, 0, 0), rgb(10, 10, 10)]);
        let transparent = Palette::new(vec![rgb(0, 0, 0), TRANSPARENT]);
        assert_eq!(Channels::for_palette(&opaque), Channels::Rgb);
        assert_eq!(Channels::for_palette(&transparent), Channels::Rgba);
        assert_eq!(Channels::for_palettes(&[opaque, transparent]), Channels::Rgba);
    }
}
