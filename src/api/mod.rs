//! Contains the processing options and the high level pipeline.

mod geometry;
mod pipeline;

pub use pipeline::{process, process_canvas, PaletteMap, QuantizationResult};
#[cfg(feature = "threads")]
pub use pipeline::{process_canvas_par, process_par};

use crate::{kmeans::KmeansOptions, PaletteSize, RgbBits};

/// How palettes are computed and assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// A single palette for the whole image.
    #[default]
    Default,
    /// One palette per region of a grid laid over the image,
    /// with each output tile using whichever palette fits it best.
    Tiled,
}

/// Target hardware restrictions to check the output against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compatibility {
    /// No restrictions.
    #[default]
    Default,
    /// Game Boy Color background restrictions: at most 8 palettes of 4 colors,
    /// and a 160x144 screen made of 8x8 tiles.
    GameBoyColor,
}

/// A builder struct to specify the parameters of [`process`].
///
/// # Examples
/// ```
/// # use pixquant::{Mode, PaletteSize, ProcessOptions, RgbBits};
/// let options = ProcessOptions::new()
///     .palette_size(PaletteSize::from_clamped(8))
///     .rgb_bits(RgbBits::new(5, 6, 5))
///     .mode(Mode::Tiled)
///     .tile_size(16, 16)
///     .palettes_grid_size(2, 2);
/// ```
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOptions {
    /// The number of colors per palette.
    pub(crate) palette_size: PaletteSize,
    /// The bit depth palettes are reduced to.
    pub(crate) rgb_bits: RgbBits,
    /// Parameters for each k-means run.
    pub(crate) kmeans: KmeansOptions,
    /// Default or tiled processing.
    pub(crate) mode: Mode,
    /// Hardware restrictions.
    pub(crate) compatibility: Compatibility,
    /// Tile width and height in pixels.
    pub(crate) tile_size: (u32, u32),
    /// Output width and height in pixels.
    pub(crate) output_size: (u32, u32),
    /// Number of palette regions along x and y.
    pub(crate) palettes_grid_size: (u32, u32),
    /// Pixel budget for the clustering sample of a single palette.
    pub(crate) max_sample_pixels: u32,
    /// Pixel budget for a tile when choosing its palette.
    pub(crate) max_tile_sample_pixels: u32,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessOptions {
    /// Creates a new [`ProcessOptions`] with default values.
    pub const fn new() -> Self {
        Self {
            palette_size: PaletteSize::from_clamped(4),
            rgb_bits: RgbBits::UNLIMITED,
            kmeans: KmeansOptions::new(),
            mode: Mode::Default,
            compatibility: Compatibility::Default,
            tile_size: (32, 32),
            output_size: (256, 256),
            palettes_grid_size: (4, 2),
            max_sample_pixels: 128 * 128,
            max_tile_sample_pixels: 16 * 16,
        }
    }

    /// Options for a Game Boy Color background: 8 palettes of 4 colors with 5 bits per channel,
    /// on a 160x144 image made of 8x8 tiles.
    pub const fn game_boy_color() -> Self {
        Self::new()
            .palette_size(PaletteSize::from_clamped(4))
            .rgb_bits(RgbBits::gbc())
            .mode(Mode::Tiled)
            .compatibility(Compatibility::GameBoyColor)
            .tile_size(8, 8)
            .output_size(160, 144)
            .palettes_grid_size(4, 2)
    }

    /// Sets the number of colors per palette.
    ///
    /// The default palette size is `4`.
    pub const fn palette_size(mut self, size: PaletteSize) -> Self {
        self.palette_size = size;
        self
    }

    /// Sets the bit depth that palette colors are reduced to.
    ///
    /// The default is [`RgbBits::UNLIMITED`].
    pub const fn rgb_bits(mut self, bits: RgbBits) -> Self {
        self.rgb_bits = bits;
        self
    }

    /// Sets the k-means fidelity, which is clamped to `1..=10`.
    ///
    /// The default fidelity is `4`.
    pub fn fidelity(mut self, fidelity: u8) -> Self {
        self.kmeans = self.kmeans.fidelity(fidelity);
        self
    }

    /// Sets the maximum number of k-means iterations.
    ///
    /// The default is [`KmeansOptions::DEFAULT_MAX_ITERS`].
    pub const fn max_iters(mut self, max_iters: u32) -> Self {
        self.kmeans = self.kmeans.max_iters(max_iters);
        self
    }

    /// Sets the seed value for the random number generator.
    ///
    /// The default seed is `0`.
    pub const fn seed(mut self, seed: u64) -> Self {
        self.kmeans = self.kmeans.seed(seed);
        self
    }

    /// Sets the processing mode.
    pub const fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the hardware compatibility mode.
    pub const fn compatibility(mut self, compatibility: Compatibility) -> Self {
        self.compatibility = compatibility;
        self
    }

    /// Sets the tile size in pixels. Only used in [`Mode::Tiled`].
    ///
    /// Zero is treated as `1`. The default tile size is `32x32`.
    pub const fn tile_size(mut self, width: u32, height: u32) -> Self {
        self.tile_size = (at_least_one(width), at_least_one(height));
        self
    }

    /// Sets the output size in pixels.
    ///
    /// In [`Mode::Tiled`], the output is shrunk to a whole number of tiles.
    /// The default output size is `256x256`.
    pub const fn output_size(mut self, width: u32, height: u32) -> Self {
        self.output_size = (width, height);
        self
    }

    /// Sets the number of palette regions along x and y. Only used in [`Mode::Tiled`].
    ///
    /// Zero is treated as `1`. The default grid is `4x2`.
    pub const fn palettes_grid_size(mut self, x: u32, y: u32) -> Self {
        self.palettes_grid_size = (at_least_one(x), at_least_one(y));
        self
    }

    /// Sets the pixel budget of the image sample that each palette is clustered from.
    ///
    /// The default is `128 * 128`.
    pub const fn max_sample_pixels(mut self, pixels: u32) -> Self {
        self.max_sample_pixels = at_least_one(pixels);
        self
    }

    /// Sets the pixel budget of the tile sample used to choose a tile's palette.
    ///
    /// The default is `16 * 16`.
    pub const fn max_tile_sample_pixels(mut self, pixels: u32) -> Self {
        self.max_tile_sample_pixels = at_least_one(pixels);
        self
    }

    /// Returns the palette size.
    #[must_use]
    pub const fn get_palette_size(&self) -> PaletteSize {
        self.palette_size
    }

    /// Returns the bit depth.
    #[must_use]
    pub const fn get_rgb_bits(&self) -> RgbBits {
        self.rgb_bits
    }

    /// Returns the k-means parameters.
    #[must_use]
    pub const fn get_kmeans(&self) -> KmeansOptions {
        self.kmeans
    }

    /// Returns the processing mode.
    #[must_use]
    pub const fn get_mode(&self) -> Mode {
        self.mode
    }

    /// Returns the hardware compatibility mode.
    #[must_use]
    pub const fn get_compatibility(&self) -> Compatibility {
        self.compatibility
    }

    /// Returns the tile size.
    #[must_use]
    pub const fn get_tile_size(&self) -> (u32, u32) {
        self.tile_size
    }

    /// Returns the output size.
    #[must_use]
    pub const fn get_output_size(&self) -> (u32, u32) {
        self.output_size
    }

    /// Returns the palette grid size.
    #[must_use]
    pub const fn get_palettes_grid_size(&self) -> (u32, u32) {
        self.palettes_grid_size
    }

    /// The number of palettes this configuration produces.
    #[must_use]
    pub const fn num_palettes(&self) -> u32 {
        match self.mode {
            Mode::Default => 1,
            Mode::Tiled => self.palettes_grid_size.0 * self.palettes_grid_size.1,
        }
    }
}

/// `max(value, 1)` usable in const fns.
const fn at_least_one(value: u32) -> u32 {
    if value == 0 {
        1
    } else {
        value
    }
}
