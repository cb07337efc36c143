//! The quantization pipeline: crop, sample, cluster, requantize and substitute.

use super::geometry::{crop_to_aspect, resize_nearest, sample_dimensions, split_lengths};
use crate::{
    gbc,
    kmeans::{self, KmeansOptions},
    requantize::requantize_palette,
    select, Canvas, Compatibility, Mode, Palette, Pixel, PixelBuffer, ProcessError,
    ProcessOptions, TRANSPARENT,
};

#[cfg(feature = "threads")]
use rayon::prelude::*;

/// The assignment of palettes to the tiles of a processed image.
///
/// In [`Mode::Default`], the whole image is a single tile using palette `0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteMap {
    /// The width of a tile in pixels.
    pub tile_width: u32,
    /// The height of a tile in pixels.
    pub tile_height: u32,
    /// The number of tiles along x.
    pub columns: u32,
    /// The number of tiles along y.
    pub rows: u32,
    /// The palette index of each tile, in row-major order.
    pub indices: Vec<usize>,
}

impl PaletteMap {
    /// Returns the palette index of the tile at `(column, row)`.
    #[must_use]
    pub fn get(&self, column: u32, row: u32) -> Option<usize> {
        if column < self.columns && row < self.rows {
            Some(self.indices[row as usize * self.columns as usize + column as usize])
        } else {
            None
        }
    }
}

/// Everything produced by one successful [`process`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizationResult {
    /// The quantized output image.
    pub image: PixelBuffer,
    /// The requantized palettes, in region order (row-major over the palette grid).
    pub palettes: Vec<Palette>,
    /// Which palette each tile of `image` uses.
    pub palette_map: PaletteMap,
    /// Whether the result satisfies the Game Boy Color restrictions and can be passed to
    /// [`gbc::encode`].
    pub gbc_compatible: bool,
}

/// Quantizes `source` according to `options`.
///
/// # Errors
/// - [`ProcessError::TooManyPalettes`] in Game Boy Color compatible tiled mode with a palette
///   grid of more than 8 regions.
/// - [`ProcessError::ZeroDimension`] if `source` is empty or the output would have no pixels.
pub fn process(
    source: &PixelBuffer,
    options: &ProcessOptions,
) -> Result<QuantizationResult, ProcessError> {
    run(source, options, false)
}

/// Computes the same result as [`process`], but clusters regions and substitutes tiles in parallel.
///
/// # Errors
/// See [`process`].
#[cfg(feature = "threads")]
pub fn process_par(
    source: &PixelBuffer,
    options: &ProcessOptions,
) -> Result<QuantizationResult, ProcessError> {
    run(source, options, true)
}

/// Runs [`process`] on the source of `canvas` and publishes the output image to it.
///
/// Nothing is published if processing fails.
///
/// # Errors
/// See [`process`].
pub fn process_canvas(
    canvas: &mut impl Canvas,
    options: &ProcessOptions,
) -> Result<QuantizationResult, ProcessError> {
    let result = process(canvas.source_pixels(), options)?;
    canvas.publish_result(result.image.clone());
    Ok(result)
}

/// Runs [`process_par`] on the source of `canvas` and publishes the output image to it.
///
/// # Errors
/// See [`process`].
#[cfg(feature = "threads")]
pub fn process_canvas_par(
    canvas: &mut impl Canvas,
    options: &ProcessOptions,
) -> Result<QuantizationResult, ProcessError> {
    let result = process_par(canvas.source_pixels(), options)?;
    canvas.publish_result(result.image.clone());
    Ok(result)
}

/// Validates the request and dispatches on the mode.
fn run(
    source: &PixelBuffer,
    options: &ProcessOptions,
    parallel: bool,
) -> Result<QuantizationResult, ProcessError> {
    let (width, height) = source.dimensions();
    if width == 0 || height == 0 {
        return Err(ProcessError::ZeroDimension);
    }

    if options.compatibility == Compatibility::GameBoyColor && options.mode == Mode::Tiled {
        let requested = options.num_palettes();
        if requested > gbc::MAX_PALETTES {
            log::warn!(
                "refusing to process {requested} palettes in Game Boy Color mode (max {})",
                gbc::MAX_PALETTES,
            );
            return Err(ProcessError::TooManyPalettes { requested, max: gbc::MAX_PALETTES });
        }
    }

    let (palettes, palette_map, image) = match options.mode {
        Mode::Default => process_default(source, options, parallel)?,
        Mode::Tiled => process_tiled(source, options, parallel)?,
    };

    let gbc_compatible = is_gbc_compatible(options, &image, &palettes, &palette_map);

    Ok(QuantizationResult { image, palettes, palette_map, gbc_compatible })
}

/// `(width, height)` as an aspect ratio.
fn aspect(width: u32, height: u32) -> f64 {
    f64::from(width) / f64::from(height)
}

/// Clusters one region's pixels and reduces the bit depth of the resulting palette.
fn region_palette(pixels: &[Pixel], kmeans: &KmeansOptions, options: &ProcessOptions) -> Palette {
    let clustering = kmeans::cluster(pixels, options.palette_size, kmeans);
    requantize_palette(&clustering.palette, options.rgb_bits)
}

/// Palettes, palette map and output image of one mode.
type Processed = (Vec<Palette>, PaletteMap, PixelBuffer);

/// Single palette processing.
#[cfg_attr(not(feature = "threads"), allow(unused_variables))]
fn process_default(
    source: &PixelBuffer,
    options: &ProcessOptions,
    parallel: bool,
) -> Result<Processed, ProcessError> {
    let (width, height) = options.output_size;
    if width == 0 || height == 0 {
        return Err(ProcessError::ZeroDimension);
    }

    log::debug!("processing in default mode to {width}x{height}");

    let cropped = crop_to_aspect(source, aspect(width, height));
    let (sample_width, sample_height) =
        sample_dimensions(width, height, u64::from(options.max_sample_pixels));
    log::debug!("clustering a {sample_width}x{sample_height} sample");

    let sample = resize_nearest(&cropped, sample_width, sample_height);
    let palette = region_palette(sample.pixels(), &options.kmeans, options);

    let output = resize_nearest(&cropped, width, height);

    #[cfg(feature = "threads")]
    let pixels = if parallel {
        select::substitute_par(output.pixels(), &palette)
    } else {
        select::substitute(output.pixels(), &palette)
    };
    #[cfg(not(feature = "threads"))]
    let pixels = select::substitute(output.pixels(), &palette);

    let palette_map = PaletteMap {
        tile_width: width,
        tile_height: height,
        columns: 1,
        rows: 1,
        indices: vec![0],
    };

    Ok((
        vec![palette],
        palette_map,
        PixelBuffer::new_unchecked(width, height, pixels),
    ))
}

/// Picks the best palette for a tile and substitutes its pixels.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn process_tile(tile: &PixelBuffer, palettes: &[Palette], max_pixels: u32) -> (usize, PixelBuffer) {
    let (width, height) = tile.dimensions();
    let pixels = u64::from(width) * u64::from(height);

    let index = if pixels > u64::from(max_pixels) {
        let scale = (f64::from(max_pixels) / pixels as f64).sqrt();
        let sample = resize_nearest(
            tile,
            ((f64::from(width) * scale) as u32).max(1),
            ((f64::from(height) * scale) as u32).max(1),
        );
        select::best_palette_index(sample.pixels(), palettes)
    } else {
        select::best_palette_index(tile.pixels(), palettes)
    }
    .unwrap_or(0);

    let substituted = match palettes.get(index) {
        Some(palette) => select::substitute(tile.pixels(), palette),
        None => tile.pixels().to_vec(),
    };

    (index, PixelBuffer::new_unchecked(width, height, substituted))
}

/// One palette per grid region, chosen per output tile.
#[cfg_attr(not(feature = "threads"), allow(unused_variables))]
fn process_tiled(
    source: &PixelBuffer,
    options: &ProcessOptions,
    parallel: bool,
) -> Result<Processed, ProcessError> {
    let (tile_width, tile_height) = options.tile_size;
    let (grid_x, grid_y) = options.palettes_grid_size;
    let columns = options.output_size.0 / tile_width;
    let rows = options.output_size.1 / tile_height;
    if columns == 0 || rows == 0 {
        return Err(ProcessError::ZeroDimension);
    }

    let (width, height) = (columns * tile_width, rows * tile_height);
    log::debug!(
        "processing in tiled mode to {width}x{height} ({columns}x{rows} tiles of {tile_width}x{tile_height}) with a {grid_x}x{grid_y} palette grid"
    );

    let cropped = crop_to_aspect(source, aspect(width, height));
    let output = resize_nearest(&cropped, width, height);

    let budget = u64::from(options.max_sample_pixels) * u64::from(grid_x) * u64::from(grid_y);
    let (sample_width, sample_height) = sample_dimensions(width, height, budget);
    // every region needs at least one pixel
    let (sample_width, sample_height) = (sample_width.max(grid_x), sample_height.max(grid_y));
    log::debug!("clustering a {sample_width}x{sample_height} sample");

    let sample = resize_nearest(&cropped, sample_width, sample_height);

    let xs = split_lengths(sample_width, grid_x);
    let ys = split_lengths(sample_height, grid_y);
    let regions = ys
        .iter()
        .flat_map(|y| {
            xs.iter().map(|x| {
                sample
                    .crop(x.start, y.start, x.end - x.start, y.end - y.start)
                    .into_pixels()
            })
        })
        .collect::<Vec<_>>();

    let seed = options.kmeans.get_seed();
    let cluster_region = |(i, pixels): (usize, &Vec<Pixel>)| {
        let kmeans = options.kmeans.seed(seed ^ i as u64);
        region_palette(pixels, &kmeans, options)
    };

    #[cfg(feature = "threads")]
    let palettes = if parallel {
        regions.par_iter().enumerate().map(cluster_region).collect::<Vec<_>>()
    } else {
        regions.iter().enumerate().map(cluster_region).collect::<Vec<_>>()
    };
    #[cfg(not(feature = "threads"))]
    let palettes = regions.iter().enumerate().map(cluster_region).collect::<Vec<_>>();

    let tile_at = |i: u32| {
        let (column, row) = (i % columns, i / columns);
        let tile = output.crop(column * tile_width, row * tile_height, tile_width, tile_height);
        let (index, tile) = process_tile(&tile, &palettes, options.max_tile_sample_pixels);
        log::trace!("tile ({column}, {row}) uses palette {index}");
        (index, tile)
    };

    #[cfg(feature = "threads")]
    let tiles = if parallel {
        (0..columns * rows).into_par_iter().map(tile_at).collect::<Vec<_>>()
    } else {
        (0..columns * rows).map(tile_at).collect::<Vec<_>>()
    };
    #[cfg(not(feature = "threads"))]
    let tiles = (0..columns * rows).map(tile_at).collect::<Vec<_>>();

    let mut image =
        PixelBuffer::new_unchecked(width, height, vec![TRANSPARENT; width as usize * height as usize]);
    let mut indices = Vec::with_capacity(tiles.len());
    for (i, (index, tile)) in (0..).zip(tiles) {
        image.paste((i % columns) * tile_width, (i / columns) * tile_height, &tile);
        indices.push(index);
    }

    let palette_map = PaletteMap { tile_width, tile_height, columns, rows, indices };

    Ok((palettes, palette_map, image))
}

/// Checks the output against the Game Boy Color background restrictions.
fn is_gbc_compatible(
    options: &ProcessOptions,
    image: &PixelBuffer,
    palettes: &[Palette],
    palette_map: &PaletteMap,
) -> bool {
    options.compatibility == Compatibility::GameBoyColor
        && image.dimensions() == (gbc::SCREEN_WIDTH, gbc::SCREEN_HEIGHT)
        && palette_map.tile_width % gbc::TILE_SIZE == 0
        && palette_map.tile_height % gbc::TILE_SIZE == 0
        && palettes.len() <= gbc::MAX_PALETTES as usize
        && palettes.iter().all(|p| p.len() <= gbc::COLORS_PER_PALETTE)
}
