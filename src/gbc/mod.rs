//! Game Boy Color export of tiled results.
//!
//! A compatible [`QuantizationResult`] is cut into the 20x18 grid of 8x8 background tiles.
//! Each tile is encoded as 2 bits per pixel into 16 bytes: for every row, one byte holding the low
//! bits of the 8 palette indices followed by one byte holding the high bits, with the leftmost
//! pixel in the most significant bit. Identical tiles are stored once. Tiles past the first 256
//! go to the second VRAM bank, which is flagged in bit 3 of the tile's map attribute.
//!
//! # Examples
//! ```no_run
//! # use pixquant::{gbc, process, PixelBuffer, ProcessOptions};
//! # fn main() -> Result<(), pixquant::ProcessError> {
//! # let source = PixelBuffer::filled(320, 288, pixquant::Pixel::new(0, 0, 0, 255))?;
//! let result = process(&source, &ProcessOptions::game_boy_color())?;
//! if let Some(image) = gbc::encode(&result) {
//!     std::fs::write("main.asm", image.to_asm()).ok();
//! }
//! # Ok(())
//! # }
//! ```

mod asm;

use crate::{select, Palette, Pixel, QuantizationResult, TRANSPARENT};

use std::collections::HashMap;

use bitvec::prelude::*;

/// Screen width in pixels.
pub const SCREEN_WIDTH: u32 = 160;
/// Screen height in pixels.
pub const SCREEN_HEIGHT: u32 = 144;
/// Width and height of a hardware tile in pixels.
pub const TILE_SIZE: u32 = 8;
/// Tiles per screen row.
pub const MAP_COLUMNS: usize = 20;
/// Tile rows per screen.
pub const MAP_ROWS: usize = 18;
/// The number of background palettes.
pub const MAX_PALETTES: u32 = 8;
/// Colors per background palette.
pub const COLORS_PER_PALETTE: usize = 4;
/// Tiles that fit in one VRAM bank.
pub const TILES_PER_BANK: usize = 256;
/// Attribute bit selecting VRAM bank 1 for a tile.
pub const BANK1_ATTRIBUTE: u8 = 0x08;

/// A unique 8x8 tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRecord {
    /// The 16 bitplane bytes, two per row.
    pub bytes: [u8; 16],
    /// The palette used by the first occurrence of this tile.
    pub palette: u8,
}

/// The encoded background: palettes, unique tiles and the two screen maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GbcImage {
    /// Palettes, each padded to [`COLORS_PER_PALETTE`] colors.
    palettes: Vec<Palette>,
    /// Unique tiles in first-seen order.
    tiles: Vec<TileRecord>,
    /// Index into `tiles` for each screen cell, row-major.
    tile_indices: Vec<u16>,
    /// Palette index for each screen cell, row-major.
    palette_indices: Vec<u8>,
}

impl GbcImage {
    /// Returns the palettes, each with exactly 4 colors.
    #[must_use]
    pub fn palettes(&self) -> &[Palette] {
        &self.palettes
    }

    /// Returns the unique tiles in first-seen order.
    #[must_use]
    pub fn tiles(&self) -> &[TileRecord] {
        &self.tiles
    }

    /// Returns the tile index of each of the 20x18 screen cells.
    ///
    /// Indices of `256` and above refer to tiles stored in VRAM bank 1.
    #[must_use]
    pub fn tile_indices(&self) -> &[u16] {
        &self.tile_indices
    }

    /// Returns the palette index of each of the 20x18 screen cells.
    #[must_use]
    pub fn palette_indices(&self) -> &[u8] {
        &self.palette_indices
    }

    /// Whether more than 256 unique tiles are needed.
    #[must_use]
    pub fn uses_bank1(&self) -> bool {
        self.tiles.len() > TILES_PER_BANK
    }

    /// The bank 0 tile map: each tile index relative to the start of its bank.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn tile_map(&self) -> Vec<u8> {
        self.tile_indices.iter().map(|&i| i as u8).collect()
    }

    /// The bank 1 attribute map: the palette index, plus [`BANK1_ATTRIBUTE`] for bank 1 tiles.
    #[must_use]
    pub fn attribute_map(&self) -> Vec<u8> {
        self.tile_indices
            .iter()
            .zip(&self.palette_indices)
            .map(|(&tile, &palette)| {
                if usize::from(tile) >= TILES_PER_BANK {
                    palette | BANK1_ATTRIBUTE
                } else {
                    palette
                }
            })
            .collect()
    }

    /// All palette colors as little-endian RGB555 words.
    #[must_use]
    pub fn palette_data(&self) -> Vec<u8> {
        self.palettes
            .iter()
            .flat_map(|palette| palette.iter())
            .flat_map(|&color| rgb555(color).to_le_bytes())
            .collect()
    }

    /// Renders a complete RGBDS assembly source that displays this image.
    #[must_use]
    pub fn to_asm(&self) -> String {
        asm::Source(self).to_string()
    }
}

/// Converts a color to the 15-bit `0bbbbbgggggrrrrr` format.
#[must_use]
pub fn rgb555(color: Pixel) -> u16 {
    let [r, g, b, _] = palette::cast::into_array(color);
    u16::from(r / 8) | (u16::from(g / 8) << 5) | (u16::from(b / 8) << 10)
}

/// Encodes 64 row-major palette indices (each `0..4`) of an 8x8 tile into 16 bitplane bytes.
///
/// Indices past the 64th are ignored and missing ones count as `0`.
#[must_use]
pub fn encode_tile(indices: &[u8]) -> [u8; 16] {
    let mut bytes = [0u8; 16];
    let bits = bytes.view_bits_mut::<Msb0>();
    for (row, line) in indices.chunks(8).take(8).enumerate() {
        for (i, &index) in line.iter().enumerate() {
            bits.set(row * 16 + i, index & 1 != 0);
            bits.set(row * 16 + 8 + i, index & 2 != 0);
        }
    }
    bytes
}

/// Repeats the last color (or [`TRANSPARENT`]) until the palette has 4 entries.
fn pad_palette(palette: &Palette) -> Palette {
    let mut colors = palette.colors().to_vec();
    let last = colors.last().copied().unwrap_or(TRANSPARENT);
    colors.resize(COLORS_PER_PALETTE.max(colors.len()), last);
    Palette::new(colors)
}

/// Encodes a Game Boy Color compatible result.
///
/// Returns `None` without doing anything if [`QuantizationResult::gbc_compatible`] is not set.
/// A palette map coarser than 8x8 tiles is stretched onto the 20x18 hardware grid.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn encode(result: &QuantizationResult) -> Option<GbcImage> {
    if !result.gbc_compatible {
        log::debug!("skipping Game Boy Color export of an incompatible result");
        return None;
    }

    let map = &result.palette_map;
    let stretch_x = (map.tile_width / TILE_SIZE).max(1);
    let stretch_y = (map.tile_height / TILE_SIZE).max(1);

    let mut tiles = Vec::new();
    let mut seen = HashMap::new();
    let mut tile_indices = Vec::with_capacity(MAP_COLUMNS * MAP_ROWS);
    let mut palette_indices = Vec::with_capacity(MAP_COLUMNS * MAP_ROWS);

    for y in 0..MAP_ROWS as u32 {
        for x in 0..MAP_COLUMNS as u32 {
            let palette_index = map.get(x / stretch_x, y / stretch_y)?;
            let palette = result.palettes.get(palette_index)?;

            let cell = result.image.crop(x * TILE_SIZE, y * TILE_SIZE, TILE_SIZE, TILE_SIZE);
            // compatible palettes have at most 4 colors
            let indices = select::index_map(cell.pixels(), palette)
                .into_iter()
                .map(|i| (i & 0b11) as u8)
                .collect::<Vec<_>>();
            let bytes = encode_tile(&indices);

            let palette_index = palette_index as u8;
            let tile_index = *seen.entry(bytes).or_insert_with(|| {
                tiles.push(TileRecord { bytes, palette: palette_index });
                (tiles.len() - 1) as u16
            });

            tile_indices.push(tile_index);
            palette_indices.push(palette_index);
        }
    }

    let image = GbcImage {
        palettes: result.palettes.iter().map(pad_palette).collect(),
        tiles,
        tile_indices,
        palette_indices,
    };

    log::info!(
        "encoded {} palettes and {} unique tiles (bank 1 used: {})",
        image.palettes.len(),
        image.tiles.len(),
        image.uses_bank1(),
    );

    Some(image)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{process, tests::*, PaletteMap, PixelBuffer, ProcessOptions};

    const BLACK: Pixel = Pixel::new(0, 0, 0, 255);
    const WHITE: Pixel = Pixel::new(255, 255, 255, 255);

    /// A 160x144 image where each 8x8 cell is drawn by `cell(x, y, n)`
    /// given the cell coordinates and pixel number within the cell.
    fn screen(cell: impl Fn(u32, u32, u32) -> Pixel) -> PixelBuffer {
        let pixels = (0..SCREEN_HEIGHT)
            .flat_map(|y| (0..SCREEN_WIDTH).map(move |x| (x, y)))
            .map(|(x, y)| cell(x / 8, y / 8, (y % 8) * 8 + x % 8))
            .collect();
        PixelBuffer::new(SCREEN_WIDTH, SCREEN_HEIGHT, pixels).unwrap()
    }

    fn single_palette_result(image: PixelBuffer, palette: Palette) -> QuantizationResult {
        QuantizationResult {
            image,
            palettes: vec![palette],
            palette_map: PaletteMap {
                tile_width: SCREEN_WIDTH,
                tile_height: SCREEN_HEIGHT,
                columns: 1,
                rows: 1,
                indices: vec![0],
            },
            gbc_compatible: true,
        }
    }

    #[test]
    fn bitplane_rows() {
        let tile: [u8; 64] = [
            0, 1, 2, 2, 1, 1, 3, 0, //
            0, 2, 2, 2, 2, 3, 3, 1, //
            1, 0, 0, 0, 2, 0, 0, 2, //
            2, 1, 1, 1, 3, 3, 3, 2, //
            0, 2, 1, 3, 0, 2, 1, 3, //
            0, 0, 0, 1, 1, 0, 0, 0, //
            2, 2, 3, 3, 1, 3, 0, 0, //
            3, 2, 1, 0, 3, 2, 1, 0, //
        ];
        let bytes = encode_tile(&tile);
        assert_eq!(bytes[..4], [0x4E, 0x32, 0x07, 0x7E]);
        assert_eq!(bytes[14..], [0xAA, 0xCC]);
    }

    #[test]
    fn rgb555_words() {
        assert_eq!(rgb555(WHITE), 0x7FFF);
        assert_eq!(rgb555(BLACK), 0);
        assert_eq!(rgb555(rgb(8, 16, 24)), 1 + 2 * 32 + 3 * 1024);
        assert_eq!(rgb555(rgb(7, 255, 0)), 31 << 5);
    }

    #[test]
    fn two_patterns_give_two_tiles() {
        let checker = |n: u32| if (n / 8 + n % 8) % 2 == 0 { BLACK } else { WHITE };
        let source = screen(|x, y, n| if (x + y) % 2 == 0 { checker(n) } else { WHITE });

        let result = process(&source, &ProcessOptions::game_boy_color()).unwrap();
        assert!(result.gbc_compatible);
        assert_eq!(result.image, source);

        let image = encode(&result).unwrap();
        assert_eq!(image.tiles().len(), 2);
        assert!(!image.uses_bank1());
        assert_eq!(image.tile_indices().len(), MAP_COLUMNS * MAP_ROWS);
        for (i, &index) in image.tile_indices().iter().enumerate() {
            let (x, y) = (i % MAP_COLUMNS, i / MAP_COLUMNS);
            assert_eq!(usize::from(index), (x + y) % 2);
        }

        // white is index 1 in [black, white, white, white]
        assert_eq!(image.tiles()[1].bytes.to_vec(), [0xFFu8, 0x00].repeat(8));
        assert_eq!(image.tiles()[0].bytes[..2], [0x55, 0x00]);
    }

    #[test]
    fn identical_tiles_are_shared() {
        let source = screen(|x, _, n| if n == x % 64 { BLACK } else { WHITE });
        let image =
            encode(&single_palette_result(source, Palette::new(vec![BLACK, WHITE]))).unwrap();

        // 20 distinct columns, repeated on every row
        assert_eq!(image.tiles().len(), MAP_COLUMNS);
        assert_eq!(
            image.tile_indices()[..MAP_COLUMNS],
            image.tile_indices()[MAP_COLUMNS..2 * MAP_COLUMNS]
        );
        assert!(image.palette_indices().iter().all(|&p| p == 0));
        assert_eq!(image.palettes()[0].colors(), &[BLACK, WHITE, WHITE, WHITE]);
    }

    #[test]
    fn tiles_past_256_use_bank1() {
        let source = screen(|x, y, n| {
            let cell = y * 20 + x;
            if n < 9 && (cell >> n) & 1 == 1 {
                WHITE
            } else {
                BLACK
            }
        });
        let image =
            encode(&single_palette_result(source, Palette::new(vec![BLACK, WHITE]))).unwrap();

        assert_eq!(image.tiles().len(), MAP_COLUMNS * MAP_ROWS);
        assert!(image.uses_bank1());
        assert_eq!(image.tile_indices()[300], 300);
        assert_eq!(image.tile_map()[300], 44);
        assert_eq!(image.attribute_map()[300], BANK1_ATTRIBUTE);
        assert_eq!(image.attribute_map()[255], 0);

        let asm = image.to_asm();
        assert!(asm.contains("tileTableBank1Start:\n    DB"));
        assert!(asm.contains("; tile 300 / $12C\n"));
        assert!(asm.contains("ld de, tileTableBank1Start"));
    }

    #[test]
    fn coarse_palette_map_is_stretched() {
        let red = Palette::new(vec![rgb(248, 0, 0)]);
        let blue = Palette::new(vec![rgb(0, 0, 248)]);
        let result = QuantizationResult {
            image: screen(|x, _, _| if (x / 2) % 2 == 0 { rgb(248, 0, 0) } else { rgb(0, 0, 248) }),
            palettes: vec![red, blue],
            palette_map: PaletteMap {
                tile_width: 16,
                tile_height: 16,
                columns: 10,
                rows: 9,
                indices: (0..90).map(|i| i % 2).collect(),
            },
            gbc_compatible: true,
        };

        let image = encode(&result).unwrap();
        assert_eq!(image.palette_indices()[..6], [0, 0, 1, 1, 0, 0]);
        assert_eq!(image.palette_indices()[MAP_COLUMNS * 17 + 19], 1);
        assert_eq!(image.tiles().len(), 1);
        assert_eq!(image.palette_data()[..2], 0x001Fu16.to_le_bytes());
    }

    #[test]
    fn incompatible_result_is_not_encoded() {
        let result = process(&test_image_64(), &ProcessOptions::new()).unwrap();
        assert!(encode(&result).is_none());
    }

    #[test]
    fn asm_layout() {
        let source = screen(|_, _, _| WHITE);
        let image =
            encode(&single_palette_result(source, Palette::new(vec![BLACK, WHITE]))).unwrap();
        let asm = image.to_asm();

        assert!(asm.contains("    loadPalettesMacro $FF68, palettesStart, 1\n"));
        assert!(asm.contains(
            "palettesStart:\n               ; Palette 0\n    DB $00,$00 ; $ 16-bit RGB = [0 0 0 255]\n    DB $FF,$7F ; $ 16-bit RGB = [255 255 255 255]\n"
        ));
        assert!(asm.contains(
            "tileTableBank0Start:\n    DB $FF,$00,$FF,$00,$FF,$00,$FF,$00 ; tile 0 / $00\n    DB $FF,$00,$FF,$00,$FF,$00,$FF,$00\ntileTableBank0End:\n"
        ));
        assert!(asm.contains("tileTableBank1Start:\ntileTableBank1End:\n"));
        assert!(!asm.contains("ld de, tileTableBank1Start"));
        assert!(asm.contains("    DB $00,$00,$00,$00,$00,$00,$00,$00,$00,$00 ; line 17\n"));
        assert_eq!(asm.matches(" ; line ").count(), 2 * MAP_ROWS);
        assert!(asm.contains("palettesMapEnd:\n"));
    }
}
