//! RGBDS assembly source emission.
//!
//! The generated program loads the palettes, copies the tile data into VRAM, writes the tile
//! and attribute maps for the visible 20x18 area and then idles on VBlank.

use super::{rgb555, GbcImage, MAP_COLUMNS, TILES_PER_BANK};

use std::fmt::{self, Display, Formatter, UpperHex};

/// Formats a number as an upper-case, `$`-prefixed hex literal of at least two digits.
struct Hex<T>(T);

impl<T: UpperHex> Display for Hex<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "${:02X}", self.0)
    }
}

/// Writes `values` as a comma separated `DB` directive, followed by an optional comment.
fn write_db<T: UpperHex + Copy>(
    f: &mut Formatter<'_>,
    values: &[T],
    comment: Option<fmt::Arguments<'_>>,
) -> fmt::Result {
    f.write_str("    DB ")?;
    for (i, &value) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{}", Hex(value))?;
    }
    if let Some(comment) = comment {
        write!(f, " ; {comment}")?;
    }
    writeln!(f)
}

/// Interrupt vectors, helper routines and the start of `Setup`.
const HEADER: &str = r#"; Game Boy Color background image, assemble with RGBDS:
;   rgbasm -o main.o main.asm
;   rgblink -o main.gb main.o
;   rgbfix -C -v -p 0 main.gb

SECTION "Header", ROM0[$0100]
    nop
    jp Setup

SECTION "VBlank interrupt", ROM0[$0040]
    push hl
    ld hl, VBlank
    ld [hl], 1
    pop hl
    reti

SECTION "Variables", WRAM0
VBlank:
    DS 1
tmp:
    DS 1

SECTION "Macros", ROM0

; \1: palette index register ($FF68 for background, $FF6A for objects)
; \2: address of the first palette
; \3: number of palettes
MACRO loadPalettesMacro
    ld a, %10000000
    ld [\1], a
    ld hl, \2
    REPT \3 * 8
        ld a, [hli]
        ld [\1 + 1], a
    ENDR
ENDM

SECTION "Subroutines", ROM0

; Copies bc bytes from de to hl.
loadAddressInc:
.loop
    ld a, [de]
    ld [hli], a
    inc de
    dec bc
    ld a, b
    or c
    jr nz, .loop
    ret

; Copies bc map bytes from de to the screen map at hl,
; skipping the 12 off-screen entries of every 32 entry map row.
loadToScreen:
    xor a
    ld [tmp], a
.loop
    ld a, [de]
    push hl
    ld hl, $FF41
.wait
    bit 1, [hl]
    jr nz, .wait
    pop hl
    ld [hli], a
    ld a, [tmp]
    cp 20
    jr nc, .pass
    inc de
    dec bc
    jr .noReset
.pass
    cp 31
    jr nz, .noReset
    ld a, $FF
    ld [tmp], a
.noReset
    inc a
    ld [tmp], a
    ld a, b
    or c
    jr nz, .loop
    ret

; Copies the DMA routine at $28 into HRAM.
copyDMA2HRAM:
    ld de, $FF80
    ld hl, $28
    REPT 10
        ld a, [hli]
        ld [de], a
        inc e
    ENDR
    ret

; Halts until a VBlank interrupt arrived.
waitVBlank:
    halt
    nop
    ld a, [VBlank]
    and a
    jr z, waitVBlank
    xor a
    ret

SECTION "DMA", ROM0[$28]
    ld a, $C1
    ld [$FF46], a
    ld a, $28
wait160us:
    dec a
    jr nz, wait160us
    ret

SECTION "Main", ROM0[$0150]

Setup:
    ld a, %00000001
    ld [$FFFF], a
    ei

    call copyDMA2HRAM
    call waitVBlank
"#;

/// Turns the LCD off and copies the bank 0 tiles.
const LCD_SETUP: &str = r"
    xor a
    ld [$FF43], a
    ld [$FF42], a

    ; LCD off, tile data at $8000, background on
    ld a, %00010011
    ld [$FF40], a

    ld hl, $8000
    ld de, tileTableBank0Start
    ld bc, tileTableBank0End - tileTableBank0Start
    call loadAddressInc

";

/// Copies the bank 1 tiles, only emitted when there are more than 256 tiles.
const BANK1_TILES: &str = r"    ld a, 1
    ld [$FF4F], a
    ld hl, $8000
    ld de, tileTableBank1Start
    ld bc, tileTableBank1End - tileTableBank1Start
    call loadAddressInc

";

/// Writes both maps, turns the LCD on and idles. Ends at the palette table label.
const MAPS_AND_LOOP: &str = r#"    xor a
    ld [$FF4F], a
    ld hl, $9800
    ld de, tileMapStart
    ld bc, tileMapEnd - tileMapStart
    call loadToScreen

    ld a, 1
    ld [$FF4F], a
    ld hl, $9800
    ld de, palettesMapStart
    ld bc, palettesMapEnd - palettesMapStart
    call loadToScreen

    ; LCD on
    ld a, %10010011
    ld [$FF40], a

.loop
    call waitVBlank
    halt
    nop
    jr .loop

SECTION "Palettes", ROM0

; little-endian RGB555 colors
palettesStart:
"#;

/// The assembly source of a [`GbcImage`].
pub(super) struct Source<'a>(pub(super) &'a GbcImage);

impl Source<'_> {
    /// Writes the tiles stored in VRAM `bank`.
    fn write_tiles(&self, f: &mut Formatter<'_>, bank: usize) -> fmt::Result {
        let start = bank * TILES_PER_BANK;
        for (i, tile) in self.0.tiles.iter().enumerate().skip(start).take(TILES_PER_BANK) {
            let (first, second) = tile.bytes.split_at(8);
            write_db(f, first, Some(format_args!("tile {i} / {}", Hex(i))))?;
            write_db(f, second, None)?;
        }
        Ok(())
    }

    /// Writes a 20x18 map, one `line` comment per row.
    fn write_map(f: &mut Formatter<'_>, map: &[u8]) -> fmt::Result {
        for (row, line) in map.chunks(MAP_COLUMNS).enumerate() {
            let (first, second) = line.split_at(line.len().min(MAP_COLUMNS / 2));
            write_db(f, first, Some(format_args!("line {row}")))?;
            if !second.is_empty() {
                write_db(f, second, None)?;
            }
        }
        Ok(())
    }
}

impl Display for Source<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let image = self.0;

        f.write_str(HEADER)?;
        writeln!(
            f,
            "    loadPalettesMacro $FF68, palettesStart, {}",
            image.palettes.len()
        )?;
        f.write_str(LCD_SETUP)?;
        if image.uses_bank1() {
            f.write_str(BANK1_TILES)?;
        }
        f.write_str(MAPS_AND_LOOP)?;

        for (i, palette) in image.palettes.iter().enumerate() {
            writeln!(f, "               ; Palette {i}")?;
            for &color in palette.iter() {
                let [lo, hi] = rgb555(color).to_le_bytes();
                writeln!(
                    f,
                    "    DB {},{} ; $ 16-bit RGB = [{} {} {} {}]",
                    Hex(lo),
                    Hex(hi),
                    color.red,
                    color.green,
                    color.blue,
                    color.alpha,
                )?;
            }
        }
        f.write_str("palettesEnd:\n\nSECTION \"Tiles\", ROM0\n\ntileTableBank0Start:\n")?;
        self.write_tiles(f, 0)?;
        f.write_str("tileTableBank0End:\n\ntileTableBank1Start:\n")?;
        self.write_tiles(f, 1)?;
        f.write_str("tileTableBank1End:\n\nSECTION \"Maps\", ROM0\n\ntileMapStart:\n")?;
        Self::write_map(f, &image.tile_map())?;
        f.write_str("tileMapEnd:\n\npalettesMapStart:\n")?;
        Self::write_map(f, &image.attribute_map())?;
        f.write_str("palettesMapEnd:\n")
    }
}
