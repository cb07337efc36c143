#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice
)]

use std::{fmt::Display, path::PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use pixquant::{
    gbc, kmeans::KmeansOptions, Mode, PaletteSize, PixelBuffer, ProcessOptions, RgbBits,
};

#[derive(Copy, Clone, ValueEnum)]
enum CliMode {
    Default,
    Tiled,
}

impl From<CliMode> for Mode {
    fn from(value: CliMode) -> Self {
        match value {
            CliMode::Default => Mode::Default,
            CliMode::Tiled => Mode::Tiled,
        }
    }
}

impl Display for CliMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                CliMode::Default => "default",
                CliMode::Tiled => "tiled",
            }
        )
    }
}

#[derive(Parser)]
pub struct Options {
    /// Colors per palette.
    #[arg(short, long, default_value_t = PaletteSize::from_clamped(4), value_parser = parse_palette_size)]
    k: PaletteSize,

    /// Bits per channel as `R,G,B`, for example `5,5,5`.
    #[arg(long, value_parser = parse_bits)]
    bits: Option<RgbBits>,

    #[arg(long, default_value_t = 4)]
    fidelity: u8,

    #[arg(long, default_value_t = KmeansOptions::DEFAULT_MAX_ITERS)]
    max_iters: u32,

    #[arg(long, default_value_t = CliMode::Default)]
    mode: CliMode,

    /// Tile size as `WxH`.
    #[arg(long, default_value = "32x32", value_parser = parse_size)]
    tile_size: (u32, u32),

    /// Output size as `WxH`.
    #[arg(long, default_value = "256x256", value_parser = parse_size)]
    output_size: (u32, u32),

    /// Palette grid as `XxY`.
    #[arg(long, default_value = "4x2", value_parser = parse_size)]
    grid: (u32, u32),

    /// Use the Game Boy Color preset, ignoring the size, mode and bit options.
    #[arg(long)]
    gbc: bool,

    /// Write RGBDS assembly for the result to this path.
    #[arg(long)]
    asm: Option<PathBuf>,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(short, long, default_value_t = 0)]
    threads: u8,

    /// Integer factor the saved image is enlarged by.
    #[arg(long, default_value_t = 1)]
    upscale: u32,

    #[arg(long)]
    verbose: bool,

    input: PathBuf,

    output: PathBuf,
}

fn parse_palette_size(s: &str) -> Result<PaletteSize, String> {
    let value: u16 = s.parse().map_err(|e| format!("{e}"))?;
    value.try_into().map_err(|e| format!("{e}"))
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (width, height) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got {s}"))?;
    let width = width.trim().parse().map_err(|e| format!("{e}"))?;
    let height = height.trim().parse().map_err(|e| format!("{e}"))?;
    Ok((width, height))
}

fn parse_bits(s: &str) -> Result<RgbBits, String> {
    let bits = s
        .split(',')
        .map(|b| b.trim().parse::<u8>().map_err(|e| format!("{e}")))
        .collect::<Result<Vec<_>, _>>()?;

    match bits.as_slice() {
        &[red, green, blue] => Ok(RgbBits::new(red, green, blue)),
        &[all] => Ok(RgbBits::new(all, all, all)),
        _ => Err(format!("expected R,G,B, got {s}")),
    }
}

fn main() -> anyhow::Result<()> {
    let Options {
        k,
        bits,
        fidelity,
        max_iters,
        mode,
        tile_size,
        output_size,
        grid,
        gbc,
        asm,
        seed,
        threads,
        upscale,
        verbose,
        input,
        output,
    } = Options::parse();

    macro_rules! log {
        ($name: literal, $val: expr) => {
            if verbose {
                let time = std::time::Instant::now();
                let value = $val;
                println!("{} took {}ms", $name, time.elapsed().as_millis());
                value
            } else {
                $val
            }
        };
    }

    let image = log!("read image", image::open(&input))
        .with_context(|| format!("failed to read {}", input.display()))?;
    let source = PixelBuffer::from(&image.into_rgba8());

    let options = if gbc {
        ProcessOptions::game_boy_color()
    } else {
        ProcessOptions::new()
            .rgb_bits(bits.unwrap_or_default())
            .mode(mode.into())
            .tile_size(tile_size.0, tile_size.1)
            .output_size(output_size.0, output_size.1)
            .palettes_grid_size(grid.0, grid.1)
    }
    .palette_size(k)
    .fidelity(fidelity)
    .max_iters(max_iters)
    .seed(seed);

    let result = log!(
        "processing",
        match threads {
            0 => pixquant::process_par(&source, &options),
            1 => pixquant::process(&source, &options),
            t => rayon::ThreadPoolBuilder::new()
                .num_threads(t.into())
                .build()?
                .install(|| pixquant::process_par(&source, &options)),
        }
    )?;

    if verbose {
        println!(
            "{} palette(s), game boy color compatible: {}",
            result.palettes.len(),
            result.gbc_compatible
        );
    }

    if let Some(path) = asm {
        let encoded = log!("gbc encoding", gbc::encode(&result))
            .context("the result does not fit the Game Boy Color restrictions")?;
        log!("write asm", std::fs::write(&path, encoded.to_asm()))
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    log!("write image", result.image.save_png(&output, upscale))?;
    Ok(())
}
