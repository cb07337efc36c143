//! Palette selection and nearest color substitution.
//!
//! Distances are euclidean over red, green and blue, with alpha joining in only when the
//! candidate palettes carry the [`TRANSPARENT`] entry (see [`Channels`]).
//! Exact ties always resolve to the lowest index.

use crate::{nearest::NearestTable, Channels, Palette, Pixel, TRANSPARENT};

use std::array;

use ordered_float::OrderedFloat;
use palette::cast;
#[cfg(feature = "threads")]
use rayon::prelude::*;

/// The first `N` components of `color` as floats.
#[inline]
fn components<const N: usize>(color: Pixel) -> [f32; N] {
    let color = cast::into_array(color);
    array::from_fn(|i| f32::from(color[i]))
}

/// Builds the nearest color table for `palette`.
fn table<const N: usize>(palette: &Palette) -> NearestTable<N> {
    let colors = palette.iter().map(|&c| components(c)).collect::<Vec<_>>();
    NearestTable::new(&colors)
}

/// Sum of the distances from each pixel to its nearest palette color.
fn total_distance<const N: usize>(pixels: &[Pixel], palette: &Palette) -> f64 {
    let table = table::<N>(palette);
    pixels
        .iter()
        .map(|&p| f64::from(table.nearest(components(p)).1).sqrt())
        .sum()
}

/// Nearest palette index of every pixel.
fn indices<const N: usize>(pixels: &[Pixel], palette: &Palette) -> Vec<usize> {
    let table = table::<N>(palette);
    pixels.iter().map(|&p| table.nearest(components(p)).0).collect()
}

/// Parallel version of [`indices`].
#[cfg(feature = "threads")]
fn indices_par<const N: usize>(pixels: &[Pixel], palette: &Palette) -> Vec<usize> {
    let table = table::<N>(palette);
    pixels.par_iter().map(|&p| table.nearest(components(p)).0).collect()
}

/// Returns the index of the palette with the smallest total distance to `pixels`,
/// or `None` if `palettes` is empty.
///
/// For each candidate, the euclidean distance from every pixel to its nearest color in that
/// palette is summed. With a single candidate, no distances are computed at all.
#[must_use]
pub fn best_palette_index(pixels: &[Pixel], palettes: &[Palette]) -> Option<usize> {
    if palettes.len() <= 1 {
        return if palettes.is_empty() { None } else { Some(0) };
    }

    let total = match Channels::for_palettes(palettes) {
        Channels::Rgb => total_distance::<3>,
        Channels::Rgba => total_distance::<4>,
    };

    palettes
        .iter()
        .map(|palette| OrderedFloat(total(pixels, palette)))
        .enumerate()
        .min_by_key(|&(_, distance)| distance)
        .map(|(i, _)| i)
}

/// Returns the palette that represents `pixels` best. See [`best_palette_index`].
#[must_use]
pub fn best_palette<'a>(pixels: &[Pixel], palettes: &'a [Palette]) -> Option<&'a Palette> {
    best_palette_index(pixels, palettes).map(|i| &palettes[i])
}

/// Returns, for every pixel, the index of its nearest color in `palette`.
///
/// Every index is less than `palette.len()`, provided the palette is not empty.
#[must_use]
pub fn index_map(pixels: &[Pixel], palette: &Palette) -> Vec<usize> {
    match Channels::for_palette(palette) {
        Channels::Rgb => indices::<3>(pixels, palette),
        Channels::Rgba => indices::<4>(pixels, palette),
    }
}

/// Replaces every pixel with its nearest color in `palette`.
#[must_use]
pub fn substitute(pixels: &[Pixel], palette: &Palette) -> Vec<Pixel> {
    lookup(&index_map(pixels, palette), palette)
}

/// Maps palette indices back to their colors.
fn lookup(indices: &[usize], palette: &Palette) -> Vec<Pixel> {
    indices
        .iter()
        .map(|&i| palette.get(i).copied().unwrap_or(TRANSPARENT))
        .collect()
}

/// Computes the same result as [`index_map`], but in parallel.
#[cfg(feature = "threads")]
#[must_use]
pub fn index_map_par(pixels: &[Pixel], palette: &Palette) -> Vec<usize> {
    match Channels::for_palette(palette) {
        Channels::Rgb => indices_par::<3>(pixels, palette),
        Channels::Rgba => indices_par::<4>(pixels, palette),
    }
}

/// Computes the same result as [`substitute`], but in parallel.
#[cfg(feature = "threads")]
#[must_use]
pub fn substitute_par(pixels: &[Pixel], palette: &Palette) -> Vec<Pixel> {
    lookup(&index_map_par(pixels, palette), palette)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;

    #[test]
    fn single_palette_is_returned_as_is() {
        let palettes = [Palette::new(vec![rgb(1, 2, 3)])];
        let pixels = random_pixels(64, 14);

        let best = best_palette(&pixels, &palettes);
        assert!(best.is_some_and(|p| std::ptr::eq(p, &palettes[0])));
        assert_eq!(best_palette_index(&[], &palettes), Some(0));
        assert_eq!(best_palette_index(&pixels, &[]), None);
    }

    #[test]
    fn indices_are_in_range() {
        let pixels = random_pixels(4096, 15);
        for len in [1, 2, 5, 8, 9, 31, 255] {
            let palette = Palette::new(random_pixels(len, 16));
            let indices = index_map(&pixels, &palette);
            assert_eq!(indices.len(), pixels.len());
            assert!(indices.iter().all(|&i| i < len));
        }
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn large_palettes_keep_full_indices() {
        let mut colors = (0..300u32)
            .map(|i| rgb((i % 200) as u8, (i / 200) as u8, 7))
            .collect::<Vec<_>>();
        colors[299] = rgb(0, 0, 250);
        let palette = Palette::new(colors);

        let pixels = [rgb(0, 0, 250), rgb(0, 1, 7), rgb(43, 0, 7)];
        assert_eq!(index_map(&pixels, &palette), [299, 200, 43]);
        assert_eq!(substitute(&pixels, &palette), pixels);

        #[cfg(feature = "threads")]
        assert_eq!(index_map_par(&pixels, &palette), [299, 200, 43]);
    }

    #[test]
    fn closest_palette_wins() {
        let red = Palette::new(vec![rgb(250, 0, 0), rgb(128, 0, 0)]);
        let blue = Palette::new(vec![rgb(0, 0, 250), rgb(0, 0, 128)]);
        let palettes = [red.clone(), blue.clone()];

        let reddish = vec![rgb(240, 10, 10); 16];
        let bluish = vec![rgb(5, 5, 140); 16];
        assert_eq!(best_palette(&reddish, &palettes), Some(&red));
        assert_eq!(best_palette(&bluish, &palettes), Some(&blue));
    }

    #[test]
    fn ties_pick_first() {
        let palette = Palette::new(vec![rgb(0, 0, 0), rgb(255, 255, 255)]);
        let palettes = [palette.clone(), palette.clone(), palette];
        assert_eq!(best_palette_index(&random_pixels(32, 17), &palettes), Some(0));

        let duplicates = Palette::new(vec![rgb(9, 9, 9), rgb(200, 0, 0), rgb(200, 0, 0)]);
        assert_eq!(index_map(&[rgb(190, 0, 0)], &duplicates), [1]);

        // equidistant from both entries
        let pair = Palette::new(vec![rgb(10, 0, 0), rgb(0, 0, 0)]);
        assert_eq!(index_map(&[rgb(5, 0, 0)], &pair), [0]);
    }

    #[test]
    fn transparent_pixels_map_to_transparent_entry() {
        let palette = Palette::new(vec![rgb(0, 0, 0), rgb(255, 255, 255), TRANSPARENT]);
        let pixels = [rgb(10, 10, 10), TRANSPARENT, rgb(240, 240, 240)];
        assert_eq!(
            substitute(&pixels, &palette),
            [rgb(0, 0, 0), TRANSPARENT, rgb(255, 255, 255)]
        );
    }

    #[test]
    #[cfg(feature = "threads")]
    fn single_and_multi_threaded_match() {
        let pixels = random_pixels(8192, 18);
        let palette = Palette::new(random_pixels(37, 19));
        assert_eq!(index_map(&pixels, &palette), index_map_par(&pixels, &palette));
        assert_eq!(substitute(&pixels, &palette), substitute_par(&pixels, &palette));
    }
}
