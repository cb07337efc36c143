//! Contains the code for color/pixel deduplication.

use crate::{Pixel, ALPHA_THRESHOLD};

use std::cmp::Ordering;

use palette::cast::{self, AsArrays};
#[cfg(feature = "threads")]
use rayon::prelude::*;

/// Deduplicated opaque colors and their frequency counts.
///
/// Pixels with an alpha below [`ALPHA_THRESHOLD`] are dropped (and remembered through
/// [`WeightedPoints::has_transparency`]). Pixels above it have their alpha forced to `255`,
/// while an alpha of exactly the threshold is left alone.
/// The unique colors are sorted lexicographically by their `(r, g, b, a)` components.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WeightedPoints {
    /// The unique colors.
    colors: Vec<Pixel>,
    /// The number of times each color was present in the original pixels.
    counts: Vec<u32>,
    /// The total number of opaque pixels.
    total_count: u32,
    /// Whether any transparent pixel was removed.
    has_transparency: bool,
}

/// Packs an opaque color into a `u32` whose ordering matches the lexicographic order of its components.
///
/// An alpha of exactly [`ALPHA_THRESHOLD`] is kept as is.
#[inline]
fn opaque_key(&[r, g, b, a]: &[u8; 4]) -> Option<u32> {
    match a.cmp(&ALPHA_THRESHOLD) {
        Ordering::Less => None,
        Ordering::Equal => Some(u32::from_be_bytes([r, g, b, a])),
        Ordering::Greater => Some(u32::from_be_bytes([r, g, b, u8::MAX])),
    }
}

impl WeightedPoints {
    /// Creates a new [`WeightedPoints`] from a slice of pixels.
    #[must_use]
    pub fn new(pixels: &[Pixel]) -> Self {
        let mut keys = pixels
            .as_arrays()
            .iter()
            .filter_map(opaque_key)
            .collect::<Vec<_>>();

        let has_transparency = keys.len() < pixels.len();
        keys.sort_unstable();
        Self::from_sorted_keys(&keys, has_transparency)
    }

    /// Creates a new [`WeightedPoints`] in parallel from a slice of pixels.
    #[cfg(feature = "threads")]
    #[must_use]
    pub fn new_par(pixels: &[Pixel]) -> Self {
        let mut keys = pixels
            .as_arrays()
            .par_iter()
            .filter_map(opaque_key)
            .collect::<Vec<_>>();

        let has_transparency = keys.len() < pixels.len();
        keys.par_sort_unstable();
        Self::from_sorted_keys(&keys, has_transparency)
    }

    /// Run-length counts the sorted keys.
    #[allow(clippy::cast_possible_truncation)]
    fn from_sorted_keys(keys: &[u32], has_transparency: bool) -> Self {
        let mut colors = Vec::new();
        let mut counts = Vec::new();

        for run in keys.chunk_by(|a, b| a == b) {
            colors.push(cast::from_array(run[0].to_be_bytes()));
            counts.push(run.len() as u32);
        }

        Self {
            colors,
            counts,
            total_count: keys.len() as u32,
            has_transparency,
        }
    }

    /// Returns the slice of unique colors.
    #[must_use]
    pub fn colors(&self) -> &[Pixel] {
        &self.colors
    }

    /// The unique colors as component arrays.
    #[must_use]
    pub fn color_components(&self) -> &[[u8; 4]] {
        self.colors.as_arrays()
    }

    /// Returns the number of times each unique color was present in the original pixels.
    #[must_use]
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Returns the number of opaque pixels.
    ///
    /// This is equal to the sum of [`WeightedPoints::counts`].
    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.total_count
    }

    /// Returns the number of unique colors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Whether there are no opaque colors at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Whether the original pixels contained any transparent pixel.
    #[must_use]
    pub fn has_transparency(&self) -> bool {
        self.has_transparency
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tests::*;
    use rand::{seq::SliceRandom, SeedableRng};
    use rand_xoshiro::Xoroshiro128PlusPlus;

    fn assert_valid(points: &WeightedPoints, pixels: &[Pixel]) {
        let colors = points.color_components();
        for i in 1..colors.len() {
            assert!(colors[i - 1] < colors[i]);
        }

        assert_eq!(points.counts().iter().sum::<u32>(), points.total_count());
        for (&color, &count) in points.colors().iter().zip(points.counts()) {
            let expected = pixels.iter().filter(|&&p| p == color).count();
            assert_eq!(count as usize, expected);
        }
    }

    #[test]
    fn empty_input() {
        let points = WeightedPoints::new(&[]);
        assert!(points.is_empty() && points.counts().is_empty());
        assert_eq!(points.total_count(), 0);
        assert!(!points.has_transparency());
    }

    #[test]
    fn duplicates_are_counted() {
        let mut pixels = random_pixels(256, 1);
        pixels.extend_from_within(..32);
        pixels.push(pixels[0]);

        let points = WeightedPoints::new(&pixels);
        assert_valid(&points, &pixels);
        assert_eq!(points.total_count() as usize, pixels.len());

        let i = points.colors().iter().position(|&c| c == pixels[0]).unwrap();
        assert_eq!(points.counts()[i], 3);
    }

    #[test]
    fn reordered_input() {
        let pixels = [random_pixels(512, 2), random_pixels(512, 2)].concat();
        let mut reordered = pixels.clone();
        reordered.shuffle(&mut Xoroshiro128PlusPlus::seed_from_u64(0));

        assert_eq!(WeightedPoints::new(&pixels), WeightedPoints::new(&reordered));
    }

    #[test]
    fn transparency_is_stripped() {
        let pixels = vec![
            rgb(10, 20, 30),
            Pixel::new(10, 20, 30, 200),
            Pixel::new(255, 255, 255, 0),
            Pixel::new(1, 2, 3, 126),
            Pixel::new(10, 20, 30, ALPHA_THRESHOLD),
        ];

        let points = WeightedPoints::new(&pixels);
        assert!(points.has_transparency());
        assert_eq!(
            points.colors(),
            &[Pixel::new(10, 20, 30, ALPHA_THRESHOLD), rgb(10, 20, 30)]
        );
        assert_eq!(points.counts(), &[1, 2]);
        assert_eq!(points.total_count(), 3);
    }

    #[test]
    #[cfg(feature = "threads")]
    fn single_and_multi_threaded_match() {
        let mut pixels = random_pixels(4096, 3);
        pixels.extend_from_within(..1024);
        pixels.push(Pixel::new(0, 0, 0, 0));

        let single = WeightedPoints::new(&pixels);
        let par = WeightedPoints::new_par(&pixels);
        assert_eq!(single, par);
    }
}
