//! Cropping, resampling and region splitting.

use crate::PixelBuffer;

use std::ops::Range;

/// Center-crops the longer axis of `image` so that its aspect ratio matches `target_aspect`.
///
/// Nothing is cropped if the ratios already differ by at most 1%.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub(crate) fn crop_to_aspect(image: &PixelBuffer, target_aspect: f64) -> PixelBuffer {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let aspect = f64::from(width) / f64::from(height);
    if ((target_aspect - aspect) / target_aspect).abs() <= 0.01 {
        return image.clone();
    }

    if aspect > target_aspect {
        let target_width = f64::from(height) * target_aspect;
        let delta = ((f64::from(width) - target_width) / 2.0) as u32;
        image.crop(delta, 0, width - 2 * delta, height)
    } else {
        let target_height = f64::from(width) / target_aspect;
        let delta = ((f64::from(height) - target_height) / 2.0) as u32;
        image.crop(0, delta, width, height - 2 * delta)
    }
}

/// Maps a destination coordinate to the source coordinate under its pixel center.
#[inline]
#[allow(clippy::cast_possible_truncation)]
fn source_coordinate(dst: u32, dst_len: u32, src_len: u32) -> u32 {
    // floor((dst + 0.5) * src_len / dst_len) in exact integer arithmetic
    let src = ((2 * u64::from(dst) + 1) * u64::from(src_len)) / (2 * u64::from(dst_len));
    (src as u32).min(src_len.saturating_sub(1))
}

/// Nearest neighbor resampling of `image` to `width x height`.
pub(crate) fn resize_nearest(image: &PixelBuffer, width: u32, height: u32) -> PixelBuffer {
    let (src_width, src_height) = image.dimensions();
    if (src_width, src_height) == (width, height) {
        return image.clone();
    }

    if image.is_empty() || width == 0 || height == 0 {
        return PixelBuffer::new_unchecked(0, 0, Vec::new());
    }

    let columns = (0..width)
        .map(|x| source_coordinate(x, width, src_width) as usize)
        .collect::<Vec<_>>();

    let pixels = image.pixels();
    let mut resized = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        let row = source_coordinate(y, height, src_height) as usize * src_width as usize;
        resized.extend(columns.iter().map(|&x| pixels[row + x]));
    }

    PixelBuffer::new_unchecked(width, height, resized)
}

/// Splits `0..total` into `groups` consecutive ranges.
///
/// The first `groups - 1` ranges have length `total / groups`, the last one takes the rest.
pub(crate) fn split_lengths(total: u32, groups: u32) -> Vec<Range<u32>> {
    let groups = groups.max(1);
    let size = total / groups;
    (0..groups)
        .map(|i| {
            let start = i * size;
            let end = if i == groups - 1 { total } else { start + size };
            start..end
        })
        .collect()
}

/// Scales `width x height` down (never up) to fit within `budget` pixels, keeping at least 1x1.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub(crate) fn sample_dimensions(width: u32, height: u32, budget: u64) -> (u32, u32) {
    let pixels = u64::from(width) * u64::from(height);
    if pixels == 0 {
        return (width, height);
    }

    let scale = (budget as f64 / pixels as f64).sqrt().min(1.0);
    let scaled = |len: u32| ((f64::from(len) * scale) as u32).max(1);
    (scaled(width), scaled(height))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tests::*;

    #[test]
    fn last_region_takes_remainder() {
        for (total, groups) in [(10, 3), (128, 4), (7, 7), (5, 8), (1000, 6), (9, 1)] {
            let ranges = split_lengths(total, groups);
            assert_eq!(ranges.len(), groups as usize);

            let (last, rest) = ranges.split_last().unwrap();
            for range in rest {
                assert_eq!(range.len() as u32, total / groups);
            }
            assert_eq!(last.end, total);

            let sum = ranges.iter().map(|r| r.len() as u32).sum::<u32>();
            assert_eq!(sum, total);
            for pair in ranges.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
        }

        assert_eq!(split_lengths(10, 3), [0..3, 3..6, 6..10]);
    }

    #[test]
    fn crop_keeps_center() {
        let image = bands(40, 10, &[rgb(255, 0, 0), rgb(0, 255, 0), rgb(0, 0, 255), rgb(9, 9, 9)]);

        // 40x10 -> 1:1 removes 15 columns from each side
        let cropped = crop_to_aspect(&image, 1.0);
        assert_eq!(cropped.dimensions(), (10, 10));
        assert_eq!(cropped.get(0, 0), Some(rgb(0, 255, 0)));
        assert_eq!(cropped.get(9, 9), Some(rgb(0, 0, 255)));

        let tall = crop_to_aspect(&image.crop(0, 0, 10, 10).upscale(2), 2.0);
        assert_eq!(tall.dimensions(), (20, 10));
    }

    #[test]
    fn crop_tolerates_small_differences() {
        let image = test_image_64();
        assert_eq!(crop_to_aspect(&image, 1.005), image);
        assert_eq!(crop_to_aspect(&image, 1.5).dimensions(), (64, 44));
    }

    #[test]
    fn resize_samples_pixel_centers() {
        let image = bands(4, 1, &[rgb(1, 1, 1), rgb(2, 2, 2), rgb(3, 3, 3), rgb(4, 4, 4)]);
        let half = resize_nearest(&image, 2, 1);
        assert_eq!(half.pixels(), &[rgb(2, 2, 2), rgb(4, 4, 4)]);

        let double = resize_nearest(&image, 8, 2);
        assert_eq!(double, image.upscale(2).crop(0, 0, 8, 2));

        let same = test_image_64();
        assert_eq!(resize_nearest(&same, 64, 64), same);
    }

    #[test]
    fn sample_size_respects_budget() {
        assert_eq!(sample_dimensions(64, 64, 128 * 128), (64, 64));
        assert_eq!(sample_dimensions(256, 256, 128 * 128), (128, 128));
        assert_eq!(sample_dimensions(1000, 10, 100), (100, 1));
        assert_eq!(sample_dimensions(3, 3, 1), (1, 1));
        let (w, h) = sample_dimensions(640, 480, 128 * 128);
        assert!(u64::from(w) * u64::from(h) <= 128 * 128);
    }
}
