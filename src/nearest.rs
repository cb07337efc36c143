//! Nearest color lookup shared by the k-means assignment step and palette selection.

use std::array;

use wide::{f32x8, CmpLt};

/// Colors laid out in chunks of 8 lanes per component for SIMD distance computation.
///
/// Unused lanes in the last chunk are filled with infinity so that they are never the nearest.
#[derive(Debug, Clone)]
pub(crate) struct NearestTable<const N: usize> {
    /// The colors, 8 per chunk.
    chunks: Vec<[f32x8; N]>,
}

impl<const N: usize> NearestTable<N> {
    /// Lays out `points` in chunks of 8, padding the last chunk with infinitely distant points.
    pub(crate) fn new(points: &[[f32; N]]) -> Self {
        let mut chunks = Vec::with_capacity(points.len().div_ceil(8));
        let exact = points.chunks_exact(8);
        chunks.extend(
            exact
                .clone()
                .map(|chunk| array::from_fn(|i| f32x8::new(array::from_fn(|j| chunk[j][i])))),
        );

        if !exact.remainder().is_empty() {
            let mut arr = [[f32::INFINITY; 8]; N];
            for (i, color) in exact.remainder().iter().enumerate() {
                for (arr, &c) in arr.iter_mut().zip(color) {
                    arr[i] = c;
                }
            }
            chunks.push(arr.map(f32x8::new));
        }

        Self { chunks }
    }

    /// Returns the index of the nearest point and its squared euclidean distance to `query`.
    ///
    /// Exact ties resolve to the lowest index.
    #[inline]
    pub(crate) fn nearest(&self, query: [f32; N]) -> (usize, f32) {
        let incr = f32x8::splat(1.0);
        let mut cur_chunk = f32x8::ZERO;
        let mut min_chunk = cur_chunk;
        let mut min_distance = f32x8::splat(f32::INFINITY);

        let query = query.map(f32x8::splat);

        for chunk in &self.chunks {
            let mut distance = f32x8::ZERO;
            for i in 0..N {
                let diff = query[i] - chunk[i];
                distance += diff * diff;
            }

            // strictly less, so earlier chunks win ties within a lane
            let mask = distance.cmp_lt(min_distance);
            min_chunk = mask.blend(cur_chunk, min_chunk);
            min_distance = mask.blend(distance, min_distance);
            cur_chunk += incr;
        }

        let mut min_index = 0;
        let mut min_dist = f32::INFINITY;
        for (lane, (&dist, &chunk)) in min_distance
            .as_array_ref()
            .iter()
            .zip(min_chunk.as_array_ref())
            .enumerate()
        {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let index = chunk as usize * 8 + lane;
            if dist < min_dist || (dist == min_dist && index < min_index) {
                min_dist = dist;
                min_index = index;
            }
        }

        (min_index, min_dist)
    }
}
