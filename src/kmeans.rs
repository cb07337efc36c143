//! Frequency weighted k-means over deduplicated colors.
//!
//! Each run is a plain Lloyd iteration over the unique colors of a [`WeightedPoints`]:
//! every unique color is assigned to its nearest centroid, and every centroid moves to the
//! count-weighted average of its assigned colors. Iteration stops once the total centroid
//! displacement has shrunk, relative to the first iteration, below a tolerance derived from the
//! fidelity setting.

use crate::{nearest::NearestTable, Palette, PaletteSize, Pixel, WeightedPoints, TRANSPARENT};

use palette::cast;
use rand::{prelude::Distribution, SeedableRng};
use rand_distr::Uniform;
use rand_xoshiro::Xoroshiro128PlusPlus;

/// A builder struct to specify the parameters for k-means.
///
/// # Examples
/// ```
/// # use pixquant::kmeans::KmeansOptions;
/// let options = KmeansOptions::new()
///     .fidelity(6)
///     .seed(42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmeansOptions {
    /// The maximum number of refinement iterations.
    max_iters: u32,
    /// Controls the convergence tolerance, higher values iterate longer.
    fidelity: u8,
    /// The seed value for the random number generator.
    seed: u64,
}

impl Default for KmeansOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl KmeansOptions {
    /// The default maximum number of iterations.
    pub const DEFAULT_MAX_ITERS: u32 = 200;

    /// The minimum fidelity.
    pub const MIN_FIDELITY: u8 = 1;

    /// The maximum fidelity.
    pub const MAX_FIDELITY: u8 = 10;

    /// Creates a new [`KmeansOptions`] with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_iters: Self::DEFAULT_MAX_ITERS,
            fidelity: 4,
            seed: 0,
        }
    }

    /// Sets the maximum number of iterations.
    ///
    /// The default is [`KmeansOptions::DEFAULT_MAX_ITERS`].
    /// Reaching this limit is not an error, the current centroids are used as is.
    #[must_use]
    pub const fn max_iters(mut self, max_iters: u32) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Sets the fidelity, which is clamped to `1..=10`.
    ///
    /// Each step up in fidelity tightens the convergence tolerance by a factor of three.
    /// The default fidelity is `4`.
    #[must_use]
    pub fn fidelity(mut self, fidelity: u8) -> Self {
        self.fidelity = fidelity.clamp(Self::MIN_FIDELITY, Self::MAX_FIDELITY);
        self
    }

    /// Sets the seed value for the random number generator.
    ///
    /// The default seed is `0`.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Returns the maximum number of iterations.
    #[must_use]
    pub const fn get_max_iters(&self) -> u32 {
        self.max_iters
    }

    /// Returns the fidelity.
    #[must_use]
    pub const fn get_fidelity(&self) -> u8 {
        self.fidelity
    }

    /// Returns the seed.
    #[must_use]
    pub const fn get_seed(&self) -> u64 {
        self.seed
    }

    /// The relative epsilon at or below which k-means is considered converged: `(1/3)^(fidelity - 1)`.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        (1.0f64 / 3.0).powi(i32::from(self.fidelity) - 1)
    }
}

/// The output of a single k-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// The rounded, sorted and padded palette.
    ///
    /// It has exactly `k` entries, plus a trailing [`TRANSPARENT`] entry if the input
    /// contained any transparent pixel.
    pub palette: Palette,
    /// The number of refinement iterations that were run.
    pub iterations: u32,
    /// The relative epsilon after the last iteration.
    pub rel_epsilon: f64,
    /// Whether the tolerance was reached before the iteration limit.
    pub converged: bool,
}

/// Tracks the relative improvement of the centroid displacement over the iterations.
#[derive(Debug, Clone, Copy)]
struct Convergence {
    /// The total displacement of the first iteration.
    start_epsilon: f64,
    /// The latest displacement relative to `start_epsilon`.
    rel_epsilon: f64,
}

impl Convergence {
    /// No iteration recorded yet.
    const fn new() -> Self {
        Self { start_epsilon: 0.0, rel_epsilon: 1.0 }
    }

    /// Records the displacement of the given iteration and returns the new relative epsilon.
    fn update(&mut self, iteration: u32, epsilon: f64) -> f64 {
        if iteration == 0 {
            self.start_epsilon = epsilon;
        }

        // a first iteration that moved nothing is already stationary
        self.rel_epsilon = if self.start_epsilon <= 0.0 {
            0.0
        } else if iteration == 0 {
            1.0
        } else {
            epsilon / self.start_epsilon
        };

        self.rel_epsilon
    }
}

/// Euclidean distance between two centroids.
fn distance(a: [f32; 4], b: [f32; 4]) -> f64 {
    a.iter()
        .zip(&b)
        .map(|(&a, &b)| {
            let d = f64::from(a) - f64::from(b);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// The mutable state of a single k-means run.
struct State<'a> {
    /// The unique colors and their counts.
    points: &'a WeightedPoints,
    /// The unique colors as floats.
    colors: Vec<[f32; 4]>,
    /// The current centroids.
    means: Vec<[f32; 4]>,
    /// The random number generator for initialization and resampling.
    rng: Xoroshiro128PlusPlus,
    /// Uniform distribution over the indices of `colors`.
    distribution: Uniform<usize>,
}

impl<'a> State<'a> {
    /// Picks `k` distinct unique colors as the initial centroids.
    ///
    /// The number of unique colors must be greater than `k`.
    fn new(points: &'a WeightedPoints, k: usize, seed: u64) -> Self {
        let colors = points
            .color_components()
            .iter()
            .map(|c| c.map(f32::from))
            .collect::<Vec<_>>();

        let mut state = Self {
            points,
            colors,
            means: Vec::with_capacity(k),
            rng: Xoroshiro128PlusPlus::seed_from_u64(seed),
            distribution: Uniform::new(0, points.len()),
        };

        for _ in 0..k {
            let mean = state.sample_from_data();
            state.means.push(mean);
        }

        state
    }

    /// Draws a random unique color that is not equal to any current centroid.
    #[allow(clippy::float_cmp)]
    fn sample_from_data(&mut self) -> [f32; 4] {
        loop {
            let candidate = self.colors[self.distribution.sample(&mut self.rng)];
            if !self.means.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// Runs one assignment + update step and returns the total centroid displacement.
    #[allow(clippy::cast_possible_truncation)]
    fn run_one_iteration(&mut self) -> f64 {
        let table = NearestTable::new(&self.means);

        let k = self.means.len();
        let mut sums = vec![[0.0f64; 4]; k];
        let mut weights = vec![0u64; k];

        for (color, &count) in self.colors.iter().zip(self.points.counts()) {
            let (i, _) = table.nearest(*color);
            let w = f64::from(count);
            for (sum, &c) in sums[i].iter_mut().zip(color) {
                *sum += w * f64::from(c);
            }
            weights[i] += u64::from(count);
        }

        let mut epsilon = 0.0;
        for i in 0..k {
            let old = self.means[i];
            let new = if weights[i] == 0 {
                self.sample_from_data()
            } else {
                #[allow(clippy::cast_precision_loss)]
                let w = weights[i] as f64;
                sums[i].map(|s| (s / w) as f32)
            };
            epsilon += distance(old, new);
            self.means[i] = new;
        }

        epsilon
    }
}

/// Rounds the centroids to 8-bit colors, then sorts, deduplicates and pads them to `k` entries.
///
/// A [`TRANSPARENT`] entry is appended after padding if `transparency` is set.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn finalize(means: &[[f32; 4]], k: usize, transparency: bool) -> Palette {
    let mut colors = means
        .iter()
        .map(|m| m.map(|c| c.round_ties_even().clamp(0.0, 255.0) as u8))
        .collect::<Vec<_>>();

    colors.sort_unstable();
    colors.dedup();
    colors.truncate(k);

    let mut palette = cast::from_array_vec::<Pixel>(colors);
    let last = palette.last().copied().unwrap_or(TRANSPARENT);
    palette.resize(k, last);

    if transparency {
        palette.push(TRANSPARENT);
    }

    Palette::new(palette)
}

/// Clusters the given pixels into a palette of `k` colors.
///
/// See [`cluster_points`] for details.
#[must_use]
pub fn cluster(pixels: &[Pixel], k: PaletteSize, options: &KmeansOptions) -> Clustering {
    cluster_points(&WeightedPoints::new(pixels), k, options)
}

/// Clusters already deduplicated points into a palette of `k` colors.
///
/// If there are at most `k` unique colors, these are returned directly without iterating.
/// Otherwise, `k` distinct initial centroids are drawn at random and refined until the relative
/// epsilon drops to [`KmeansOptions::tolerance`] or [`KmeansOptions::get_max_iters`] is reached.
/// An empty cluster has its centroid replaced by a random unique color.
#[must_use]
pub fn cluster_points(
    points: &WeightedPoints,
    k: PaletteSize,
    options: &KmeansOptions,
) -> Clustering {
    let k = k.as_usize();
    let transparency = points.has_transparency();

    if points.len() <= k {
        let colors = points
            .color_components()
            .iter()
            .map(|c| c.map(f32::from))
            .collect::<Vec<_>>();

        return Clustering {
            palette: finalize(&colors, k, transparency),
            iterations: 0,
            rel_epsilon: 0.0,
            converged: true,
        };
    }

    let tolerance = options.tolerance();
    log::debug!(
        "running k-means on {} unique colors with k = {k} and tolerance {tolerance:.6}",
        points.len(),
    );

    let mut state = State::new(points, k, options.seed);
    let mut convergence = Convergence::new();
    let mut iterations = 0;
    let mut converged = false;

    for iteration in 0..options.max_iters {
        let epsilon = state.run_one_iteration();
        iterations = iteration + 1;

        if convergence.update(iteration, epsilon) <= tolerance {
            converged = true;
            break;
        }
    }

    log::debug!(
        "k-means finished after {iterations} iterations with relative epsilon {:.6} (converged: {converged})",
        convergence.rel_epsilon,
    );

    Clustering {
        palette: finalize(&state.means, k, transparency),
        iterations,
        rel_epsilon: convergence.rel_epsilon,
        converged,
    }
}
