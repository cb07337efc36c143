#![allow(dead_code)]

use std::sync::OnceLock;

use pixquant::{Pixel, PixelBuffer};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoroshiro128PlusPlus;

/// A smooth diagonal gradient with a little per-pixel noise, so that most colors repeat a few times.
pub fn gradient(width: u32, height: u32, seed: u64) -> PixelBuffer {
    let mut rng = Xoroshiro128PlusPlus::seed_from_u64(seed);
    let pixels = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .map(|(x, y)| {
            let r = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            let b = ((x + y) * 255 / (width + height).max(1)) as u8;
            let n = rng.gen_range(0..8);
            Pixel::new(r.saturating_add(n), g.saturating_add(n), b, 255)
        })
        .collect();

    PixelBuffer::new(width, height, pixels).unwrap()
}

/// Uniform random colors, which makes every color unique.
pub fn noise(width: u32, height: u32, seed: u64) -> PixelBuffer {
    let mut rng = Xoroshiro128PlusPlus::seed_from_u64(seed);
    let pixels = (0..width * height)
        .map(|_| Pixel::new(rng.gen(), rng.gen(), rng.gen(), 255))
        .collect();

    PixelBuffer::new(width, height, pixels).unwrap()
}

static IMAGES: OnceLock<Vec<(String, PixelBuffer)>> = OnceLock::new();

pub fn load_synthetic_images() -> Vec<(String, PixelBuffer)> {
    vec![
        ("gradient_640x480".to_owned(), gradient(640, 480, 0)),
        ("gradient_1920x1080".to_owned(), gradient(1920, 1080, 1)),
        ("noise_640x480".to_owned(), noise(640, 480, 2)),
    ]
}

pub fn synthetic_images() -> &'static [(String, PixelBuffer)] {
    IMAGES.get_or_init(load_synthetic_images)
}
