//! Bit depth reduction of palette colors.
//!
//! Each channel is snapped to the nearest value representable with the given number of bits and
//! then expanded back to 8 bits, which reproduces the banding of a low bit depth display.

use crate::{Palette, Pixel};

/// The number of bits per red, green and blue channel.
///
/// Every channel is clamped to `1..=16`. The value `16/16/16` means "no limit" and leaves colors
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RgbBits {
    /// Bits of the red channel.
    pub red: u8,
    /// Bits of the green channel.
    pub green: u8,
    /// Bits of the blue channel.
    pub blue: u8,
}

impl Default for RgbBits {
    fn default() -> Self {
        Self::UNLIMITED
    }
}

impl RgbBits {
    /// The largest accepted number of bits per channel.
    pub const MAX: u8 = 16;

    /// No bit depth reduction.
    pub const UNLIMITED: Self = Self { red: Self::MAX, green: Self::MAX, blue: Self::MAX };

    /// Creates a new [`RgbBits`], clamping each channel to `1..=16`.
    #[must_use]
    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        let clamp = |bits: u8| bits.clamp(1, Self::MAX);
        Self {
            red: clamp(red),
            green: clamp(green),
            blue: clamp(blue),
        }
    }

    /// The 5 bits per channel of the Game Boy Color.
    #[must_use]
    pub const fn gbc() -> Self {
        Self { red: 5, green: 5, blue: 5 }
    }

    /// Whether this is the "no limit" setting.
    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        *self == Self::UNLIMITED
    }
}

/// Snaps one 8-bit channel onto the lattice of `bits` bit values.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn requantize_channel(value: u8, bits: u8) -> u8 {
    let scale = (f64::from((1u32 << bits) - 1)) / 255.0;
    let stored = (f64::from(value) * scale).round_ties_even();
    (stored / scale).round_ties_even().clamp(0.0, 255.0) as u8
}

/// Reduces the bit depth of the red, green and blue channels of `color`.
///
/// Alpha is left untouched.
#[must_use]
pub fn requantize(color: Pixel, bits: RgbBits) -> Pixel {
    if bits.is_unlimited() {
        return color;
    }

    Pixel::new(
        requantize_channel(color.red, bits.red),
        requantize_channel(color.green, bits.green),
        requantize_channel(color.blue, bits.blue),
        color.alpha,
    )
}

/// Requantizes every color of the palette, keeping its order and length.
#[must_use]
pub fn requantize_palette(palette: &Palette, bits: RgbBits) -> Palette {
    if bits.is_unlimited() {
        return palette.clone();
    }

    palette.iter().map(|&color| requantize(color, bits)).collect::<Vec<_>>().into()
}
