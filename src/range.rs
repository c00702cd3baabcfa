//! Range validators for command parameters.
//!
//! Pure functions used by [`crate::Session`] verbs before any wire I/O is
//! attempted; an out-of-bounds value fails with [`Error::Range`] and no
//! partial write occurs.

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Color temperature bounds in Kelvin.
pub const CT_MIN: u16 = 1700;
pub const CT_MAX: u16 = 6500;

/// Packed 24-bit RGB upper bound.
pub const RGB_MAX: u32 = 16_777_215;

/// Validate a color temperature (1700 - 6500 K).
pub fn ct_check_range(ct: u16) -> Result<()> {
    if (CT_MIN..=CT_MAX).contains(&ct) {
        Ok(())
    } else {
        Err(Error::range("ct", ct as i64, CT_MIN as i64, CT_MAX as i64))
    }
}

/// Validate a packed RGB value, or separate channels when `full` is `None`.
///
/// The separate channels are `u8` so they cannot be out of range; they are
/// accepted here so callers validate through a single entry point.
pub fn rgb_check_range(full: Option<u32>, _r: u8, _g: u8, _b: u8) -> Result<()> {
    match full {
        Some(full) if full > RGB_MAX => Err(Error::range("rgb", full as i64, 0, RGB_MAX as i64)),
        _ => Ok(()),
    }
}

/// Validate a hue (0 - 359 degrees).
pub fn hue_check_range(hue: u16) -> Result<()> {
    if hue <= 359 {
        Ok(())
    } else {
        Err(Error::range("hue", hue as i64, 0, 359))
    }
}

/// Validate a saturation (0 - 100).
pub fn sat_check_range(sat: u8) -> Result<()> {
    if sat <= 100 {
        Ok(())
    } else {
        Err(Error::range("sat", sat as i64, 0, 100))
    }
}

/// Validate a brightness (1 - 100).
pub fn bright_check_range(bright: u8) -> Result<()> {
    if (1..=100).contains(&bright) {
        Ok(())
    } else {
        Err(Error::range("bright", bright as i64, 1, 100))
    }
}

/// Validate an adjustment percentage (-100 - 100).
pub fn percent_check_range(percent: i8) -> Result<()> {
    if (-100..=100).contains(&percent) {
        Ok(())
    } else {
        Err(Error::range("percentage", percent as i64, -100, 100))
    }
}

/// Pack separate R/G/B channels into one 24-bit integer (big-endian
/// channel order). Performs no validation; callers validate first.
pub fn rgb_to_full(r: u8, g: u8, b: u8) -> u32 {
    (r as u32) * 65536 + (g as u32) * 256 + b as u32
}
