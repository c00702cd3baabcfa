//! RGB color argument for `set_rgb`.

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::range::{rgb_check_range, rgb_to_full};

/// An RGB color, either pre-packed or as separate channels.
///
/// The wire protocol takes one packed 24-bit integer; separate
/// channels are packed with big-endian channel order R,G,B.
///
/// # Examples
///
/// ```
/// use yee_rs::RgbValue;
///
/// assert_eq!(RgbValue::Components(11, 11, 11).packed().unwrap(), 723723);
/// assert_eq!(RgbValue::Full(54363).packed().unwrap(), 54363);
/// assert!(RgbValue::Full(16_777_216).packed().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RgbValue {
    /// Packed 24-bit value, 0 - 16777215.
    Full(u32),
    /// Separate red, green and blue channels.
    Components(u8, u8, u8),
}

impl RgbValue {
    /// Validate and return the packed 24-bit value.
    pub fn packed(&self) -> Result<u32, Error> {
        match *self {
            RgbValue::Full(full) => {
                rgb_check_range(Some(full), 0, 0, 0)?;
                Ok(full)
            }
            RgbValue::Components(r, g, b) => {
                rgb_check_range(None, r, g, b)?;
                Ok(rgb_to_full(r, g, b))
            }
        }
    }
}

impl From<u32> for RgbValue {
    fn from(full: u32) -> Self {
        RgbValue::Full(full)
    }
}

impl From<(u8, u8, u8)> for RgbValue {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        RgbValue::Components(r, g, b)
    }
}
