//! Power-on mode for `set_power`.

use serde::{Deserialize, Serialize};

/// Mode the bulb switches into when powered on (wire values 0-5).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerOnMode {
    /// Resume the previous mode.
    #[default]
    Normal = 0,
    /// Color temperature mode.
    Ct = 1,
    /// RGB mode.
    Rgb = 2,
    /// Hue/saturation mode.
    Hsv = 3,
    /// Resume a color flow.
    ColorFlow = 4,
    /// Night light (moonlight) mode.
    NightLight = 5,
}

impl PowerOnMode {
    pub fn value(&self) -> u8 {
        *self as u8
    }
}
