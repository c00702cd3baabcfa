//! Transition effect for state-changing commands.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// How a bulb transitions to a newly commanded state.
///
/// Serialized into command params as the lowercase wire string
/// (`"smooth"` / `"sudden"`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    /// Gradual transition over the configured duration.
    #[default]
    Smooth,
    /// Immediate transition; the duration param is ignored by firmware.
    Sudden,
}
