//! Gradual adjustment parameters for `set_adjust`.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Direction of a `set_adjust` change, serialized as the lowercase wire
/// string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AdjustAction {
    Increase,
    Decrease,
    /// Increase, wrapping back to the minimum after the maximum. The only
    /// action the protocol accepts for [`AdjustProp::Color`].
    Circle,
}

/// Property adjusted by `set_adjust`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AdjustProp {
    Bright,
    Ct,
    Color,
}
