//! Color-flow effect types and expression encoding.

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::range::{bright_check_range, ct_check_range, rgb_check_range};

type Result<T> = std::result::Result<T, Error>;

/// Minimum duration of a single flow step in milliseconds.
pub const FLOW_STEP_MIN_MS: u64 = 50;

/// What a bulb does when a color flow finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    /// Recover the state from before the flow started.
    #[default]
    Recover = 0,
    /// Stay at the state of the last step.
    Stay = 1,
    /// Turn the bulb off.
    Off = 2,
}

impl FlowAction {
    pub fn value(&self) -> u8 {
        *self as u8
    }
}

/// Interpretation of a flow step's `value` field (wire values 1, 2, 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowMode {
    /// `value` is a packed 24-bit RGB color.
    Color = 1,
    /// `value` is a color temperature in Kelvin.
    Temperature = 2,
    /// `value` is ignored; the step is a pause.
    Sleep = 7,
}

impl FlowMode {
    pub fn value(&self) -> u8 {
        *self as u8
    }
}

/// One transition in a multi-step lighting effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStep {
    /// Step duration in milliseconds, at least 50.
    pub duration_ms: u64,
    pub mode: FlowMode,
    /// Packed RGB for [`FlowMode::Color`], Kelvin for
    /// [`FlowMode::Temperature`], ignored for [`FlowMode::Sleep`].
    pub value: u32,
    /// Brightness 1 - 100.
    pub brightness: u8,
}

impl FlowStep {
    /// Validate the step against the per-mode value ranges.
    pub fn validate(&self) -> Result<()> {
        bright_check_range(self.brightness)?;

        if self.duration_ms < FLOW_STEP_MIN_MS {
            return Err(Error::FlowDuration(self.duration_ms));
        }

        match self.mode {
            FlowMode::Color => rgb_check_range(Some(self.value), 0, 0, 0)?,
            FlowMode::Temperature => {
                ct_check_range(u16::try_from(self.value).map_err(|_| {
                    Error::range("ct", self.value as i64, 1700, 6500)
                })?)?;
            }
            FlowMode::Sleep => {}
        }

        Ok(())
    }

    fn encode(&self) -> String {
        format!(
            "{},{},{},{}",
            self.duration_ms,
            self.mode.value(),
            self.value,
            self.brightness
        )
    }
}

/// A flow program: either a pre-encoded expression string or a structured
/// list of steps.
///
/// Structured steps are validated and serialized as comma-joined
/// `duration,mode,value,brightness` tuples; raw expressions are passed
/// through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowExpression {
    Raw(String),
    Steps(Vec<FlowStep>),
}

impl FlowExpression {
    /// Validate (structured steps only) and encode the wire expression.
    pub fn encode(&self) -> Result<String> {
        match self {
            FlowExpression::Raw(expr) => Ok(expr.clone()),
            FlowExpression::Steps(steps) => {
                let mut tuples = Vec::with_capacity(steps.len());
                for step in steps {
                    step.validate()?;
                    tuples.push(step.encode());
                }
                Ok(tuples.join(","))
            }
        }
    }

    /// Number of steps, when known.
    pub fn step_count(&self) -> Option<usize> {
        match self {
            FlowExpression::Raw(_) => None,
            FlowExpression::Steps(steps) => Some(steps.len()),
        }
    }
}

impl From<&str> for FlowExpression {
    fn from(expr: &str) -> Self {
        FlowExpression::Raw(expr.to_string())
    }
}

impl From<Vec<FlowStep>> for FlowExpression {
    fn from(steps: Vec<FlowStep>) -> Self {
        FlowExpression::Steps(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(duration_ms: u64, mode: FlowMode, value: u32, brightness: u8) -> FlowStep {
        FlowStep {
            duration_ms,
            mode,
            value,
            brightness,
        }
    }

    #[test]
    fn test_encode_steps() {
        let flow = FlowExpression::Steps(vec![
            step(1000, FlowMode::Temperature, 2700, 100),
            step(500, FlowMode::Color, 255, 10),
            step(5000, FlowMode::Sleep, 0, 1),
        ]);
        assert_eq!(
            flow.encode().unwrap(),
            "1000,2,2700,100,500,1,255,10,5000,7,0,1"
        );
    }

    #[test]
    fn test_raw_expression_passes_through() {
        let flow = FlowExpression::from("50,1,255,100");
        assert_eq!(flow.encode().unwrap(), "50,1,255,100");
    }

    #[test]
    fn test_duration_floor() {
        let flow = FlowExpression::Steps(vec![step(40, FlowMode::Temperature, 53689, 50)]);
        assert!(matches!(flow.encode(), Err(Error::FlowDuration(40))));
    }

    #[test]
    fn test_mode_value_ranges() {
        // Color mode value must fit packed RGB range.
        let flow = FlowExpression::Steps(vec![step(100, FlowMode::Color, 16_777_216, 50)]);
        assert!(flow.encode().is_err());

        // Temperature mode value must be a valid ct.
        let flow = FlowExpression::Steps(vec![step(100, FlowMode::Temperature, 53689, 50)]);
        assert!(flow.encode().is_err());

        // Sleep mode ignores the value.
        let flow = FlowExpression::Steps(vec![step(100, FlowMode::Sleep, 999_999_999, 50)]);
        assert!(flow.encode().is_ok());
    }

    #[test]
    fn test_step_brightness_range() {
        let flow = FlowExpression::Steps(vec![step(100, FlowMode::Sleep, 0, 0)]);
        assert!(flow.encode().is_err());
    }
}
