//! Composite scene commands for `set_scene`.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::errors::Error;
use crate::range::{bright_check_range, ct_check_range, hue_check_range, sat_check_range};
use crate::types::flow::{FlowAction, FlowExpression};
use crate::types::rgb::RgbValue;

type Result<T> = std::result::Result<T, Error>;

/// A scene bundles a target state with a brightness into one command.
///
/// Each kind carries its own mandatory fields and is range-checked before
/// dispatch; the params open with the scene-kind tag as the protocol
/// requires.
///
/// # Examples
///
/// ```
/// use yee_rs::{RgbValue, Scene};
///
/// let scene = Scene::Color { rgb: RgbValue::Full(65280), bright: 70 };
/// assert_eq!(scene.params().unwrap().len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scene {
    /// Static RGB color at a given brightness.
    Color { rgb: RgbValue, bright: u8 },
    /// Hue/saturation color at a given brightness.
    Hsv { hue: u16, sat: u8, bright: u8 },
    /// Color temperature at a given brightness.
    Ct { ct: u16, bright: u8 },
    /// A color flow; shares validation and encoding with `start_cf`.
    Cf {
        repeat: u32,
        action: FlowAction,
        flow: FlowExpression,
    },
    /// Turn on at a given brightness and power off after a delay.
    AutoDelayOff { minutes: u32, bright: u8 },
}

impl Scene {
    /// Validate the scene and build the `set_scene` params.
    pub fn params(&self) -> Result<Vec<Value>> {
        match self {
            Scene::Color { rgb, bright } => {
                let packed = rgb.packed()?;
                bright_check_range(*bright)?;
                Ok(vec![json!("color"), json!(packed), json!(bright)])
            }
            Scene::Hsv { hue, sat, bright } => {
                hue_check_range(*hue)?;
                sat_check_range(*sat)?;
                bright_check_range(*bright)?;
                Ok(vec![json!("hsv"), json!(hue), json!(sat), json!(bright)])
            }
            Scene::Ct { ct, bright } => {
                ct_check_range(*ct)?;
                bright_check_range(*bright)?;
                Ok(vec![json!("ct"), json!(ct), json!(bright)])
            }
            Scene::Cf {
                repeat,
                action,
                flow,
            } => {
                let expr = flow.encode()?;
                Ok(vec![
                    json!("cf"),
                    json!(repeat),
                    json!(action.value()),
                    json!(expr),
                ])
            }
            Scene::AutoDelayOff { minutes, bright } => {
                bright_check_range(*bright)?;
                Ok(vec![json!("auto_delay_off"), json!(minutes), json!(bright)])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::flow::{FlowMode, FlowStep};

    #[test]
    fn test_color_scene_params() {
        let scene = Scene::Color {
            rgb: RgbValue::Components(11, 11, 11),
            bright: 50,
        };
        assert_eq!(
            scene.params().unwrap(),
            vec![json!("color"), json!(723723), json!(50)]
        );
    }

    #[test]
    fn test_hsv_scene_params() {
        let scene = Scene::Hsv {
            hue: 300,
            sat: 40,
            bright: 80,
        };
        assert_eq!(
            scene.params().unwrap(),
            vec![json!("hsv"), json!(300), json!(40), json!(80)]
        );
    }

    #[test]
    fn test_ct_scene_rejects_out_of_range() {
        let scene = Scene::Ct { ct: 1000, bright: 50 };
        assert!(scene.params().is_err());

        let scene = Scene::Ct { ct: 2700, bright: 0 };
        assert!(scene.params().is_err());
    }

    #[test]
    fn test_cf_scene_encodes_flow() {
        let scene = Scene::Cf {
            repeat: 0,
            action: FlowAction::Recover,
            flow: FlowExpression::Steps(vec![FlowStep {
                duration_ms: 1000,
                mode: FlowMode::Temperature,
                value: 2700,
                brightness: 100,
            }]),
        };
        assert_eq!(
            scene.params().unwrap(),
            vec![json!("cf"), json!(0), json!(0), json!("1000,2,2700,100")]
        );
    }

    #[test]
    fn test_cf_scene_rejects_bad_step() {
        let scene = Scene::Cf {
            repeat: 0,
            action: FlowAction::Stay,
            flow: FlowExpression::Steps(vec![FlowStep {
                duration_ms: 40,
                mode: FlowMode::Temperature,
                value: 2700,
                brightness: 100,
            }]),
        };
        assert!(scene.params().is_err());
    }

    #[test]
    fn test_auto_delay_off_params() {
        let scene = Scene::AutoDelayOff {
            minutes: 5,
            bright: 30,
        };
        assert_eq!(
            scene.params().unwrap(),
            vec![json!("auto_delay_off"), json!(5), json!(30)]
        );
    }
}
