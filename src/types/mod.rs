//! Value types for light control parameters.

mod adjust;
mod cron;
mod effect;
mod flow;
mod power;
mod rgb;
mod scene;

pub use adjust::{AdjustAction, AdjustProp};
pub use cron::CronType;
pub use effect::Effect;
pub use flow::{FlowAction, FlowExpression, FlowMode, FlowStep};
pub use power::PowerOnMode;
pub use rgb::RgbValue;
pub use scene::Scene;
