//! Cron job type for `cron_add`/`cron_get`/`cron_del`.

use serde::{Deserialize, Serialize};

/// Timer job kind. The protocol currently defines only delayed power-off
/// (wire value 0).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CronType {
    #[default]
    PowerOff = 0,
}

impl CronType {
    pub fn value(&self) -> u8 {
        *self as u8
    }
}
