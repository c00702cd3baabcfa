//! Session configuration.

use std::time::Duration;

use crate::types::{Effect, PowerOnMode};

/// Default write-socket timeout.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default listen-socket idle timeout; an hour of silence is treated as a
/// dead connection and triggers the reconnect policy.
pub const DEFAULT_LISTEN_TIMEOUT: Duration = Duration::from_secs(3600);

/// Default transition duration applied when a verb omits one.
pub const DEFAULT_EFFECT_DURATION_MS: u64 = 300;

/// Tunables for one [`crate::Session`].
///
/// # Examples
///
/// ```
/// use yee_rs::SessionConfig;
///
/// let config = SessionConfig {
///     dry_run: true,
///     ..SessionConfig::default()
/// };
/// assert_eq!(config.effect_duration_ms, 300);
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Timeout for connect/write operations on the control channel.
    pub write_timeout: Duration,
    /// Idle timeout on the listen channel before it reconnects.
    pub listen_timeout: Duration,
    /// Local source port for the write connection; `None` binds ephemeral.
    /// Explicit ports let multiple sessions from one host stay apart in
    /// captures.
    pub write_local_port: Option<u16>,
    /// Local source port for the listen connection; `None` binds ephemeral.
    pub listen_local_port: Option<u16>,
    /// Transition effect applied when a verb omits one.
    pub default_effect: Effect,
    /// Transition duration applied when a verb omits one.
    pub effect_duration_ms: u64,
    /// Power-on mode applied when `turn_on` omits one.
    pub default_power_mode: PowerOnMode,
    /// When set, verbs build and return their payload without opening any
    /// socket or writing to the wire.
    pub dry_run: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            listen_timeout: DEFAULT_LISTEN_TIMEOUT,
            write_local_port: None,
            listen_local_port: None,
            default_effect: Effect::Smooth,
            effect_duration_ms: DEFAULT_EFFECT_DURATION_MS,
            default_power_mode: PowerOnMode::Normal,
            dry_run: false,
        }
    }
}

impl SessionConfig {
    /// A configuration for payload-construction tests: no sockets, no
    /// wire writes.
    pub fn dry_run() -> Self {
        SessionConfig {
            dry_run: true,
            ..Self::default()
        }
    }
}
