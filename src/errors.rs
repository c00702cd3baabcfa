/// All error types that can occur when interacting with Yeelight bulbs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to serialize data to JSON.
    #[error("failed to dump json: {0:?}")]
    JsonDump(serde_json::Error),

    /// A network socket operation failed on the control or listen channel.
    #[error("socket {action} error: {err:?}")]
    Socket { action: String, err: std::io::Error },

    /// A command was issued while the write connection is not open.
    ///
    /// Commands are never queued; reconnect explicitly with
    /// [`crate::Session::reconnect_write`] and resend.
    #[error("write socket is not open")]
    NotConnected,

    /// The specified device id is absent from the [`crate::Registry`].
    #[error("device {0:?} not found in registry")]
    DeviceNotFound(String),

    /// A verb requiring a specific cached power state was called while the
    /// device is cached in the opposite state.
    #[error("device must be powered {}", if *.required { "on" } else { "off" })]
    PowerPrecondition { required: bool },

    /// A numeric parameter is outside the protocol-allowed bounds.
    #[error("{param} must be in range {min} - {max}, got {value}")]
    Range {
        param: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// A color-flow step duration is below the 50 ms protocol floor.
    #[error("flow step duration must be at least 50 ms, got {0}")]
    FlowDuration(u64),

    /// `set_adjust` was called with `prop = color` and an action other
    /// than `circle`, which the protocol rejects.
    #[error("adjust property \"color\" only supports the \"circle\" action")]
    InvalidAdjust,

    /// A discovery response datagram could not be parsed.
    #[error("malformed discovery response: {0}")]
    DiscoveryParse(String),

    /// The listen channel gave up reconnecting after the retry budget.
    #[error("listen channel failed after {attempts} reconnect attempts: {reason}")]
    ListenChannelFailed { attempts: u32, reason: String },
}

impl Error {
    /// Create a new socket error
    pub fn socket(action: &str, err: std::io::Error) -> Self {
        Error::Socket {
            action: action.to_string(),
            err,
        }
    }

    /// Create a new range error
    pub fn range(param: &'static str, value: i64, min: i64, max: i64) -> Self {
        Error::Range {
            param,
            value,
            min,
            max,
        }
    }

    pub(crate) fn timeout(action: &str) -> Self {
        Error::socket(
            action,
            std::io::Error::new(std::io::ErrorKind::TimedOut, "operation timed out"),
        )
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
