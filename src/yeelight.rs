//! Top-level facade tying discovery, the registry, and sessions together.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::config::SessionConfig;
use crate::device::DeviceRecord;
use crate::discovery::DiscoverySearch;
use crate::errors::Error;
use crate::registry::Registry;
use crate::session::Session;

type Result<T> = std::result::Result<T, Error>;

/// Poll interval for the discovery receive loop.
const RECV_POLL: Duration = Duration::from_millis(500);

/// Entry point for discovering bulbs and opening sessions against them.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use yee_rs::{SessionConfig, Yeelight};
///
/// # async fn run() -> Result<(), yee_rs::Error> {
/// let hub = Yeelight::new();
/// let devices = hub.discover(Duration::from_secs(3)).await?;
/// for device in &devices {
///     println!("{} at {}", device.id, device.ip);
/// }
///
/// if let Some(device) = devices.first() {
///     let session = hub.create_session(&device.id, SessionConfig::default()).await?;
///     session.toggle(&Default::default()).await?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct Yeelight {
    registry: Arc<Registry>,
}

impl Yeelight {
    pub fn new() -> Self {
        Self::default()
    }

    /// The backing device registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run one multicast search and collect responses for `window`.
    ///
    /// Malformed response datagrams are logged and skipped; socket errors
    /// abort the sweep. Returns a snapshot of every device known after the
    /// sweep, including devices found by earlier calls.
    pub async fn discover(&self, window: Duration) -> Result<Vec<DeviceRecord>> {
        let search = DiscoverySearch::start().await?;
        let deadline = Instant::now() + window;

        while Instant::now() < deadline {
            match tokio::time::timeout(RECV_POLL, search.recv()).await {
                Ok(Ok((raw, from))) => match self.registry.ingest_datagram(&raw) {
                    Ok(record) => debug!("discovered device {} at {from}", record.id),
                    Err(e) => warn!("skipping response from {from}: {e}"),
                },
                Ok(Err(e)) => return Err(e),
                Err(_) => continue,
            }
        }

        Ok(self.registry.get_all())
    }

    /// Snapshot of one known device by id.
    pub fn get_device(&self, id: &str) -> Option<DeviceRecord> {
        self.registry.get_one(id)
    }

    /// Snapshot of all known devices.
    pub fn get_devices(&self) -> Vec<DeviceRecord> {
        self.registry.get_all()
    }

    /// Open a session against a previously discovered device.
    ///
    /// The session shares the registry's record handle, so later
    /// re-discovery refreshes the endpoint the session observes.
    pub async fn create_session(&self, id: &str, config: SessionConfig) -> Result<Session> {
        let record = self
            .registry
            .handle(id)
            .ok_or_else(|| Error::DeviceNotFound(id.to_string()))?;
        Session::bind(record, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATAGRAM: &str = "HTTP/1.1 200 OK\r\n\
        Location: yeelight://192.168.0.201:55443\r\n\
        id: 0x0000000007fb2d9a\r\n\
        model: color\r\n\
        power: on\r\n\
        bright: 100\r\n";

    #[tokio::test]
    async fn test_create_session_for_unknown_device() {
        let hub = Yeelight::new();
        let err = hub
            .create_session("0xmissing", SessionConfig::dry_run())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DeviceNotFound(_)));
    }

    #[tokio::test]
    async fn test_create_session_shares_registry_state() {
        let hub = Yeelight::new();
        hub.registry().ingest_datagram(DATAGRAM.as_bytes()).unwrap();

        let session = hub
            .create_session("0x0000000007fb2d9a", SessionConfig::dry_run())
            .await
            .unwrap();
        assert_eq!(session.device().model, "color");

        // A refresh sweep lands in the session's view of the device.
        let refreshed = DATAGRAM.replace("bright: 100", "bright: 40");
        hub.registry().ingest_datagram(refreshed.as_bytes()).unwrap();
        assert_eq!(session.device().bright, 40);
    }

    #[test]
    fn test_get_device_snapshots() {
        let hub = Yeelight::new();
        assert!(hub.get_devices().is_empty());

        hub.registry().ingest_datagram(DATAGRAM.as_bytes()).unwrap();
        assert_eq!(hub.get_devices().len(), 1);
        assert!(hub.get_device("0x0000000007fb2d9a").is_some());
        assert!(hub.get_device("nope").is_none());
    }
}
