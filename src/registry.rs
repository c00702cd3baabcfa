//! In-memory collection of discovered devices, keyed by id.

use std::sync::{Arc, Mutex};

use log::debug;

use crate::device::DeviceRecord;
use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Shared handle to one record; sessions bound to a device hold the same
/// handle the registry does, so re-discovery refreshes and push updates
/// are visible on both sides.
pub(crate) type SharedRecord = Arc<Mutex<DeviceRecord>>;

/// An ordered, in-memory collection of [`DeviceRecord`]s, unique by `id`.
///
/// Purely in-memory and rebuilt by each discovery pass; records live until
/// explicitly replaced. Lookups are linear scans, which is fine for the
/// expected device counts (tens, not thousands).
#[derive(Debug, Default)]
pub struct Registry {
    devices: Mutex<Vec<SharedRecord>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every known record, in insertion order.
    pub fn get_all(&self) -> Vec<DeviceRecord> {
        self.devices
            .lock()
            .unwrap()
            .iter()
            .map(|rec| rec.lock().unwrap().clone())
            .collect()
    }

    /// Snapshot of the record with the given id.
    pub fn get_one(&self, id: &str) -> Option<DeviceRecord> {
        self.devices
            .lock()
            .unwrap()
            .iter()
            .find(|rec| rec.lock().unwrap().id == id)
            .map(|rec| rec.lock().unwrap().clone())
    }

    /// Atomically swap the backing collection.
    pub fn replace_all(&self, records: Vec<DeviceRecord>) {
        let mut devices = self.devices.lock().unwrap();
        *devices = records
            .into_iter()
            .map(|rec| Arc::new(Mutex::new(rec)))
            .collect();
    }

    /// Insert a record, or refresh the existing one with the same id.
    ///
    /// A refresh overwrites the stored record wholesale: `ip`/`port` can
    /// change between discovery runs and must not be merged blindly. The
    /// handle itself is preserved so bound sessions see the new endpoint.
    pub fn upsert(&self, record: DeviceRecord) {
        let mut devices = self.devices.lock().unwrap();
        match devices
            .iter()
            .find(|rec| rec.lock().unwrap().id == record.id)
        {
            Some(existing) => {
                debug!("refreshing device {}", record.id);
                *existing.lock().unwrap() = record;
            }
            None => {
                debug!("registering device {}", record.id);
                devices.push(Arc::new(Mutex::new(record)));
            }
        }
    }

    /// Parse one discovery datagram and store the result.
    ///
    /// Returns the parsed record so the caller can log or collect it.
    pub fn ingest_datagram(&self, raw: &[u8]) -> Result<DeviceRecord> {
        let record = DeviceRecord::from_discovery_response(raw)?;
        self.upsert(record.clone());
        Ok(record)
    }

    pub(crate) fn handle(&self, id: &str) -> Option<SharedRecord> {
        self.devices
            .lock()
            .unwrap()
            .iter()
            .find(|rec| rec.lock().unwrap().id == id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn record(id: &str, ip: [u8; 4]) -> DeviceRecord {
        DeviceRecord::new(id, Ipv4Addr::from(ip))
    }

    #[test]
    fn test_get_all_empty_is_empty_vec() {
        let registry = Registry::new();
        assert!(registry.get_all().is_empty());
    }

    #[test]
    fn test_get_one() {
        let registry = Registry::new();
        registry.replace_all(vec![record("a", [10, 0, 0, 1]), record("b", [10, 0, 0, 2])]);

        assert_eq!(registry.get_one("b").unwrap().ip, Ipv4Addr::new(10, 0, 0, 2));
        assert!(registry.get_one("missing").is_none());
    }

    #[test]
    fn test_replace_all_swaps_collection() {
        let registry = Registry::new();
        registry.replace_all(vec![record("a", [10, 0, 0, 1])]);
        registry.replace_all(vec![record("b", [10, 0, 0, 2])]);

        let all = registry.get_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "b");
    }

    #[test]
    fn test_upsert_refreshes_through_existing_handle() {
        let registry = Registry::new();
        registry.upsert(record("a", [10, 0, 0, 1]));

        let handle = registry.handle("a").unwrap();
        let mut refreshed = record("a", [10, 0, 0, 9]);
        refreshed.port = 55444;
        registry.upsert(refreshed);

        // The previously handed-out handle observes the new endpoint.
        let seen = handle.lock().unwrap().clone();
        assert_eq!(seen.ip, Ipv4Addr::new(10, 0, 0, 9));
        assert_eq!(seen.port, 55444);
        assert_eq!(registry.get_all().len(), 1);
    }

    #[test]
    fn test_ingest_datagram_skips_malformed() {
        let registry = Registry::new();
        assert!(registry.ingest_datagram(b"garbage").is_err());
        assert!(registry.get_all().is_empty());

        let raw = "HTTP/1.1 200 OK\r\n\
            Location: yeelight://192.168.0.201:55443\r\n\
            id: 0xfeed\r\n\
            power: off\r\n";
        let rec = registry.ingest_datagram(raw.as_bytes()).unwrap();
        assert_eq!(rec.id, "0xfeed");
        assert!(!rec.power);
        assert_eq!(registry.get_all().len(), 1);
    }
}
