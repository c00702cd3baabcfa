//! Push notification support: the listen channel of a device session.
//!
//! Bulbs report asynchronous state changes (app actions, wall switches,
//! finished flows) as `{"method":...,"params":{...}}` lines on a second
//! TCP connection to the control port. The channel keeps the session's
//! cached [`DeviceRecord`] in sync and fans each update out to
//! subscribers.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, error, warn};
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use crate::device::DeviceRecord;
use crate::errors::Error;
use crate::history::{MessageHistory, MessageType};
use crate::registry::SharedRecord;
use crate::session::open_stream;

/// Callback invoked for every ingested push, with the raw parsed message
/// and a snapshot of the record after the update was applied.
pub type NotificationCallback = Box<dyn Fn(&Notification, &DeviceRecord) + Send + 'static>;

/// One parsed push message.
#[derive(Debug, Clone)]
pub struct Notification {
    pub method: String,
    pub params: Map<String, Value>,
}

type Subscriptions = Arc<Mutex<HashMap<u64, NotificationCallback>>>;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAYS_MS: [u64; 3] = [750, 1500, 3000];

/// The listen half of a session.
///
/// Runs a background reader task with a bounded reconnect policy: up to
/// [`MAX_RETRIES`] consecutive failures, then the channel shuts down and
/// the failure is surfaced through [`PushChannel::last_error`].
pub(crate) struct PushChannel {
    running: Arc<AtomicBool>,
    subscriptions: Subscriptions,
    next_token: AtomicU64,
    last_error: Arc<Mutex<Option<String>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PushChannel {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            subscriptions: Arc::new(Mutex::new(HashMap::new())),
            next_token: AtomicU64::new(1),
            last_error: Arc::new(Mutex::new(None)),
            task: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    pub fn subscribe(&self, callback: NotificationCallback) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        self.subscriptions.lock().unwrap().insert(token, callback);
        token
    }

    pub fn unsubscribe(&self, token: u64) -> bool {
        self.subscriptions.lock().unwrap().remove(&token).is_some()
    }

    /// Spawn the reader task against the device's control endpoint.
    pub fn start(
        &self,
        record: SharedRecord,
        history: Arc<Mutex<MessageHistory>>,
        addr: SocketAddr,
        local_port: Option<u16>,
        connect_timeout: Duration,
        idle_timeout: Duration,
    ) {
        if self.is_running() {
            return;
        }
        self.running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.running);
        let subscriptions = Arc::clone(&self.subscriptions);
        let last_error = Arc::clone(&self.last_error);

        let handle = tokio::spawn(async move {
            let mut attempts: u32 = 0;

            while running.load(Ordering::SeqCst) {
                match open_stream(addr, local_port, connect_timeout).await {
                    Ok(stream) => {
                        debug!("listen channel connected to {addr}");
                        attempts = 0;
                        let mut lines = BufReader::new(stream).lines();

                        loop {
                            if !running.load(Ordering::SeqCst) {
                                return;
                            }
                            match tokio::time::timeout(idle_timeout, lines.next_line()).await {
                                Ok(Ok(Some(line))) => {
                                    ingest_line(&line, &record, &subscriptions, &history);
                                }
                                Ok(Ok(None)) => {
                                    warn!("listen channel closed by {addr}");
                                    break;
                                }
                                Ok(Err(e)) => {
                                    warn!("listen channel read error: {e}");
                                    break;
                                }
                                Err(_) => {
                                    warn!("listen channel idle for {idle_timeout:?}, reconnecting");
                                    break;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        warn!("listen channel connect failed: {e}");
                    }
                }

                attempts += 1;
                if attempts > MAX_RETRIES {
                    let err = Error::ListenChannelFailed {
                        attempts: MAX_RETRIES,
                        reason: format!("listen channel to {addr} kept dropping"),
                    };
                    error!("{err}");
                    *last_error.lock().unwrap() = Some(err.to_string());
                    running.store(false, Ordering::SeqCst);
                    return;
                }

                let delay_idx = ((attempts - 1) as usize).min(RETRY_DELAYS_MS.len() - 1);
                tokio::time::sleep(Duration::from_millis(RETRY_DELAYS_MS[delay_idx])).await;
            }
        });

        *self.task.lock().unwrap() = Some(handle);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.task.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.stop();
    }
}

fn ingest_line(
    line: &str,
    record: &SharedRecord,
    subscriptions: &Subscriptions,
    history: &Arc<Mutex<MessageHistory>>,
) {
    let msg: Value = match serde_json::from_str(line) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("skipping malformed push message: {e}");
            return;
        }
    };

    let Some(method) = msg.get("method").and_then(|m| m.as_str()) else {
        // Command acknowledgements ({"id":..,"result":..}) carry no state.
        debug!("ignoring non-push message on listen channel");
        return;
    };
    let Some(params) = msg.get("params").and_then(|p| p.as_object()) else {
        warn!("push message {method:?} carries no params object");
        return;
    };

    let snapshot = {
        let mut rec = record.lock().unwrap();
        rec.apply_push(params);
        rec.clone()
    };
    history.lock().unwrap().record(MessageType::Push, &msg);
    debug!("push {method} applied to device {}", snapshot.id);

    let notification = Notification {
        method: method.to_string(),
        params: params.clone(),
    };
    for callback in subscriptions.lock().unwrap().values() {
        callback(&notification, &snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn shared_record(power: bool) -> SharedRecord {
        let mut record = DeviceRecord::new("foo", Ipv4Addr::new(192, 168, 0, 201));
        record.power = power;
        Arc::new(Mutex::new(record))
    }

    #[test]
    fn test_subscribe_unsubscribe() {
        let channel = PushChannel::new();
        let token = channel.subscribe(Box::new(|_, _| {}));
        assert_eq!(channel.subscriptions.lock().unwrap().len(), 1);
        assert!(channel.unsubscribe(token));
        assert!(!channel.unsubscribe(token));
        assert!(channel.subscriptions.lock().unwrap().is_empty());
    }

    #[test]
    fn test_ingest_updates_record_and_notifies() {
        let record = shared_record(false);
        let subscriptions: Subscriptions = Arc::new(Mutex::new(HashMap::new()));
        let history = Arc::new(Mutex::new(MessageHistory::new()));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        subscriptions.lock().unwrap().insert(
            1,
            Box::new(move |notification: &Notification, device: &DeviceRecord| {
                sink.lock()
                    .unwrap()
                    .push((notification.method.clone(), device.power));
            }),
        );

        ingest_line(
            r#"{"method":"props","params":{"power":"on","bright":80}}"#,
            &record,
            &subscriptions,
            &history,
        );

        let rec = record.lock().unwrap();
        assert!(rec.power);
        assert_eq!(rec.bright, 80);
        drop(rec);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[("props".to_string(), true)]);
        assert_eq!(history.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_ingest_skips_malformed_lines() {
        let record = shared_record(true);
        let subscriptions: Subscriptions = Arc::new(Mutex::new(HashMap::new()));
        let history = Arc::new(Mutex::new(MessageHistory::new()));

        ingest_line("not json at all", &record, &subscriptions, &history);
        ingest_line(r#"{"id":1,"result":["ok"]}"#, &record, &subscriptions, &history);

        assert!(record.lock().unwrap().power);
        assert!(history.lock().unwrap().is_empty());
    }

    #[test]
    fn test_channel_not_running_until_started() {
        let channel = PushChannel::new();
        assert!(!channel.is_running());
        assert!(channel.last_error().is_none());
    }
}
