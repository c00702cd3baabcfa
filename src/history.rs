//! Message history tracking for debugging and diagnostics.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type of message in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    /// A command written to the control channel.
    Send,
    /// A state push received on the listen channel.
    Push,
}

/// A recorded message in the history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub msg_type: MessageType,
    pub method: String,
    pub message: Value,
    /// Seconds since history creation
    pub timestamp: f64,
}

/// Ring-buffered record of a session's wire traffic.
#[derive(Debug, Clone)]
pub struct MessageHistory {
    start_time: Instant,
    entries: Vec<HistoryEntry>,
    last_error: Option<String>,
    max_entries: usize,
}

impl Default for MessageHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageHistory {
    pub const DEFAULT_MAX_ENTRIES: usize = 100;

    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            entries: Vec::new(),
            last_error: None,
            max_entries: Self::DEFAULT_MAX_ENTRIES,
        }
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            max_entries,
            ..Self::new()
        }
    }

    pub fn record(&mut self, msg_type: MessageType, message: &Value) {
        let Some(method) = message.get("method").and_then(|m| m.as_str()) else {
            return;
        };

        self.entries.push(HistoryEntry {
            msg_type,
            method: method.to_string(),
            message: message.clone(),
            timestamp: self.start_time.elapsed().as_secs_f64(),
        });

        if self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }
    }

    pub fn record_error(&mut self, error: &str) {
        self.last_error = Some(error.to_string());
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_message() {
        let mut history = MessageHistory::new();
        history.record(
            MessageType::Send,
            &json!({"method": "set_bright", "params": [50, "smooth", 300]}),
        );

        assert_eq!(history.len(), 1);
        assert_eq!(history.entries()[0].method, "set_bright");
    }

    #[test]
    fn test_record_skips_methodless_messages() {
        let mut history = MessageHistory::new();
        history.record(MessageType::Push, &json!({"params": {}}));
        assert!(history.is_empty());
    }

    #[test]
    fn test_record_error() {
        let mut history = MessageHistory::new();
        history.record_error("connection timeout");
        assert_eq!(history.last_error(), Some("connection timeout"));
    }

    #[test]
    fn test_max_entries() {
        let mut history = MessageHistory::with_max_entries(2);
        for i in 0..5 {
            history.record(MessageType::Send, &json!({"method": format!("method{}", i)}));
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.entries()[0].method, "method3");
    }
}
