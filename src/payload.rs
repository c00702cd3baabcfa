//! Wire command payloads and line framing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Error;

/// A `{method, params}` protocol message unit, before the per-session id
/// is attached.
///
/// This is the exact body a verb would write to the wire; dry-run sessions
/// return it instead of writing, and the two paths share this one
/// construction site so they cannot drift apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandPayload {
    pub method: String,
    pub params: Vec<Value>,
}

impl CommandPayload {
    /// Build a payload, prefixing the method with `bg_` when targeting the
    /// background lamp of a combo fixture.
    pub fn new(method: &str, params: Vec<Value>, background: bool) -> Self {
        let method = if background {
            format!("bg_{method}")
        } else {
            method.to_string()
        };
        CommandPayload { method, params }
    }

    /// Encode the full wire line: `{"id":N,"method":...,"params":[...]}`
    /// terminated by CRLF.
    pub fn encode_line(&self, id: u64) -> Result<String, Error> {
        let body = serde_json::to_string(&serde_json::json!({
            "id": id,
            "method": self.method,
            "params": self.params,
        }))
        .map_err(Error::JsonDump)?;
        Ok(format!("{body}\r\n"))
    }

    pub(crate) fn to_value(&self) -> Value {
        serde_json::json!({ "method": self.method, "params": self.params })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bg_prefix() {
        let payload = CommandPayload::new("set_ct_abx", vec![json!(1800)], true);
        assert_eq!(payload.method, "bg_set_ct_abx");

        let payload = CommandPayload::new("set_ct_abx", vec![json!(1800)], false);
        assert_eq!(payload.method, "set_ct_abx");
    }

    #[test]
    fn test_encode_line_framing() {
        let payload = CommandPayload::new(
            "set_ct_abx",
            vec![json!(1800), json!("sudden"), json!(1000)],
            false,
        );
        assert_eq!(
            payload.encode_line(1).unwrap(),
            "{\"id\":1,\"method\":\"set_ct_abx\",\"params\":[1800,\"sudden\",1000]}\r\n"
        );
    }

    #[test]
    fn test_empty_params_serialize_as_array() {
        let payload = CommandPayload::new("toggle", vec![], false);
        assert_eq!(
            payload.encode_line(7).unwrap(),
            "{\"id\":7,\"method\":\"toggle\",\"params\":[]}\r\n"
        );
    }
}
