//! Device records: last-known state of one physical bulb.

use std::net::Ipv4Addr;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Default TCP control port of a Yeelight bulb.
pub const CONTROL_PORT: u16 = 55443;

/// Active color mode reported by a bulb (wire values 1-3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ColorMode {
    #[default]
    Rgb = 1,
    Temperature = 2,
    Hsv = 3,
}

impl From<ColorMode> for u8 {
    fn from(mode: ColorMode) -> u8 {
        mode as u8
    }
}

impl TryFrom<u8> for ColorMode {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, String> {
        match value {
            1 => Ok(ColorMode::Rgb),
            2 => Ok(ColorMode::Temperature),
            3 => Ok(ColorMode::Hsv),
            other => Err(format!("invalid color_mode {other}")),
        }
    }
}

/// The last-known state of one physical bulb.
///
/// Created by parsing a discovery response (or supplied directly by the
/// caller), refreshed in place on re-discovery, and mutated by push
/// notifications while a [`crate::Session`] is bound to it. `id` is the
/// only stable cross-session key; `ip` and `port` may change between
/// discovery runs.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Stable identifier, unique within a registry.
    pub id: String,
    pub ip: Ipv4Addr,
    pub port: u16,
    pub model: String,
    pub power: bool,
    /// Brightness 1 - 100 (0 until first reported).
    pub bright: u8,
    pub color_mode: ColorMode,
    pub ct: Option<u16>,
    pub rgb: Option<u32>,
    pub hue: Option<u16>,
    pub sat: Option<u8>,
    pub name: Option<String>,
    /// Firmware version.
    pub fw: Option<u32>,
    /// True while a color-flow effect is active.
    pub flowing: bool,
    pub flow_params: Option<String>,
    pub musicmode: bool,
    /// Minutes until a scheduled power-off, when one is set.
    pub delayoff: Option<u32>,
}

impl DeviceRecord {
    pub fn new(id: &str, ip: Ipv4Addr) -> Self {
        DeviceRecord {
            id: id.to_string(),
            ip,
            port: CONTROL_PORT,
            model: String::new(),
            power: false,
            bright: 0,
            color_mode: ColorMode::default(),
            ct: None,
            rgb: None,
            hue: None,
            sat: None,
            name: None,
            fw: None,
            flowing: false,
            flow_params: None,
            musicmode: false,
            delayoff: None,
        }
    }

    /// Parse one discovery response datagram into a record.
    ///
    /// Responses are HTTP-response-like header blocks: a status line
    /// matching `HTTP/...`, then CRLF-separated `name: value` headers. A
    /// `Location: yeelight://<ip>:<port>` header supplies the control
    /// endpoint; unrecognized headers are ignored. One datagram encodes
    /// exactly one device.
    pub fn from_discovery_response(raw: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| Error::DiscoveryParse("datagram is not valid utf-8".into()))?;

        let mut lines = text.split("\r\n");
        let status = lines.next().unwrap_or_default();
        if !status.to_ascii_uppercase().starts_with("HTTP/") {
            return Err(Error::DiscoveryParse(format!(
                "response does not start with an HTTP status line: {status:?}"
            )));
        }

        let mut record = DeviceRecord::new("", Ipv4Addr::UNSPECIFIED);
        let mut seen_location = false;

        for line in lines {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_ascii_lowercase().as_str() {
                "location" => {
                    let (ip, port) = parse_location(value)?;
                    record.ip = ip;
                    record.port = port;
                    seen_location = true;
                }
                "id" => record.id = value.to_string(),
                "model" => record.model = value.to_string(),
                "fw_ver" => record.fw = value.parse().ok(),
                "power" => record.power = value.eq_ignore_ascii_case("on"),
                "bright" => record.bright = value.parse().unwrap_or(0),
                "color_mode" => {
                    if let Ok(raw) = value.parse::<u8>()
                        && let Ok(mode) = ColorMode::try_from(raw)
                    {
                        record.color_mode = mode;
                    }
                }
                "ct" => record.ct = value.parse().ok(),
                "rgb" => record.rgb = value.parse().ok(),
                "hue" => record.hue = value.parse().ok(),
                "sat" => record.sat = value.parse().ok(),
                "name" => {
                    if !value.is_empty() {
                        record.name = Some(value.to_string());
                    }
                }
                // Advertisement plumbing headers carry no device state.
                "cache-control" | "date" | "ext" | "server" | "host" | "man" | "st" | "usn"
                | "support" => {}
                other => debug!("ignoring unrecognized discovery header {other:?}"),
            }
        }

        if record.id.is_empty() {
            return Err(Error::DiscoveryParse("response carries no id header".into()));
        }
        if !seen_location {
            return Err(Error::DiscoveryParse(
                "response carries no Location header".into(),
            ));
        }

        Ok(record)
    }

    /// Apply a push notification's `params` object, field by field.
    ///
    /// The wire pushes string enums (`power`) while the record uses
    /// booleans; those are normalized after the copy. `flowing` is only
    /// recomputed when the push carries a flow-relevant key, so partial
    /// pushes during an active flow do not clear it.
    pub fn apply_push(&mut self, params: &Map<String, Value>) {
        for (key, value) in params {
            match key.as_str() {
                "power" => {
                    if let Some(s) = value.as_str() {
                        self.power = s.eq_ignore_ascii_case("on");
                    }
                }
                "bright" => {
                    if let Some(v) = as_u64(value) {
                        self.bright = v.min(100) as u8;
                    }
                }
                "color_mode" => {
                    if let Some(v) = as_u64(value)
                        && let Ok(mode) = ColorMode::try_from(v.min(255) as u8)
                    {
                        self.color_mode = mode;
                    }
                }
                "ct" => self.ct = as_u64(value).map(|v| v.min(u16::MAX as u64) as u16),
                "rgb" => self.rgb = as_u64(value).map(|v| v.min(u32::MAX as u64) as u32),
                "hue" => self.hue = as_u64(value).map(|v| v.min(u16::MAX as u64) as u16),
                "sat" => self.sat = as_u64(value).map(|v| v.min(100) as u8),
                "name" => self.name = value.as_str().map(String::from),
                "fw_ver" | "fw" => self.fw = as_u64(value).map(|v| v as u32),
                "flow_params" => {
                    self.flow_params = match value {
                        Value::String(s) if !s.is_empty() => Some(s.clone()),
                        Value::String(_) | Value::Null => None,
                        other => Some(other.to_string()),
                    };
                }
                "flowing" => {}
                "music_on" | "musicmode" => {
                    self.musicmode = as_u64(value).map(|v| v == 1).unwrap_or(false);
                }
                "delayoff" => self.delayoff = as_u64(value).map(|v| v as u32),
                other => debug!("ignoring unrecognized push key {other:?}"),
            }
        }

        // Recompute only when the push speaks about flows; absence of flow
        // keys on an unrelated push must not be misread as flow-stop.
        if params.contains_key("flowing") || params.contains_key("flow_params") {
            let flowing = params.get("flowing").map(truthy).unwrap_or(false);
            let has_flow_params = params.get("flow_params").map(truthy).unwrap_or(false);
            self.flowing = flowing || has_flow_params;
            if !self.flowing {
                self.flow_params = None;
            }
        }
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn parse_location(value: &str) -> Result<(Ipv4Addr, u16)> {
    let rest = value
        .strip_prefix("yeelight://")
        .ok_or_else(|| Error::DiscoveryParse(format!("unexpected location scheme: {value:?}")))?;
    let (ip, port) = rest
        .split_once(':')
        .ok_or_else(|| Error::DiscoveryParse(format!("location has no port: {value:?}")))?;

    let ip = ip
        .parse()
        .map_err(|_| Error::DiscoveryParse(format!("invalid ip in location: {ip:?}")))?;
    let port = port
        .parse()
        .map_err(|_| Error::DiscoveryParse(format!("invalid port in location: {port:?}")))?;

    Ok((ip, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DATAGRAM: &str = "HTTP/1.1 200 OK\r\n\
        Cache-Control: max-age=3600\r\n\
        Location: yeelight://192.168.0.201:55443\r\n\
        id: 0x000000000015243f\r\n\
        model: color\r\n\
        fw_ver: 18\r\n\
        support: get_prop set_default set_power toggle\r\n\
        power: off\r\n\
        bright: 100\r\n\
        color_mode: 2\r\n\
        ct: 4000\r\n\
        rgb: 16711680\r\n\
        hue: 100\r\n\
        sat: 35\r\n\
        name: my_bulb\r\n";

    #[test]
    fn test_parse_discovery_response() {
        let record = DeviceRecord::from_discovery_response(DATAGRAM.as_bytes()).unwrap();

        assert_eq!(record.id, "0x000000000015243f");
        assert_eq!(record.ip, Ipv4Addr::new(192, 168, 0, 201));
        assert_eq!(record.port, 55443);
        assert_eq!(record.model, "color");
        assert_eq!(record.fw, Some(18));
        assert!(!record.power);
        assert_eq!(record.bright, 100);
        assert_eq!(record.color_mode, ColorMode::Temperature);
        assert_eq!(record.ct, Some(4000));
        assert_eq!(record.rgb, Some(16_711_680));
        assert_eq!(record.hue, Some(100));
        assert_eq!(record.sat, Some(35));
        assert_eq!(record.name.as_deref(), Some("my_bulb"));
    }

    #[test]
    fn test_parse_power_on() {
        let raw = DATAGRAM.replace("power: off", "power: on");
        let record = DeviceRecord::from_discovery_response(raw.as_bytes()).unwrap();
        assert!(record.power);
    }

    #[test]
    fn test_parse_rejects_non_http() {
        let raw = b"NOTIFY * HELLO\r\nid: 1\r\n";
        assert!(DeviceRecord::from_discovery_response(raw).is_err());
    }

    #[test]
    fn test_parse_rejects_missing_id() {
        let raw = "HTTP/1.1 200 OK\r\nLocation: yeelight://192.168.0.201:55443\r\n";
        assert!(DeviceRecord::from_discovery_response(raw.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_ignores_unknown_headers() {
        let raw = "HTTP/1.1 200 OK\r\n\
            Location: yeelight://10.0.0.2:55443\r\n\
            id: 0xabc\r\n\
            x-new-field: whatever\r\n";
        let record = DeviceRecord::from_discovery_response(raw.as_bytes()).unwrap();
        assert_eq!(record.id, "0xabc");
        // Power defaults to false when absent.
        assert!(!record.power);
    }

    fn params(value: serde_json::Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_apply_push_normalizes_power() {
        let mut record = DeviceRecord::new("foo", Ipv4Addr::LOCALHOST);
        record.apply_push(&params(json!({"power": "on", "bright": 40})));
        assert!(record.power);
        assert_eq!(record.bright, 40);

        record.apply_push(&params(json!({"power": "off"})));
        assert!(!record.power);
        assert_eq!(record.bright, 40);
    }

    #[test]
    fn test_apply_push_flowing_guard() {
        let mut record = DeviceRecord::new("foo", Ipv4Addr::LOCALHOST);

        record.apply_push(&params(json!({"flowing": 1, "flow_params": "0,0,1000,2,2700,100"})));
        assert!(record.flowing);
        assert_eq!(record.flow_params.as_deref(), Some("0,0,1000,2,2700,100"));

        // An unrelated partial push must not clear the flow state.
        record.apply_push(&params(json!({"bright": 10})));
        assert!(record.flowing);

        record.apply_push(&params(json!({"flowing": 0})));
        assert!(!record.flowing);
        assert!(record.flow_params.is_none());
    }

    #[test]
    fn test_apply_push_updates_color_fields() {
        let mut record = DeviceRecord::new("foo", Ipv4Addr::LOCALHOST);
        record.apply_push(&params(json!({
            "color_mode": 3,
            "hue": 359,
            "sat": 45,
            "ct": 2700,
            "rgb": 723723,
            "name": "desk",
            "delayoff": 15
        })));
        assert_eq!(record.color_mode, ColorMode::Hsv);
        assert_eq!(record.hue, Some(359));
        assert_eq!(record.sat, Some(45));
        assert_eq!(record.ct, Some(2700));
        assert_eq!(record.rgb, Some(723_723));
        assert_eq!(record.name.as_deref(), Some("desk"));
        assert_eq!(record.delayoff, Some(15));
    }
}
