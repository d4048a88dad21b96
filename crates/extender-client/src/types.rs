//! Response schemas and errors for the hub REST API
//!
//! The firmware omits fields freely depending on version and state, so
//! every schema declares its defaults here rather than at the call sites.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default carrier frequency in kHz when a capture does not report one
pub const DEFAULT_FREQ_KHZ: u32 = 38;

/// Default transmit duty cycle in percent
pub const DEFAULT_DUTY: u8 = 33;

/// Default transmit repeat count
pub const DEFAULT_REPEAT: u32 = 1;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("hub rejected the bearer token")]
    Unauthorized,

    #[error("hub returned unexpected status {0}")]
    UnexpectedStatus(reqwest::StatusCode),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl ClientError {
    /// True when the failure was an authentication rejection rather than
    /// a transport or firmware problem.
    #[must_use] pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized)
    }
}

/// Identity block from `GET /api/status`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HubStatus {
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub instance: String,
    #[serde(default)]
    pub mac: String,
    #[serde(default)]
    pub fw_ver: String,
    #[serde(default)]
    pub ap_on: bool,
    #[serde(default)]
    pub sta_ok: bool,
    #[serde(default)]
    pub sta_ssid: String,
}

/// Wifi details from `GET /api/wifi/status`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WifiStatus {
    #[serde(default)]
    pub sta: StaStatus,
    #[serde(default)]
    pub ap: ApStatus,
}

/// Station-side wifi state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaStatus {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub ssid: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub rssi: i32,
}

/// Access-point-side wifi state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApStatus {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub ip: String,
}

/// Receiver counters from `GET /api/ir/rxinfo`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RxInfo {
    #[serde(default)]
    pub rx_count: u64,
    #[serde(default)]
    pub last_freq_khz: Option<u32>,
}

/// Firmware slot usage and saved names from `GET /api/ir/saved`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedSlots {
    #[serde(default)]
    pub count: u32,
    #[serde(default = "default_slot_capacity")]
    pub max: u32,
    #[serde(default = "default_slot_capacity")]
    pub available: u32,
    #[serde(default)]
    pub names: Vec<String>,
}

impl Default for SavedSlots {
    fn default() -> Self {
        Self {
            count: 0,
            max: default_slot_capacity(),
            available: default_slot_capacity(),
            names: Vec::new(),
        }
    }
}

/// Most recent capture from `GET /api/ir/last`
///
/// `combined` holds the mark/space timing sequence in microseconds and is
/// the identity of a capture: two captures are the same signal iff their
/// sequences match element for element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedSignal {
    #[serde(default)]
    pub combined: Vec<u32>,
    #[serde(default = "default_freq_khz")]
    pub freq_khz: u32,
    #[serde(default = "default_frames")]
    pub frames: u32,
}

impl CapturedSignal {
    /// True when the hub reports an empty receive buffer.
    #[must_use] pub fn is_empty(&self) -> bool {
        self.combined.is_empty()
    }

    /// The timing sequence identifying this capture.
    #[must_use] pub fn signature(&self) -> &[u32] {
        &self.combined
    }
}

/// Transmit body for `POST /api/ir/send`. Frequency is in Hz on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct SendSignal {
    pub freq: u32,
    pub duty: u8,
    pub repeat: u32,
    pub raw: Vec<u32>,
}

impl SendSignal {
    /// Build a transmit body from kHz parameters.
    #[must_use] pub fn from_khz(freq_khz: u32, duty: u8, repeat: u32, raw: Vec<u32>) -> Self {
        Self {
            freq: freq_khz * 1000,
            duty,
            repeat,
            raw,
        }
    }
}

/// Acknowledgement body returned by the firmware slot endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FirmwareAck {
    #[serde(default)]
    pub status: String,
}

fn default_slot_capacity() -> u32 {
    50
}

fn default_freq_khz() -> u32 {
    DEFAULT_FREQ_KHZ
}

fn default_frames() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_defaults_fill_missing_fields() {
        let sig: CapturedSignal = serde_json::from_str(r#"{"combined":[100,200,100]}"#).unwrap();
        assert_eq!(sig.combined, vec![100, 200, 100]);
        assert_eq!(sig.freq_khz, 38);
        assert_eq!(sig.frames, 1);
        assert!(!sig.is_empty());
    }

    #[test]
    fn empty_capture_detected() {
        let sig: CapturedSignal = serde_json::from_str("{}").unwrap();
        assert!(sig.is_empty());
    }

    #[test]
    fn saved_slots_default_to_firmware_capacity() {
        let slots: SavedSlots = serde_json::from_str("{}").unwrap();
        assert_eq!(slots.count, 0);
        assert_eq!(slots.max, 50);
        assert_eq!(slots.available, 50);
        assert!(slots.names.is_empty());

        let slots: SavedSlots =
            serde_json::from_str(r#"{"count":3,"max":50,"available":47,"names":["tv power"]}"#)
                .unwrap();
        assert_eq!(slots.count, 3);
        assert_eq!(slots.names, vec!["tv power"]);
    }

    #[test]
    fn status_tolerates_partial_payload() {
        let status: HubStatus = serde_json::from_str(r#"{"hostname":"hub-livingroom"}"#).unwrap();
        assert_eq!(status.hostname, "hub-livingroom");
        assert_eq!(status.fw_ver, "");
        assert!(!status.sta_ok);
    }

    #[test]
    fn send_body_converts_khz_to_hz() {
        let body = SendSignal::from_khz(38, 33, 1, vec![9000, 4500]);
        assert_eq!(body.freq, 38_000);

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["freq"], 38_000);
        assert_eq!(json["duty"], 33);
        assert_eq!(json["repeat"], 1);
    }
}
