//! Data models for the command library

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current on-disk schema version
pub const SCHEMA_VERSION: u32 = 1;

/// A learned IR/RF command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrCommand {
    /// Carrier frequency in kHz
    pub freq_khz: u32,
    /// Transmit duty cycle in percent
    pub duty: u8,
    /// Transmit repeat count
    pub repeat: u32,
    /// Mark/space timing sequence in microseconds
    pub raw: Vec<u32>,
    /// Capture timestamp (ISO 8601)
    pub learned_at: String,
}

impl IrCommand {
    /// Create a command stamped with the current time.
    #[must_use] pub fn new(freq_khz: u32, duty: u8, repeat: u32, raw: Vec<u32>) -> Self {
        Self {
            freq_khz,
            duty,
            repeat,
            raw,
            learned_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// A device and its learned commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Creation timestamp (ISO 8601)
    pub created_at: String,
    /// Commands keyed by normalized name
    #[serde(default)]
    pub commands: BTreeMap<String, IrCommand>,
}

impl DeviceRecord {
    /// Create an empty record stamped with the current time.
    #[must_use] pub fn new() -> Self {
        Self {
            created_at: chrono::Utc::now().to_rfc3339(),
            commands: BTreeMap::new(),
        }
    }
}

impl Default for DeviceRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Root of the library file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryFile {
    /// Schema version tag; optional on load
    #[serde(default = "default_version")]
    pub version: u32,
    /// Devices keyed by normalized name
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceRecord>,
}

impl Default for LibraryFile {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            devices: BTreeMap::new(),
        }
    }
}

fn default_version() -> u32 {
    SCHEMA_VERSION
}

/// Device listing entry, without command payloads
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSummary {
    pub name: String,
    pub created_at: String,
    pub command_count: usize,
}

/// Command listing entry, without the raw timing data
#[derive(Debug, Clone, Serialize)]
pub struct CommandSummary {
    pub name: String,
    pub freq_khz: u32,
    pub duty: u8,
    pub repeat: u32,
    pub learned_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_file_accepts_missing_version_tag() {
        let file: LibraryFile = serde_json::from_str(r#"{"devices":{}}"#).unwrap();
        assert_eq!(file.version, SCHEMA_VERSION);
        assert!(file.devices.is_empty());
    }

    #[test]
    fn device_record_accepts_missing_commands() {
        let record: DeviceRecord =
            serde_json::from_str(r#"{"created_at":"2026-08-21T10:00:00+00:00"}"#).unwrap();
        assert!(record.commands.is_empty());
    }

    #[test]
    fn command_serializes_with_wire_field_names() {
        let command = IrCommand::new(38, 33, 1, vec![9000, 4500]);
        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["freq_khz"], 38);
        assert_eq!(json["duty"], 33);
        assert_eq!(json["repeat"], 1);
        assert_eq!(json["raw"], serde_json::json!([9000, 4500]));
        assert!(json["learned_at"].is_string());
    }
}
