//! Events broadcast by the coordinator to any interested listener

use serde::Serialize;
use serde_json::Value;

/// What the coordinator was doing when the event fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Learn,
    Send,
    Delete,
    List,
}

/// Outcome stage of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Started,
    Success,
    Error,
    Timeout,
}

/// Whether the operation targeted a device or a single command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Device,
    Command,
}

/// A single operation progress report.
#[derive(Debug, Clone, Serialize)]
pub struct OperationEvent {
    pub operation: Operation,
    pub status: OperationStatus,
    pub entity_type: EntityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationEvent {
    #[must_use] pub fn started(
        operation: Operation,
        entity_type: EntityKind,
        device_name: Option<String>,
        command_name: Option<String>,
        data: Option<Value>,
    ) -> Self {
        Self {
            operation,
            status: OperationStatus::Started,
            entity_type,
            device_name,
            command_name,
            data,
            error: None,
        }
    }

    #[must_use] pub fn success(
        operation: Operation,
        entity_type: EntityKind,
        device_name: Option<String>,
        command_name: Option<String>,
        data: Option<Value>,
    ) -> Self {
        Self {
            operation,
            status: OperationStatus::Success,
            entity_type,
            device_name,
            command_name,
            data,
            error: None,
        }
    }

    #[must_use] pub fn error(
        operation: Operation,
        entity_type: EntityKind,
        device_name: Option<String>,
        command_name: Option<String>,
        error: String,
    ) -> Self {
        Self {
            operation,
            status: OperationStatus::Error,
            entity_type,
            device_name,
            command_name,
            data: None,
            error: Some(error),
        }
    }

    #[must_use] pub fn timeout(
        operation: Operation,
        entity_type: EntityKind,
        device_name: Option<String>,
        command_name: Option<String>,
    ) -> Self {
        Self {
            operation,
            status: OperationStatus::Timeout,
            entity_type,
            device_name,
            command_name,
            data: None,
            error: None,
        }
    }
}

/// Everything the coordinator announces over its broadcast channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoordinatorEvent {
    /// Progress of a learn, send, delete or list operation.
    Operation(OperationEvent),
    /// A signal was captured outside any learn context.
    SignalCaptured {
        raw_data: Vec<u32>,
        freq_khz: u32,
        frames: u32,
        count: usize,
    },
    /// The hub went online or offline.
    HubState { online: bool },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_events_are_tagged() {
        let event = CoordinatorEvent::Operation(OperationEvent::success(
            Operation::Send,
            EntityKind::Command,
            Some("tv".into()),
            Some("power".into()),
            None,
        ));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "operation");
        assert_eq!(json["operation"], "send");
        assert_eq!(json["status"], "success");
        assert_eq!(json["entity_type"], "command");
        assert_eq!(json["device_name"], "tv");
    }

    #[test]
    fn absent_fields_are_omitted() {
        let event = OperationEvent::timeout(Operation::Learn, EntityKind::Command, None, None);
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("device_name").is_none());
        assert!(json.get("error").is_none());
        assert_eq!(json["status"], "timeout");
    }

    #[test]
    fn hub_state_carries_online_flag() {
        let json = serde_json::to_value(CoordinatorEvent::HubState { online: false }).unwrap();
        assert_eq!(json["type"], "hub_state");
        assert_eq!(json["online"], false);
    }
}
