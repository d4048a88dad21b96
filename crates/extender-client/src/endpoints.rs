//! REST endpoint paths exposed by the hub firmware

/// Hub identity and network summary
pub const STATUS: &str = "/api/status";
/// Station and access-point wifi details
pub const WIFI_STATUS: &str = "/api/wifi/status";
/// Receiver counters
pub const IR_RX_INFO: &str = "/api/ir/rxinfo";
/// Firmware slot usage and saved signal names
pub const IR_SAVED: &str = "/api/ir/saved";
/// Most recent capture in the receive buffer
pub const IR_LAST: &str = "/api/ir/last";
/// Raw signal transmit
pub const IR_SEND: &str = "/api/ir/send";
/// Arm the capture window
pub const IR_LEARN_START: &str = "/api/ir/learn/start";
/// Disarm the capture window
pub const IR_LEARN_STOP: &str = "/api/ir/learn/stop";
/// Save the last capture into a named slot
pub const IR_SAVE: &str = "/api/ir/save";
/// Transmit a named slot
pub const IR_SEND_NAME: &str = "/api/ir/send/name";
/// Delete a named slot
pub const IR_DELETE: &str = "/api/ir/delete";
/// Clear every slot
pub const IR_CLEAR: &str = "/api/ir/clear";
