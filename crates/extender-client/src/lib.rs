//! HTTP client for the IR/RF extender hub firmware
//!
//! This crate implements the REST API exposed by the hub: identity and
//! wifi queries, receiver counters, raw signal transmit, capture polling,
//! and the firmware's named slot storage.

pub mod client;
pub mod endpoints;
pub mod types;

pub use client::{ExtenderClient, DEFAULT_TIMEOUT};
pub use types::*;
