//! Command library and hub coordination for the IR bridge
//!
//! This crate owns the learned-command store (a JSON file mirrored into
//! memory) and the coordinator that keeps a consolidated hub snapshot
//! fresh and runs the learning capture loop.

pub mod coordinator;
pub mod error;
pub mod events;
pub mod library;
pub mod model;
pub mod name;
pub mod persistence;

pub use coordinator::{
    CoordinatorConfig, HubCoordinator, HubSnapshot, LearnContext, StorageSummary,
};
pub use error::CoreError;
pub use events::{CoordinatorEvent, EntityKind, Operation, OperationEvent, OperationStatus};
pub use library::CommandLibrary;
pub use model::{CommandSummary, DeviceRecord, DeviceSummary, IrCommand, LibraryFile};
pub use name::{validate_name, NameValue};
