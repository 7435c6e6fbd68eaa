//! Character Device Infrastructure - Registration and dispatch for char devices
//!
//! # Purpose
//! Provides the host-side plumbing a character-device driver registers
//! against: dynamic major-number allocation, device classes and nodes,
//! attribute files, and open/read/close dispatch with RAII session handles.
//!
//! # Integration Points
//! - Depends on: nothing outside the standard library and the common stack
//! - Provides to: driver components (via the `CharDevice` and
//!   `DeviceAttribute` traits) and host tools (via `DeviceRegistry`)
//!
//! # Architecture
//! A process-wide `DeviceRegistry` owns the lookup tables. Every
//! registration step returns a guard that deregisters on drop, so a failed
//! driver init unwinds its partial registration in reverse order without
//! any explicit cleanup code. Sessions are guards too: dropping a
//! `FileHandle` always releases the device.
//!
//! # Testing Strategy
//! - Unit tests: major allocation, mode bits, registry bookkeeping
//! - Integration tests: full register/open/unwind workflows with stub devices

use thiserror::Error;

mod devnum;
mod fops;
mod registry;
mod sysfs;

pub use devnum::{DevNum, MajorAllocator, DYNAMIC_MAJOR_FIRST, DYNAMIC_MAJOR_LAST};
pub use fops::{AccessMode, CharDevice};
pub use registry::{
    AttrHandle, ChrdevRegistration, ClassHandle, DeviceNode, DeviceRegistry, FileHandle,
};
pub use sysfs::{DeviceAttribute, Mode};

/// Error types for device registration and access
#[derive(Debug, Error)]
pub enum Error {
    #[error("permission denied")]
    PermissionDenied,

    #[error("device is busy")]
    Busy,

    #[error("payload exceeds device buffer ({len} > {capacity})")]
    PayloadTooLarge { len: usize, capacity: usize },

    #[error("dynamic major numbers exhausted")]
    MajorsExhausted,

    #[error("device class already registered: {name}")]
    ClassExists { name: String },

    #[error("device node already registered: {name}")]
    NodeExists { name: String },

    #[error("attribute already registered on {node}: {name}")]
    AttributeExists { node: String, name: String },

    #[error("no char device registered for major {major}")]
    UnknownMajor { major: u32 },

    #[error("device not found: {name}")]
    DeviceNotFound { name: String },

    #[error("attribute not found on {node}: {name}")]
    AttributeNotFound { node: String, name: String },
}

pub type Result<T> = core::result::Result<T, Error>;
