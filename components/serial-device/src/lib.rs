//! Serial Identifier Driver - Exclusive-access char device for a crypto chip ID
//!
//! # Purpose
//! Exposes a fixed 32-byte serial/crypto identifier through a read-only
//! device node, with a privileged write-only `serialnumber` attribute for
//! updating the identifier out of band.
//!
//! # Integration Points
//! - Depends on: `chardev` (registration, dispatch, attribute files)
//! - Provides to: host tools and tests driving the device through a
//!   `DeviceRegistry`
//!
//! # Architecture
//! A single shared state object carries the buffer and the session gate.
//! The gate admits one session at a time without blocking; `one_shot`
//! mode makes the second and later reads of a session report
//! end-of-stream. The attribute path updates the buffer regardless of
//! session state.
//!
//! # Testing Strategy
//! - Unit tests: gate behavior, one-shot semantics, stale-tail updates,
//!   parameter parsing
//! - Integration tests: full lifecycle through a registry, including the
//!   concurrent-open race

use static_assertions::const_assert;

mod device;
mod module;
mod params;

pub use module::SerialModule;
pub use params::{ModuleParams, ParamError};

/// Device buffer capacity in bytes
pub const SERIAL_LEN: usize = 32;

/// Buffer contents at module load; trailing capacity starts zeroed
pub const INIT_VALUE: &[u8] = b"INIT.VALUE";

/// Char device name
pub const DEVICE_NAME: &str = "serial";

/// Device class name
pub const CLASS_NAME: &str = "cryptoid";

/// Attribute file carrying the privileged serial-number update
pub const ATTR_NAME: &str = "serialnumber";

const_assert!(INIT_VALUE.len() <= SERIAL_LEN);
