//! Serial Identifier Device - Exclusive-access buffer with one-shot reads
//!
//! One `SerialState` is shared between the device-node path and the
//! attribute path. The open gate is a single compare-exchange, so a second
//! opener is turned away immediately instead of queueing. The buffer
//! content sits behind its own short-lived mutex; attribute updates take
//! that mutex only, never the open gate, and are valid whether or not a
//! session is open.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, error, info};

use chardev::{AccessMode, CharDevice, DeviceAttribute, Error, Mode, Result};

use crate::params::ModuleParams;
use crate::{ATTR_NAME, INIT_VALUE, SERIAL_LEN};

/// Shared driver state: the identifier buffer and the session gate
pub(crate) struct SerialState {
    /// Identifier buffer; the mutex is held only for the single copy
    serial: Mutex<[u8; SERIAL_LEN]>,

    /// Exclusive-session gate
    claimed: AtomicBool,

    /// Whether the current session already transferred the buffer
    consumed: AtomicBool,

    params: ModuleParams,
}

impl SerialState {
    pub(crate) fn new(params: ModuleParams) -> Arc<Self> {
        let mut serial = [0u8; SERIAL_LEN];
        serial[..INIT_VALUE.len()].copy_from_slice(INIT_VALUE);

        Arc::new(Self {
            serial: Mutex::new(serial),
            claimed: AtomicBool::new(false),
            consumed: AtomicBool::new(false),
            params,
        })
    }
}

/// Device-node side of the driver
pub(crate) struct SerialNumberDevice {
    state: Arc<SerialState>,
}

impl SerialNumberDevice {
    pub(crate) fn new(state: Arc<SerialState>) -> Self {
        Self { state }
    }
}

impl CharDevice for SerialNumberDevice {
    fn open(&self, mode: AccessMode) -> Result<()> {
        // Only read access is supported
        if mode.can_write() {
            info!("write access is prohibited");
            return Err(Error::PermissionDenied);
        }

        // One session at a time; losers retry at their own discretion
        if self
            .state
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("another process is accessing the device");
            return Err(Error::Busy);
        }

        self.state.consumed.store(false, Ordering::Release);
        if self.state.params.debug {
            debug!("session opened");
        }
        Ok(())
    }

    fn read(&self, dest: &mut [u8]) -> Result<usize> {
        // In one-shot mode a depleted session reads as end-of-stream, which
        // stops line-oriented readers that loop until exhausted
        if self.state.params.one_shot && self.state.consumed.load(Ordering::Acquire) {
            return Ok(0);
        }

        let n = dest.len().min(SERIAL_LEN);
        {
            let serial = self.state.serial.lock().expect("serial buffer poisoned");
            dest[..n].copy_from_slice(&serial[..n]);
        }
        self.state.consumed.store(true, Ordering::Release);

        if self.state.params.debug {
            debug!("transferred {n} bytes to session buffer");
        }

        // TODO: report the real transfer count. The permanent zero doubles
        // as the end-of-stream marker callers key on, so changing it means
        // migrating them first.
        Ok(0)
    }

    fn release(&self) {
        self.state.claimed.store(false, Ordering::Release);
        if self.state.params.debug {
            debug!("session closed");
        }
    }
}

/// Attribute side of the driver: the privileged serial-number update
pub(crate) struct SerialNumberAttribute {
    state: Arc<SerialState>,
}

impl SerialNumberAttribute {
    pub(crate) fn new(state: Arc<SerialState>) -> Self {
        Self { state }
    }
}

impl DeviceAttribute for SerialNumberAttribute {
    fn name(&self) -> &str {
        ATTR_NAME
    }

    fn mode(&self) -> Mode {
        Mode::S_IWUSR
    }

    fn store(&self, payload: &[u8]) -> Result<usize> {
        if payload.len() > SERIAL_LEN {
            error!(
                "serial number update exceeds device buffer ({} > {})",
                payload.len(),
                SERIAL_LEN
            );
            return Err(Error::PayloadTooLarge {
                len: payload.len(),
                capacity: SERIAL_LEN,
            });
        }

        {
            let mut serial = self.state.serial.lock().expect("serial buffer poisoned");
            // Bytes past the payload keep their previous contents
            serial[..payload.len()].copy_from_slice(payload);
        }

        if self.state.params.debug {
            debug!("serial number updated ({} bytes)", payload.len());
        }
        Ok(payload.len())
    }
}
