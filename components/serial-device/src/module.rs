//! Module Lifecycle - Registration at load, reverse-order unwind at unload
//!
//! `SerialModule::init` runs the registration sequence with `?`, so a
//! failure at any step drops the guards created so far in reverse order
//! and the registry is left exactly as before the load attempt.

use std::sync::Arc;

use log::info;

use chardev::{AttrHandle, ChrdevRegistration, ClassHandle, DevNum, DeviceNode, DeviceRegistry, Result};

use crate::device::{SerialNumberAttribute, SerialNumberDevice, SerialState};
use crate::params::ModuleParams;
use crate::{CLASS_NAME, DEVICE_NAME};

/// A loaded driver instance
///
/// Field order is teardown order: attribute file, device node, class,
/// char device registration.
pub struct SerialModule {
    _attr: Option<AttrHandle>,
    node: DeviceNode,
    _class: ClassHandle,
    chrdev: ChrdevRegistration,
}

impl SerialModule {
    /// Register the driver against a device registry
    ///
    /// # Errors
    /// Any registration-step failure aborts the load; partially created
    /// registrations unwind before the error returns.
    pub fn init(registry: &Arc<DeviceRegistry>, params: ModuleParams) -> Result<SerialModule> {
        let state = SerialState::new(params);
        let device = Arc::new(SerialNumberDevice::new(Arc::clone(&state)));

        let chrdev = registry.register_chrdev(DEVICE_NAME, device)?;
        let class = registry.class_create(CLASS_NAME)?;
        let node_name = format!("{CLASS_NAME}_{DEVICE_NAME}");
        let node = class.device_create(DevNum::new(chrdev.major(), 0), &node_name)?;

        // The device node stays usable without its sysfs endpoint
        let attr = match node.create_file(Arc::new(SerialNumberAttribute::new(state))) {
            Ok(handle) => Some(handle),
            Err(err) => {
                info!("failed to create sysfs endpoint, continuing without: {err}");
                None
            }
        };

        info!("{DEVICE_NAME} driver loaded (major {})", chrdev.major());
        Ok(SerialModule {
            _attr: attr,
            node,
            _class: class,
            chrdev,
        })
    }

    /// Major number allocated at load
    pub fn major(&self) -> u32 {
        self.chrdev.major()
    }

    /// Name of the device node clients open
    pub fn node_name(&self) -> &str {
        self.node.name()
    }
}

impl Drop for SerialModule {
    fn drop(&mut self) {
        info!("{DEVICE_NAME} driver unloading");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chardev::{AccessMode, Error};
    use crate::{ATTR_NAME, INIT_VALUE};

    #[test]
    fn test_init_registers_node_and_attr() {
        let registry = DeviceRegistry::new();
        let module = SerialModule::init(&registry, ModuleParams::default()).unwrap();

        assert_eq!(module.node_name(), "cryptoid_serial");
        assert_eq!(registry.chrdev_name(module.major()).as_deref(), Some(DEVICE_NAME));

        let mut file = registry.open(module.node_name(), AccessMode::ReadOnly).unwrap();
        let mut buf = [0u8; 32];
        file.read(&mut buf).unwrap();
        assert_eq!(&buf[..INIT_VALUE.len()], INIT_VALUE);

        let written = registry.attr_store(module.node_name(), ATTR_NAME, b"42").unwrap();
        assert_eq!(written, 2);
    }

    #[test]
    fn test_second_load_fails_and_unwinds() {
        let registry = DeviceRegistry::new();
        let first = SerialModule::init(&registry, ModuleParams::default()).unwrap();

        // The class name is already taken; the second load must unwind its
        // chrdev registration on the way out
        let second = SerialModule::init(&registry, ModuleParams::default());
        assert!(matches!(second, Err(Error::ClassExists { .. })));

        // First instance is unaffected
        let file = registry.open(first.node_name(), AccessMode::ReadOnly);
        assert!(file.is_ok());

        // The failed load returned its major
        drop(first);
        let reloaded = SerialModule::init(&registry, ModuleParams::default()).unwrap();
        assert_eq!(reloaded.major(), chardev::DYNAMIC_MAJOR_FIRST);
    }

    #[test]
    fn test_unload_removes_everything() {
        let registry = DeviceRegistry::new();
        let module = SerialModule::init(&registry, ModuleParams::default()).unwrap();
        let node_name = module.node_name().to_string();

        drop(module);
        assert!(matches!(
            registry.open(&node_name, AccessMode::ReadOnly),
            Err(Error::DeviceNotFound { .. })
        ));
        assert!(matches!(
            registry.attr_store(&node_name, ATTR_NAME, b"42"),
            Err(Error::AttributeNotFound { .. })
        ));
    }
}
