//! Integration tests for the registration workflow
//!
//! These tests walk the same sequence a driver init runs: register the
//! char device, create the class, create the node, attach an attribute
//! file, then tear everything down in reverse and confirm nothing leaks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chardev::{
    AccessMode, CharDevice, DevNum, DeviceAttribute, DeviceRegistry, Error, Mode, Result,
};

struct EchoDevice {
    open: AtomicBool,
}

impl EchoDevice {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            open: AtomicBool::new(false),
        })
    }
}

impl CharDevice for EchoDevice {
    fn open(&self, _mode: AccessMode) -> Result<()> {
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn read(&self, dest: &mut [u8]) -> Result<usize> {
        dest.fill(0xEE);
        Ok(dest.len())
    }

    fn release(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

struct SinkAttr;

impl DeviceAttribute for SinkAttr {
    fn name(&self) -> &str {
        "sink"
    }

    fn mode(&self) -> Mode {
        Mode::S_IWUSR
    }

    fn store(&self, payload: &[u8]) -> Result<usize> {
        Ok(payload.len())
    }
}

/// Full register → open → teardown workflow
#[test]
fn full_registration_workflow() {
    let registry = DeviceRegistry::new();
    let device = EchoDevice::new();

    let chrdev = registry
        .register_chrdev("echo", device.clone())
        .expect("chrdev registration failed");
    let class = registry.class_create("echoclass").expect("class creation failed");
    let node = class
        .device_create(DevNum::new(chrdev.major(), 0), "echoclass_echo")
        .expect("node creation failed");
    let attr = node.create_file(Arc::new(SinkAttr)).expect("attr creation failed");

    // Device node path
    let mut file = registry
        .open("echoclass_echo", AccessMode::ReadOnly)
        .expect("open failed");
    assert!(device.open.load(Ordering::SeqCst));

    let mut buf = [0u8; 8];
    file.read(&mut buf).expect("read failed");
    assert_eq!(buf, [0xEE; 8]);

    drop(file);
    assert!(!device.open.load(Ordering::SeqCst));

    // Attribute path works without any open session
    let written = registry
        .attr_store("echoclass_echo", "sink", b"123")
        .expect("attr store failed");
    assert_eq!(written, 3);

    // Teardown in reverse creation order
    drop(attr);
    drop(node);
    drop(class);
    drop(chrdev);

    assert!(matches!(
        registry.open("echoclass_echo", AccessMode::ReadOnly),
        Err(Error::DeviceNotFound { .. })
    ));
    assert!(matches!(
        registry.attr_store("echoclass_echo", "sink", b"123"),
        Err(Error::AttributeNotFound { .. })
    ));
}

/// A failed init step leaves no residue once the earlier guards drop
#[test]
fn partial_registration_unwinds() {
    let registry = DeviceRegistry::new();
    let major;

    {
        let chrdev = registry
            .register_chrdev("half", EchoDevice::new())
            .expect("chrdev registration failed");
        major = chrdev.major();
        let class = registry.class_create("halfclass").expect("class creation failed");

        // Simulated init failure: the node name is already taken
        let _node = class
            .device_create(DevNum::new(major, 0), "halfclass_half")
            .expect("node creation failed");
        let clash = class.device_create(DevNum::new(major, 1), "halfclass_half");
        assert!(matches!(clash, Err(Error::NodeExists { .. })));

        // Guards fall out of scope here, reverse order
    }

    // Major was returned to the allocator and the class name is free again
    let reused = registry.register_chrdev("again", EchoDevice::new()).unwrap();
    assert_eq!(reused.major(), major);
    assert!(registry.class_create("halfclass").is_ok());
}
