//! Device Registry - Process-wide registration tables and dispatch
//!
//! Drivers register in the same order the kernel-side sequence would run:
//! chrdev (major + fops), then class, then device node, then attribute
//! files. Every step returns a guard; dropping a guard removes exactly
//! what the step created, so guards dropped in reverse creation order
//! unwind a partial registration the same way an error-label chain would.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use log::debug;

use crate::devnum::{DevNum, MajorAllocator};
use crate::fops::{AccessMode, CharDevice};
use crate::sysfs::DeviceAttribute;
use crate::{Error, Result};

struct ChrdevEntry {
    name: String,
    fops: Arc<dyn CharDevice>,
}

#[derive(Default)]
struct Tables {
    /// Registered char devices, keyed by major
    chrdevs: HashMap<u32, ChrdevEntry>,
    /// Registered device classes
    classes: Vec<String>,
    /// Device nodes, keyed by node name
    nodes: HashMap<String, DevNum>,
    /// Attribute files, keyed by (node name, attribute name)
    attrs: HashMap<(String, String), Arc<dyn DeviceAttribute>>,
}

/// Process-wide device registry
pub struct DeviceRegistry {
    majors: Mutex<MajorAllocator>,
    tables: RwLock<Tables>,
}

impl DeviceRegistry {
    /// Create an empty registry
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            majors: Mutex::new(MajorAllocator::new()),
            tables: RwLock::new(Tables::default()),
        })
    }

    /// Register a char device under a dynamically allocated major
    ///
    /// # Errors
    /// Returns `MajorsExhausted` when no major is available.
    pub fn register_chrdev(
        self: &Arc<Self>,
        name: &str,
        fops: Arc<dyn CharDevice>,
    ) -> Result<ChrdevRegistration> {
        let major = self.majors.lock().expect("major allocator poisoned").allocate()?;

        let mut tables = self.tables.write().expect("registry tables poisoned");
        tables.chrdevs.insert(
            major,
            ChrdevEntry {
                name: name.to_string(),
                fops,
            },
        );
        debug!("registered char device '{name}' with major {major}");

        Ok(ChrdevRegistration {
            registry: Arc::clone(self),
            major,
        })
    }

    /// Create a device class
    ///
    /// # Errors
    /// Returns `ClassExists` if the name is already taken.
    pub fn class_create(self: &Arc<Self>, name: &str) -> Result<ClassHandle> {
        let mut tables = self.tables.write().expect("registry tables poisoned");
        if tables.classes.iter().any(|c| c == name) {
            return Err(Error::ClassExists {
                name: name.to_string(),
            });
        }
        tables.classes.push(name.to_string());
        debug!("created device class '{name}'");

        Ok(ClassHandle {
            registry: Arc::clone(self),
            name: name.to_string(),
        })
    }

    /// Open a session on a device node
    ///
    /// Resolves the node to its registered char device and calls the
    /// driver's `open`. The returned handle releases the device when
    /// dropped, on every exit path.
    ///
    /// # Errors
    /// `DeviceNotFound` for unknown nodes, `UnknownMajor` if the backing
    /// char device was unregistered, plus whatever the driver's `open`
    /// rejects.
    pub fn open(&self, node_name: &str, mode: AccessMode) -> Result<FileHandle> {
        let fops = {
            let tables = self.tables.read().expect("registry tables poisoned");
            let devnum = tables.nodes.get(node_name).ok_or_else(|| Error::DeviceNotFound {
                name: node_name.to_string(),
            })?;
            let entry = tables
                .chrdevs
                .get(&devnum.major())
                .ok_or(Error::UnknownMajor {
                    major: devnum.major(),
                })?;
            Arc::clone(&entry.fops)
        };

        fops.open(mode)?;
        Ok(FileHandle { fops, mode })
    }

    /// Store a payload into an attribute file
    ///
    /// Independent of any open session on the node.
    ///
    /// # Errors
    /// `AttributeNotFound` for unknown attributes, `PermissionDenied` when
    /// the attribute is not writable, plus whatever the handler rejects.
    pub fn attr_store(&self, node: &str, attr: &str, payload: &[u8]) -> Result<usize> {
        let handler = self.lookup_attr(node, attr)?;
        if !handler.mode().writable() {
            return Err(Error::PermissionDenied);
        }
        handler.store(payload)
    }

    /// Show the contents of an attribute file
    ///
    /// # Errors
    /// `AttributeNotFound` for unknown attributes, `PermissionDenied` when
    /// the attribute is not readable.
    pub fn attr_show(&self, node: &str, attr: &str) -> Result<Vec<u8>> {
        let handler = self.lookup_attr(node, attr)?;
        if !handler.mode().readable() {
            return Err(Error::PermissionDenied);
        }
        handler.show()
    }

    /// Name registered for a major, if any
    pub fn chrdev_name(&self, major: u32) -> Option<String> {
        let tables = self.tables.read().expect("registry tables poisoned");
        tables.chrdevs.get(&major).map(|e| e.name.clone())
    }

    fn lookup_attr(&self, node: &str, attr: &str) -> Result<Arc<dyn DeviceAttribute>> {
        let tables = self.tables.read().expect("registry tables poisoned");
        tables
            .attrs
            .get(&(node.to_string(), attr.to_string()))
            .cloned()
            .ok_or_else(|| Error::AttributeNotFound {
                node: node.to_string(),
                name: attr.to_string(),
            })
    }
}

/// Guard for a registered char device; unregisters on drop
pub struct ChrdevRegistration {
    registry: Arc<DeviceRegistry>,
    major: u32,
}

impl ChrdevRegistration {
    /// Major number allocated to this device
    pub fn major(&self) -> u32 {
        self.major
    }
}

impl Drop for ChrdevRegistration {
    fn drop(&mut self) {
        let mut tables = self.registry.tables.write().expect("registry tables poisoned");
        if let Some(entry) = tables.chrdevs.remove(&self.major) {
            debug!("unregistered char device '{}' (major {})", entry.name, self.major);
        }
        drop(tables);
        self.registry
            .majors
            .lock()
            .expect("major allocator poisoned")
            .free(self.major);
    }
}

/// Guard for a device class; destroys the class on drop
pub struct ClassHandle {
    registry: Arc<DeviceRegistry>,
    name: String,
}

impl ClassHandle {
    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create a device node under this class
    ///
    /// # Errors
    /// `UnknownMajor` if no char device is registered for the number,
    /// `NodeExists` if the node name is taken.
    pub fn device_create(&self, devnum: DevNum, node_name: &str) -> Result<DeviceNode> {
        let mut tables = self
            .registry
            .tables
            .write()
            .expect("registry tables poisoned");
        if !tables.chrdevs.contains_key(&devnum.major()) {
            return Err(Error::UnknownMajor {
                major: devnum.major(),
            });
        }
        if tables.nodes.contains_key(node_name) {
            return Err(Error::NodeExists {
                name: node_name.to_string(),
            });
        }
        tables.nodes.insert(node_name.to_string(), devnum);
        debug!("created device node '{node_name}' ({}:{})", devnum.major(), devnum.minor());

        Ok(DeviceNode {
            registry: Arc::clone(&self.registry),
            name: node_name.to_string(),
        })
    }
}

impl Drop for ClassHandle {
    fn drop(&mut self) {
        let mut tables = self.registry.tables.write().expect("registry tables poisoned");
        tables.classes.retain(|c| c != &self.name);
        debug!("destroyed device class '{}'", self.name);
    }
}

/// Guard for a device node; destroys the node (and its attribute files)
/// on drop
pub struct DeviceNode {
    registry: Arc<DeviceRegistry>,
    name: String,
}

impl DeviceNode {
    /// Node name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create an attribute file on this node
    ///
    /// # Errors
    /// `AttributeExists` if the node already has an attribute of that name.
    pub fn create_file(&self, attr: Arc<dyn DeviceAttribute>) -> Result<AttrHandle> {
        let key = (self.name.clone(), attr.name().to_string());
        let mut tables = self
            .registry
            .tables
            .write()
            .expect("registry tables poisoned");
        if tables.attrs.contains_key(&key) {
            return Err(Error::AttributeExists {
                node: key.0,
                name: key.1,
            });
        }
        debug!("created attribute '{}' on '{}'", key.1, key.0);
        let handle = AttrHandle {
            registry: Arc::clone(&self.registry),
            node: key.0.clone(),
            name: key.1.clone(),
        };
        tables.attrs.insert(key, attr);
        Ok(handle)
    }
}

impl Drop for DeviceNode {
    fn drop(&mut self) {
        let mut tables = self.registry.tables.write().expect("registry tables poisoned");
        tables.nodes.remove(&self.name);
        // Attribute files do not outlive their node
        tables.attrs.retain(|(node, _), _| node != &self.name);
        debug!("destroyed device node '{}'", self.name);
    }
}

/// Guard for an attribute file; removes the file on drop
pub struct AttrHandle {
    registry: Arc<DeviceRegistry>,
    node: String,
    name: String,
}

impl Drop for AttrHandle {
    fn drop(&mut self) {
        let mut tables = self.registry.tables.write().expect("registry tables poisoned");
        tables.attrs.remove(&(self.node.clone(), self.name.clone()));
    }
}

/// An open session on a device node
///
/// Dropping the handle releases the device unconditionally.
pub struct FileHandle {
    fops: Arc<dyn CharDevice>,
    mode: AccessMode,
}

impl FileHandle {
    /// Read from the device into `dest`
    ///
    /// # Errors
    /// `PermissionDenied` when the session mode does not permit reading,
    /// plus whatever the driver's `read` rejects.
    pub fn read(&mut self, dest: &mut [u8]) -> Result<usize> {
        if !self.mode.can_read() {
            return Err(Error::PermissionDenied);
        }
        self.fops.read(dest)
    }

    /// Access mode this session was opened with
    pub fn mode(&self) -> AccessMode {
        self.mode
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        self.fops.release();
    }
}
