//! Device Attributes - Key/value control-plane files on device nodes
//!
//! Attributes are the out-of-band channel next to a device node: a
//! privileged caller can store into (or show from) an attribute without
//! holding an open session on the node itself. Permission bits on the
//! attribute decide which directions are allowed.

use bitflags::bitflags;

use crate::{Error, Result};

bitflags! {
    /// Attribute permission bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mode: u16 {
        /// Owner may read
        const S_IRUSR = 0o400;
        /// Owner may write
        const S_IWUSR = 0o200;
        /// Group may read
        const S_IRGRP = 0o040;
        /// Others may read
        const S_IROTH = 0o004;
        /// Read for owner, group, and others
        const S_IRUGO = Self::S_IRUSR.bits() | Self::S_IRGRP.bits() | Self::S_IROTH.bits();
    }
}

impl Mode {
    /// Whether any read bit is set
    pub fn readable(&self) -> bool {
        self.intersects(Mode::S_IRUGO)
    }

    /// Whether the write bit is set
    pub fn writable(&self) -> bool {
        self.contains(Mode::S_IWUSR)
    }
}

/// A named attribute exposed on a device node
///
/// The default `show` rejects reads so write-only attributes only need to
/// implement `store`.
pub trait DeviceAttribute: Send + Sync {
    /// Attribute file name
    fn name(&self) -> &str;

    /// Permission bits
    fn mode(&self) -> Mode;

    /// Store a payload into the attribute
    fn store(&self, payload: &[u8]) -> Result<usize>;

    /// Show the attribute contents
    fn show(&self) -> Result<Vec<u8>> {
        Err(Error::PermissionDenied)
    }
}
