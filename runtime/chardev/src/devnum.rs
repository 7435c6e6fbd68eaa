//! Device Numbers - Major/minor pairs and dynamic major allocation
//!
//! Majors are handed out from the local/experimental range so they never
//! collide with well-known assignments. Freed majors go onto a free list
//! and are reused before the cursor advances.

use crate::{Error, Result};

/// First major in the local/experimental range
pub const DYNAMIC_MAJOR_FIRST: u32 = 240;

/// Last major in the local/experimental range (inclusive)
pub const DYNAMIC_MAJOR_LAST: u32 = 254;

/// Device number: a major/minor pair identifying one device node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DevNum {
    major: u32,
    minor: u32,
}

impl DevNum {
    /// Create a device number from a major/minor pair
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Get the major number
    pub fn major(&self) -> u32 {
        self.major
    }

    /// Get the minor number
    pub fn minor(&self) -> u32 {
        self.minor
    }
}

/// Dynamic major allocator
pub struct MajorAllocator {
    /// Next unallocated major
    next: u32,
    /// Free list of released majors
    free: Vec<u32>,
}

impl MajorAllocator {
    /// Create an allocator covering the full dynamic range
    pub fn new() -> Self {
        Self {
            next: DYNAMIC_MAJOR_FIRST,
            free: Vec::new(),
        }
    }

    /// Allocate a major number
    ///
    /// # Errors
    /// Returns `MajorsExhausted` when the dynamic range is fully allocated.
    pub fn allocate(&mut self) -> Result<u32> {
        // Reuse a released major first
        if let Some(major) = self.free.pop() {
            return Ok(major);
        }

        if self.next > DYNAMIC_MAJOR_LAST {
            return Err(Error::MajorsExhausted);
        }

        let major = self.next;
        self.next += 1;
        Ok(major)
    }

    /// Return a major to the allocator
    pub fn free(&mut self, major: u32) {
        self.free.push(major);
    }
}

impl Default for MajorAllocator {
    fn default() -> Self {
        Self::new()
    }
}
