//! The disk: a fixed-size byte buffer every record lives in.
//!
//! Address 0 is reserved and never handed out by the allocator, which lets
//! `data_addr == 0` and `next_addr == 0` mean "none" without ambiguity.

use std::ops::Range;

use super::errors::{VfsError, VfsResult};

/// First address the allocator may return.
pub const FIRST_USABLE_ADDR: u32 = 1;

/// Fixed-size in-memory disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arena {
    bytes: Vec<u8>,
}

impl Arena {
    /// Creates a zeroed arena of `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns `VFS_ALLOCATION_FAILED` if `size` is zero, exceeds the 32-bit
    /// address space, or the buffer cannot be reserved.
    pub fn new(size: usize) -> VfsResult<Self> {
        if size < FIRST_USABLE_ADDR as usize || size > u32::MAX as usize {
            return Err(VfsError::allocation_failed(size));
        }

        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(size)
            .map_err(|_| VfsError::allocation_failed(size))?;
        bytes.resize(size, 0);

        Ok(Self { bytes })
    }

    /// Wraps an existing disk image.
    pub fn from_bytes(bytes: Vec<u8>) -> VfsResult<Self> {
        let size = bytes.len();
        if size < FIRST_USABLE_ADDR as usize || size > u32::MAX as usize {
            return Err(VfsError::allocation_failed(size));
        }
        Ok(Self { bytes })
    }

    /// Disk size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false: an arena holds at least the reserved byte
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Raw byte-for-byte export of the whole disk
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Byte at `addr`, or `None` past the end
    pub fn byte(&self, addr: usize) -> Option<u8> {
        self.bytes.get(addr).copied()
    }

    /// Borrow `len` bytes starting at `addr`, or `None` if out of bounds
    pub fn slice(&self, addr: u32, len: usize) -> Option<&[u8]> {
        let start = addr as usize;
        self.bytes.get(start..start.checked_add(len)?)
    }

    /// Mutably borrow `len` bytes starting at `addr`, or `None` if out of bounds
    pub fn slice_mut(&mut self, addr: u32, len: usize) -> Option<&mut [u8]> {
        let start = addr as usize;
        self.bytes.get_mut(start..start.checked_add(len)?)
    }

    /// Zero a byte range, clamped to the arena end
    pub fn scrub(&mut self, range: Range<usize>) {
        let end = range.end.min(self.bytes.len());
        if range.start < end {
            self.bytes[range.start..end].fill(0);
        }
    }
}
