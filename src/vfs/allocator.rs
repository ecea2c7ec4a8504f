//! Block allocator
//!
//! A single left-to-right scan over the arena, keeping a running count of
//! contiguous free bytes:
//!
//! - `Used` / `HeaderUsed` records reset the run and are skipped whole
//! - `Free` / `HeaderFree` records are scrubbed and added to the run
//! - `Unset` bytes add one byte to the run
//! - bytes outside the tag space count as one occupied byte
//!
//! The scan returns the start of the first run that reaches the requested
//! size. Record widths are clamped to the arena end. The allocator never
//! writes a tag: the caller must write its record before the next scan.

use super::arena::{Arena, FIRST_USABLE_ADDR};
use super::errors::{VfsError, VfsResult};
use super::layout::BlockTag;

/// Result of a successful scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// Start of the free run
    pub addr: u32,
    /// Free records zeroed while scanning
    pub scrubbed_spans: usize,
}

/// Find room for `requested` bytes.
///
/// Zero-byte requests are treated as one byte.
///
/// # Errors
///
/// Returns `VFS_OUT_OF_SPACE` when the scan reaches the arena end first.
pub fn allocate(arena: &mut Arena, requested: usize) -> VfsResult<Allocation> {
    let requested = requested.max(1);
    let len = arena.len();

    let mut cursor = FIRST_USABLE_ADDR as usize;
    let mut free_run = 0usize;
    let mut scrubbed_spans = 0usize;

    while cursor < len {
        let tag = arena.byte(cursor).and_then(BlockTag::from_byte);
        let width = match tag {
            Some(tag @ (BlockTag::Used | BlockTag::HeaderUsed)) => {
                free_run = 0;
                tag.record_len().min(len - cursor)
            }
            Some(tag @ (BlockTag::Free | BlockTag::HeaderFree)) => {
                let width = tag.record_len().min(len - cursor);
                arena.scrub(cursor..cursor + width);
                scrubbed_spans += 1;
                free_run += width;
                width
            }
            Some(BlockTag::Unset) => {
                free_run += 1;
                1
            }
            None => {
                free_run = 0;
                1
            }
        };
        cursor += width;

        if free_run >= requested {
            return Ok(Allocation {
                addr: (cursor - free_run) as u32,
                scrubbed_spans,
            });
        }
    }

    Err(VfsError::out_of_space(requested))
}

/// Read-only walk over every tagged record, in address order
pub fn records(arena: &Arena) -> Records<'_> {
    Records {
        arena,
        cursor: FIRST_USABLE_ADDR as usize,
    }
}

/// Iterator returned by [`records`]
pub struct Records<'a> {
    arena: &'a Arena,
    cursor: usize,
}

impl Iterator for Records<'_> {
    type Item = (u32, BlockTag);

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.arena.len();
        while self.cursor < len {
            let addr = self.cursor;
            match self.arena.byte(addr).and_then(BlockTag::from_byte) {
                Some(BlockTag::Unset) | None => self.cursor += 1,
                Some(tag) => {
                    self.cursor += tag.record_len().min(len - addr);
                    return Some((addr as u32, tag));
                }
            }
        }
        None
    }
}
