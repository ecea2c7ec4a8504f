//! Observable VFS events
//!
//! Events are explicit and typed; their names are the `event` key of every
//! log line.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Disk lifecycle
    /// A fresh zeroed disk was created
    ArenaCreated,

    // Allocation
    /// A data block was allocated
    BlockAllocated,
    /// The allocator ran out of space
    AllocationFailed,

    // Entries
    /// A file or directory header was written
    EntryCreated,
    /// An entry and its chain were released
    EntryRemoved,

    // Data
    /// A full write completed
    WriteComplete,
    /// An append completed
    AppendComplete,
    /// A read completed
    ReadComplete,
    /// An operation failed
    OperationFailed,

    // Images
    /// Disk image written
    ImageDumped,
    /// Disk image loaded
    ImageLoaded,

    // Serve loop
    /// Request loop started
    ServeStart,
    /// Request loop ended
    ServeStop,
}

impl Event {
    /// Returns the event name
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ArenaCreated => "ARENA_CREATED",
            Event::BlockAllocated => "BLOCK_ALLOCATED",
            Event::AllocationFailed => "ALLOCATION_FAILED",
            Event::EntryCreated => "ENTRY_CREATED",
            Event::EntryRemoved => "ENTRY_REMOVED",
            Event::WriteComplete => "WRITE_COMPLETE",
            Event::AppendComplete => "APPEND_COMPLETE",
            Event::ReadComplete => "READ_COMPLETE",
            Event::OperationFailed => "OPERATION_FAILED",
            Event::ImageDumped => "IMAGE_DUMPED",
            Event::ImageLoaded => "IMAGE_LOADED",
            Event::ServeStart => "SERVE_START",
            Event::ServeStop => "SERVE_STOP",
        }
    }

    /// Per-block events are only interesting when tracing
    pub fn is_detail(&self) -> bool {
        matches!(self, Event::BlockAllocated)
    }

    /// Failure events are logged as warnings
    pub fn is_failure(&self) -> bool {
        matches!(self, Event::AllocationFailed | Event::OperationFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
