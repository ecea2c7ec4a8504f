//! VFS error types
//!
//! Error codes:
//! - VFS_ALLOCATION_FAILED (FATAL) - the arena itself could not be created
//! - VFS_OUT_OF_SPACE (ERROR) - allocator scan exhausted the arena
//! - VFS_EMPTY_TARGET (ERROR) - append on an entry with no chain
//! - VFS_EMPTY_FILE (ERROR) - read on an entry of size zero
//! - VFS_TRUNCATED_CHAIN (FATAL) - chain ends before the declared size
//! - VFS_BAD_RECORD (FATAL) - bytes at an address do not decode as expected
//! - VFS_INVALID_HANDLE (ERROR) - a handle does not name a live header
//! - VFS_IMAGE_IO (ERROR) - dumping or loading a disk image failed

use std::fmt;
use std::io;

/// Severity levels for VFS errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, the arena stays usable
    Error,
    /// The arena can no longer be trusted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// VFS error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VfsErrorCode {
    /// Arena buffer could not be reserved
    AllocationFailed,
    /// No contiguous run large enough for the request
    OutOfSpace,
    /// Append target has no data chain
    EmptyTarget,
    /// Read target has size zero
    EmptyFile,
    /// Chain ended before the declared size was reached
    TruncatedChain,
    /// Record at an address has the wrong tag or shape
    BadRecord,
    /// Handle does not point at a live header
    InvalidHandle,
    /// Disk image could not be written or read
    ImageIo,
}

impl VfsErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            VfsErrorCode::AllocationFailed => "VFS_ALLOCATION_FAILED",
            VfsErrorCode::OutOfSpace => "VFS_OUT_OF_SPACE",
            VfsErrorCode::EmptyTarget => "VFS_EMPTY_TARGET",
            VfsErrorCode::EmptyFile => "VFS_EMPTY_FILE",
            VfsErrorCode::TruncatedChain => "VFS_TRUNCATED_CHAIN",
            VfsErrorCode::BadRecord => "VFS_BAD_RECORD",
            VfsErrorCode::InvalidHandle => "VFS_INVALID_HANDLE",
            VfsErrorCode::ImageIo => "VFS_IMAGE_IO",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            VfsErrorCode::AllocationFailed => Severity::Fatal,
            VfsErrorCode::OutOfSpace => Severity::Error,
            VfsErrorCode::EmptyTarget => Severity::Error,
            VfsErrorCode::EmptyFile => Severity::Error,
            VfsErrorCode::TruncatedChain => Severity::Fatal,
            VfsErrorCode::BadRecord => Severity::Fatal,
            VfsErrorCode::InvalidHandle => Severity::Error,
            VfsErrorCode::ImageIo => Severity::Error,
        }
    }
}

impl fmt::Display for VfsErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// VFS error with context
#[derive(Debug)]
pub struct VfsError {
    code: VfsErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl VfsError {
    fn new(code: VfsErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// The arena buffer could not be created
    pub fn allocation_failed(size: usize) -> Self {
        Self::new(
            VfsErrorCode::AllocationFailed,
            format!("Failed to create a disk of {} bytes", size),
        )
    }

    /// The allocator found no run of `requested` free bytes
    pub fn out_of_space(requested: usize) -> Self {
        Self::new(VfsErrorCode::OutOfSpace, "Out of disk space")
            .with_details(format!("requested_bytes: {}", requested))
    }

    /// Append on an entry without a data chain
    pub fn empty_target(header_addr: u32) -> Self {
        Self::new(
            VfsErrorCode::EmptyTarget,
            "Entry has no data to append to; write it first",
        )
        .with_details(format!("header_addr: {}", header_addr))
    }

    /// Read on an entry of size zero
    pub fn empty_file(header_addr: u32) -> Self {
        Self::new(VfsErrorCode::EmptyFile, "File is empty")
            .with_details(format!("header_addr: {}", header_addr))
    }

    /// Chain ended after `emitted` of `expected` bytes
    pub fn truncated_chain(header_addr: u32, emitted: usize, expected: usize) -> Self {
        Self::new(
            VfsErrorCode::TruncatedChain,
            format!(
                "Block chain ended after {} of {} bytes",
                emitted, expected
            ),
        )
        .with_details(format!("header_addr: {}", header_addr))
    }

    /// Bytes at `addr` do not form the expected record
    pub fn bad_record(addr: u32, reason: impl Into<String>) -> Self {
        Self::new(VfsErrorCode::BadRecord, reason).with_details(format!("addr: {}", addr))
    }

    /// `addr` holds no live header
    pub fn invalid_handle(addr: u32) -> Self {
        Self::new(VfsErrorCode::InvalidHandle, "No live entry at this address")
            .with_details(format!("addr: {}", addr))
    }

    /// Image file I/O failure
    pub fn image_io(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: VfsErrorCode::ImageIo,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    /// Image content rejected without an I/O cause
    pub fn image_invalid(message: impl Into<String>) -> Self {
        Self::new(VfsErrorCode::ImageIo, message)
    }

    fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }

    /// Returns the error code
    pub fn code(&self) -> VfsErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether the arena should no longer be trusted
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for VfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for VfsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for VFS operations
pub type VfsResult<T> = Result<T, VfsError>;
