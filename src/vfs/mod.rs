//! In-memory virtual file system
//!
//! The whole file system lives inside one fixed-size byte buffer, the disk.
//! Files are a header record plus a singly linked chain of fixed-size data
//! blocks, all stored in the disk itself.
//!
//! # Design Principles
//!
//! - One owned disk per `Vfs`, no global state
//! - Records are tag-prefixed and decoded through validating readers
//! - Address 0 is reserved, so 0 always means "no block"
//! - First-fit allocation by linear scan; free records are scrubbed when
//!   the scan passes over them
//! - No rollback: partial writes stay visible
//!
//! ```ignore
//! use ramvfs::vfs::Vfs;
//!
//! let mut vfs = Vfs::new(4096)?;
//! let file = vfs.create_file("test.txt")?;
//! vfs.write(file, b"hello")?;
//! vfs.append(file, b", world")?;
//! assert_eq!(vfs.read(file)?, b"hello, world");
//! ```

pub mod allocator;
mod arena;
mod errors;
mod filesystem;
mod hash;
pub mod image;
pub mod layout;
mod report;

pub use arena::{Arena, FIRST_USABLE_ADDR};
pub use errors::{Severity, VfsError, VfsErrorCode, VfsResult};
pub use filesystem::{FileHandle, Vfs};
pub use hash::name_hash;
pub use image::ImageManifest;
pub use layout::{BlockTag, EntryKind, FileHeader, BLOCK_SIZE, DATA_BLOCK_LEN, HEADER_LEN};
pub use report::FileInfo;
