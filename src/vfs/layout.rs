//! Record layout inside the arena
//!
//! Every record starts with a one-byte tag. Integers are little-endian.
//!
//! File header (42 bytes):
//!
//! ```text
//! +-----------+  0
//! | Tag       |  (u8: HeaderUsed / HeaderFree)
//! +-----------+  1
//! | Name      |  (24 bytes, left-aligned, tail not cleared)
//! +-----------+  25
//! | Name Hash |  (u64 LE, over all 24 name bytes)
//! +-----------+  33
//! | Kind      |  (u8: 1 = file, 2 = directory)
//! +-----------+  34
//! | Data Addr |  (u32 LE, 0 = no chain)
//! +-----------+  38
//! | Size      |  (u32 LE)
//! +-----------+  42
//! ```
//!
//! Data block (5 + BLOCK_SIZE bytes):
//!
//! ```text
//! +-----------+  0
//! | Tag       |  (u8: Used / Free)
//! +-----------+  1
//! | Next Addr |  (u32 LE, 0 = end of chain)
//! +-----------+  5
//! | Payload   |  (BLOCK_SIZE bytes)
//! +-----------+
//! ```
//!
//! Records are only ever read through the decoders below, which check the
//! tag and bounds before interpreting anything else.

use thiserror::Error;

use super::arena::Arena;
use super::errors::VfsError;

/// Payload bytes per data block
pub const BLOCK_SIZE: usize = 32;

/// Bytes reserved for a name
pub const NAME_LEN: usize = 24;

const HEADER_NAME: usize = 1;
const HEADER_HASH: usize = HEADER_NAME + NAME_LEN;
const HEADER_KIND: usize = HEADER_HASH + 8;
const HEADER_DATA_ADDR: usize = HEADER_KIND + 1;
const HEADER_SIZE: usize = HEADER_DATA_ADDR + 4;

/// Width of a file header record
pub const HEADER_LEN: usize = HEADER_SIZE + 4;

const BLOCK_NEXT: usize = 1;
const BLOCK_PAYLOAD: usize = BLOCK_NEXT + 4;

/// Width of a data block record
pub const DATA_BLOCK_LEN: usize = BLOCK_PAYLOAD + BLOCK_SIZE;

/// Record discriminator stored at the first byte of every record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockTag {
    /// Raw byte never allocated
    Unset = 0,
    /// Live data block
    Used = 1,
    /// Released data block
    Free = 2,
    /// Live file header
    HeaderUsed = 3,
    /// Released file header
    HeaderFree = 4,
}

impl BlockTag {
    /// Decode a tag byte; `None` for bytes outside the tag space
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(BlockTag::Unset),
            1 => Some(BlockTag::Used),
            2 => Some(BlockTag::Free),
            3 => Some(BlockTag::HeaderUsed),
            4 => Some(BlockTag::HeaderFree),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Declared width of a record carrying this tag
    pub fn record_len(self) -> usize {
        match self {
            BlockTag::Unset => 1,
            BlockTag::Used | BlockTag::Free => DATA_BLOCK_LEN,
            BlockTag::HeaderUsed | BlockTag::HeaderFree => HEADER_LEN,
        }
    }
}

/// What a header describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[serde(rename = "file")]
    RegularFile = 1,
    Directory = 2,
}

impl EntryKind {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(EntryKind::RegularFile),
            2 => Some(EntryKind::Directory),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::RegularFile => "File",
            EntryKind::Directory => "Directory",
        }
    }
}

/// Decode failures for records in the arena
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("Record at {addr} overruns the disk ({len} bytes needed)")]
    OutOfBounds { addr: u32, len: usize },

    #[error("Expected {expected:?} record at {addr}, found tag byte {found}")]
    UnexpectedTag {
        addr: u32,
        expected: BlockTag,
        found: u8,
    },

    #[error("Unknown entry kind {kind} in header at {addr}")]
    UnknownKind { addr: u32, kind: u8 },
}

impl LayoutError {
    pub fn addr(&self) -> u32 {
        match self {
            LayoutError::OutOfBounds { addr, .. }
            | LayoutError::UnexpectedTag { addr, .. }
            | LayoutError::UnknownKind { addr, .. } => *addr,
        }
    }
}

impl From<LayoutError> for VfsError {
    fn from(e: LayoutError) -> Self {
        VfsError::bad_record(e.addr(), e.to_string())
    }
}

fn record(arena: &Arena, addr: u32, expected: BlockTag) -> Result<&[u8], LayoutError> {
    let len = expected.record_len();
    let bytes = arena
        .slice(addr, len)
        .ok_or(LayoutError::OutOfBounds { addr, len })?;
    if bytes[0] != expected.as_byte() {
        return Err(LayoutError::UnexpectedTag {
            addr,
            expected,
            found: bytes[0],
        });
    }
    Ok(bytes)
}

fn record_mut(arena: &mut Arena, addr: u32, expected: BlockTag) -> Result<&mut [u8], LayoutError> {
    let len = expected.record_len();
    let bytes = arena
        .slice_mut(addr, len)
        .ok_or(LayoutError::OutOfBounds { addr, len })?;
    if bytes[0] != expected.as_byte() {
        return Err(LayoutError::UnexpectedTag {
            addr,
            expected,
            found: bytes[0],
        });
    }
    Ok(bytes)
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}

/// Overwrite the tag byte at `addr`
pub fn write_tag(arena: &mut Arena, addr: u32, tag: BlockTag) -> Result<(), LayoutError> {
    let byte = arena
        .slice_mut(addr, 1)
        .ok_or(LayoutError::OutOfBounds { addr, len: 1 })?;
    byte[0] = tag.as_byte();
    Ok(())
}

/// Decoded file header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// Raw name field, including whatever trails the name
    pub name: [u8; NAME_LEN],
    /// Hash of `name`
    pub hash: u64,
    pub kind: EntryKind,
    /// First data block, 0 when nothing has been written
    pub data_addr: u32,
    /// Logical file length in bytes
    pub size: u32,
}

impl FileHeader {
    /// Decode a live header at `addr`
    pub fn decode(arena: &Arena, addr: u32) -> Result<Self, LayoutError> {
        let bytes = record(arena, addr, BlockTag::HeaderUsed)?;

        let mut name = [0u8; NAME_LEN];
        name.copy_from_slice(&bytes[HEADER_NAME..HEADER_HASH]);

        let kind = EntryKind::from_byte(bytes[HEADER_KIND]).ok_or(LayoutError::UnknownKind {
            addr,
            kind: bytes[HEADER_KIND],
        })?;

        Ok(Self {
            name,
            hash: read_u64(bytes, HEADER_HASH),
            kind,
            data_addr: read_u32(bytes, HEADER_DATA_ADDR),
            size: read_u32(bytes, HEADER_SIZE),
        })
    }

    /// Write this header, tag included, at `addr`
    pub fn encode(&self, arena: &mut Arena, addr: u32) -> Result<(), LayoutError> {
        let bytes = arena
            .slice_mut(addr, HEADER_LEN)
            .ok_or(LayoutError::OutOfBounds {
                addr,
                len: HEADER_LEN,
            })?;

        bytes[0] = BlockTag::HeaderUsed.as_byte();
        bytes[HEADER_NAME..HEADER_HASH].copy_from_slice(&self.name);
        bytes[HEADER_HASH..HEADER_KIND].copy_from_slice(&self.hash.to_le_bytes());
        bytes[HEADER_KIND] = self.kind as u8;
        bytes[HEADER_DATA_ADDR..HEADER_SIZE].copy_from_slice(&self.data_addr.to_le_bytes());
        bytes[HEADER_SIZE..HEADER_LEN].copy_from_slice(&self.size.to_le_bytes());
        Ok(())
    }

    /// Name bytes up to the first NUL
    pub fn name_bytes(&self) -> &[u8] {
        let end = self.name.iter().position(|b| *b == 0).unwrap_or(NAME_LEN);
        &self.name[..end]
    }

    /// Name as text, invalid UTF-8 replaced
    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(self.name_bytes()).into_owned()
    }
}

/// Name field currently stored at a header address, before a header is written
pub fn raw_name(arena: &Arena, addr: u32) -> Result<[u8; NAME_LEN], LayoutError> {
    let bytes = arena
        .slice(addr, HEADER_LEN)
        .ok_or(LayoutError::OutOfBounds {
            addr,
            len: HEADER_LEN,
        })?;
    let mut name = [0u8; NAME_LEN];
    name.copy_from_slice(&bytes[HEADER_NAME..HEADER_HASH]);
    Ok(name)
}

/// Borrowed view of a live data block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataBlock<'a> {
    pub next_addr: u32,
    pub payload: &'a [u8],
}

impl<'a> DataBlock<'a> {
    /// Decode a live data block at `addr`
    pub fn decode(arena: &'a Arena, addr: u32) -> Result<Self, LayoutError> {
        let bytes = record(arena, addr, BlockTag::Used)?;
        Ok(Self {
            next_addr: read_u32(bytes, BLOCK_NEXT),
            payload: &bytes[BLOCK_PAYLOAD..DATA_BLOCK_LEN],
        })
    }

    /// Tag a freshly allocated span as a chain-terminating data block.
    ///
    /// The payload is left untouched.
    pub fn init(arena: &mut Arena, addr: u32) -> Result<(), LayoutError> {
        let bytes = arena
            .slice_mut(addr, DATA_BLOCK_LEN)
            .ok_or(LayoutError::OutOfBounds {
                addr,
                len: DATA_BLOCK_LEN,
            })?;
        bytes[0] = BlockTag::Used.as_byte();
        bytes[BLOCK_NEXT..BLOCK_PAYLOAD].copy_from_slice(&0u32.to_le_bytes());
        Ok(())
    }

    /// Point the block at `addr` to `next`
    pub fn set_next(arena: &mut Arena, addr: u32, next: u32) -> Result<(), LayoutError> {
        let bytes = record_mut(arena, addr, BlockTag::Used)?;
        bytes[BLOCK_NEXT..BLOCK_PAYLOAD].copy_from_slice(&next.to_le_bytes());
        Ok(())
    }

    /// Payload of the live block at `addr`
    pub fn payload_mut(arena: &mut Arena, addr: u32) -> Result<&mut [u8], LayoutError> {
        let bytes = record_mut(arena, addr, BlockTag::Used)?;
        Ok(&mut bytes[BLOCK_PAYLOAD..DATA_BLOCK_LEN])
    }
}
