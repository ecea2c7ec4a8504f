//! File operations over the arena
//!
//! A `Vfs` owns one disk, the last error raised against it and its counters.
//! Entries are named by a [`FileHandle`], the address of their header;
//! every operation re-decodes the header from the disk, so a handle never
//! holds stale state.
//!
//! # Chains
//!
//! File contents live in singly linked data blocks starting at the header's
//! `data_addr`. A full write allocates `len / BLOCK_SIZE + 1` blocks, one
//! more than strictly needed when `len` is a multiple of `BLOCK_SIZE`; the
//! trailing block is reused by a later append. Once the first new block is
//! linked, the previous chain is tagged free.
//!
//! # Partial failure
//!
//! Nothing is rolled back, but the header `size` always covers exactly the
//! bytes reachable from `data_addr`. A write that fails before its first
//! block leaves the file untouched; one that fails later keeps the prefix of
//! the new contents it linked. An append that runs out of space keeps the
//! bytes it already stored.

use std::cell::Cell;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::allocator::{self, records};
use super::arena::Arena;
use super::errors::{VfsError, VfsErrorCode, VfsResult};
use super::hash::name_hash;
use super::image::{self, ImageManifest};
use super::layout::{
    self, BlockTag, DataBlock, EntryKind, FileHeader, LayoutError, BLOCK_SIZE, DATA_BLOCK_LEN,
    HEADER_LEN, NAME_LEN,
};
use super::report::FileInfo;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry, MetricsSnapshot};

/// Address of a live file header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileHandle(u32);

impl FileHandle {
    /// Refer to the header at `addr`; validated on use
    pub fn new(addr: u32) -> Self {
        Self(addr)
    }

    pub fn addr(&self) -> u32 {
        self.0
    }
}

/// An in-memory file system over one fixed-size disk
#[derive(Debug)]
pub struct Vfs {
    arena: Arena,
    last_error: Cell<Option<VfsErrorCode>>,
    metrics: MetricsRegistry,
}

impl Vfs {
    /// Create a file system on a fresh zeroed disk of `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns `VFS_ALLOCATION_FAILED` if the disk cannot be created.
    pub fn new(size: usize) -> VfsResult<Self> {
        let arena = Arena::new(size)?;
        log_event_with_fields(Event::ArenaCreated, &[("disk_size", &size.to_string())]);
        Ok(Self::with_arena(arena))
    }

    /// Wrap an existing disk
    pub fn with_arena(arena: Arena) -> Self {
        Self {
            arena,
            last_error: Cell::new(None),
            metrics: MetricsRegistry::new(),
        }
    }

    /// Load a disk image written by [`Vfs::dump_image`]
    pub fn load_image(path: &Path) -> VfsResult<Self> {
        let arena = image::load(path)?;
        log_event_with_fields(
            Event::ImageLoaded,
            &[
                ("disk_size", &arena.len().to_string()),
                ("path", &path.display().to_string()),
            ],
        );
        Ok(Self::with_arena(arena))
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Code of the most recent failed operation on this disk
    pub fn last_error(&self) -> Option<VfsErrorCode> {
        self.last_error.get()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn track<T>(&self, op: &str, result: VfsResult<T>) -> VfsResult<T> {
        if let Err(ref e) = result {
            self.last_error.set(Some(e.code()));
            log_event_with_fields(
                Event::OperationFailed,
                &[
                    ("code", e.code().code()),
                    ("message", e.message()),
                    ("op", op),
                ],
            );
        }
        result
    }

    fn allocate(&mut self, len: usize) -> VfsResult<u32> {
        match allocator::allocate(&mut self.arena, len) {
            Ok(allocation) => {
                self.metrics
                    .add_scrubbed_spans(allocation.scrubbed_spans as u64);
                Ok(allocation.addr)
            }
            Err(e) => {
                self.metrics.increment_allocation_failures();
                log_event_with_fields(
                    Event::AllocationFailed,
                    &[("requested_bytes", &len.to_string())],
                );
                Err(e)
            }
        }
    }

    fn allocate_block(&mut self) -> VfsResult<u32> {
        let addr = self.allocate(DATA_BLOCK_LEN)?;
        DataBlock::init(&mut self.arena, addr)?;
        self.metrics.increment_blocks();
        log_event_with_fields(Event::BlockAllocated, &[("addr", &addr.to_string())]);
        Ok(addr)
    }

    fn load_header(&self, handle: FileHandle) -> VfsResult<FileHeader> {
        FileHeader::decode(&self.arena, handle.0).map_err(|e| match e {
            LayoutError::OutOfBounds { .. } | LayoutError::UnexpectedTag { .. } => {
                VfsError::invalid_handle(handle.0)
            }
            e => e.into(),
        })
    }

    fn store_header(&mut self, handle: FileHandle, header: &FileHeader) -> VfsResult<()> {
        Ok(header.encode(&mut self.arena, handle.0)?)
    }

    /// Create a file or directory header named `name`.
    ///
    /// Names longer than 24 bytes are truncated. Shorter names overlay the
    /// bytes already on the disk; the hash covers all 24 bytes.
    ///
    /// # Errors
    ///
    /// Returns `VFS_OUT_OF_SPACE` if no room is left for a header.
    pub fn create_entry(&mut self, name: &str, kind: EntryKind) -> VfsResult<FileHandle> {
        let result = self.create_entry_inner(name.as_bytes(), kind);
        self.track("create", result)
    }

    /// Create a regular file
    pub fn create_file(&mut self, name: &str) -> VfsResult<FileHandle> {
        self.create_entry(name, EntryKind::RegularFile)
    }

    /// Create a directory entry
    pub fn create_dir(&mut self, name: &str) -> VfsResult<FileHandle> {
        self.create_entry(name, EntryKind::Directory)
    }

    fn create_entry_inner(&mut self, name: &[u8], kind: EntryKind) -> VfsResult<FileHandle> {
        let addr = self.allocate(HEADER_LEN)?;

        let mut name_field = layout::raw_name(&self.arena, addr)?;
        let len = name.len().min(NAME_LEN);
        name_field[..len].copy_from_slice(&name[..len]);

        let header = FileHeader {
            name: name_field,
            hash: name_hash(&name_field),
            kind,
            data_addr: 0,
            size: 0,
        };
        let handle = FileHandle(addr);
        self.store_header(handle, &header)?;
        self.metrics.increment_headers();

        log_event_with_fields(
            Event::EntryCreated,
            &[
                ("addr", &addr.to_string()),
                ("kind", kind.as_str()),
                ("name", &header.name_lossy()),
            ],
        );
        Ok(handle)
    }

    /// Decode the header behind `handle`
    pub fn header(&self, handle: FileHandle) -> VfsResult<FileHeader> {
        let result = self.load_header(handle);
        self.track("header", result)
    }

    /// Replace the contents of `handle` with `data`.
    ///
    /// Always allocates `data.len() / BLOCK_SIZE + 1` blocks. The previous
    /// chain is released as soon as the first new block is linked, so later
    /// blocks of the new chain may land in it.
    ///
    /// # Errors
    ///
    /// - `VFS_OUT_OF_SPACE` if a block cannot be allocated. Before the first
    ///   block the file is unchanged; after it the file holds the prefix of
    ///   `data` linked so far
    /// - `VFS_BAD_RECORD` if the previous chain does not decode; nothing is
    ///   written in that case
    pub fn write(&mut self, handle: FileHandle, data: &[u8]) -> VfsResult<()> {
        let result = self.write_inner(handle, data);
        self.track("write", result)
    }

    fn write_inner(&mut self, handle: FileHandle, data: &[u8]) -> VfsResult<()> {
        let mut header = self.load_header(handle)?;
        if u32::try_from(data.len()).is_err() {
            return Err(VfsError::out_of_space(data.len()));
        }
        let old_chain = self.chain_of(&header)?;

        let blocks = data.len() / BLOCK_SIZE + 1;
        let mut prev: Option<u32> = None;

        for index in 0..blocks {
            let addr = self.allocate_block()?;

            let start = (index * BLOCK_SIZE).min(data.len());
            let end = (start + BLOCK_SIZE).min(data.len());
            let chunk = &data[start..end];
            DataBlock::payload_mut(&mut self.arena, addr)?[..chunk.len()].copy_from_slice(chunk);

            match prev {
                None => header.data_addr = addr,
                Some(prev_addr) => DataBlock::set_next(&mut self.arena, prev_addr, addr)?,
            }
            header.size = end as u32;
            self.store_header(handle, &header)?;
            self.metrics.add_bytes_written(chunk.len() as u64);

            if prev.is_none() {
                self.release_chain(&old_chain)?;
            }
            prev = Some(addr);
        }

        log_event_with_fields(
            Event::WriteComplete,
            &[
                ("addr", &handle.0.to_string()),
                ("blocks", &blocks.to_string()),
                ("released", &old_chain.len().to_string()),
                ("size", &header.size.to_string()),
            ],
        );
        Ok(())
    }

    /// Append `data` to the end of `handle`'s contents.
    ///
    /// Fills the spare capacity of the block holding the last byte, then the
    /// following chain block if one exists, then newly allocated blocks.
    ///
    /// # Errors
    ///
    /// - `VFS_EMPTY_TARGET` if the entry was never written
    /// - `VFS_OUT_OF_SPACE` if a new block cannot be allocated; the bytes
    ///   stored so far remain and are counted in the header size
    /// - `VFS_TRUNCATED_CHAIN` if the chain is shorter than the header size
    pub fn append(&mut self, handle: FileHandle, data: &[u8]) -> VfsResult<()> {
        let result = self.append_inner(handle, data);
        self.track("append", result)
    }

    fn append_inner(&mut self, handle: FileHandle, data: &[u8]) -> VfsResult<()> {
        let mut header = self.load_header(handle)?;
        if header.data_addr == 0 {
            return Err(VfsError::empty_target(handle.0));
        }
        if header.size as usize + data.len() > u32::MAX as usize {
            return Err(VfsError::out_of_space(data.len()));
        }

        let (mut addr, mut used) = self.seek_last_block(handle, &header)?;
        let mut remaining = data;

        while !remaining.is_empty() {
            if used == BLOCK_SIZE {
                let next = DataBlock::decode(&self.arena, addr)?.next_addr;
                addr = if next != 0 {
                    next
                } else {
                    let fresh = self.allocate_block()?;
                    DataBlock::set_next(&mut self.arena, addr, fresh)?;
                    fresh
                };
                used = 0;
            }

            let n = (BLOCK_SIZE - used).min(remaining.len());
            DataBlock::payload_mut(&mut self.arena, addr)?[used..used + n]
                .copy_from_slice(&remaining[..n]);
            used += n;
            remaining = &remaining[n..];

            header.size += n as u32;
            self.store_header(handle, &header)?;
            self.metrics.add_bytes_appended(n as u64);
        }

        log_event_with_fields(
            Event::AppendComplete,
            &[
                ("addr", &handle.0.to_string()),
                ("appended", &data.len().to_string()),
                ("size", &header.size.to_string()),
            ],
        );
        Ok(())
    }

    /// Block holding the last byte of the file, and how many of its payload
    /// bytes are in use. A zero-length file resolves to its first block.
    fn seek_last_block(&self, handle: FileHandle, header: &FileHeader) -> VfsResult<(u32, usize)> {
        let size = header.size as usize;
        let index = size.saturating_sub(1) / BLOCK_SIZE;

        let mut addr = header.data_addr;
        for step in 0..index {
            let next = DataBlock::decode(&self.arena, addr)?.next_addr;
            if next == 0 {
                return Err(VfsError::truncated_chain(
                    handle.0,
                    (step + 1) * BLOCK_SIZE,
                    size,
                ));
            }
            addr = next;
        }
        DataBlock::decode(&self.arena, addr)?;

        Ok((addr, size - index * BLOCK_SIZE))
    }

    /// Read the full contents of `handle`.
    ///
    /// Each block contributes at most the bytes still owed, so padding in the
    /// last block is never returned.
    ///
    /// # Errors
    ///
    /// - `VFS_EMPTY_FILE` if the size is zero (the chain is not visited)
    /// - `VFS_TRUNCATED_CHAIN` if the chain ends before `size` bytes
    pub fn read(&self, handle: FileHandle) -> VfsResult<Vec<u8>> {
        let result = self.read_inner(handle);
        self.track("read", result)
    }

    fn read_inner(&self, handle: FileHandle) -> VfsResult<Vec<u8>> {
        let header = self.load_header(handle)?;
        if header.size == 0 {
            return Err(VfsError::empty_file(handle.0));
        }

        let size = header.size as usize;
        let mut out = Vec::with_capacity(size);
        let mut addr = header.data_addr;

        while out.len() < size {
            if addr == 0 {
                return Err(VfsError::truncated_chain(handle.0, out.len(), size));
            }
            let block = DataBlock::decode(&self.arena, addr)?;
            let n = (size - out.len()).min(BLOCK_SIZE);
            out.extend_from_slice(&block.payload[..n]);
            addr = block.next_addr;
        }

        self.metrics.add_bytes_read(size as u64);
        log_event_with_fields(
            Event::ReadComplete,
            &[("addr", &handle.0.to_string()), ("size", &size.to_string())],
        );
        Ok(out)
    }

    /// Addresses of every block in `handle`'s chain, in order
    pub fn chain(&self, handle: FileHandle) -> VfsResult<Vec<u32>> {
        let result = self
            .load_header(handle)
            .and_then(|header| self.chain_of(&header));
        self.track("chain", result)
    }

    fn chain_of(&self, header: &FileHeader) -> VfsResult<Vec<u32>> {
        let max_blocks = self.arena.len() / DATA_BLOCK_LEN;
        let mut chain = Vec::new();
        let mut addr = header.data_addr;

        while addr != 0 {
            if chain.len() >= max_blocks {
                return Err(VfsError::bad_record(
                    addr,
                    "Block chain is longer than the disk can hold",
                ));
            }
            let next = DataBlock::decode(&self.arena, addr)?.next_addr;
            chain.push(addr);
            addr = next;
        }
        Ok(chain)
    }

    fn release_chain(&mut self, chain: &[u32]) -> VfsResult<()> {
        for addr in chain {
            layout::write_tag(&mut self.arena, *addr, BlockTag::Free)?;
        }
        self.metrics.add_blocks_released(chain.len() as u64);
        Ok(())
    }

    /// Release an entry and its chain.
    ///
    /// Records are only re-tagged as free; the allocator scrubs them when a
    /// later scan passes over them. The handle is invalid afterwards.
    ///
    /// # Errors
    ///
    /// Returns `VFS_INVALID_HANDLE` if the handle names no live header and
    /// `VFS_BAD_RECORD` if its chain does not decode; nothing is released in
    /// either case.
    pub fn remove(&mut self, handle: FileHandle) -> VfsResult<()> {
        let result = self.remove_inner(handle);
        self.track("remove", result)
    }

    fn remove_inner(&mut self, handle: FileHandle) -> VfsResult<()> {
        let header = self.load_header(handle)?;
        let chain = self.chain_of(&header)?;

        self.release_chain(&chain)?;
        layout::write_tag(&mut self.arena, handle.0, BlockTag::HeaderFree)?;
        self.metrics.increment_entries_removed();

        log_event_with_fields(
            Event::EntryRemoved,
            &[
                ("addr", &handle.0.to_string()),
                ("blocks", &chain.len().to_string()),
            ],
        );
        Ok(())
    }

    /// Every live entry, in address order
    pub fn entries(&self) -> Vec<FileHandle> {
        records(&self.arena)
            .filter(|(_, tag)| *tag == BlockTag::HeaderUsed)
            .map(|(addr, _)| FileHandle(addr))
            .collect()
    }

    /// Metadata report for `handle`
    pub fn file_info(&self, handle: FileHandle) -> VfsResult<FileInfo> {
        let result = self.load_header(handle).and_then(|header| {
            let blocks = self.chain_of(&header)?.len();
            Ok(FileInfo::new(handle, &header, blocks))
        });
        self.track("info", result)
    }

    /// Write the disk to `path` with a manifest beside it
    pub fn dump_image(&self, path: &Path) -> VfsResult<ImageManifest> {
        let result = image::dump(&self.arena, path);
        if result.is_ok() {
            log_event_with_fields(
                Event::ImageDumped,
                &[
                    ("disk_size", &self.arena.len().to_string()),
                    ("path", &path.display().to_string()),
                ],
            );
        }
        self.track("dump", result)
    }
}
