//! Disk images
//!
//! An image is the arena's bytes, unchanged. Next to it a manifest records
//! the geometry the image was written with:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "disk_size": 4096,
//!   "block_size": 32,
//!   "header_len": 42,
//!   "data_block_len": 37,
//!   "image_checksum": "crc32:deadbeef",
//!   "created_at": "2026-10-19T09:30:00Z"
//! }
//! ```
//!
//! The checksum is informational; loading never verifies it.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::arena::Arena;
use super::errors::{VfsError, VfsResult};
use super::layout::{BLOCK_SIZE, DATA_BLOCK_LEN, HEADER_LEN};

/// Geometry and provenance of a dumped image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageManifest {
    pub format_version: u8,
    pub disk_size: u64,
    pub block_size: usize,
    pub header_len: usize,
    pub data_block_len: usize,
    /// `crc32:XXXXXXXX` over the image bytes
    pub image_checksum: String,
    /// RFC 3339, UTC
    pub created_at: String,
}

impl ImageManifest {
    fn describe(arena: &Arena) -> Self {
        Self {
            format_version: 1,
            disk_size: arena.len() as u64,
            block_size: BLOCK_SIZE,
            header_len: HEADER_LEN,
            data_block_len: DATA_BLOCK_LEN,
            image_checksum: format!("crc32:{:08x}", crc32fast::hash(arena.as_bytes())),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// `<image>.manifest.json`
pub fn manifest_path(image_path: &Path) -> PathBuf {
    let mut name = OsString::from(image_path.as_os_str());
    name.push(".manifest.json");
    PathBuf::from(name)
}

fn write_synced(path: &Path, bytes: &[u8], what: &str) -> VfsResult<()> {
    let mut file = File::create(path).map_err(|e| {
        VfsError::image_io(format!("Failed to create {}: {}", what, path.display()), e)
    })?;
    file.write_all(bytes).map_err(|e| {
        VfsError::image_io(format!("Failed to write {}: {}", what, path.display()), e)
    })?;
    file.sync_all().map_err(|e| {
        VfsError::image_io(format!("Failed to fsync {}: {}", what, path.display()), e)
    })
}

/// Write the disk to `path` and its manifest beside it
pub fn dump(arena: &Arena, path: &Path) -> VfsResult<ImageManifest> {
    write_synced(path, arena.as_bytes(), "disk image")?;

    let manifest = ImageManifest::describe(arena);
    let json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| VfsError::image_invalid(format!("Failed to serialize manifest: {}", e)))?;
    write_synced(&manifest_path(path), json.as_bytes(), "manifest")?;

    Ok(manifest)
}

/// Read a disk image; its size becomes the disk size
pub fn load(path: &Path) -> VfsResult<Arena> {
    let bytes = fs::read(path).map_err(|e| {
        VfsError::image_io(format!("Failed to read disk image: {}", path.display()), e)
    })?;
    if bytes.is_empty() {
        return Err(VfsError::image_invalid(format!(
            "Disk image is empty: {}",
            path.display()
        )));
    }
    Arena::from_bytes(bytes)
}

/// Read the manifest written next to `image_path`
pub fn read_manifest(image_path: &Path) -> VfsResult<ImageManifest> {
    let path = manifest_path(image_path);
    let json = fs::read_to_string(&path).map_err(|e| {
        VfsError::image_io(format!("Failed to read manifest: {}", path.display()), e)
    })?;
    serde_json::from_str(&json)
        .map_err(|e| VfsError::image_invalid(format!("Invalid manifest JSON: {}", e)))
}
