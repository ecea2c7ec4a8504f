//! File metadata reports

use std::fmt;

use serde::Serialize;

use super::filesystem::FileHandle;
use super::layout::{EntryKind, FileHeader};

/// Everything worth showing about one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    /// Header address
    pub entry: u32,
    pub name: String,
    pub kind: EntryKind,
    pub data_addr: u32,
    pub size: u32,
    pub hash: u64,
    /// Blocks in the chain
    pub blocks: usize,
}

impl FileInfo {
    pub fn new(handle: FileHandle, header: &FileHeader, blocks: usize) -> Self {
        Self {
            entry: handle.addr(),
            name: header.name_lossy(),
            kind: header.kind,
            data_addr: header.data_addr,
            size: header.size,
            hash: header.hash,
            blocks,
        }
    }
}

impl fmt::Display for FileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File info")?;
        writeln!(f, "  Name: {}", self.name)?;
        writeln!(f, "  Type: {}", self.kind.as_str())?;
        writeln!(f, "  Data address: {}", self.data_addr)?;
        writeln!(f, "  Size: {}", self.size)?;
        writeln!(f, "  Hash: {}", self.hash)?;
        write!(f, "  Blocks: {}", self.blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::layout::NAME_LEN;

    fn sample() -> FileInfo {
        let mut name = [0u8; NAME_LEN];
        name[..8].copy_from_slice(b"test.txt");
        let header = FileHeader {
            name,
            hash: 42,
            kind: EntryKind::RegularFile,
            data_addr: 43,
            size: 144,
        };
        FileInfo::new(FileHandle::new(1), &header, 5)
    }

    #[test]
    fn test_text_report() {
        let text = sample().to_string();
        assert!(text.starts_with("File info\n"));
        assert!(text.contains("  Name: test.txt\n"));
        assert!(text.contains("  Type: File\n"));
        assert!(text.contains("  Data address: 43\n"));
        assert!(text.contains("  Size: 144\n"));
        assert!(text.ends_with("  Blocks: 5"));
    }

    #[test]
    fn test_json_report() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["entry"], 1);
        assert_eq!(json["name"], "test.txt");
        assert_eq!(json["kind"], "file");
        assert_eq!(json["size"], 144);
    }
}
