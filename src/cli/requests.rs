//! Serve-loop requests
//!
//! One JSON object per line, tagged by `op`:
//!
//! ```json
//! {"op":"create","name":"notes.txt","kind":"file"}
//! {"op":"write","entry":1,"data":"hello"}
//! {"op":"append","entry":1,"data":", world"}
//! {"op":"read","entry":1}
//! {"op":"info","entry":1}
//! {"op":"remove","entry":1}
//! {"op":"list"}
//! {"op":"stats"}
//! {"op":"dump","path":"disks/tmp.disk"}
//! ```
//!
//! `entry` is the header address returned by `create`.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{json, Value};

use super::errors::{CliError, CliResult};
use crate::vfs::{EntryKind, FileHandle, FileInfo, Vfs};

fn default_kind() -> EntryKind {
    EntryKind::RegularFile
}

/// A single request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Request {
    Create {
        name: String,
        #[serde(default = "default_kind")]
        kind: EntryKind,
    },
    Write {
        entry: u32,
        data: String,
    },
    Append {
        entry: u32,
        data: String,
    },
    Read {
        entry: u32,
    },
    Info {
        entry: u32,
    },
    Remove {
        entry: u32,
    },
    List,
    Stats,
    Dump {
        #[serde(default)]
        path: Option<PathBuf>,
    },
}

impl Request {
    /// Parse one request line
    pub fn parse(line: &str) -> CliResult<Self> {
        serde_json::from_str(line)
            .map_err(|e| CliError::invalid_request(format!("Invalid request: {}", e)))
    }
}

/// Apply `request` to `vfs` and build the response payload
pub fn handle(vfs: &mut Vfs, request: Request, dump_path: Option<&Path>) -> CliResult<Value> {
    match request {
        Request::Create { name, kind } => {
            let handle = vfs.create_entry(&name, kind)?;
            Ok(json!({ "entry": handle.addr() }))
        }
        Request::Write { entry, data } => {
            let handle = FileHandle::new(entry);
            vfs.write(handle, data.as_bytes())?;
            Ok(json!({ "entry": entry, "size": vfs.header(handle)?.size }))
        }
        Request::Append { entry, data } => {
            let handle = FileHandle::new(entry);
            vfs.append(handle, data.as_bytes())?;
            Ok(json!({ "entry": entry, "size": vfs.header(handle)?.size }))
        }
        Request::Read { entry } => {
            let bytes = vfs.read(FileHandle::new(entry))?;
            Ok(json!({
                "entry": entry,
                "size": bytes.len(),
                "data": String::from_utf8_lossy(&bytes),
            }))
        }
        Request::Info { entry } => Ok(serde_json::to_value(vfs.file_info(FileHandle::new(entry))?)?),
        Request::Remove { entry } => {
            vfs.remove(FileHandle::new(entry))?;
            Ok(json!({ "entry": entry, "removed": true }))
        }
        Request::List => {
            let infos = vfs
                .entries()
                .into_iter()
                .map(|handle| vfs.file_info(handle))
                .collect::<Result<Vec<FileInfo>, _>>()?;
            Ok(json!({ "entries": infos }))
        }
        Request::Stats => Ok(json!({
            "disk_size": vfs.arena().len(),
            "last_error": vfs.last_error().map(|code| code.code()),
            "metrics": vfs.metrics(),
        })),
        Request::Dump { path } => {
            let path = path
                .as_deref()
                .or(dump_path)
                .ok_or_else(|| CliError::invalid_request("No dump path given or configured"))?;
            let manifest = vfs.dump_image(path)?;
            Ok(json!({ "path": path.display().to_string(), "manifest": manifest }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create_defaults_to_file() {
        let request = Request::parse(r#"{"op":"create","name":"a.txt"}"#).unwrap();
        assert_eq!(
            request,
            Request::Create {
                name: "a.txt".to_string(),
                kind: EntryKind::RegularFile
            }
        );
    }

    #[test]
    fn test_parse_directory_kind() {
        let request = Request::parse(r#"{"op":"create","name":"etc","kind":"directory"}"#).unwrap();
        assert_eq!(
            request,
            Request::Create {
                name: "etc".to_string(),
                kind: EntryKind::Directory
            }
        );
    }

    #[test]
    fn test_parse_unknown_op() {
        let err = Request::parse(r#"{"op":"format"}"#).unwrap_err();
        assert_eq!(err.code_str(), "VFS_CLI_INVALID_REQUEST");
    }

    #[test]
    fn test_handle_write_then_read() {
        let mut vfs = Vfs::new(512).unwrap();
        let created = handle(
            &mut vfs,
            Request::Create {
                name: "a.txt".into(),
                kind: EntryKind::RegularFile,
            },
            None,
        )
        .unwrap();
        let entry = created["entry"].as_u64().unwrap() as u32;

        handle(
            &mut vfs,
            Request::Write {
                entry,
                data: "hello".into(),
            },
            None,
        )
        .unwrap();
        let read = handle(&mut vfs, Request::Read { entry }, None).unwrap();
        assert_eq!(read["data"], "hello");
        assert_eq!(read["size"], 5);
    }

    #[test]
    fn test_dump_without_path_is_rejected() {
        let mut vfs = Vfs::new(64).unwrap();
        let err = handle(&mut vfs, Request::Dump { path: None }, None).unwrap_err();
        assert_eq!(err.code_str(), "VFS_CLI_INVALID_REQUEST");
    }
}
