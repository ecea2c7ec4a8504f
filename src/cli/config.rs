//! Configuration file
//!
//! ```json
//! {
//!   "disk_size": 4096,
//!   "dump_path": "disks/tmp.disk",
//!   "log_level": "info"
//! }
//! ```
//!
//! Every field is optional.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{CliError, CliResult};
use crate::observability::Severity;

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Disk size in bytes (default 4096)
    #[serde(default = "default_disk_size")]
    pub disk_size: u64,

    /// Where images are dumped when a command or request gives no path
    #[serde(default)]
    pub dump_path: Option<PathBuf>,

    /// Lowest log severity emitted (default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_disk_size() -> u64 {
    4096
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            disk_size: default_disk_size(),
            dump_path: None,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load `path` if given, otherwise use defaults
    pub fn resolve(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> CliResult<()> {
        if self.disk_size == 0 {
            return Err(CliError::config_error("disk_size must be > 0"));
        }

        if self.disk_size > u32::MAX as u64 {
            return Err(CliError::config_error(format!(
                "disk_size {} exceeds the 32-bit address space",
                self.disk_size
            )));
        }

        self.severity()?;

        Ok(())
    }

    /// Disk size as a buffer length
    pub fn disk_len(&self) -> usize {
        self.disk_size as usize
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> CliResult<Severity> {
        Severity::parse(&self.log_level).ok_or_else(|| {
            CliError::config_error(format!(
                "Invalid log_level: '{}'. Must be one of trace, info, warn, error, fatal.",
                self.log_level
            ))
        })
    }
}
