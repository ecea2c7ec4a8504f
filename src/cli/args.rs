//! CLI argument definitions using clap
//!
//! Commands:
//! - ramvfs demo [--config <path>]
//! - ramvfs serve [--config <path>]
//! - ramvfs inspect --image <path> [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ramvfs - a file system inside a fixed-size in-memory disk
#[derive(Parser, Debug)]
#[command(name = "ramvfs")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a file, write, append, read it back and dump the disk
    Demo {
        /// Path to configuration file (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Serve JSON requests from stdin against a fresh disk
    Serve {
        /// Path to configuration file (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Report every entry of a dumped disk image
    Inspect {
        /// Disk image to load
        #[arg(long)]
        image: PathBuf,

        /// Path to configuration file (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inspect() {
        let cli = Cli::try_parse_from(["ramvfs", "inspect", "--image", "disks/tmp.disk"]).unwrap();
        match cli.command {
            Command::Inspect { image, config } => {
                assert_eq!(image, PathBuf::from("disks/tmp.disk"));
                assert!(config.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_inspect_requires_image() {
        assert!(Cli::try_parse_from(["ramvfs", "inspect"]).is_err());
    }
}
