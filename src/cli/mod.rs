//! CLI module for ramvfs
//!
//! Provides command-line interface for:
//! - demo: Create, write, append and read `test.txt` on a fresh disk
//! - serve: Answer JSON requests from stdin against a fresh disk
//! - inspect: Report the entries of a dumped disk image

mod args;
mod commands;
mod config;
mod errors;
mod io;
mod requests;

pub use args::{Cli, Command};
pub use commands::{demo, inspect, run, run_command, serve, serve_loop};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_requests, write_error, write_response};
pub use requests::{handle, Request};
