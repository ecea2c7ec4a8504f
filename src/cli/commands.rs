//! CLI command implementations

use std::io::{self, BufRead, Write};
use std::path::Path;

use serde_json::{json, Value};

use crate::observability::{log_event_with_fields, set_min_severity, Event};
use crate::vfs::{image, FileInfo, Vfs};

use super::args::Command;
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{read_requests, write_error, write_response};
use super::requests::{handle, Request};

const DEMO_FILE: &str = "test.txt";
const DEMO_WRITE: &str =
    "QWERTYUIOPASDFGHJKLZXCVBNM,.qwertyuiopasdfghjklzxcvbnm,.1234567890-!#€%&/()=?";
const DEMO_APPEND: &str = "0987654321.0987654321..0987654321...0987654321....0987654321.....";

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Demo { config } => demo(config.as_deref()),
        Command::Serve { config } => serve(config.as_deref()),
        Command::Inspect { image, config } => inspect(&image, config.as_deref()),
    }
}

fn load_config(config_path: Option<&Path>) -> CliResult<Config> {
    let config = Config::resolve(config_path)?;
    set_min_severity(config.severity()?);
    Ok(config)
}

/// Create `test.txt`, write it, append to it, read it back, report it and
/// dump the disk when a dump path is configured.
pub fn demo(config_path: Option<&Path>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let mut stdout = io::stdout();
    run_demo(&config, &mut stdout)
}

fn run_demo<W: Write>(config: &Config, out: &mut W) -> CliResult<()> {
    let mut vfs = Vfs::new(config.disk_len())?;

    let file = vfs.create_file(DEMO_FILE)?;
    vfs.write(file, DEMO_WRITE.as_bytes())?;
    vfs.append(file, DEMO_APPEND.as_bytes())?;

    let contents = vfs.read(file)?;
    let info = vfs.file_info(file)?;

    let dump = match config.dump_path.as_deref() {
        Some(path) => Some(vfs.dump_image(path)?),
        None => None,
    };

    write_response(
        out,
        json!({
            "data": String::from_utf8_lossy(&contents),
            "file": info,
            "dump": dump,
        }),
    )
}

/// Serve JSON requests from stdin against a fresh disk
pub fn serve(config_path: Option<&Path>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let mut vfs = Vfs::new(config.disk_len())?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    serve_loop(
        &mut vfs,
        stdin.lock(),
        &mut stdout,
        config.dump_path.as_deref(),
    )
}

/// Answer every request line from `input` on `out`.
///
/// Request errors are reported and the loop continues; fatal file system
/// errors and input I/O errors end it.
pub fn serve_loop<R: BufRead, W: Write>(
    vfs: &mut Vfs,
    input: R,
    out: &mut W,
    dump_path: Option<&Path>,
) -> CliResult<()> {
    log_event_with_fields(
        Event::ServeStart,
        &[("disk_size", &vfs.arena().len().to_string())],
    );

    let mut handled = 0usize;
    for line in read_requests(input) {
        let result = line
            .and_then(|line| Request::parse(&line))
            .and_then(|request| handle(vfs, request, dump_path));
        handled += 1;

        match result {
            Ok(data) => write_response(out, data)?,
            Err(e) => {
                write_error(out, e.code_str(), e.message())?;
                if e.is_fatal() {
                    break;
                }
            }
        }
    }

    log_event_with_fields(Event::ServeStop, &[("requests", &handled.to_string())]);
    Ok(())
}

/// Report every entry of a dumped image
pub fn inspect(image_path: &Path, config_path: Option<&Path>) -> CliResult<()> {
    load_config(config_path)?;
    let mut stdout = io::stdout();
    write_response(&mut stdout, inspect_image(image_path)?)
}

fn inspect_image(image_path: &Path) -> CliResult<Value> {
    let vfs = Vfs::load_image(image_path)?;
    let manifest = image::read_manifest(image_path).ok();

    let entries = vfs
        .entries()
        .into_iter()
        .map(|handle| vfs.file_info(handle))
        .collect::<Result<Vec<FileInfo>, _>>()
        .map_err(CliError::from)?;

    Ok(json!({
        "disk_size": vfs.arena().len(),
        "manifest": manifest,
        "entries": entries,
    }))
}
