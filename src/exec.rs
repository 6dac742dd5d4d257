//! Subprocess helpers for the external linking tool.
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// Run `program` with `args` in `dir`, inheriting stdout and stderr, and
/// wait for it to exit.  There is no timeout.
///
/// # Errors
///
/// Returns an error if the process cannot be spawned or waited on.
pub fn run_inherited(dir: &Path, program: &str, args: &[String]) -> io::Result<ExitStatus> {
    Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
}

/// Render a command line for log messages.
#[must_use]
pub fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Locate `program` on `PATH`.
#[must_use]
pub fn which(program: &str) -> Option<PathBuf> {
    ::which::which(program).ok()
}
