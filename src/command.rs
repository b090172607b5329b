use crate::env::Environment;
use anyhow::Result;
use std::io::{Read, Write};

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Generic failure: bad redirection target, refused pipeline, parse or spawn error.
pub const EXIT_FAILURE: ExitCode = 1;

/// The program was found but could not be executed.
pub const EXIT_NOT_EXECUTABLE: ExitCode = 126;

/// The program could not be found.
pub const EXIT_NOT_FOUND: ExitCode = 127;

/// A process killed by signal `S` reports `SIGNAL_EXIT_BASE + S`.
pub const SIGNAL_EXIT_BASE: ExitCode = 128;

/// Object-safe trait for any command executed inside the interpreter process.
///
/// Built-ins implement it through a blanket impl. The streams are the
/// command's standard input and output after redirection.
pub trait ExecutableCommand {
    /// Executes the command.
    fn execute(
        self: Box<Self>,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;
}
