//! Running external programs.
//!
//! [`execute`] forks, applies the command's redirections in the child, and
//! replaces the child's image with the program. Between fork and exec the
//! child performs only async-signal-safe calls: everything that allocates
//! (path lookup, C strings, pointer arrays) is prepared beforehand. Failures
//! in the child are written to a close-on-exec pipe as a fixed-size record
//! and turned into a diagnostic by the parent.

use crate::command::{
    EXIT_FAILURE, EXIT_NOT_EXECUTABLE, EXIT_NOT_FOUND, ExitCode, SIGNAL_EXIT_BASE,
};
use crate::env::Environment;
use crate::parser::StructuredCommand;
use crate::signals;
use nix::errno::Errno;
use nix::sys::signal::{SigSet, SigmaskHow, Signal, pthread_sigmask};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, fork};
use std::borrow::Cow;
use std::convert::Infallible;
use std::ffi::{CString, NulError, OsStr, c_char, c_int};
use std::io::{self, PipeReader, PipeWriter, Read, Write};
use std::os::fd::RawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::ptr;

/// Errors that prevent the executor from producing an exit status.
///
/// Failures inside the child (bad redirection target, unknown program) are
/// not errors: they are reported and mapped to an exit status.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("cannot execute an empty command")]
    EmptyCommand,
    #[error("argument contains a NUL byte: {0}")]
    NulByte(#[from] NulError),
    #[error("cannot create a pipe: {0}")]
    Pipe(#[source] io::Error),
    #[error("cannot block SIGCHLD: {0}")]
    SignalMask(#[source] Errno),
    #[error("cannot create a process: {0}")]
    Fork(#[source] Errno),
    #[error("cannot wait for process {pid}: {source}")]
    Wait {
        pid: Pid,
        #[source]
        source: Errno,
    },
}

/// What became of a started program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The program ran to completion, or failed before it could run.
    Finished(ExitCode),
    /// The program was exec'd in the background and is not waited for.
    Background(Pid),
}

impl Outcome {
    /// Exit status to record; 0 for a background program.
    pub fn status(self) -> ExitCode {
        match self {
            Outcome::Finished(status) => status,
            Outcome::Background(_) => 0,
        }
    }
}

/// Runs `cmd` as an external program.
///
/// Background commands return as soon as the program has been exec'd.
/// Foreground commands are waited for; a process killed by signal `S`
/// yields `128 + S`.
pub fn execute(cmd: &StructuredCommand, env: &Environment) -> Result<Outcome, ExecError> {
    let plan = SpawnPlan::new(cmd, env)?;
    let (mut report_reader, report_writer) = io::pipe().map_err(ExecError::Pipe)?;
    let mask = SigchldBlock::new()?;

    // SAFETY: the child only makes async-signal-safe calls before exec or _exit.
    let child = match unsafe { fork() } {
        Ok(ForkResult::Child) => run_child(&plan, mask.old_mask(), report_writer),
        Ok(ForkResult::Parent { child }) => child,
        Err(errno) => return Err(ExecError::Fork(errno)),
    };
    drop(report_writer);
    log::debug!("started process {child} for {:?}", cmd.argv);

    if let Some(failure) = read_failure(&mut report_reader) {
        let status = wait_for_exit(child)?;
        log::debug!("process {child} failed before exec ({failure:?}), exit status {status}");
        eprintln!("mini-shell: {}", failure.describe(cmd));
        return Ok(Outcome::Finished(failure.status()));
    }

    if cmd.background {
        return Ok(Outcome::Background(child));
    }

    let status = wait_for_exit(child)?;
    log::debug!("process {child} finished with status {status}");
    Ok(Outcome::Finished(status))
}

/// Everything the child needs, allocated before fork.
struct SpawnPlan {
    program: Option<CString>,
    input: Option<CString>,
    output: Option<(CString, bool)>,
    _argv: Vec<CString>,
    _envp: Vec<CString>,
    argv_ptrs: Vec<*const c_char>,
    envp_ptrs: Vec<*const c_char>,
}

impl SpawnPlan {
    fn new(cmd: &StructuredCommand, env: &Environment) -> Result<Self, ExecError> {
        let name = cmd.program().ok_or(ExecError::EmptyCommand)?;

        let search_paths = env.get_var("PATH").unwrap_or_default();
        let program = find_command_path(OsStr::new(search_paths), Path::new(name))
            .map(|path| CString::new(path.as_os_str().as_bytes()))
            .transpose()?;

        let argv = cmd
            .argv
            .iter()
            .map(|arg| CString::new(arg.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        let envp = env
            .vars
            .iter()
            .map(|(key, value)| CString::new(format!("{key}={value}")))
            .collect::<Result<Vec<_>, _>>()?;

        let input = cmd.input.as_deref().map(CString::new).transpose()?;
        let output = match &cmd.output {
            Some(target) => Some((CString::new(target.path.as_str())?, target.append)),
            None => None,
        };

        let argv_ptrs = null_terminated(&argv);
        let envp_ptrs = null_terminated(&envp);
        Ok(Self {
            program,
            input,
            output,
            _argv: argv,
            _envp: envp,
            argv_ptrs,
            envp_ptrs,
        })
    }
}

fn null_terminated(strings: &[CString]) -> Vec<*const c_char> {
    strings
        .iter()
        .map(|s| s.as_ptr())
        .chain(std::iter::once(ptr::null()))
        .collect()
}

/// Blocks `SIGCHLD` on the calling thread while alive.
///
/// Keeps the background reaper from collecting the status of a child this
/// thread is about to wait for.
struct SigchldBlock {
    old: SigSet,
}

impl SigchldBlock {
    fn new() -> Result<Self, ExecError> {
        let mut block = SigSet::empty();
        block.add(Signal::SIGCHLD);
        let mut old = SigSet::empty();
        pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&block), Some(&mut old))
            .map_err(ExecError::SignalMask)?;
        Ok(Self { old })
    }

    fn old_mask(&self) -> &SigSet {
        &self.old
    }
}

impl Drop for SigchldBlock {
    fn drop(&mut self) {
        if let Err(errno) = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&self.old), None) {
            log::error!("cannot restore the signal mask: {errno}");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Input = 1,
    Output = 2,
    NotFound = 3,
    Exec = 4,
}

impl Stage {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Input),
            2 => Some(Self::Output),
            3 => Some(Self::NotFound),
            4 => Some(Self::Exec),
            _ => None,
        }
    }
}

/// What went wrong in the child before the program started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChildFailure {
    stage: Stage,
    errno: Errno,
}

impl ChildFailure {
    const LEN: usize = 5;

    fn new(stage: Stage, errno: Errno) -> Self {
        Self { stage, errno }
    }

    fn encode(self) -> [u8; Self::LEN] {
        let [a, b, c, d] = (self.errno as i32).to_ne_bytes();
        [self.stage as u8, a, b, c, d]
    }

    fn decode(bytes: [u8; Self::LEN]) -> Option<Self> {
        let [stage, a, b, c, d] = bytes;
        let errno = Errno::from_raw(i32::from_ne_bytes([a, b, c, d]));
        Some(Self::new(Stage::from_byte(stage)?, errno))
    }

    fn status(self) -> ExitCode {
        match self.stage {
            Stage::Input | Stage::Output => EXIT_FAILURE,
            Stage::NotFound => EXIT_NOT_FOUND,
            Stage::Exec if self.errno == Errno::ENOENT => EXIT_NOT_FOUND,
            Stage::Exec => EXIT_NOT_EXECUTABLE,
        }
    }

    fn describe(self, cmd: &StructuredCommand) -> String {
        let name = cmd.program().unwrap_or_default();
        match self.stage {
            Stage::Input => {
                let path = cmd.input.as_deref().unwrap_or_default();
                format!("{path}: cannot open for reading: {}", self.errno.desc())
            }
            Stage::Output => {
                let path = cmd.output.as_ref().map_or("", |t| t.path.as_str());
                format!("{path}: cannot open for writing: {}", self.errno.desc())
            }
            Stage::NotFound => format!("{name}: command not found"),
            Stage::Exec if self.errno == Errno::ENOENT => format!("{name}: command not found"),
            Stage::Exec => format!("{name}: {}", self.errno.desc()),
        }
    }
}

fn read_failure(reader: &mut PipeReader) -> Option<ChildFailure> {
    let mut bytes = [0; ChildFailure::LEN];
    // EOF means the pipe was closed by a successful exec.
    reader.read_exact(&mut bytes).ok()?;
    ChildFailure::decode(bytes)
}

fn run_child(plan: &SpawnPlan, old_mask: &SigSet, mut report: PipeWriter) -> ! {
    signals::reset_job_control_signals();
    let _ = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(old_mask), None);

    let Err(failure) = exec_child(plan);
    let _ = report.write_all(&failure.encode());
    // SAFETY: _exit skips atexit handlers and stdio flushing inherited from the parent.
    unsafe { libc::_exit(failure.status()) }
}

fn exec_child(plan: &SpawnPlan) -> Result<Infallible, ChildFailure> {
    if let Some(path) = &plan.input {
        let fd = open_raw(path, libc::O_RDONLY).map_err(|e| ChildFailure::new(Stage::Input, e))?;
        move_fd(fd, &[libc::STDIN_FILENO]).map_err(|e| ChildFailure::new(Stage::Input, e))?;
    }

    if let Some((path, append)) = &plan.output {
        let mode = if *append { libc::O_APPEND } else { libc::O_TRUNC };
        let fd = open_raw(path, libc::O_WRONLY | libc::O_CREAT | mode)
            .map_err(|e| ChildFailure::new(Stage::Output, e))?;
        // Standard error follows the output target.
        move_fd(fd, &[libc::STDOUT_FILENO, libc::STDERR_FILENO])
            .map_err(|e| ChildFailure::new(Stage::Output, e))?;
    }

    let Some(program) = &plan.program else {
        return Err(ChildFailure::new(Stage::NotFound, Errno::ENOENT));
    };

    // SAFETY: both pointer arrays are null-terminated and point into
    // CStrings owned by `plan`.
    unsafe {
        libc::execve(
            program.as_ptr(),
            plan.argv_ptrs.as_ptr(),
            plan.envp_ptrs.as_ptr(),
        )
    };
    Err(ChildFailure::new(Stage::Exec, Errno::last()))
}

fn open_raw(path: &CString, flags: c_int) -> Result<RawFd, Errno> {
    // SAFETY: `path` is a valid NUL-terminated string.
    Errno::result(unsafe { libc::open(path.as_ptr(), flags, 0o644 as libc::c_uint) })
}

/// Duplicates `fd` onto each of `targets` and closes the original.
fn move_fd(fd: RawFd, targets: &[RawFd]) -> Result<(), Errno> {
    for &target in targets {
        if fd != target {
            // SAFETY: plain descriptor syscall.
            Errno::result(unsafe { libc::dup2(fd, target) })?;
        }
    }
    if !targets.contains(&fd) {
        // SAFETY: `fd` was opened by us and is not used afterwards.
        unsafe { libc::close(fd) };
    }
    Ok(())
}

/// Waits for `pid` to terminate, continuing past stops and interrupted waits.
fn wait_for_exit(pid: Pid) -> Result<ExitCode, ExecError> {
    loop {
        match waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(code),
            Ok(WaitStatus::Signaled(_, signal, _)) => return Ok(terminated_by_signal(signal)),
            Ok(status) => log::debug!("process {pid} changed state ({status:?}), still waiting"),
            Err(Errno::EINTR) => continue,
            Err(source) => return Err(ExecError::Wait { pid, source }),
        }
    }
}

fn terminated_by_signal(signal: Signal) -> ExitCode {
    SIGNAL_EXIT_BASE + signal as i32
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - `./foo` or any path with multiple components (e.g., `bin/sh`): returns it
///   if it exists relative to the current directory.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   and return the first existing match.
/// - Empty path: returns `None`.
///
/// Returns either a borrowed reference to the provided `path` or an owned `PathBuf`
/// when the result is discovered via PATH lookup.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => None,
        (Some(x), None) if !path.starts_with(".") => {
            find_in_path(search_paths, x.as_os_str()).map(Cow::Owned)
        }
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    for dir in std::env::split_paths(search_paths) {
        let path = dir.join(cmd);
        if path.is_file() {
            return Some(path);
        }
    }
    None
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}
