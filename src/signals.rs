//! Asynchronous signal coordination.
//!
//! The interpreter catches `SIGINT` to abort a pending line read and
//! `SIGCHLD` to reap finished background jobs. It ignores `SIGQUIT` and
//! `SIGTSTP` itself; children reset all three to their default disposition
//! before exec.
//!
//! The handlers only touch atomics and call `waitpid`. Everything the user
//! sees in response to a signal is printed by the main loop.

use nix::errno::Errno;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use std::ffi::c_int;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

static INSTALLED: OnceLock<Result<(), Errno>> = OnceLock::new();

/// Signals a job should see with their default disposition.
pub(crate) const JOB_CONTROL_SIGNALS: [Signal; 3] =
    [Signal::SIGINT, Signal::SIGQUIT, Signal::SIGTSTP];

#[derive(Debug, thiserror::Error)]
#[error("cannot install signal handlers: {0}")]
pub struct SignalError(#[from] Errno);

extern "C" fn on_interrupt(_signal: c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

extern "C" fn on_child_exit(_signal: c_int) {
    let saved = ::errno::errno();
    reap_terminated();
    ::errno::set_errno(saved);
}

/// Collects every terminated child without blocking.
///
/// Async-signal-safe: no allocation, no output.
fn reap_terminated() -> usize {
    let mut reaped = 0;
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) | Err(_) => break reaped,
            Ok(_) => reaped += 1,
        }
    }
}

/// Handle to the process-wide signal state.
///
/// Creating a handle has no side effect; [`install`](Self::install) sets up
/// the handlers. The handle is passed explicitly to the code that polls the
/// interrupt flag rather than having it read a global.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalCoordinator {
    _private: (),
}

impl SignalCoordinator {
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Installs the interpreter's signal dispositions.
    ///
    /// Only the first call changes anything; later calls return the first
    /// call's result.
    pub fn install(&self) -> Result<(), SignalError> {
        let result = *INSTALLED.get_or_init(|| {
            // SAFETY: both handlers only perform async-signal-safe operations.
            unsafe { install_handlers() }
        });
        if result.is_ok() {
            log::debug!("signal handlers installed");
        }
        result.map_err(SignalError)
    }

    /// Returns `true` if an interrupt arrived since the flag was last cleared.
    pub fn interrupted(&self) -> bool {
        INTERRUPTED.load(Ordering::SeqCst)
    }

    pub fn clear_interrupt(&self) {
        INTERRUPTED.store(false, Ordering::SeqCst);
    }

    /// Clears the flag, returning whether it was set.
    pub fn take_interrupt(&self) -> bool {
        INTERRUPTED.swap(false, Ordering::SeqCst)
    }

    /// Runs the reap loop synchronously and returns how many children it collected.
    pub fn reap_children(&self) -> usize {
        let reaped = reap_terminated();
        if reaped > 0 {
            log::debug!("reaped {reaped} background process(es)");
        }
        reaped
    }
}

unsafe fn install_handlers() -> Result<(), Errno> {
    // No SA_RESTART: a blocked read must fail with EINTR.
    let interrupt = SigAction::new(
        SigHandler::Handler(on_interrupt),
        SaFlags::empty(),
        SigSet::empty(),
    );
    let child = SigAction::new(
        SigHandler::Handler(on_child_exit),
        SaFlags::SA_RESTART | SaFlags::SA_NOCLDSTOP,
        SigSet::empty(),
    );
    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());

    unsafe {
        nix::sys::signal::sigaction(Signal::SIGINT, &interrupt)?;
        nix::sys::signal::sigaction(Signal::SIGCHLD, &child)?;
        nix::sys::signal::sigaction(Signal::SIGQUIT, &ignore)?;
        nix::sys::signal::sigaction(Signal::SIGTSTP, &ignore)?;
    }
    Ok(())
}

/// Restores the default disposition of [`JOB_CONTROL_SIGNALS`].
///
/// Called in a freshly forked child, so it must stay async-signal-safe.
pub(crate) fn reset_job_control_signals() {
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    for signal in JOB_CONTROL_SIGNALS {
        // SAFETY: installing SIG_DFL cannot run any handler code.
        let _ = unsafe { nix::sys::signal::sigaction(signal, &default) };
    }
}
