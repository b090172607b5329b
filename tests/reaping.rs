use mini_shell::{Interpreter, MemWriter, SignalCoordinator};
use std::time::{Duration, Instant};

/// Whether any child of this process is still running or unreaped.
///
/// Uses `WNOWAIT` so that the check itself never reaps anything.
fn has_children() -> bool {
    // SAFETY: siginfo_t is plain data and waitid only writes into it.
    let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
    let flags = libc::WEXITED | libc::WNOHANG | libc::WNOWAIT;
    // SAFETY: `info` is a valid, writable siginfo_t.
    let rc = unsafe { libc::waitid(libc::P_ALL, 0, &mut info, flags) };
    if rc == -1 {
        assert_eq!(std::io::Error::last_os_error().raw_os_error(), Some(libc::ECHILD));
        return false;
    }
    true
}

#[test]
fn background_children_are_reaped_without_waiting() {
    SignalCoordinator::new().install().unwrap();
    let mut sh = Interpreter::default().with_output(Box::new(MemWriter::new()));

    for _ in 0..5 {
        assert_eq!(sh.run_line("true &"), 0);
    }

    let deadline = Instant::now() + Duration::from_secs(10);
    while has_children() {
        assert!(Instant::now() < deadline, "background children left unreaped");
        std::thread::sleep(Duration::from_millis(20));
    }
}
