//! Synchronous reaping, in a process that never installs the handlers.

use mini_shell::{Interpreter, MemWriter, SignalCoordinator};
use std::time::{Duration, Instant};

#[test]
fn reap_children_collects_finished_background_jobs() {
    let signals = SignalCoordinator::new();
    let mut sh = Interpreter::default().with_output(Box::new(MemWriter::new()));

    for _ in 0..3 {
        assert_eq!(sh.run_line("true &"), 0);
    }

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut reaped = 0;
    while reaped < 3 {
        assert!(Instant::now() < deadline, "only {reaped} of 3 children reaped");
        reaped += signals.reap_children();
        std::thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(reaped, 3);
    assert_eq!(signals.reap_children(), 0);
}
