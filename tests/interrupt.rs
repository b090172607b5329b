use mini_shell::input::{FdReader, LineReader, ReadOutcome};
use mini_shell::{Interpreter, MemWriter, SignalCoordinator};
use std::io::Write;
use std::sync::{Mutex, MutexGuard, mpsc};
use std::thread;
use std::time::Duration;

/// Serializes tests that raise or inspect the process-wide interrupt flag.
fn lock_flag() -> MutexGuard<'static, ()> {
    static FLAG: Mutex<()> = Mutex::new(());
    FLAG.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[test]
fn sigint_interrupts_a_blocked_read() {
    let _flag = lock_flag();
    let signals = SignalCoordinator::new();
    signals.install().unwrap();
    signals.clear_interrupt();

    let (pipe_reader, mut pipe_writer) = std::io::pipe().unwrap();
    let (tid_tx, tid_rx) = mpsc::channel();
    let (first_tx, first_rx) = mpsc::channel();

    let reader_thread = thread::spawn(move || {
        // SAFETY: pthread_self has no preconditions.
        tid_tx.send(unsafe { libc::pthread_self() }).unwrap();
        let mut reader = FdReader::new(pipe_reader, 1024);
        first_tx.send(reader.read_line("").unwrap()).unwrap();
        reader.read_line("").unwrap()
    });

    let tid = tid_rx.recv().unwrap();
    // The signal may land before the thread blocks in read; repeat until it
    // reports back.
    let first = loop {
        // SAFETY: the thread is alive until it has sent its first result.
        assert_eq!(unsafe { libc::pthread_kill(tid, libc::SIGINT) }, 0);
        match first_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(outcome) => break outcome,
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(e) => panic!("reader thread died: {e}"),
        }
    };
    assert_eq!(first, ReadOutcome::Interrupted);
    assert!(signals.interrupted());
    assert!(signals.take_interrupt());
    assert!(!signals.interrupted());

    pipe_writer.write_all(b"echo ok\n").unwrap();
    let second = reader_thread.join().unwrap();
    assert_eq!(second, ReadOutcome::Line("echo ok".to_owned()));
}

#[test]
fn install_can_be_repeated() {
    let signals = SignalCoordinator::new();
    assert!(signals.install().is_ok());
    assert!(SignalCoordinator::default().install().is_ok());
}

struct FlagWatcher {
    signals: SignalCoordinator,
    seen: Vec<bool>,
}

impl LineReader for FlagWatcher {
    fn read_line(&mut self, _prompt: &str) -> anyhow::Result<ReadOutcome> {
        self.seen.push(self.signals.interrupted());
        Ok(match self.seen.len() {
            1 => ReadOutcome::Interrupted,
            _ => ReadOutcome::Line("exit 9".to_owned()),
        })
    }
}

#[test]
fn loop_consumes_the_interrupt_flag() {
    let _flag = lock_flag();
    let signals = SignalCoordinator::new();
    signals.install().unwrap();

    // SAFETY: raise delivers SIGINT to this thread; the installed handler only sets the flag.
    assert_eq!(unsafe { libc::raise(libc::SIGINT) }, 0);
    assert!(signals.interrupted());

    let mut sh = Interpreter::default()
        .with_signals(signals)
        .with_output(Box::new(MemWriter::new()));
    let mut reader = FlagWatcher {
        signals,
        seen: Vec::new(),
    };

    assert_eq!(sh.repl(&mut reader), 9);
    assert_eq!(reader.seen, [false, false]);
    assert!(!signals.interrupted());
}
