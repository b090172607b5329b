use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{ErrorKind, Read};

/// Default bound on the length of one command line, in bytes.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

/// Result of one attempt to read a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A line without its terminating newline.
    Line(String),
    /// The read was cut short by an interrupt; the partial line is gone.
    Interrupted,
    /// No more input.
    Eof,
}

/// Source of command lines for the interpreter loop.
pub trait LineReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;

    /// Called for every line the loop accepts.
    fn add_history(&mut self, _line: &str) {}
}

/// Line editor used when standard input is a terminal.
pub struct EditorReader {
    editor: DefaultEditor,
    max_line: usize,
}

impl EditorReader {
    pub fn new(max_line: usize) -> Result<Self> {
        let editor = DefaultEditor::new().context("failed to initialize the line editor")?;
        Ok(Self { editor, max_line })
    }
}

impl LineReader for EditorReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                let mut bytes = line.into_bytes();
                truncate_line(&mut bytes, self.max_line);
                Ok(ReadOutcome::Line(String::from_utf8_lossy(&bytes).into_owned()))
            }
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(e) => Err(e).context("failed to read a line"),
        }
    }

    fn add_history(&mut self, line: &str) {
        if let Err(e) = self.editor.add_history_entry(line) {
            log::debug!("editor history rejected a line: {e}");
        }
    }
}

/// Reads lines one byte at a time straight from a descriptor.
///
/// Meant for input that is not a terminal, so no prompt is shown.
/// Nothing past the newline is consumed, so a child started for this line
/// sees the rest of the input. A read failing with `EINTR` ends the attempt
/// with [`ReadOutcome::Interrupted`].
pub struct FdReader<R> {
    source: R,
    max_line: usize,
}

impl<R: Read> FdReader<R> {
    pub fn new(source: R, max_line: usize) -> Self {
        Self { source, max_line }
    }
}

impl<R: Read> LineReader for FdReader<R> {
    fn read_line(&mut self, _prompt: &str) -> Result<ReadOutcome> {
        let mut line = Vec::new();
        let mut truncated = false;
        let mut byte = [0u8; 1];
        loop {
            match self.source.read(&mut byte) {
                Ok(0) if line.is_empty() && !truncated => return Ok(ReadOutcome::Eof),
                Ok(0) => break,
                Ok(_) if byte[0] == b'\n' => break,
                Ok(_) if line.len() < self.max_line => line.push(byte[0]),
                Ok(_) => truncated = true,
                Err(e) if e.kind() == ErrorKind::Interrupted => {
                    return Ok(ReadOutcome::Interrupted);
                }
                Err(e) => return Err(e).context("failed to read a line"),
            }
        }

        if truncated {
            log::debug!("line longer than {} bytes was truncated", self.max_line);
            truncate_line(&mut line, self.max_line);
        }
        Ok(ReadOutcome::Line(String::from_utf8_lossy(&line).into_owned()))
    }
}

/// Cuts `line` to at most `max` bytes without splitting a UTF-8 sequence.
fn truncate_line(line: &mut Vec<u8>, max: usize) {
    line.truncate(max);
    if let Err(e) = std::str::from_utf8(line) {
        if e.error_len().is_none() {
            line.truncate(e.valid_up_to());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::{self, Cursor};

    fn reader(input: &str, max: usize) -> FdReader<Cursor<Vec<u8>>> {
        FdReader::new(Cursor::new(input.as_bytes().to_vec()), max)
    }

    #[test]
    fn reads_lines_then_eof() {
        let mut r = reader("ls -l\npwd\n", 1024);
        assert_eq!(r.read_line("$ ").unwrap(), ReadOutcome::Line("ls -l".into()));
        assert_eq!(r.read_line("$ ").unwrap(), ReadOutcome::Line("pwd".into()));
        assert_eq!(r.read_line("$ ").unwrap(), ReadOutcome::Eof);
    }

    #[test]
    fn last_line_without_newline_is_returned() {
        let mut r = reader("exit 3", 1024);
        assert_eq!(r.read_line("").unwrap(), ReadOutcome::Line("exit 3".into()));
        assert_eq!(r.read_line("").unwrap(), ReadOutcome::Eof);
    }

    #[test]
    fn empty_line_is_not_eof() {
        let mut r = reader("\n", 1024);
        assert_eq!(r.read_line("").unwrap(), ReadOutcome::Line(String::new()));
    }

    #[test]
    fn long_line_is_truncated_and_rest_discarded() {
        let mut r = reader("abcdefgh\nnext\n", 4);
        assert_eq!(r.read_line("").unwrap(), ReadOutcome::Line("abcd".into()));
        assert_eq!(r.read_line("").unwrap(), ReadOutcome::Line("next".into()));
    }

    #[test]
    fn truncation_keeps_whole_characters() {
        // "é" is two bytes; a limit of 2 would split the second one.
        let mut r = reader("aé\n", 2);
        assert_eq!(r.read_line("").unwrap(), ReadOutcome::Line("a".into()));
    }

    struct InterruptOnce {
        fired: bool,
        rest: Cursor<Vec<u8>>,
    }

    impl Read for InterruptOnce {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.fired && self.rest.position() == 3 {
                self.fired = true;
                return Err(io::Error::from(ErrorKind::Interrupted));
            }
            self.rest.read(buf)
        }
    }

    #[test]
    fn interrupted_read_discards_partial_line() {
        let source = InterruptOnce {
            fired: false,
            rest: Cursor::new(b"abcdef\nok\n".to_vec()),
        };
        let mut r = FdReader::new(source, 1024);
        assert_matches!(r.read_line("").unwrap(), ReadOutcome::Interrupted);
        assert_eq!(r.read_line("").unwrap(), ReadOutcome::Line("def".into()));
        assert_eq!(r.read_line("").unwrap(), ReadOutcome::Line("ok".into()));
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::from(ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn other_errors_are_reported() {
        let mut r = FdReader::new(Broken, 1024);
        assert!(r.read_line("").is_err());
    }
}
