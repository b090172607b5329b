use crate::parser::{OutputTarget, StructuredCommand};
use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{self, Result as IoResult, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::rc::Rc;

/// Opens the files a built-in reads from and writes to.
///
/// Input is opened before output so that a missing input file does not
/// create or truncate the output file.
pub(crate) fn open_redirections(
    cmd: &StructuredCommand,
) -> Result<(Option<File>, Option<File>), RedirectError> {
    let input = match &cmd.input {
        Some(path) => Some(File::open(path).map_err(|source| RedirectError {
            path: path.clone(),
            action: "reading",
            source,
        })?),
        None => None,
    };
    let output = match &cmd.output {
        Some(target) => Some(open_output(target).map_err(|source| RedirectError {
            path: target.path.clone(),
            action: "writing",
            source,
        })?),
        None => None,
    };
    Ok((input, output))
}

fn open_output(target: &OutputTarget) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).mode(0o644);
    if target.append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }
    options.open(&target.path)
}

#[derive(Debug, thiserror::Error)]
#[error("{path}: cannot open for {action}: {source}")]
pub(crate) struct RedirectError {
    path: String,
    action: &'static str,
    source: io::Error,
}

/// Memory-backed writer for capturing the interpreter's own output.
///
/// Cloning shares the buffer, so a caller can keep a handle and read what
/// was written after handing the writer over.
#[derive(Debug, Clone, Default)]
pub struct MemWriter {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl MemWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.borrow()).into_owned()
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::fs;
    use std::io::Read;

    #[test]
    fn mem_writer_shares_its_buffer() {
        let handle = MemWriter::new();
        let mut writer = handle.clone();
        write!(writer, "hello").unwrap();
        assert_eq!(handle.contents(), "hello");
    }

    #[test]
    fn opens_input_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::write(&input, "data").unwrap();
        fs::write(&output, "old old old").unwrap();

        let line = format!("cmd < {} > {}", input.display(), output.display());
        let (stdin, stdout) = open_redirections(&parse(&line).unwrap()).unwrap();

        let mut text = String::new();
        stdin.unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "data");

        stdout.unwrap().write_all(b"new").unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), "new");
    }

    #[test]
    fn append_keeps_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out");
        fs::write(&output, "one\n").unwrap();

        let line = format!("cmd >> {}", output.display());
        let (_, stdout) = open_redirections(&parse(&line).unwrap()).unwrap();
        stdout.unwrap().write_all(b"two\n").unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn missing_input_leaves_output_alone() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out");
        let line = format!(
            "cmd < {} > {}",
            dir.path().join("missing").display(),
            output.display()
        );
        let err = open_redirections(&parse(&line).unwrap()).unwrap_err();
        assert!(err.to_string().contains("cannot open for reading"));
        assert!(!output.exists());
    }
}
