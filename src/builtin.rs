use crate::command::{CommandFactory, EXIT_FAILURE, ExecutableCommand, ExitCode};
use crate::env::Environment;
use crate::interpreter::Factory;
use anyhow::{Context, Result, bail};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::io::{Read, Write};
use std::path::PathBuf;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "cd".
    fn name() -> &'static str;

    /// Executes the command using provided IO streams and environment.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        <T as BuiltinCommand>::execute(*self, stdin, stdout, env).or_else(|e| {
            eprintln!("mini-shell: {e:#}");
            Ok(EXIT_FAILURE)
        })
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        if self.is_error {
            eprintln!("{}", self.output.trim_end());
            Ok(EXIT_FAILURE)
        } else {
            stdout.write_all(self.output.as_bytes())?;
            Ok(0)
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.current_dir.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the working directory of the shell and of every program it starts
/// afterwards. Without an argument, go to $HOME.
pub struct Cd {
    #[argh(positional)]
    /// new working directory, absolute or relative to the current one.
    pub dir: Option<PathBuf>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let dir = match self.dir.filter(|d| !d.as_os_str().is_empty()) {
            Some(dir) => env.current_dir.join(dir),
            None => PathBuf::from(env.get_var("HOME").context("cd: HOME not set")?),
        };

        env::set_current_dir(&dir).with_context(|| format!("cd: {}", dir.display()))?;
        env.current_dir = env::current_dir().context("cd: can't read the new directory")?;
        Ok(0)
    }
}

/// Built-ins that take their operands exactly as written.
///
/// No option parsing happens, so words like `--help` or `-e` reach the
/// command unchanged.
pub(crate) trait VerbatimCommand: Sized {
    fn name() -> &'static str;

    fn from_words(words: &[&str]) -> Self;

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

/// Creates [`VerbatimCommand`]s; the counterpart of [`Factory`].
pub(crate) struct Verbatim<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Verbatim<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

struct Words<T>(T);

impl<T: VerbatimCommand> ExecutableCommand for Words<T> {
    fn execute(
        self: Box<Self>,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        self.0.execute(stdin, stdout, env).or_else(|e| {
            eprintln!("mini-shell: {e:#}");
            Ok(EXIT_FAILURE)
        })
    }
}

impl<T: VerbatimCommand + 'static> CommandFactory for Verbatim<T> {
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(Box::new(Words(T::from_words(args))))
        } else {
            None
        }
    }
}

/// Leave the shell.
///
/// The status is read like C's `atoi`: leading digits with an optional sign,
/// anything else counts as 0.
pub struct Exit {
    pub code: ExitCode,
}

impl VerbatimCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn from_words(words: &[&str]) -> Self {
        Self {
            code: words.first().map_or(0, |word| leading_int(word)),
        }
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        env.exit_requested = Some(self.code);
        Ok(self.code)
    }
}

fn leading_int(word: &str) -> ExitCode {
    let word = word.trim_start();
    let (negative, digits) = match word.as_bytes().first() {
        Some(b'-') => (true, &word[1..]),
        Some(b'+') => (false, &word[1..]),
        _ => (false, word),
    };
    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0 as ExitCode, |acc, d| {
            acc.wrapping_mul(10).wrapping_add(ExitCode::from(d - b'0'))
        });
    if negative { value.wrapping_neg() } else { value }
}

/// Print the arguments separated by single spaces.
///
/// A leading `-n` drops the final newline; every other word is printed as is.
pub struct Echo {
    pub no_newline: bool,
    pub words: Vec<String>,
}

impl VerbatimCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn from_words(words: &[&str]) -> Self {
        let (no_newline, words) = match words.split_first() {
            Some((&"-n", rest)) => (true, rest),
            _ => (false, words),
        };
        Self {
            no_newline,
            words: words.iter().map(|w| (*w).to_owned()).collect(),
        }
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        let end = if self.no_newline { "" } else { "\n" };
        write!(stdout, "{}{end}", self.words.join(" "))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Set a variable passed to every program started afterwards.
pub struct Export {
    #[argh(positional)]
    /// assignment in the form NAME=value.
    pub assignment: String,
}

impl BuiltinCommand for Export {
    fn name() -> &'static str {
        "export"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        match self.assignment.split_once('=') {
            Some((name, value)) if !name.is_empty() => {
                env.set_var(name, value);
                Ok(0)
            }
            _ => bail!("export: invalid format, use: export NAME=value"),
        }
    }
}

#[derive(FromArgs)]
/// List the lines entered so far, oldest first.
pub struct History {}

impl BuiltinCommand for History {
    fn name() -> &'static str {
        "history"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        if env.history.is_empty() {
            writeln!(stdout, "No commands in history")?;
            return Ok(0);
        }
        for (i, line) in env.history.iter().enumerate() {
            writeln!(stdout, "{:4}  {}", i + 1, line)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Clear the terminal screen.
pub struct Clear {}

impl BuiltinCommand for Clear {
    fn name() -> &'static str {
        "clear"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        write!(stdout, "\x1b[H\x1b[J")?;
        Ok(0)
    }
}

const HELP_TEXT: &str = "\
Built-in commands:
  cd [dir]          change directory ($HOME when omitted)
  pwd               print the working directory
  echo [-n] [args]  print arguments
  export NAME=value set a variable for programs started afterwards
  history           list previous command lines
  clear             clear the screen
  help              show this message
  exit [code]       leave the shell

Redirection:
  command > file    write standard output (and errors) to file
  command >> file   append standard output (and errors) to file
  command < file    read standard input from file

Background:
  command &         run command without waiting for it
";

#[derive(FromArgs)]
/// Describe the built-in commands and supported syntax.
pub struct Help {}

impl BuiltinCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        stdout.write_all(HELP_TEXT.as_bytes())?;
        Ok(0)
    }
}
