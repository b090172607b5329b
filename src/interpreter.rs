use crate::command::{CommandFactory, EXIT_FAILURE, ExecutableCommand, ExitCode};
use crate::config::Config;
use crate::env::Environment;
use crate::external::{self, Outcome};
use crate::history::DEFAULT_HISTORY_SIZE;
use crate::input::{LineReader, ReadOutcome};
use crate::io_adapters;
use crate::parser::{Parser, StructuredCommand};
use crate::prompt::{PROMPT, PromptStyle};
use crate::signals::SignalCoordinator;
use std::io::{self, Read, Write};
use std::path::PathBuf;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate, see [`crate::builtin`].
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// The shell's read-parse-dispatch loop.
///
/// The interpreter owns an [`Environment`] and a list of [`CommandFactory`]
/// objects consulted for built-ins; anything they don't recognize is started
/// as an external program.
///
/// Example
/// ```
/// use mini_shell::Interpreter;
/// let mut sh = Interpreter::default();
/// assert_eq!(sh.run_line("echo hello world"), 0);
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
    parser: Parser,
    signals: SignalCoordinator,
    prompt: PromptStyle,
    stdout: Box<dyn Write>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(env: Environment, commands: Vec<Box<dyn CommandFactory>>) -> Self {
        let home = env.get_var("HOME").map(PathBuf::from);
        Self {
            env,
            commands,
            parser: Parser::default(),
            signals: SignalCoordinator::new(),
            prompt: PromptStyle::new(home, false),
            stdout: Box::new(io::stdout()),
        }
    }

    /// Interpreter with the built-in commands and settings from `config`.
    pub fn from_config(config: &Config) -> Self {
        let env = Environment::new(config.history_size);
        let home = env.get_var("HOME").map(PathBuf::from);
        Self::new(env, builtin_factories())
            .with_parser(Parser::new(config.max_tokens))
            .with_prompt(PromptStyle::new(home, config.color))
    }

    pub fn with_parser(mut self, parser: Parser) -> Self {
        self.parser = parser;
        self
    }

    /// Use the handle whose handlers the caller installed.
    pub fn with_signals(mut self, signals: SignalCoordinator) -> Self {
        self.signals = signals;
        self
    }

    pub fn with_prompt(mut self, prompt: PromptStyle) -> Self {
        self.prompt = prompt;
        self
    }

    /// Send the interpreter's own output (prompt header, built-ins) to `out`.
    pub fn with_output(mut self, out: Box<dyn Write>) -> Self {
        self.stdout = out;
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Parses and runs one command line, returning its exit status.
    ///
    /// Failures are reported on standard error and turned into a non-zero
    /// status; nothing here stops the interpreter.
    pub fn run_line(&mut self, line: &str) -> ExitCode {
        let status = match self.parser.parse(line) {
            Ok(cmd) => {
                log::debug!("parsed {line:?} into {cmd:?}");
                self.dispatch(&cmd)
            }
            Err(e) => {
                eprintln!("mini-shell: {e}");
                EXIT_FAILURE
            }
        };
        self.env.last_status = status;
        status
    }

    fn dispatch(&mut self, cmd: &StructuredCommand) -> ExitCode {
        let Some(name) = cmd.program() else {
            return 0;
        };
        if cmd.requests_pipeline() {
            eprintln!("mini-shell: pipelines are not supported");
            return EXIT_FAILURE;
        }

        if let Some(builtin) = self.create_builtin(name, cmd) {
            return self.run_builtin(builtin, cmd);
        }

        self.flush_output();
        match external::execute(cmd, &self.env) {
            Ok(Outcome::Finished(status)) => status,
            Ok(Outcome::Background(pid)) => {
                self.say(&format!("[{pid}] running in background"));
                0
            }
            Err(e) => {
                log::error!("can't run {name}: {e}");
                eprintln!("mini-shell: {name}: {e}");
                EXIT_FAILURE
            }
        }
    }

    fn create_builtin(
        &self,
        name: &str,
        cmd: &StructuredCommand,
    ) -> Option<Box<dyn ExecutableCommand>> {
        let args: Vec<&str> = cmd.argv[1..].iter().map(String::as_str).collect();
        self.commands
            .iter()
            .find_map(|factory| factory.try_create(name, &args))
    }

    fn run_builtin(
        &mut self,
        builtin: Box<dyn ExecutableCommand>,
        cmd: &StructuredCommand,
    ) -> ExitCode {
        let (input, output) = match io_adapters::open_redirections(cmd) {
            Ok(files) => files,
            Err(e) => {
                eprintln!("mini-shell: {e}");
                return EXIT_FAILURE;
            }
        };

        let mut stdin: Box<dyn Read> = match input {
            Some(file) => Box::new(file),
            None => Box::new(io::stdin()),
        };
        let result = match output {
            Some(mut file) => builtin.execute(&mut stdin, &mut file, &mut self.env),
            None => {
                let result = builtin.execute(&mut stdin, &mut self.stdout, &mut self.env);
                self.flush_output();
                result
            }
        };

        result.unwrap_or_else(|e| {
            eprintln!("mini-shell: {e:#}");
            EXIT_FAILURE
        })
    }

    /// Reads and runs lines from `reader` until end of input or `exit`.
    ///
    /// Returns the status the shell should exit with: the `exit` argument if
    /// one was given, otherwise the status of the last command.
    pub fn repl(&mut self, reader: &mut dyn LineReader) -> ExitCode {
        loop {
            if self.signals.take_interrupt() {
                log::debug!("interrupt arrived while the last command ran");
            }

            let header = self.prompt.header(&self.env.current_dir);
            self.say(&header);

            match reader.read_line(PROMPT) {
                Ok(ReadOutcome::Line(line)) => {
                    let line = line.trim_end();
                    if line.is_empty() {
                        continue;
                    }
                    reader.add_history(line);
                    self.env.history.push(line);
                    self.run_line(line);
                    if let Some(code) = self.env.exit_requested {
                        return code;
                    }
                }
                Ok(ReadOutcome::Interrupted) => {
                    let flagged = self.signals.take_interrupt();
                    log::debug!("line read interrupted (flag set: {flagged})");
                    self.say("");
                }
                Ok(ReadOutcome::Eof) => {
                    self.say("");
                    break;
                }
                Err(e) => {
                    eprintln!("mini-shell: {e:#}");
                    break;
                }
            }
        }
        self.env.last_status
    }

    /// Prints the welcome line.
    pub fn greet(&mut self) {
        let banner = self.prompt.banner();
        self.say(&banner);
    }

    /// Prints the goodbye line.
    pub fn farewell(&mut self) {
        let text = self.prompt.farewell();
        self.say(&text);
    }

    fn say(&mut self, text: &str) {
        if let Err(e) = writeln!(self.stdout, "{text}").and_then(|()| self.stdout.flush()) {
            log::debug!("can't write to output: {e}");
        }
    }

    fn flush_output(&mut self) {
        if let Err(e) = self.stdout.flush() {
            log::debug!("can't flush output: {e}");
        }
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the built-in commands and default settings.
    fn default() -> Self {
        Self::new(Environment::new(DEFAULT_HISTORY_SIZE), builtin_factories())
    }
}

fn builtin_factories() -> Vec<Box<dyn CommandFactory>> {
    use crate::builtin::*;
    vec![
        Box::new(Factory::<Cd>::default()),
        Box::new(Factory::<Clear>::default()),
        Box::new(Verbatim::<Echo>::default()),
        Box::new(Verbatim::<Exit>::default()),
        Box::new(Factory::<Export>::default()),
        Box::new(Factory::<Help>::default()),
        Box::new(Factory::<History>::default()),
        Box::new(Factory::<Pwd>::default()),
    ]
}
