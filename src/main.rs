use anyhow::{Context, Result};
use argh::FromArgs;
use mini_shell::command::ExitCode;
use mini_shell::config::Config;
use mini_shell::input::{EditorReader, FdReader};
use mini_shell::{Interpreter, SignalCoordinator, logging};
use std::fs::File;
use std::io::{self, IsTerminal};
use std::os::fd::AsFd;
use std::path::PathBuf;

#[derive(FromArgs)]
/// A small interactive command interpreter.
struct Args {
    /// configuration file (default: ~/.config/mini-shell/config.toml).
    #[argh(option)]
    config: Option<PathBuf>,

    /// log level: off, error, warn, info, debug or trace.
    #[argh(option)]
    log_level: Option<String>,

    /// append log records to this file instead of standard error.
    #[argh(option)]
    log_file: Option<PathBuf>,

    /// run a single command line and exit with its status.
    #[argh(option, short = 'c')]
    command: Option<String>,

    /// disable colors in the prompt.
    #[argh(switch)]
    no_color: bool,
}

fn main() {
    let status = match run(argh::from_env()) {
        Ok(status) => status,
        Err(e) => {
            eprintln!("mini-shell: {e:#}");
            1
        }
    };
    std::process::exit(status);
}

fn run(args: Args) -> Result<ExitCode> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(level) = args.log_level {
        config.log.level = level;
    }
    if args.log_file.is_some() {
        config.log.file = args.log_file;
    }
    if args.no_color || !io::stdout().is_terminal() {
        config.color = false;
    }

    logging::init(&config.log)?;
    log::debug!("configuration: {config:?}");

    let signals = SignalCoordinator::new();
    signals
        .install()
        .context("can't install signal handlers")?;

    let mut sh = Interpreter::from_config(&config).with_signals(signals);

    if let Some(line) = args.command {
        let status = sh.run_line(&line);
        return Ok(sh.env().exit_requested.unwrap_or(status));
    }

    let stdin = io::stdin();
    if stdin.is_terminal() {
        sh.greet();
        let mut reader = EditorReader::new(config.max_line_length)?;
        let status = sh.repl(&mut reader);
        sh.farewell();
        Ok(status)
    } else {
        let fd = stdin
            .as_fd()
            .try_clone_to_owned()
            .context("can't duplicate standard input")?;
        let mut reader = FdReader::new(File::from(fd), config.max_line_length);
        Ok(sh.repl(&mut reader))
    }
}
