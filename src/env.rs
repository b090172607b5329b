use crate::command::ExitCode;
use crate::history::History;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Mutable, user-level view of the process environment used by the interpreter.
///
/// The environment contains:
/// - `vars`: variables passed to every external command.
/// - `current_dir`: the working directory (kept in sync with the process by `cd`).
/// - `history`: lines entered so far.
/// - `last_status`: exit status of the most recent command.
/// - `exit_requested`: set by `exit`; the main loop stops when it sees it.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    pub history: History,
    pub last_status: ExitCode,
    /// When set, the interactive loop stops with this status.
    pub exit_requested: Option<ExitCode>,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    ///
    /// This copies variables from `std::env::vars_os()` (skipping any that are
    /// not valid UTF-8) and initializes `current_dir` from `std::env::current_dir()`.
    pub fn new(history_size: usize) -> Self {
        let vars = stdenv::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_vars(vars, current_dir, history_size)
    }

    /// Creates an environment from explicit parts without looking at the process.
    pub fn with_vars(
        vars: HashMap<String, String>,
        current_dir: PathBuf,
        history_size: usize,
    ) -> Self {
        Self {
            vars,
            current_dir,
            history: History::new(history_size),
            last_status: 0,
            exit_requested: None,
        }
    }

    /// Get the value of a variable.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Set or override a variable.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }
}
