//! A small interactive command interpreter.
//!
//! A line read from the user goes through the [`lexer`] (whitespace
//! splitting), the [`parser`] (redirection and background markers pulled out
//! into a [`StructuredCommand`]) and is then either run in-process as a
//! built-in or started as an external program by [`external::execute`].
//!
//! The main entry point is [`Interpreter`], which owns the [`env::Environment`]
//! and drives the read-parse-dispatch loop. Process-wide signal handling lives
//! in [`signals`]; install it once with [`SignalCoordinator::install`] before
//! starting the loop.

mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod external;
pub mod history;
pub mod input;
mod interpreter;
mod io_adapters;
pub mod lexer;
pub mod logging;
pub mod parser;
pub mod prompt;
pub mod signals;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
pub use io_adapters::MemWriter;
pub use parser::{Parser, StructuredCommand, parse};
pub use signals::SignalCoordinator;
