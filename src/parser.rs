use crate::lexer::{self, TokenizeError};
use std::collections::TryReserveError;

/// Where the standard output of a command goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    /// The file to write to. Created if absent.
    pub path: String,
    /// `true` for `>>` (append), `false` for `>` (truncate).
    pub append: bool,
}

/// The parsed, operator-free representation of one input line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredCommand {
    /// The program name followed by its arguments.
    ///
    /// Never contains the redirection operators, `|`, or the background marker.
    pub argv: Vec<String>,
    /// File fed as standard input (`< path`).
    pub input: Option<String>,
    /// File receiving standard output (`> path` or `>> path`).
    pub output: Option<OutputTarget>,
    /// The line ended with `&`.
    pub background: bool,
    /// Number of `|` tokens seen. Pipelines are not executed; callers must
    /// refuse a command with a non-zero count.
    pub pipe_count: usize,
}

impl StructuredCommand {
    /// The program name, if there is one.
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    /// Returns `true` if there is nothing to run (e.g. the line was just `&`).
    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }

    /// Returns `true` if the line asked for a pipeline.
    pub fn requests_pipeline(&self) -> bool {
        self.pipe_count > 0
    }
}

/// Kind of redirection operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RedirectKind {
    /// `<`
    Input,
    /// `>`
    Output,
    /// `>>`
    Append,
}

impl RedirectKind {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "<" => Some(Self::Input),
            ">" => Some(Self::Output),
            ">>" => Some(Self::Append),
            _ => None,
        }
    }
}

/// Errors that can occur while parsing a line.
///
/// Malformed redirections are not errors: a dangling operator is dropped and
/// a repeated operator overwrites the earlier one.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
    #[error("out of memory while building the argument list")]
    OutOfMemory(#[from] TryReserveError),
}

/// Line parser with a configurable token limit.
#[derive(Debug, Clone, Copy)]
pub struct Parser {
    max_tokens: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(lexer::DEFAULT_MAX_TOKENS)
    }
}

impl Parser {
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens }
    }

    /// Parses one line (without its trailing newline) into a [`StructuredCommand`].
    ///
    /// The line is not trimmed: only a `&` in the very last position marks a
    /// background command.
    pub fn parse(&self, line: &str) -> Result<StructuredCommand, ParseError> {
        let (line, background) = match line.strip_suffix('&') {
            Some(rest) => (rest, true),
            None => (line, false),
        };

        let tokens = lexer::tokenize_with_limit(line, self.max_tokens)?;
        let mut cmd = CommandBuilder::from(tokens).build()?;
        cmd.background = background;
        log::debug!("parsed {line:?} into {cmd:?}");
        Ok(cmd)
    }
}

/// Parses `line` with the default token limit. See [`Parser::parse`].
pub fn parse(line: &str) -> Result<StructuredCommand, ParseError> {
    Parser::default().parse(line)
}

struct CommandBuilder {
    tokens: std::vec::IntoIter<String>,
    cmd: StructuredCommand,
}

impl CommandBuilder {
    fn from(tokens: Vec<String>) -> Self {
        CommandBuilder {
            tokens: tokens.into_iter(),
            cmd: StructuredCommand::default(),
        }
    }

    fn build(mut self) -> Result<StructuredCommand, ParseError> {
        while let Some(token) = self.tokens.next() {
            if let Some(kind) = RedirectKind::from_token(&token) {
                // A dangling operator has no target and is dropped.
                if let Some(target) = self.tokens.next() {
                    self.redirect(kind, target);
                }
            } else if token == "|" {
                self.cmd.pipe_count += 1;
            } else {
                self.cmd.argv.try_reserve(1)?;
                self.cmd.argv.push(token);
            }
        }
        Ok(self.cmd)
    }

    fn redirect(&mut self, kind: RedirectKind, path: String) {
        match kind {
            RedirectKind::Input => self.cmd.input = Some(path),
            RedirectKind::Output | RedirectKind::Append => {
                self.cmd.output = Some(OutputTarget {
                    path,
                    append: kind == RedirectKind::Append,
                })
            }
        }
    }
}
