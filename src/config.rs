use crate::history::DEFAULT_HISTORY_SIZE;
use crate::input::DEFAULT_MAX_LINE_LENGTH;
use crate::lexer::DEFAULT_MAX_TOKENS;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Shell settings read from `config.toml`. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Tokens kept per line; the rest are dropped.
    pub max_tokens: usize,
    /// Bytes kept per line; the rest of the line is discarded.
    pub max_line_length: usize,
    pub history_size: usize,
    /// ANSI colors in the prompt header.
    pub color: bool,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
    pub level: String,
    /// Log to this file instead of standard error.
    pub file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            history_size: DEFAULT_HISTORY_SIZE,
            color: true,
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            file: None,
        }
    }
}

impl Config {
    /// Loads the configuration.
    ///
    /// An explicit `path` must exist and parse. Without one, the user file at
    /// `~/.config/mini-shell/config.toml` is used when present; a broken user
    /// file is reported and the defaults are used instead.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        let Some(path) = Self::user_path() else {
            return Ok(Self::default());
        };
        if !path.is_file() {
            return Ok(Self::default());
        }
        match Self::from_file(&path) {
            Ok(config) => Ok(config),
            Err(e) => {
                eprintln!("mini-shell: {e:#}; using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("can't read config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn user_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(Path::new(&home).join(".config/mini-shell/config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.max_tokens, 64);
        assert_eq!(config.max_line_length, 1024);
        assert_eq!(config.history_size, 100);
        assert!(config.color);
        assert_eq!(config.log.level, "warn");
        assert_eq!(config.log.file, None);
    }

    #[test]
    fn fields_override_defaults() {
        let config = Config::parse(
            r#"
            max_tokens = 8
            color = false

            [log]
            level = "debug"
            file = "/tmp/mini-shell.log"
            "#,
        )
        .unwrap();
        assert_eq!(config.max_tokens, 8);
        assert_eq!(config.max_line_length, 1024);
        assert!(!config.color);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.file, Some(PathBuf::from("/tmp/mini-shell.log")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::parse("max_token = 3").is_err());
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn explicit_path_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "history_size = 5\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.history_size, 5);
    }
}
