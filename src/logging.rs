use crate::config::LogConfig;
use anyhow::{Context, Result, anyhow};
use log::LevelFilter;
use simplelog::{ColorChoice, TermLogger, TerminalMode, WriteLogger};
use std::fs::OpenOptions;
use std::str::FromStr;

/// Installs the global logger described by `config`.
///
/// Records go to `config.file` (appended) when set, otherwise to standard error.
pub fn init(config: &LogConfig) -> Result<()> {
    let level = LevelFilter::from_str(&config.level)
        .map_err(|_| anyhow!("unknown log level {:?}", config.level))?;
    let settings = simplelog::ConfigBuilder::new()
        .set_time_level(LevelFilter::Debug)
        .build();

    match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("can't open log file {}", path.display()))?;
            WriteLogger::init(level, settings, file)
        }
        None => TermLogger::init(level, settings, TerminalMode::Stderr, ColorChoice::Auto),
    }
    .map_err(|_| anyhow!("logger already installed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_level_is_rejected() {
        let config = LogConfig {
            level: "loud".to_owned(),
            file: None,
        };
        let err = init(&config).unwrap_err();
        assert!(err.to_string().contains("loud"));
    }
}
