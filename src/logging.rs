// src/logging.rs

//! Process-wide `tracing` subscriber.
//!
//! Called once by the binary entry point before the router is built.
//! `RUST_LOG` overrides the configured level.

use anyhow::{Context, Result};
use std::{fs::OpenOptions, sync::Mutex};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LogConfig;

pub fn init(cfg: &LogConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&cfg.level)
            .with_context(|| format!("Invalid log level {:?}", cfg.level))?,
    };

    let layer = match &cfg.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            let base = fmt::layer().with_writer(Mutex::new(file)).with_ansi(false);
            if cfg.json {
                base.json().boxed()
            } else {
                base.boxed()
            }
        }
        None => {
            let base = fmt::layer().with_writer(std::io::stderr);
            if cfg.json {
                base.json().boxed()
            } else {
                base.boxed()
            }
        }
    };

    // a subscriber installed by the host process takes precedence
    let _ = tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_the_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acroute.log");
        let cfg = LogConfig {
            file: Some(path.clone()),
            json: true,
            ..LogConfig::default()
        };

        init(&cfg).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn unwritable_log_file_is_an_error() {
        let cfg = LogConfig {
            file: Some("/definitely/not/here/acroute.log".into()),
            ..LogConfig::default()
        };
        assert!(init(&cfg).is_err());
    }
}
