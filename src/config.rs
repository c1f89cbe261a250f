// src/config.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, net::SocketAddr, path::Path, path::PathBuf};

use crate::error::RouterError;

/// Router configuration.
///
/// Built in code with the named setters, or loaded from YAML:
///
/// addr: 0.0.0.0
/// port: 8080
/// debug_mode: true
/// tls:
///   key: certs/server.key
///   cert: certs/server.pem
/// log:
///   level: info
///   json: false
///
/// Every key is optional; missing keys keep their defaults.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RouterConfig {
    /// Listen IP address
    pub addr: String,

    /// Listen port
    pub port: u16,

    /// Verbose route registration and debug-level logs
    pub debug_mode: bool,

    /// Key and certificate for `tls_server`
    pub tls: Option<TlsConfig>,

    pub log: LogConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1".to_string(),
            port: 9527,
            debug_mode: false,
            tls: None,
            log: LogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TlsConfig {
    pub key: PathBuf,
    pub cert: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directive, e.g. `info` or `acroute=debug,tower_http=info`
    pub level: String,

    /// Emit JSON lines instead of human readable output
    pub json: bool,

    /// Append to this file instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl RouterConfig {
    pub fn address(mut self, ip: impl Into<String>, port: u16) -> Self {
        self.addr = ip.into();
        self.port = port;
        self
    }

    pub fn debug_mode(mut self, debug: bool) -> Self {
        self.debug_mode = debug;
        if debug && self.log.level == LogConfig::default().level {
            self.log.level = "debug".to_string();
        }
        self
    }

    pub fn tls(mut self, key: impl Into<PathBuf>, cert: impl Into<PathBuf>) -> Self {
        self.tls = Some(TlsConfig {
            key: key.into(),
            cert: cert.into(),
        });
        self
    }

    pub fn log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Load and parse a YAML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let cfg: RouterConfig =
            serde_yaml::from_str(&raw).context("Failed to parse YAML config")?;

        let debug = cfg.debug_mode;
        Ok(cfg.debug_mode(debug))
    }

    /// Resolve the listen socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, RouterError> {
        format!("{}:{}", self.addr, self.port)
            .parse()
            .or_else(|_| {
                // IPv6 literals need brackets
                format!("[{}]:{}", self.addr, self.port).parse()
            })
            .map_err(|_| RouterError::InvalidAddress {
                addr: self.addr.clone(),
                port: self.port,
            })
    }

    /// Check the settings a router cannot start without.
    pub fn validate(&self) -> Result<(), RouterError> {
        self.socket_addr()?;
        if let Some(tls) = &self.tls {
            if tls.key.as_os_str().is_empty() || tls.cert.as_os_str().is_empty() {
                return Err(RouterError::IncompleteTls);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let cfg = RouterConfig::default();
        assert_eq!(cfg.addr, "127.0.0.1");
        assert_eq!(cfg.port, 9527);
        assert!(!cfg.debug_mode);
        assert!(cfg.tls.is_none());
        assert_eq!(cfg.socket_addr().unwrap().to_string(), "127.0.0.1:9527");
    }

    #[test]
    fn setters_override_defaults() {
        let cfg = RouterConfig::default()
            .address("0.0.0.0", 8080)
            .debug_mode(true)
            .tls("k.pem", "c.pem");
        assert_eq!(cfg.socket_addr().unwrap().to_string(), "0.0.0.0:8080");
        assert!(cfg.debug_mode);
        assert_eq!(cfg.log.level, "debug");
        assert_eq!(cfg.tls.unwrap().cert, PathBuf::from("c.pem"));
    }

    #[test]
    fn ipv6_addresses_resolve() {
        let cfg = RouterConfig::default().address("::1", 80);
        assert_eq!(cfg.socket_addr().unwrap().to_string(), "[::1]:80");
    }

    #[test]
    fn validation_rejects_bad_settings() {
        let bad_addr = RouterConfig::default().address("not an ip", 1);
        assert!(matches!(
            bad_addr.validate(),
            Err(RouterError::InvalidAddress { .. })
        ));

        let bad_tls = RouterConfig::default().tls("", "cert.pem");
        assert!(matches!(bad_tls.validate(), Err(RouterError::IncompleteTls)));
    }

    #[test]
    fn load_fills_missing_keys_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port: 8088\ndebug_mode: true\nlog:\n  json: true").unwrap();

        let cfg = RouterConfig::load(file.path()).unwrap();
        assert_eq!(cfg.addr, "127.0.0.1");
        assert_eq!(cfg.port, 8088);
        assert!(cfg.log.json);
        assert_eq!(cfg.log.level, "debug");
    }

    #[test]
    fn load_reports_unreadable_files() {
        let err = RouterConfig::load(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
