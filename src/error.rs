// src/error.rs

use thiserror::Error;

/// Failure while constructing a router.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("invalid listen address {addr}:{port}")]
    InvalidAddress { addr: String, port: u16 },

    #[error("TLS needs both a key and a certificate path")]
    IncompleteTls,
}

/// Failure while registering a route or command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("unsupported HTTP method {method:?} for {path}")]
    UnsupportedMethod { method: String, path: String },

    #[error("route path must start with '/': {0:?}")]
    InvalidPath(String),

    #[error("route path {path} conflicts with registered path {existing}")]
    ConflictingPath { path: String, existing: String },

    #[error("route {method} {path} is already registered")]
    DuplicateRoute { method: String, path: String },

    #[error("CLI command {0:?} is already registered")]
    DuplicateCommand(String),

    #[error("flag --{flag} of command {command:?} clashes with a built-in flag")]
    ReservedFlag { command: String, flag: String },

    #[error("flag --{flag} is declared twice for command {command:?}")]
    DuplicateFlag { command: String, flag: String },
}

/// Failure while binding parameters into a struct.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("required field {field:?} is missing")]
    MissingField { field: String },

    #[error("field {field:?}: cannot parse {value:?} as {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: &'static str,
    },
}
