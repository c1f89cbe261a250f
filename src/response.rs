// src/response.rs

//! Write side of a handler invocation.
//!
//! HTTP responses are JSON bodies with a status code. CLI responses are
//! text lines on the command's output stream; `send_ok` and `send_fail`
//! print the bare message there, with no status distinction.
//!
//! Responding more than once is allowed: for HTTP the last call wins,
//! for the CLI every call prints a line.

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::IntoResponse,
};
use serde::Serialize;
use std::io::Write;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Simple `{code, msg}` body used by `send_ok` / `send_fail`.
#[derive(Debug, Serialize)]
struct Simple<'m> {
    code: u8,
    msg: &'m str,
}

pub enum Response<'a> {
    Http(HttpResponse),
    Cli(CliResponse<'a>),
}

impl Response<'_> {
    pub fn respond<T: Serialize + ?Sized>(&mut self, code: u16, payload: &T) {
        match self {
            Response::Http(r) => r.respond(code, payload),
            Response::Cli(r) => r.respond(code, payload),
        }
    }

    /// HTTP 200 `{"code":0,"msg":msg}`, or the bare message on the CLI.
    pub fn send_ok(&mut self, msg: &str) {
        match self {
            Response::Http(r) => r.respond(StatusCode::OK.as_u16(), &Simple { code: 0, msg }),
            Response::Cli(r) => r.line(msg),
        }
    }

    /// HTTP 500 `{"code":1,"msg":msg}`, or the bare message on the CLI.
    pub fn send_fail(&mut self, msg: &str) {
        match self {
            Response::Http(r) => r.respond(
                StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                &Simple { code: 1, msg },
            ),
            Response::Cli(r) => r.line(msg),
        }
    }
}

/* ---------------- http ---------------- */

/// Buffered HTTP reply, turned into an axum response after the handler returns.
#[derive(Debug, Default)]
pub struct HttpResponse {
    reply: Option<(StatusCode, Vec<u8>)>,
}

impl HttpResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond<T: Serialize + ?Sized>(&mut self, code: u16, payload: &T) {
        let status = StatusCode::from_u16(code).unwrap_or_else(|_| {
            tracing::warn!(code, "invalid HTTP status code, sending 500");
            StatusCode::INTERNAL_SERVER_ERROR
        });

        let reply = match serde_json::to_vec(payload) {
            Ok(body) => (status, body),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialise response payload");
                let body = serde_json::json!({ "code": 1, "msg": "output failed" });
                (StatusCode::INTERNAL_SERVER_ERROR, body.to_string().into_bytes())
            }
        };

        self.reply = Some(reply);
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.reply.as_ref().map(|(status, _)| *status)
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.reply.as_ref().map(|(_, body)| body.as_slice())
    }
}

impl IntoResponse for HttpResponse {
    /// A handler that never responded yields an empty 200.
    fn into_response(self) -> axum::response::Response {
        match self.reply {
            None => StatusCode::OK.into_response(),
            Some((status, body)) => (
                status,
                [(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
                body,
            )
                .into_response(),
        }
    }
}

/* ---------------- cli ---------------- */

/// Text output of one subcommand run.
pub struct CliResponse<'a> {
    out: &'a mut dyn Write,
}

impl<'a> CliResponse<'a> {
    pub fn new(out: &'a mut dyn Write) -> Self {
        Self { out }
    }

    /// Print `code <code>, msg <json>`.
    ///
    /// A payload that cannot be serialised is reported on the same stream
    /// and never aborts the command.
    pub fn respond<T: Serialize + ?Sized>(&mut self, code: u16, payload: &T) {
        let line = match serde_json::to_string(payload) {
            Ok(json) => format!("code {}, msg {}", code, json),
            Err(e) => format!("code {}, msg output failed, err {}", code, e),
        };
        self.line(&line);
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text) {
            tracing::warn!(error = %e, "failed to write command output");
        }
    }
}
