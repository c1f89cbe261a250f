// src/action.rs

//! Read side of a handler invocation.
//!
//! An `Action` is either:
//! - `Http`: decoded body (form, multipart or JSON) and query string of one request
//! - `Cli`: parsed arguments of one subcommand run
//!
//! Typed getters never fail. A missing or unparsable value yields the
//! type's zero value; use `Action::param` to see which of the two happened.
//! `bind_into` walks a parameter schema and does report failures.

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Multipart},
    http::{header::CONTENT_TYPE, Request},
};
use chrono::{DateTime, Utc};
use clap::ArgMatches;
use serde_json::Value;
use std::{sync::Arc, time::Duration};

use crate::context::Context;
use crate::error::BindError;
use crate::params::{Params, Slot};
use crate::value::{FromParam, Param};

/// Upper bound on a form-encoded or JSON request body.
const BODY_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Http,
    Cli,
}

#[derive(Debug)]
pub enum Action {
    Http(HttpAction),
    Cli(CliAction),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Http(_) => ActionKind::Http,
            Action::Cli(_) => ActionKind::Cli,
        }
    }

    pub fn context(&self) -> &Context {
        match self {
            Action::Http(a) => &a.context,
            Action::Cli(a) => &a.context,
        }
    }

    /// Look up one parameter, keeping "missing" and "malformed" apart.
    pub fn param<T>(&self, name: &str) -> Param<T>
    where
        T: FromParam + Clone + Send + Sync + 'static,
    {
        match self {
            Action::Http(a) => Param::from_raw(a.raw(name)),
            Action::Cli(a) => a.param(name),
        }
    }

    /// Every value given for `name`, in order.
    pub fn values(&self, name: &str) -> Vec<String> {
        match self {
            Action::Http(a) => a.values(name),
            Action::Cli(a) => a.values(name),
        }
    }

    /// `None` when absent or unparsable.
    pub fn time_value(&self, name: &str) -> Option<DateTime<Utc>> {
        self.param(name).value()
    }

    pub fn int_value(&self, name: &str) -> isize {
        self.param(name).unwrap_or_default()
    }

    pub fn int64_value(&self, name: &str) -> i64 {
        self.param(name).unwrap_or_default()
    }

    pub fn float64_value(&self, name: &str) -> f64 {
        self.param(name).unwrap_or_default()
    }

    pub fn string_value(&self, name: &str) -> String {
        self.param(name).unwrap_or_default()
    }

    pub fn bool_value(&self, name: &str) -> bool {
        self.param(name).unwrap_or_default()
    }

    pub fn uint_value(&self, name: &str) -> usize {
        self.param(name).unwrap_or_default()
    }

    pub fn uint64_value(&self, name: &str) -> u64 {
        self.param(name).unwrap_or_default()
    }

    pub fn duration_value(&self, name: &str) -> Duration {
        self.param(name).unwrap_or_default()
    }

    /// Fill `target` from this invocation's values.
    ///
    /// Fields without an alias and fields of unsupported types are left
    /// untouched. A required field with no value, or any value that does not
    /// parse as the field's type, is an error.
    pub fn bind_into<P: Params>(&self, target: &mut P) -> Result<(), BindError> {
        for field in P::schema().fields() {
            let name = field.alias();
            if name.is_empty() {
                continue;
            }
            let required = field.tags.required();

            match field.slot {
                Slot::Bool(acc) => {
                    assign(self.param::<bool>(name), name, required, acc(target))?;
                }
                Slot::Int(acc) => {
                    assign(self.param::<isize>(name), name, required, acc(target))?;
                }
                Slot::Int64(acc) => {
                    assign(self.param::<i64>(name), name, required, acc(target))?;
                }
                Slot::Float64(acc) => {
                    assign(self.param::<f64>(name), name, required, acc(target))?;
                }
                Slot::String(acc) => {
                    assign(self.param::<String>(name), name, required, acc(target))?;
                }
                Slot::Duration(acc) => {
                    assign(self.param::<Duration>(name), name, required, acc(target))?;
                }
                Slot::Uint(acc) => {
                    assign(self.param::<usize>(name), name, required, acc(target))?;
                }
                Slot::Uint64(acc) => {
                    assign(self.param::<u64>(name), name, required, acc(target))?;
                }
                Slot::Timestamp(acc) => {
                    let mut at = DateTime::<Utc>::default();
                    if assign(self.param::<DateTime<Utc>>(name), name, required, &mut at)? {
                        *acc(target) = Some(at);
                    }
                }
                Slot::StringList(acc) => {
                    let values = self.values(name);
                    if !values.is_empty() {
                        *acc(target) = values;
                    } else if required {
                        return Err(BindError::MissingField {
                            field: name.to_string(),
                        });
                    }
                }
                Slot::Unsupported(_) => {}
            }
        }

        Ok(())
    }
}

/// Store a looked-up value into its slot; `Ok(true)` when something was stored.
fn assign<T: FromParam>(
    param: Param<T>,
    field: &str,
    required: bool,
    slot: &mut T,
) -> Result<bool, BindError> {
    match param {
        Param::Value(v) => {
            *slot = v;
            Ok(true)
        }
        Param::Missing if required => Err(BindError::MissingField {
            field: field.to_string(),
        }),
        Param::Missing => Ok(false),
        Param::Malformed(value) => Err(BindError::InvalidValue {
            field: field.to_string(),
            value,
            expected: T::EXPECTED,
        }),
    }
}

/* ---------------- http ---------------- */

/// Query string and decoded body of a single HTTP request.
#[derive(Debug)]
pub struct HttpAction {
    query: Vec<(String, String)>,
    body: Vec<(String, String)>,
    context: Arc<Context>,
}

impl HttpAction {
    pub fn new(
        query: Vec<(String, String)>,
        body: Vec<(String, String)>,
        context: Arc<Context>,
    ) -> Self {
        Self {
            query,
            body,
            context,
        }
    }

    /// Collect query pairs and body pairs, decoding the body by content type:
    /// - `application/x-www-form-urlencoded`: form pairs
    /// - `multipart/form-data`: text parts (file parts are skipped)
    /// - `application/json`: top-level members of an object
    ///
    /// Other content types, unreadable bodies and malformed bodies leave
    /// the body empty.
    pub async fn from_request(req: Request<Body>, context: Arc<Context>) -> Self {
        let query = req
            .uri()
            .query()
            .map(|q| parse_pairs(q.as_bytes()))
            .unwrap_or_default();

        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.to_ascii_lowercase())
            .unwrap_or_default();

        let body = if content_type.starts_with("application/x-www-form-urlencoded") {
            read_body(req).await.map(|b| parse_pairs(&b)).unwrap_or_default()
        } else if content_type.starts_with("multipart/form-data") {
            multipart_pairs(req).await
        } else if is_json(&content_type) {
            read_body(req).await.map(|b| json_pairs(&b)).unwrap_or_default()
        } else {
            Vec::new()
        };

        Self::new(query, body, context)
    }

    /// Body value first, then query value. Empty values count as absent.
    fn raw(&self, name: &str) -> Option<&str> {
        first(&self.body, name).or_else(|| first(&self.query, name))
    }

    fn values(&self, name: &str) -> Vec<String> {
        let body = all(&self.body, name);
        if body.is_empty() {
            all(&self.query, name)
        } else {
            body
        }
    }
}

fn is_json(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

async fn read_body(req: Request<Body>) -> Option<Bytes> {
    match axum::body::to_bytes(req.into_body(), BODY_LIMIT).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::debug!(error = %e, "failed to read request body");
            None
        }
    }
}

async fn multipart_pairs(req: Request<Body>) -> Vec<(String, String)> {
    let mut multipart = match Multipart::from_request(req, &()).await {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring malformed multipart body");
            return Vec::new();
        }
    };

    let mut pairs = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "stopped reading multipart body");
                break;
            }
        };
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match field.text().await {
            Ok(text) => pairs.push((name, text)),
            Err(e) => tracing::debug!(error = %e, field = %name, "skipping unreadable multipart field"),
        }
    }
    pairs
}

/// Flatten the top level of a JSON object into key/value pairs.
///
/// Strings are taken as-is, numbers and bools in their JSON spelling, and
/// arrays contribute one pair per scalar element. Nested objects keep their
/// JSON text. `null` counts as absent.
fn json_pairs(raw: &[u8]) -> Vec<(String, String)> {
    let object = match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(object)) => object,
        Ok(_) => {
            tracing::debug!("ignoring JSON body that is not an object");
            return Vec::new();
        }
        Err(e) => {
            tracing::debug!(error = %e, "ignoring malformed JSON body");
            return Vec::new();
        }
    };

    let mut pairs = Vec::new();
    for (key, value) in object {
        match value {
            Value::Array(items) => pairs.extend(
                items
                    .iter()
                    .filter_map(json_scalar)
                    .map(|v| (key.clone(), v)),
            ),
            other => {
                if let Some(v) = json_scalar(&other) {
                    pairs.push((key, v));
                }
            }
        }
    }
    pairs
}

fn json_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Array(_) => None,
        Value::Object(_) => Some(value.to_string()),
    }
}

fn parse_pairs(raw: &[u8]) -> Vec<(String, String)> {
    serde_urlencoded::from_bytes(raw).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "ignoring malformed urlencoded data");
        Vec::new()
    })
}

fn first<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}

fn all(pairs: &[(String, String)], name: &str) -> Vec<String> {
    pairs
        .iter()
        .filter(|(k, v)| k == name && !v.is_empty())
        .map(|(_, v)| v.clone())
        .collect()
}

/* ---------------- cli ---------------- */

/// Parsed arguments of a single subcommand run.
#[derive(Debug)]
pub struct CliAction {
    matches: ArgMatches,
    context: Arc<Context>,
}

impl CliAction {
    pub fn new(matches: ArgMatches, context: Arc<Context>) -> Self {
        Self { matches, context }
    }

    pub fn matches(&self) -> &ArgMatches {
        &self.matches
    }

    /// Read the typed value clap stored for `name`.
    ///
    /// When the flag was stored as another type (a `uint` flag read with
    /// `int_value`, or a hand-registered string argument) its raw text is
    /// parsed instead. Unknown names are `Missing`.
    fn param<T>(&self, name: &str) -> Param<T>
    where
        T: FromParam + Clone + Send + Sync + 'static,
    {
        match self.matches.try_get_one::<T>(name) {
            Ok(Some(v)) => Param::Value(v.clone()),
            Ok(None) => Param::Missing,
            Err(_) => {
                let raw = self.raw_values(name).into_iter().next();
                Param::from_raw(raw.filter(|v| !v.is_empty()))
            }
        }
    }

    fn values(&self, name: &str) -> Vec<String> {
        self.raw_values(name)
            .into_iter()
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Command-line text of every occurrence of `name`.
    fn raw_values(&self, name: &str) -> Vec<&str> {
        match self.matches.try_get_raw(name) {
            Ok(Some(raw)) => raw.filter_map(|v| v.to_str()).collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouterConfig;
    use crate::flags::synthesize;
    use crate::params::Schema;
    use crate::tags::Tags;

    #[derive(Debug, Default, PartialEq)]
    struct Query {
        page: isize,
        offset: i64,
        ratio: f64,
        keyword: String,
        tags: Vec<String>,
        timeout: Duration,
        limit: usize,
        id: u64,
        since: Option<DateTime<Utc>>,
        verbose: bool,
        internal: String,
    }

    impl Params for Query {
        fn describe(schema: &mut Schema<Self>) {
            schema
                .field("page", Tags::new().form("page"), Slot::Int(|p| &mut p.page))
                .field("offset", Tags::new().form("offset"), Slot::Int64(|p| &mut p.offset))
                .field("ratio", Tags::new().form("ratio"), Slot::Float64(|p| &mut p.ratio))
                .field("keyword", Tags::new().json("keyword"), Slot::String(|p| &mut p.keyword))
                .field("tags", Tags::new().form("tag"), Slot::StringList(|p| &mut p.tags))
                .field("timeout", Tags::new().form("timeout"), Slot::Duration(|p| &mut p.timeout))
                .field("limit", Tags::new().form("limit"), Slot::Uint(|p| &mut p.limit))
                .field("id", Tags::new().form("id").binding("required"), Slot::Uint64(|p| &mut p.id))
                .field("since", Tags::new().form("since"), Slot::Timestamp(|p| &mut p.since))
                .field("verbose", Tags::new().form("verbose"), Slot::Bool(|p| &mut p.verbose))
                .field("internal", Tags::new(), Slot::String(|p| &mut p.internal));
        }
    }

    fn ctx() -> Arc<Context> {
        Arc::new(Context::new(RouterConfig::default()))
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn http(query: &[(&str, &str)], form: &[(&str, &str)]) -> Action {
        Action::Http(HttpAction::new(pairs(query), pairs(form), ctx()))
    }

    fn cli(args: &[&str]) -> Action {
        let cmd = synthesize::<Query>()
            .iter()
            .fold(clap::Command::new("query"), |cmd, flag| cmd.arg(flag.to_arg()));
        let matches = cmd.try_get_matches_from(args).unwrap();
        Action::Cli(CliAction::new(matches, ctx()))
    }

    #[test]
    fn http_absent_values_are_zero() {
        let action = http(&[], &[]);
        assert_eq!(action.string_value("nope"), "");
        assert_eq!(action.int_value("nope"), 0);
        assert!(!action.bool_value("nope"));
        assert_eq!(action.uint64_value("nope"), 0);
        assert_eq!(action.float64_value("nope"), 0.0);
        assert!(action.time_value("nope").is_none());
    }

    #[test]
    fn http_form_wins_over_query() {
        let action = http(&[("page", "1"), ("q", "from-query")], &[("page", "2"), ("q", "")]);
        assert_eq!(action.int_value("page"), 2);
        assert_eq!(action.string_value("q"), "from-query");
    }

    #[test]
    fn http_malformed_values_are_zero_but_distinguishable() {
        let action = http(&[("page", "two"), ("on", "yes")], &[]);
        assert_eq!(action.int_value("page"), 0);
        assert!(!action.bool_value("on"));
        assert!(action.param::<isize>("page").is_malformed());
        assert!(action.param::<isize>("other").is_missing());
    }

    #[test]
    fn http_time_is_unix_seconds() {
        let action = http(&[("at", "1700000000")], &[]);
        assert_eq!(action.time_value("at").unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn http_bind_fills_every_supported_kind() {
        let action = http(
            &[
                ("page", "3"),
                ("offset", "-9"),
                ("ratio", "0.5"),
                ("keyword", "rust"),
                ("tag", "a"),
                ("tag", "b"),
                ("timeout", "1m"),
                ("limit", "10"),
                ("id", "42"),
                ("since", "1700000000"),
                ("verbose", "true"),
                ("internal", "ignored"),
            ],
            &[],
        );
        let mut q = Query::default();
        action.bind_into(&mut q).unwrap();

        assert_eq!(q.page, 3);
        assert_eq!(q.offset, -9);
        assert_eq!(q.ratio, 0.5);
        assert_eq!(q.keyword, "rust");
        assert_eq!(q.tags, vec!["a", "b"]);
        assert_eq!(q.timeout, Duration::from_secs(60));
        assert_eq!(q.limit, 10);
        assert_eq!(q.id, 42);
        assert_eq!(q.since.unwrap().timestamp(), 1_700_000_000);
        assert!(q.verbose);
        assert_eq!(q.internal, "");
    }

    #[test]
    fn http_bind_enforces_required() {
        let mut q = Query::default();
        let err = http(&[("page", "1")], &[]).bind_into(&mut q).unwrap_err();
        assert_eq!(
            err,
            BindError::MissingField {
                field: "id".to_string()
            }
        );
    }

    #[test]
    fn http_bind_rejects_malformed() {
        let mut q = Query::default();
        let err = http(&[("id", "1"), ("limit", "-1")], &[])
            .bind_into(&mut q)
            .unwrap_err();
        assert_eq!(
            err,
            BindError::InvalidValue {
                field: "limit".to_string(),
                value: "-1".to_string(),
                expected: "uint",
            }
        );
    }

    #[test]
    fn cli_getters_read_typed_flags() {
        let action = cli(&["query", "--id", "5", "--page", "-2", "--verbose", "--keyword", "k"]);
        assert_eq!(action.kind(), ActionKind::Cli);
        assert_eq!(action.uint64_value("id"), 5);
        assert_eq!(action.int_value("page"), -2);
        assert!(action.bool_value("verbose"));
        assert_eq!(action.string_value("keyword"), "k");
        assert_eq!(action.string_value("unknown"), "");
        assert_eq!(action.int64_value("offset"), 0);
    }

    #[test]
    fn cli_bind_round_trips_scalars() {
        let action = cli(&[
            "query",
            "--page",
            "7",
            "--offset",
            "-70",
            "--ratio",
            "2.25",
            "--keyword",
            "hello world",
            "--tag",
            "x",
            "--timeout",
            "250ms",
            "--limit",
            "8",
            "--id",
            "18446744073709551615",
            "--since",
            "2024-01-02T03:04:05Z",
            "--verbose",
        ]);
        let mut q = Query::default();
        action.bind_into(&mut q).unwrap();

        assert_eq!(q.page, 7);
        assert_eq!(q.offset, -70);
        assert_eq!(q.ratio, 2.25);
        assert_eq!(q.keyword, "hello world");
        assert_eq!(q.tags, vec!["x"]);
        assert_eq!(q.timeout, Duration::from_millis(250));
        assert_eq!(q.limit, 8);
        assert_eq!(q.id, u64::MAX);
        assert_eq!(q.since.unwrap().timestamp(), 1_704_164_645);
        assert!(q.verbose);
    }

    #[test]
    fn cli_bind_leaves_absent_flags_at_zero() {
        let mut q = Query::default();
        cli(&["query", "--id", "1"]).bind_into(&mut q).unwrap();
        assert_eq!(
            q,
            Query {
                id: 1,
                ..Query::default()
            }
        );
    }

    #[test]
    fn cli_parses_hand_registered_string_args() {
        let matches = clap::Command::new("raw")
            .arg(clap::Arg::new("count").long("count"))
            .try_get_matches_from(["raw", "--count", "12"])
            .unwrap();
        let action = Action::Cli(CliAction::new(matches, ctx()));
        assert_eq!(action.int_value("count"), 12);
        assert_eq!(action.string_value("count"), "12");
    }

    async fn from_body(content_type: &str, body: &str) -> Action {
        let req = Request::builder()
            .method("POST")
            .uri("/x?page=1&keyword=from-query")
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body.to_string()))
            .unwrap();
        Action::Http(HttpAction::from_request(req, ctx()).await)
    }

    #[tokio::test]
    async fn http_json_body_binds_top_level_members() {
        let action = from_body(
            "application/json; charset=utf-8",
            r#"{"id": 42, "ratio": 0.5, "verbose": true, "tag": ["a", "b"], "keyword": "rust", "since": null}"#,
        )
        .await;

        let mut q = Query::default();
        action.bind_into(&mut q).unwrap();
        assert_eq!(q.id, 42);
        assert_eq!(q.page, 1);
        assert_eq!(q.ratio, 0.5);
        assert!(q.verbose);
        assert_eq!(q.tags, vec!["a", "b"]);
        assert_eq!(q.keyword, "rust");
        assert!(q.since.is_none());
    }

    #[tokio::test]
    async fn http_json_body_that_is_not_an_object_is_ignored() {
        let action = from_body("application/json", "[1, 2, 3]").await;
        assert_eq!(action.int_value("page"), 1);
        assert_eq!(action.string_value("keyword"), "from-query");
        assert!(from_body("application/json", "{broken").await.param::<u64>("id").is_missing());
    }

    #[tokio::test]
    async fn http_multipart_text_parts_are_read() {
        let body = concat!(
            "--XB\r\n",
            "Content-Disposition: form-data; name=\"keyword\"\r\n\r\n",
            "from-body\r\n",
            "--XB\r\n",
            "Content-Disposition: form-data; name=\"id\"; filename=\"id.txt\"\r\n",
            "Content-Type: text/plain\r\n\r\n",
            "7\r\n",
            "--XB--\r\n",
        );
        let action = from_body("multipart/form-data; boundary=XB", body).await;
        assert_eq!(action.string_value("keyword"), "from-body");
        assert_eq!(action.int_value("page"), 1);
        assert!(action.param::<u64>("id").is_missing());
    }

    #[tokio::test]
    async fn http_unknown_content_type_uses_query_only() {
        let action = from_body("text/plain", "keyword=body").await;
        assert_eq!(action.string_value("keyword"), "from-query");
    }

    #[test]
    fn cli_numeric_getters_read_any_numeric_flag() {
        let action = cli(&["query", "--id", "9", "--limit", "2", "--page", "-4"]);

        assert_eq!(action.int_value("limit"), 2);
        assert_eq!(action.int64_value("limit"), 2);
        assert_eq!(action.uint_value("limit"), 2);
        assert_eq!(action.uint64_value("limit"), 2);
        assert_eq!(action.float64_value("limit"), 2.0);
        assert_eq!(action.string_value("limit"), "2");

        assert_eq!(action.int_value("id"), 9);
        assert_eq!(action.int64_value("page"), -4);
        assert_eq!(action.float64_value("page"), -4.0);
        assert_eq!(action.uint_value("page"), 0);
        assert!(action.param::<usize>("page").is_malformed());
    }
}
