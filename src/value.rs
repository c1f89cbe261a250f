// src/value.rs

//! Text to typed value conversion shared by both invocation paths.
//!
//! Getters on an action are best effort: a missing or unparsable value
//! collapses to the type's zero value. `Param` keeps the three outcomes
//! apart for callers that need to tell "not given" from "given wrong".

use chrono::{DateTime, TimeZone, Utc};
use std::time::Duration;

/// Outcome of looking up a single named parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param<T> {
    Missing,
    Malformed(String),
    Value(T),
}

impl<T> Param<T> {
    pub fn from_raw(raw: Option<&str>) -> Self
    where
        T: FromParam,
    {
        match raw {
            None => Param::Missing,
            Some(raw) => match T::from_param(raw) {
                Some(v) => Param::Value(v),
                None => Param::Malformed(raw.to_string()),
            },
        }
    }

    pub fn value(self) -> Option<T> {
        match self {
            Param::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Param::Missing)
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Param::Malformed(_))
    }

    pub fn unwrap_or_default(self) -> T
    where
        T: Default,
    {
        self.value().unwrap_or_default()
    }
}

/// Types that can be parsed out of a single parameter string.
pub trait FromParam: Sized {
    /// Human readable name used in bind errors.
    const EXPECTED: &'static str;

    fn from_param(raw: &str) -> Option<Self>;
}

macro_rules! from_str_param {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl FromParam for $ty {
                const EXPECTED: &'static str = $name;

                fn from_param(raw: &str) -> Option<Self> {
                    raw.trim().parse().ok()
                }
            }
        )*
    };
}

from_str_param! {
    isize => "int",
    i64 => "int64",
    usize => "uint",
    u64 => "uint64",
    f64 => "float64",
}

impl FromParam for String {
    const EXPECTED: &'static str = "string";

    fn from_param(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl FromParam for bool {
    const EXPECTED: &'static str = "bool";

    fn from_param(raw: &str) -> Option<Self> {
        parse_bool(raw)
    }
}

impl FromParam for Duration {
    const EXPECTED: &'static str = "duration";

    fn from_param(raw: &str) -> Option<Self> {
        parse_duration(raw).ok()
    }
}

impl FromParam for DateTime<Utc> {
    const EXPECTED: &'static str = "timestamp";

    fn from_param(raw: &str) -> Option<Self> {
        parse_timestamp(raw).ok()
    }
}

/* ---------------- parsers ---------------- */

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Parse a duration such as `1h30m`, `250ms` or `1.5s`.
///
/// Every number needs a unit; `0` is the only exception.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let s = raw.trim();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return Err(format!("invalid duration {:?}", raw));
        }
        let amount: f64 = rest[..num_len]
            .parse()
            .map_err(|_| format!("invalid duration {:?}", raw))?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "" => return Err(format!("missing unit in duration {:?}", raw)),
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            unit => return Err(format!("unknown unit {:?} in duration {:?}", unit, raw)),
        };
        total += amount * nanos_per_unit;
        rest = &rest[unit_len..];
    }

    Ok(Duration::from_nanos(total as u64))
}

/// Parse an RFC 3339 timestamp or integer Unix seconds.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let secs: i64 = s
        .parse()
        .map_err(|_| format!("invalid timestamp {:?}", raw))?;
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| format!("timestamp out of range: {}", secs))
}
