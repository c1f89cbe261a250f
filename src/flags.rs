// src/flags.rs

//! CLI flag synthesis from a parameter schema.
//!
//! One flag per field with a non-empty alias, in schema order. The flag
//! kind follows the field's declared type; fields of a type with no flag
//! kind are skipped with a warning.

use clap::{value_parser, Arg, ArgAction};
use serde::Serialize;

use crate::params::{Params, Slot};
use crate::value::{parse_bool, parse_duration, parse_timestamp};

/// CLI-facing type of a synthesized flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    Bool,
    Int,
    Int64,
    Float,
    String,
    StringList,
    Duration,
    Uint,
    Uint64,
    Timestamp,
}

impl FlagKind {
    /// Map a field slot to a flag kind, `None` for unsupported types.
    pub fn of<P>(slot: &Slot<P>) -> Option<Self> {
        let kind = match slot {
            Slot::Bool(_) => FlagKind::Bool,
            Slot::Int(_) => FlagKind::Int,
            Slot::Int64(_) => FlagKind::Int64,
            Slot::Float64(_) => FlagKind::Float,
            Slot::String(_) => FlagKind::String,
            Slot::StringList(_) => FlagKind::StringList,
            Slot::Duration(_) => FlagKind::Duration,
            Slot::Uint(_) => FlagKind::Uint,
            Slot::Uint64(_) => FlagKind::Uint64,
            Slot::Timestamp(_) => FlagKind::Timestamp,
            Slot::Unsupported(_) => return None,
        };
        Some(kind)
    }

    fn value_name(self) -> &'static str {
        match self {
            FlagKind::Bool => "BOOL",
            FlagKind::Int | FlagKind::Int64 => "INT",
            FlagKind::Float => "FLOAT",
            FlagKind::String | FlagKind::StringList => "STRING",
            FlagKind::Duration => "DURATION",
            FlagKind::Uint | FlagKind::Uint64 => "UINT",
            FlagKind::Timestamp => "TIME",
        }
    }
}

/// A synthesized flag definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagSpec {
    pub name: &'static str,
    pub kind: FlagKind,
    pub usage: &'static str,
    pub required: bool,
}

impl FlagSpec {
    /// Build the clap argument for this flag.
    ///
    /// Values are stored with the Rust type of the matching field, so the
    /// CLI action can read them back with `try_get_one::<T>`.
    pub fn to_arg(&self) -> Arg {
        let arg = Arg::new(self.name)
            .long(self.name)
            .help(self.usage)
            .required(self.required);

        match self.kind {
            // `--flag` alone means true; `--flag=false` is accepted too
            FlagKind::Bool => arg
                .action(ArgAction::Set)
                .num_args(0..=1)
                .require_equals(true)
                .default_value("false")
                .default_missing_value("true")
                .value_parser(parse_bool_flag),
            FlagKind::StringList => arg
                .action(ArgAction::Append)
                .value_name(self.kind.value_name())
                .value_parser(value_parser!(String)),
            kind => {
                let arg = arg.action(ArgAction::Set).value_name(kind.value_name());
                match kind {
                    FlagKind::Int => arg
                        .allow_negative_numbers(true)
                        .value_parser(value_parser!(isize)),
                    FlagKind::Int64 => arg
                        .allow_negative_numbers(true)
                        .value_parser(value_parser!(i64)),
                    FlagKind::Float => arg
                        .allow_negative_numbers(true)
                        .value_parser(value_parser!(f64)),
                    FlagKind::Uint => arg.value_parser(value_parser!(usize)),
                    FlagKind::Uint64 => arg.value_parser(value_parser!(u64)),
                    FlagKind::Duration => arg.value_parser(parse_duration),
                    FlagKind::Timestamp => arg.value_parser(parse_timestamp),
                    _ => arg.value_parser(value_parser!(String)),
                }
            }
        }
    }
}

fn parse_bool_flag(raw: &str) -> Result<bool, String> {
    parse_bool(raw).ok_or_else(|| format!("invalid bool {:?}", raw))
}

/// Synthesize the flags for a parameter type.
pub fn synthesize<P: Params>() -> Vec<FlagSpec> {
    let schema = P::schema();
    let mut flags = Vec::with_capacity(schema.len());

    for field in schema.fields() {
        let name = field.alias();
        if name.is_empty() {
            continue;
        }

        let Some(kind) = FlagKind::of(&field.slot) else {
            if let Slot::Unsupported(ty) = field.slot {
                tracing::warn!(
                    params = std::any::type_name::<P>(),
                    field = field.name,
                    declared_type = ty,
                    "field type has no flag kind, skipping"
                );
            }
            continue;
        };

        flags.push(FlagSpec {
            name,
            kind,
            usage: field.tags.description_text(),
            required: field.tags.required(),
        });
    }

    flags
}
