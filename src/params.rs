// src/params.rs

//! Parameter schemas.
//!
//! A parameter struct describes its own fields instead of being inspected
//! at runtime. The schema is the single source for:
//! - CLI flag synthesis (`flags`)
//! - binding request / command values into the struct (`action`)
//!
//! ```
//! use acroute::params::{Params, Schema, Slot};
//! use acroute::tags::Tags;
//!
//! #[derive(Debug, Default)]
//! struct ListItems {
//!     page: isize,
//!     keyword: String,
//! }
//!
//! impl Params for ListItems {
//!     fn describe(schema: &mut Schema<Self>) {
//!         schema
//!             .field("page", Tags::new().form("page").description("page number"), Slot::Int(|p| &mut p.page))
//!             .field("keyword", Tags::new().json("keyword"), Slot::String(|p| &mut p.keyword));
//!     }
//! }
//!
//! assert_eq!(ListItems::schema().len(), 2);
//! ```

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::tags::Tags;

/// Projection from a parameter struct to one of its fields.
pub type Accessor<P, T> = fn(&mut P) -> &mut T;

/// Declared type of a field together with its accessor.
pub enum Slot<P> {
    Bool(Accessor<P, bool>),
    Int(Accessor<P, isize>),
    Int64(Accessor<P, i64>),
    Float64(Accessor<P, f64>),
    String(Accessor<P, String>),
    StringList(Accessor<P, Vec<String>>),
    Duration(Accessor<P, Duration>),
    Uint(Accessor<P, usize>),
    Uint64(Accessor<P, u64>),
    Timestamp(Accessor<P, Option<DateTime<Utc>>>),
    /// A field whose type has no flag kind; carries the declared type name.
    Unsupported(&'static str),
}

impl<P> Clone for Slot<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for Slot<P> {}

/// One described field.
pub struct Field<P> {
    pub name: &'static str,
    pub tags: Tags,
    pub slot: Slot<P>,
}

impl<P> Field<P> {
    pub fn alias(&self) -> &'static str {
        self.tags.alias()
    }
}

/// Ordered field descriptions of a parameter struct.
pub struct Schema<P> {
    fields: Vec<Field<P>>,
}

impl<P> Default for Schema<P> {
    fn default() -> Self {
        Self { fields: Vec::new() }
    }
}

impl<P> Schema<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(&mut self, name: &'static str, tags: Tags, slot: Slot<P>) -> &mut Self {
        self.fields.push(Field { name, tags, slot });
        self
    }

    pub fn fields(&self) -> &[Field<P>] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A struct that can be filled from HTTP values or CLI flags.
///
/// `Default` provides the zero value every unbound field keeps.
pub trait Params: Default + Sized {
    /// Push one entry per field, in declaration order.
    fn describe(schema: &mut Schema<Self>);

    fn schema() -> Schema<Self> {
        let mut schema = Schema::new();
        Self::describe(&mut schema);
        schema
    }
}

/// Routes without parameters.
impl Params for () {
    fn describe(_: &mut Schema<Self>) {}
}

/// A top-level sequence has no flags and binds nothing.
impl<P: Params> Params for Vec<P> {
    fn describe(_: &mut Schema<Self>) {}
}
