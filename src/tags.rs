// src/tags.rs

//! Field tags.
//!
//! Every field of a parameter struct carries a small set of optional tags:
//! - `form` / `json`: the external name (HTTP field name and CLI flag name)
//! - `description`: help text for the CLI flag
//! - `binding`: validation markers, only `required` is understood
//!
//! Malformed or missing tags never fail; they degrade to an empty alias,
//! an empty description or "not required".

/// Tags attached to a single parameter field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tags {
    pub form: Option<&'static str>,
    pub json: Option<&'static str>,
    pub description: Option<&'static str>,
    pub binding: Option<&'static str>,
}

impl Tags {
    pub const fn new() -> Self {
        Self {
            form: None,
            json: None,
            description: None,
            binding: None,
        }
    }

    pub const fn form(mut self, value: &'static str) -> Self {
        self.form = Some(value);
        self
    }

    pub const fn json(mut self, value: &'static str) -> Self {
        self.json = Some(value);
        self
    }

    pub const fn description(mut self, value: &'static str) -> Self {
        self.description = Some(value);
        self
    }

    pub const fn binding(mut self, value: &'static str) -> Self {
        self.binding = Some(value);
        self
    }

    /// External name of the field.
    ///
    /// `form` wins; an absent or empty `form` falls back to `json`.
    /// Returns an empty string when neither is set, which means the field
    /// is neither bound nor exposed as a flag.
    pub fn alias(&self) -> &'static str {
        let tag = match self.form {
            Some(form) if !form.is_empty() => form,
            _ => self.json.unwrap_or(""),
        };
        tag.trim()
    }

    pub fn description_text(&self) -> &'static str {
        self.description.unwrap_or("").trim()
    }

    /// True iff the `binding` tag mentions `required` anywhere.
    pub fn required(&self) -> bool {
        self.binding.is_some_and(|b| b.contains("required"))
    }
}
