// src/value.rs
//
// One place that decides what an attribute value looks like.
//
// Sources hand us a string, a newline- or "; "-joined string, a list, or
// nothing at all. The table only ever stores a single "; "-joined string, and
// the response only ever carries a list. Every boundary goes through here.

use serde::{Deserialize, Serialize};

use crate::config::consts::{NOT_APPLICABLE, VALUE_SEP};

/// Raw value shape as produced by an external source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceValue {
    List(Vec<String>),
    Text(String),
    Missing,
}

impl SourceValue {
    /// `None` when the source did not actually address the attribute
    /// (`null`, or the scraper's `N/A` placeholder). Anything else,
    /// including an empty list, is a real answer.
    pub fn flatten(&self) -> Option<String> {
        match self {
            SourceValue::Missing => None,
            SourceValue::Text(t) if t.trim().eq_ignore_ascii_case(NOT_APPLICABLE) => None,
            SourceValue::Text(t) => Some(flatten_text(t)),
            SourceValue::List(items) => Some(join_entries(items.iter().map(String::as_str))),
        }
    }
}

impl From<&str> for SourceValue {
    fn from(s: &str) -> Self { SourceValue::Text(s!(s)) }
}

impl From<String> for SourceValue {
    fn from(s: String) -> Self { SourceValue::Text(s) }
}

impl From<Vec<String>> for SourceValue {
    fn from(v: Vec<String>) -> Self { SourceValue::List(v) }
}

impl From<Vec<&str>> for SourceValue {
    fn from(v: Vec<&str>) -> Self { SourceValue::List(v.into_iter().map(String::from).collect()) }
}

/// Normalize a free-form string into the stored representation.
pub fn flatten_text(text: &str) -> String {
    join_entries(text.split(['\n', '\r']).flat_map(|line| line.split(VALUE_SEP.trim_end())))
}

/// Split a stored value into its entries. Empty stored value => no entries.
pub fn split(stored: &str) -> Vec<String> {
    stored
        .split(VALUE_SEP)
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(String::from)
        .collect()
}

fn join_entries<'a>(entries: impl Iterator<Item = &'a str>) -> String {
    let mut out = s!();
    for e in entries.map(str::trim).filter(|e| !e.is_empty()) {
        if !out.is_empty() { out.push_str(VALUE_SEP); }
        out.push_str(e);
    }
    out
}
