// src/row.rs
//
// One vehicle's attributes. The key lives beside the attribute map, never
// inside it, so nothing downstream has to filter it back out.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::key::VehicleKey;

pub type Fields = BTreeMap<String, String>;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Row {
    pub key: VehicleKey,
    pub fields: Fields,
}

impl Row {
    pub fn new(key: VehicleKey) -> Self {
        Self { key, fields: Fields::new() }
    }

    /// Empty string for every column in `header`, then nothing else.
    pub fn blank(key: VehicleKey, header: &[String]) -> Self {
        let mut row = Self::new(key);
        row.backfill(header);
        row
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// Field-level merge. Columns named in `update` are overwritten (an empty
    /// string included); every other column keeps its current value.
    pub fn merge(&mut self, update: &Fields) {
        for (col, val) in update {
            self.fields.insert(col.clone(), val.clone());
        }
    }

    /// Give every header column a value, leaving existing values alone.
    pub fn backfill(&mut self, header: &[String]) {
        for col in header {
            self.fields.entry(col.clone()).or_default();
        }
    }

    /// True when every listed column holds a non-empty value.
    pub fn covers<'a>(&self, columns: impl IntoIterator<Item = &'a str>) -> bool {
        columns.into_iter().all(|c| self.get(c).is_some_and(|v| !v.is_empty()))
    }
}
