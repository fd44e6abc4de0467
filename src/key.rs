// src/key.rs
//
// Vehicle descriptor -> canonical lookup key.
//
// "2020 Honda Odyssey 3.5L V6" and "2020honda  odyssey 3.5l v6" are the same
// vehicle: trim, lowercase, then drop every whitespace character.

use std::fmt;

use serde::Serialize;

/// Canonical row key. Only constructible through [`normalize`], so holding one
/// means the string is already in normal form.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct VehicleKey(String);

impl VehicleKey {
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn into_string(self) -> String { self.0 }
}

impl fmt::Display for VehicleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VehicleKey {
    fn as_ref(&self) -> &str { &self.0 }
}

impl From<&str> for VehicleKey {
    fn from(raw: &str) -> Self { normalize(raw) }
}

impl From<String> for VehicleKey {
    fn from(raw: String) -> Self { normalize(&raw) }
}

/// Pure and idempotent; never fails. Empty input gives the empty key.
pub fn normalize(raw: &str) -> VehicleKey {
    VehicleKey(
        raw.trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect(),
    )
}
