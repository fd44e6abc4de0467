// src/attributes.rs
//
// The attributes a repair order asks about, and how a source's names map onto
// table columns. Columns are plain strings in the table, so attributes not
// listed here still flow through untouched.

use std::fmt;
use std::str::FromStr;

use crate::config::consts::KEY_COLUMN;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attribute {
    OilFilters,
    OilTypes,
    EngineAirFilters,
    CabinAirFilters,
    OilCapacity,
}

impl Attribute {
    pub const ALL: [Attribute; 5] = [
        Attribute::OilFilters,
        Attribute::OilTypes,
        Attribute::EngineAirFilters,
        Attribute::CabinAirFilters,
        Attribute::OilCapacity,
    ];

    /// Table column name.
    pub fn column(self) -> &'static str {
        match self {
            Attribute::OilFilters       => "Oil Filters",
            Attribute::OilTypes         => "Oil Types",
            Attribute::EngineAirFilters => "Engine Air Filters",
            Attribute::CabinAirFilters  => "Cabin Air Filters",
            Attribute::OilCapacity      => "Oil Capacity",
        }
    }

    /// Key used by the scraper's output.
    pub fn source_key(self) -> &'static str {
        match self {
            Attribute::OilFilters       => "oil_filters",
            Attribute::OilTypes         => "oil_types",
            Attribute::EngineAirFilters => "engine_air_filters",
            Attribute::CabinAirFilters  => "cabin_air_filters",
            Attribute::OilCapacity      => "oil_capacity",
        }
    }

    /// Accepts the column name, the source key, or the singular filter-menu
    /// label ("Engine Air Filter"), case-insensitively.
    pub fn lookup(name: &str) -> Option<Attribute> {
        let n = name.trim();
        Self::ALL.into_iter().find(|a| {
            n.eq_ignore_ascii_case(a.column())
                || n.eq_ignore_ascii_case(a.source_key())
                || n.eq_ignore_ascii_case(a.column().trim_end_matches('s'))
        })
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Attribute {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attribute::lookup(s).ok_or_else(|| format!("unknown attribute: {s}"))
    }
}

/// Map any attribute name a source might use onto its table column.
/// Unrecognised names are kept verbatim (trimmed) so new columns can appear.
pub fn column_for(name: &str) -> String {
    match Attribute::lookup(name) {
        Some(a) => s!(a.column()),
        None => s!(name.trim()),
    }
}

/// True for any spelling of the reserved key column. The key is never an
/// attribute, whatever case a source or a user writes it in.
pub fn is_key_column(name: &str) -> bool {
    name.trim().eq_ignore_ascii_case(KEY_COLUMN)
}

/// Requested attribute columns, in request order, without repeats.
/// An empty request means every known attribute.
pub fn requested_columns<S: AsRef<str>>(requested: &[S]) -> Vec<String> {
    if requested.is_empty() {
        return Attribute::ALL.iter().map(|a| s!(a.column())).collect();
    }
    let mut out: Vec<String> = Vec::with_capacity(requested.len());
    for r in requested {
        let col = column_for(r.as_ref());
        if !col.is_empty() && !is_key_column(&col) && !out.contains(&col) {
            out.push(col);
        }
    }
    out
}
