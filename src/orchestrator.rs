// src/orchestrator.rs
//
// Cache first, source second, write back what the source found.
//
//   START -> CACHE_LOOKUP -> HIT  ----------------------------> RESPOND (cache)
//                         -> MISS -> SOURCE_FETCH -> FETCH_OK  -> MERGE -> RESPOND (scraped | scraped+cache)
//                                                 -> FETCH_FAIL -> RESPOND (cache, if any row) | error
//
// Holds no state between requests; consistency is the store's job.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::attributes::requested_columns;
use crate::config::consts::UNKNOWN;
use crate::error::{Error, Result};
use crate::extract::DescriptorExtractor;
use crate::key::{normalize, VehicleKey};
use crate::row::Row;
use crate::source::{to_fields, PartsSource};
use crate::store::TableStore;
use crate::value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Provenance {
    #[serde(rename = "cache")]
    Cache,
    #[serde(rename = "scraped")]
    Scraped,
    #[serde(rename = "scraped+cache")]
    ScrapedAndCache,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Cache           => "cache",
            Provenance::Scraped         => "scraped",
            Provenance::ScrapedAndCache => "scraped+cache",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the answer made it to disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    /// Nothing new to write (cache answer, stale fallback, empty source result).
    NotNeeded,
    /// Merged row is on disk.
    Persisted,
    /// Merge computed in memory but the write failed; the reason is attached.
    NotPersisted(String),
}

impl Durability {
    pub fn is_durable(&self) -> bool { !matches!(self, Durability::NotPersisted(_)) }
}

/// Result of one request before it is shaped for the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub descriptor: String,
    pub provenance: Provenance,
    pub durability: Durability,
    /// Requested attribute columns, in request order.
    pub requested: Vec<String>,
    pub row: Row,
}

impl Outcome {
    pub fn key(&self) -> &VehicleKey { &self.row.key }

    /// Requested values as lists; an empty stored value reads as `["unknown"]`.
    pub fn values(&self) -> BTreeMap<String, Vec<String>> {
        self.requested
            .iter()
            .map(|col| {
                let mut vals = value::split(self.row.get(col).unwrap_or(""));
                if vals.is_empty() { vals.push(s!(UNKNOWN)); }
                (col.clone(), vals)
            })
            .collect()
    }

    pub fn response(&self) -> Response {
        Response {
            descriptor: self.descriptor.clone(),
            key: self.row.key.clone(),
            provenance: self.provenance,
            durability: self.durability.clone(),
            values: self.values(),
        }
    }
}

/// JSON shape handed back across the request boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Response {
    pub descriptor: String,
    pub key: VehicleKey,
    pub provenance: Provenance,
    pub durability: Durability,
    pub values: BTreeMap<String, Vec<String>>,
}

pub struct Orchestrator<S> {
    store: TableStore,
    source: S,
}

impl<S: PartsSource> Orchestrator<S> {
    pub fn new(store: TableStore, source: S) -> Self {
        Self { store, source }
    }

    pub fn store(&self) -> &TableStore { &self.store }
    pub fn source(&self) -> &S { &self.source }

    /// Answer `requested` attributes (all known ones when empty) for `descriptor`.
    pub fn resolve<R: AsRef<str>>(&self, descriptor: &str, requested: &[R]) -> Result<Outcome> {
        let key = normalize(descriptor);
        let columns = requested_columns(requested);
        let outcome = |provenance, durability, row| Outcome {
            descriptor: s!(descriptor),
            provenance,
            durability,
            requested: columns.clone(),
            row,
        };

        // CACHE_LOOKUP
        let prior = match self.store.lookup(&key) {
            Ok(found) => found,
            Err(e) => {
                warn!(key = %key, error = %e, "cache read failed; treating as miss");
                None
            }
        };
        if let Some(row) = &prior {
            if row.covers(columns.iter().map(String::as_str)) {
                debug!(key = %key, "cache hit");
                return Ok(outcome(Provenance::Cache, Durability::NotNeeded, row.clone()));
            }
            debug!(key = %key, "partial cache row; fetching");
        } else {
            debug!(key = %key, "cache miss; fetching");
        }

        // SOURCE_FETCH
        let output = match self.source.scrape(descriptor, &columns) {
            Ok(out) => out,
            Err(e) => match prior {
                Some(row) => {
                    warn!(key = %key, error = %e, "source failed; answering from stale cache");
                    return Ok(outcome(Provenance::Cache, Durability::NotNeeded, row));
                }
                None => {
                    warn!(key = %key, error = %e, "source failed with nothing cached");
                    return Err(Error::Scrape(e));
                }
            },
        };

        // MERGE
        let provenance = if prior.is_some() { Provenance::ScrapedAndCache } else { Provenance::Scraped };
        let fields = to_fields(&output);
        if fields.is_empty() {
            info!(key = %key, "source returned nothing usable; nothing to store");
            let row = prior.unwrap_or_else(|| Row::new(key.clone()));
            return Ok(outcome(provenance, Durability::NotNeeded, row));
        }

        match self.store.upsert(&key, &fields) {
            Ok(row) => {
                info!(key = %key, %provenance, columns = fields.len(), "merged source result");
                Ok(outcome(provenance, Durability::Persisted, row))
            }
            Err(e) => {
                warn!(key = %key, error = %e, "merge not persisted");
                let mut row = prior.unwrap_or_else(|| Row::new(key.clone()));
                row.merge(&fields);
                Ok(outcome(provenance, Durability::NotPersisted(e.to_string()), row))
            }
        }
    }

    /// Extract the descriptor from a repair-order image, then [`Orchestrator::resolve`].
    pub fn resolve_image<E, R>(&self, extractor: &E, image: &[u8], requested: &[R]) -> Result<Outcome>
    where
        E: DescriptorExtractor + ?Sized,
        R: AsRef<str>,
    {
        let descriptor = extractor.extract(image)?;
        info!(descriptor = %descriptor, "descriptor extracted");
        self.resolve(&descriptor, requested)
    }
}
