// src/lib.rs
//! Vehicle parts lookup for repair orders.
//!
//! Descriptor in, oil filters / oil types / air filters / oil capacity out:
//! answered from a flat CSV cache when it can be, from an external scraper
//! when it can't, with whatever the scraper finds merged back into the cache.
//!
//! ```text
//! image --extract--> descriptor --key::normalize--> VehicleKey
//!                                        |
//!            store::TableStore::lookup <-+-> source::PartsSource::scrape
//!                                        |
//!                      store::TableStore::upsert (merge + atomic replace)
//! ```

#[macro_use]
pub mod macros;

pub mod attributes;
pub mod config;
pub mod error;
pub mod extract;
pub mod key;
pub mod log;
pub mod orchestrator;
pub mod row;
pub mod source;
pub mod store;
pub mod table;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use attributes::Attribute;
pub use error::{Error, ExtractionError, Result, ScrapeError, StoreError};
pub use key::{normalize, VehicleKey};
pub use orchestrator::{Durability, Orchestrator, Outcome, Provenance, Response};
pub use row::{Fields, Row};
pub use store::TableStore;
