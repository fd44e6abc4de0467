// tests/orchestrator.rs
//
// Cache-then-source flow with a counting stub in place of the scraper.
//
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use ro_parts::source::{PartsSource, SourceOutput};
use ro_parts::value::SourceValue;
use ro_parts::{
    normalize, Attribute, Durability, Error, ExtractionError, Fields, Orchestrator, Provenance,
    ScrapeError, TableStore,
};
use tempfile::{tempdir, TempDir};

enum Reply {
    Found(Vec<(&'static str, SourceValue)>),
    Fail,
}

struct Stub {
    reply: Reply,
    calls: AtomicUsize,
    last_request: Mutex<Vec<String>>,
}

impl Stub {
    fn new(reply: Reply) -> Self {
        Self { reply, calls: AtomicUsize::new(0), last_request: Mutex::new(Vec::new()) }
    }
    fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl PartsSource for Stub {
    fn scrape(&self, _descriptor: &str, requested: &[String]) -> Result<SourceOutput, ScrapeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = requested.to_vec();
        match &self.reply {
            Reply::Found(pairs) => Ok(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()),
            Reply::Fail => Err(ScrapeError::Unavailable("catalogue timed out".into())),
        }
    }
}

fn fields(pairs: &[(&str, &str)]) -> Fields {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn full_row() -> Fields {
    fields(&[
        ("Oil Filters", "WIX: 57356; FRAM: PH7317"),
        ("Oil Types", "0w-20"),
        ("Engine Air Filters", "WIX: 49013"),
        ("Cabin Air Filters", "WIX: 24483"),
        ("Oil Capacity", "5.6 quarts"),
    ])
}

fn setup(reply: Reply) -> (TempDir, Orchestrator<Stub>) {
    let dir = tempdir().unwrap();
    let store = TableStore::new(dir.path().join("results.csv"));
    (dir, Orchestrator::new(store, Stub::new(reply)))
}

const ODYSSEY: &str = "2020 Honda Odyssey 3.5L V6";
const ALL: [&str; 0] = [];

#[test]
fn full_cached_row_short_circuits() {
    let (_dir, orch) = setup(Reply::Fail);
    orch.store().upsert(&normalize(ODYSSEY), &full_row()).unwrap();

    let out = orch.resolve("2020honda Odyssey   3.5L v6", &ALL).unwrap();
    assert_eq!(out.provenance, Provenance::Cache);
    assert_eq!(out.durability, Durability::NotNeeded);
    assert_eq!(orch.source().calls(), 0);
    assert_eq!(out.values()["Oil Filters"], vec!["WIX: 57356", "FRAM: PH7317"]);
}

#[test]
fn miss_scrapes_once_and_persists() {
    let (_dir, orch) = setup(Reply::Found(vec![
        ("oil_filters", SourceValue::from(vec!["WIX: 57356", "FRAM: PH7317"])),
        ("oil_capacity", SourceValue::from("5.6 quarts")),
    ]));

    let out = orch.resolve(ODYSSEY, &["Oil Filters", "Oil Capacity"]).unwrap();
    assert_eq!(out.provenance, Provenance::Scraped);
    assert_eq!(out.durability, Durability::Persisted);
    assert_eq!(orch.source().calls(), 1);
    assert_eq!(*orch.source().last_request.lock().unwrap(), vec!["Oil Filters", "Oil Capacity"]);

    let stored = orch.store().lookup(&normalize(ODYSSEY)).unwrap().unwrap();
    assert_eq!(stored.get("Oil Filters"), Some("WIX: 57356; FRAM: PH7317"));
    assert_eq!(stored.get("Oil Capacity"), Some("5.6 quarts"));

    // Now answered from the cache.
    let again = orch.resolve(ODYSSEY, &["Oil Filters", "Oil Capacity"]).unwrap();
    assert_eq!(again.provenance, Provenance::Cache);
    assert_eq!(orch.source().calls(), 1);
}

#[test]
fn partial_row_is_topped_up_without_erasing() {
    let (_dir, orch) = setup(Reply::Found(vec![
        ("oil_types", SourceValue::from(vec!["0w-20", "5w-20"])),
        ("oil_filters", SourceValue::from("N/A")),
        ("cabin_air_filters", SourceValue::Missing),
    ]));
    orch.store().upsert(&normalize(ODYSSEY), &fields(&[("Oil Filters", "WIX: 57356")])).unwrap();

    let out = orch.resolve(ODYSSEY, &["Oil Filters", "Oil Types"]).unwrap();
    assert_eq!(out.provenance, Provenance::ScrapedAndCache);
    assert_eq!(out.durability, Durability::Persisted);
    assert_eq!(out.row.get("Oil Filters"), Some("WIX: 57356"));
    assert_eq!(out.row.get("Oil Types"), Some("0w-20; 5w-20"));

    let table = orch.store().load().unwrap();
    assert!(!table.header().iter().any(|h| h == "Cabin Air Filters"), "unanswered column must not be written");
}

#[test]
fn stale_row_beats_failed_source() {
    let (_dir, orch) = setup(Reply::Fail);
    orch.store().upsert(&normalize(ODYSSEY), &fields(&[("Oil Capacity", "5.6 quarts")])).unwrap();

    let out = orch.resolve(ODYSSEY, &ALL).unwrap();
    assert_eq!(out.provenance, Provenance::Cache);
    assert_eq!(orch.source().calls(), 1);
    let values = out.values();
    assert_eq!(values["Oil Capacity"], vec!["5.6 quarts"]);
    assert_eq!(values["Oil Filters"], vec!["unknown"]);
}

#[test]
fn failed_source_with_empty_cache_is_an_error() {
    let (_dir, orch) = setup(Reply::Fail);
    let err = orch.resolve(ODYSSEY, &ALL).unwrap_err();
    assert!(matches!(err, Error::Scrape(ScrapeError::Unavailable(_))), "{err}");
    assert!(!orch.store().path().exists());
}

#[test]
fn unreadable_table_counts_as_miss() {
    let (_dir, orch) = setup(Reply::Found(vec![("oil_types", SourceValue::from("0w-20"))]));
    fs::write(orch.store().path(), "Make,Model\nHonda,Odyssey\n").unwrap();

    let out = orch.resolve(ODYSSEY, &["Oil Types"]).unwrap();
    assert_eq!(orch.source().calls(), 1);
    assert_eq!(out.provenance, Provenance::Scraped);
    // The table cannot be merged into without losing data, so nothing was written.
    assert!(matches!(out.durability, Durability::NotPersisted(_)));
    assert!(!out.durability.is_durable());
    assert_eq!(out.row.get("Oil Types"), Some("0w-20"));
    assert_eq!(fs::read_to_string(orch.store().path()).unwrap(), "Make,Model\nHonda,Odyssey\n");
}

#[test]
fn write_failure_is_surfaced_as_not_persisted() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("not_a_dir");
    fs::write(&blocker, "").unwrap();
    let store = TableStore::new(blocker.join("results.csv"));
    let orch = Orchestrator::new(store, Stub::new(Reply::Found(vec![("oil_capacity", SourceValue::from("4.4 quarts"))])));

    let out = orch.resolve("2016 Mazda 3 2.0L L4", &["Oil Capacity"]).unwrap();
    assert_eq!(out.provenance, Provenance::Scraped);
    assert!(matches!(out.durability, Durability::NotPersisted(_)));
    assert_eq!(out.values()["Oil Capacity"], vec!["4.4 quarts"]);
}

#[test]
fn empty_source_result_writes_nothing() {
    let (_dir, orch) = setup(Reply::Found(vec![("oil_types", SourceValue::Missing)]));
    let out = orch.resolve(ODYSSEY, &["Oil Types"]).unwrap();
    assert_eq!(out.provenance, Provenance::Scraped);
    assert_eq!(out.durability, Durability::NotNeeded);
    assert_eq!(out.values()["Oil Types"], vec!["unknown"]);
    assert!(!orch.store().path().exists());
}

#[test]
fn response_json_shape() {
    let (_dir, orch) = setup(Reply::Found(vec![("oil_capacity", SourceValue::from("5.6 quarts"))]));
    let out = orch.resolve(ODYSSEY, &[Attribute::OilCapacity.column()]).unwrap();
    let json = serde_json::to_value(out.response()).unwrap();

    assert_eq!(json["descriptor"], ODYSSEY);
    assert_eq!(json["key"], "2020hondaodyssey3.5lv6");
    assert_eq!(json["provenance"], "scraped");
    assert_eq!(json["durability"], "persisted");
    assert_eq!(json["values"]["Oil Capacity"], serde_json::json!(["5.6 quarts"]));
}

#[test]
fn image_requests_go_through_the_extractor() {
    let (_dir, orch) = setup(Reply::Fail);
    orch.store().upsert(&normalize(ODYSSEY), &full_row()).unwrap();

    let extractor = |_: &[u8]| -> Result<String, ExtractionError> {
        ro_parts::extract::parse_reply(
            r#"```json
{"year": "2020", "make": "Honda", "model": "Odyssey", "engine": "3.5L V6"}
```"#,
        )
    };
    let out = orch.resolve_image(&extractor, b"\xff\xd8jpeg", &ALL).unwrap();
    assert_eq!(out.provenance, Provenance::Cache);
    assert_eq!(out.descriptor, ODYSSEY);

    let blind = |_: &[u8]| -> Result<String, ExtractionError> {
        Err(ExtractionError::Unparseable("blurry".into()))
    };
    let err = orch.resolve_image(&blind, b"", &ALL).unwrap_err();
    assert!(matches!(err, Error::Extraction(_)));
    assert_eq!(orch.source().calls(), 0);
}

#[test]
fn key_column_from_source_never_becomes_a_column() {
    let (_dir, orch) = setup(Reply::Found(vec![
        ("car", SourceValue::from("x")),
        ("oil_capacity", SourceValue::from("4 qt")),
    ]));

    let out = orch.resolve(ODYSSEY, &["Oil Capacity"]).unwrap();
    assert_eq!(out.durability, Durability::Persisted);
    assert_eq!(out.row.fields, fields(&[("Oil Capacity", "4 qt")]));

    let text = fs::read_to_string(orch.store().path()).unwrap();
    assert_eq!(text, "Car,Oil Capacity\n2020hondaodyssey3.5lv6,4 qt\n");
}
