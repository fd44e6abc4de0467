// benches/table.rs
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ro_parts::table::Table;
use ro_parts::{normalize, Fields, TableStore};

const ROWS: usize = 500;

fn row_fields(i: usize) -> Fields {
    [
        ("Oil Filters", format!("WIX: {}; FRAM: PH{}", 51000 + i, 7000 + i)),
        ("Oil Types", "0w-20; 5w-20".to_string()),
        ("Oil Capacity", format!("{}.{} quarts", 4 + i % 3, i % 10)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn populated() -> Table {
    let mut t = Table::new();
    for i in 0..ROWS {
        t.upsert(&normalize(&format!("20{:02} Make{} Model {}", i % 25, i % 17, i)), &row_fields(i));
    }
    t
}

fn bench_table(c: &mut Criterion) {
    let table = populated();
    let csv = table.to_csv_string().expect("serialize table");

    c.bench_function("normalize_descriptor", |b| {
        b.iter(|| normalize(black_box("  2020 Honda Odyssey 3.5L V6  ")))
    });

    c.bench_function("parse_500_rows", |b| {
        b.iter(|| Table::parse(std::path::Path::new("bench.csv"), black_box(csv.as_bytes())).map(|t| t.len()))
    });

    c.bench_function("in_memory_upsert_existing", |b| {
        let mut t = table.clone();
        let key = normalize("2010 Make10 Model 250");
        let update: Fields = [("Oil Capacity".to_string(), "5.0 quarts".to_string())].into_iter().collect();
        b.iter(|| black_box(t.upsert(&key, &update)))
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let store = TableStore::new(dir.path().join("results.csv"));
    for i in 0..ROWS {
        store.upsert(&normalize(&format!("vehicle {i}")), &row_fields(i)).expect("seed");
    }
    c.bench_function("store_lookup_500_rows", |b| {
        let key = normalize("vehicle 499");
        b.iter(|| store.lookup(black_box(&key)).map(|r| r.is_some()))
    });
    c.bench_function("store_upsert_500_rows", |b| {
        let key = normalize("vehicle 250");
        let update: Fields = [("Oil Types".to_string(), "5w-30".to_string())].into_iter().collect();
        b.iter(|| store.upsert(black_box(&key), &update).map(|r| r.fields.len()))
    });
}

criterion_group!(benches, bench_table);
criterion_main!(benches);
