use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chrono::NaiveDate;
use recordkeeper::conflict::classify;
use recordkeeper::datatype::Value;
use recordkeeper::predicate::{combine, Comparison, WhereSet};
use recordkeeper::record::Record;

fn where_sets() -> Vec<WhereSet> {
    let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    (0..16)
        .map(|i| {
            let mut where_set = WhereSet::new();
            where_set
                .add("name", Comparison::Like, format!("{}%", i)).unwrap()
                .add_between("created", day, day.succ_opt().unwrap())
                .add_in("id", 0..64)
                .add_is_null_negate("deleted_at");
            where_set
        })
        .collect()
}

fn rows(n: i64, version: i64) -> Vec<Record> {
    (0..n)
        .map(|id| Record::new().with("id", id).with("version", version).with("name", "x"))
        .collect()
}

fn bench_predicates(c: &mut Criterion) {
    let where_sets = where_sets();
    c.bench_function("combine 16 where sets", |b| {
        b.iter(|| combine(black_box(&where_sets)))
    });
    c.bench_function("where set round trip", |b| {
        b.iter(|| {
            let json = black_box(&where_sets[0]).to_json().unwrap();
            WhereSet::from_json(&json).unwrap()
        })
    });
}

fn bench_classify(c: &mut Criterion) {
    let snapshot = rows(10_000, 1);
    let mut current = rows(10_000, 1);
    current[5_000].set_field("version", 2);
    current.truncate(9_000);
    let identifier = |r: &Record| r.field("id").map(Value::to_string).unwrap_or_default();
    c.bench_function("classify 10k rows", |b| {
        b.iter(|| classify(black_box(&snapshot), black_box(&current), identifier, Some("version")))
    });
}

criterion_group!(benches, bench_predicates, bench_classify);
criterion_main!(benches);
