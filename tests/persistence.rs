use chrono::NaiveDate;
use recordkeeper::datatype::Value;
use recordkeeper::mapper::{KeyedMapping, RecordMapper};
use recordkeeper::persist::{PersistenceMode, Persistor};
use recordkeeper::predicate::{Comparison, WhereSet};
use recordkeeper::record::Record;
use recordkeeper::schema::{Column, Table};
use recordkeeper::RecordKeeperError;

fn setup() -> Persistor {
    let persistor = Persistor::open(PersistenceMode::InMemory).expect("db");
    persistor
        .execute_batch(
            "
            create table T (
                id integer primary key,
                name text,
                price decimal(10, 2),
                created timestamp
            );
            ",
        )
        .expect("schema");
    persistor
}

fn table() -> Table {
    Table::new("T")
        .with_column(Column::new("id", "Id"))
        .with_column(Column::new("name", "Name").with_max_length(10))
        .with_column(Column::new("price", "Price"))
        .with_column(Column::new("created", "Created"))
}

#[test]
fn insert_then_fetch_then_delete() {
    let persistor = setup();
    let record = Record::new().with("id", 1).with("name", "A");
    assert_eq!(persistor.insert(&record, "T").expect("insert"), 1);

    let row = persistor.fetch_row("SELECT * FROM T;", &[]).expect("row");
    assert_eq!(row.field("name"), Some(&Value::Text("A".into())));
    assert_eq!(row.field("price"), Some(&Value::Null));

    let mut where_set = WhereSet::new();
    where_set.add("name", Comparison::Equal, "A").unwrap();
    let mut mapper = RecordMapper::multi(&persistor, KeyedMapping::new(table(), &["id"]), vec![where_set]);
    assert_eq!(mapper.delete().expect("delete"), 1);
    let err = persistor.fetch_row("SELECT * FROM T WHERE name = ?;", &[Value::from("A")]).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn scalars_and_missing_rows() {
    let persistor = setup();
    let count = persistor.fetch_scalar("SELECT COUNT(*) FROM T;", &[]).expect("count");
    assert_eq!(count, Value::Integer(0));
    let missing = persistor.fetch_scalar("SELECT name FROM T WHERE id = ?;", &[Value::Integer(9)]);
    assert!(matches!(missing, Err(RecordKeeperError::NotFound(_))));
    assert_eq!(persistor.query_scalar("SELECT name FROM T;", &[]).expect("query"), None);
    assert_eq!(persistor.count("T", &[]).expect("count"), 0);
}

#[test]
fn results_are_normalized_by_declared_type() {
    let persistor = setup();
    let created = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(8, 15, 0).unwrap();
    let record = Record::new()
        .with("id", 1)
        .with("name", "A")
        .with("price", "12.50")
        .with("created", created);
    persistor.insert(&record, "T").expect("insert");
    let row = persistor.fetch_row("SELECT * FROM T;", &[]).expect("row");
    assert_eq!(row.field("created"), Some(&Value::Timestamp(created)));
    assert_eq!(row.field("price"), Some(&Value::Real(12.5)));
    // stored as text in the driver's format
    let raw = persistor.fetch_scalar("SELECT created || '' AS raw FROM T;", &[]).expect("raw");
    assert_eq!(raw, Value::Text("2024-03-01 08:15:00".into()));
}

#[test]
fn timestamps_bind_as_comparable_text() {
    let persistor = setup();
    for (id, day) in [(1, 1), (2, 15), (3, 28)] {
        let created = NaiveDate::from_ymd_opt(2024, 2, day).unwrap();
        persistor.insert(&Record::new().with("id", id).with("created", created), "T").unwrap();
    }
    let mut where_set = WhereSet::new();
    where_set.add_between(
        "created",
        NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
        NaiveDate::from_ymd_opt(2024, 2, 20).unwrap(),
    );
    let rows = persistor.search("T", &[where_set], "").expect("search");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].field("id"), Some(&Value::Integer(2)));
}

#[test]
fn search_ors_where_sets() {
    let persistor = setup();
    for (id, name) in [(1, "Ann"), (2, "Bob"), (3, "Cid"), (4, "Dan")] {
        persistor.insert(&Record::new().with("id", id).with("name", name), "T").unwrap();
    }
    let mut first = WhereSet::new();
    first.add_in("id", [1, 2]).add("name", Comparison::Like, "B%").unwrap();
    let mut second = WhereSet::new();
    second.add("name", Comparison::Regexp, "^D").unwrap();
    let rows = persistor.search("T", &[first, second], "ORDER BY id").expect("search");
    let ids: Vec<_> = rows.iter().map(|r| r.field("id").cloned()).collect();
    assert_eq!(ids, vec![Some(Value::Integer(2)), Some(Value::Integer(4))]);

    let mut nulls = WhereSet::new();
    nulls.add_is_null("price");
    assert_eq!(persistor.count("T", &[nulls]).unwrap(), 4);
}

#[test]
fn regexp_matches_numbers_and_skips_nulls() {
    let persistor = setup();
    persistor.insert(&Record::new().with("id", 12).with("price", "12.50"), "T").unwrap();
    persistor.insert(&Record::new().with("id", 21).with("name", "Eve"), "T").unwrap();

    let mut by_id = WhereSet::new();
    by_id.add("id", Comparison::Regexp, "^1").unwrap();
    let rows = persistor.search("T", &[by_id], "").expect("integer column");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].field("id"), Some(&Value::Integer(12)));

    let mut by_price = WhereSet::new();
    by_price.add("price", Comparison::Regexp, r"^12\.5").unwrap();
    assert_eq!(persistor.count("T", &[by_price]).expect("real column"), 1);

    // row 12 has no name
    let mut by_name = WhereSet::new();
    by_name.add("name", Comparison::Regexp, "E").unwrap();
    assert_eq!(persistor.count("T", &[by_name]).expect("null text"), 1);

    let mut no_pattern = WhereSet::new();
    no_pattern.add("name", Comparison::Regexp, Value::Null).unwrap();
    assert_eq!(persistor.count("T", &[no_pattern]).expect("null pattern"), 0);
}

#[test]
fn update_without_matches_is_not_found() {
    let persistor = setup();
    persistor.insert(&Record::new().with("id", 1).with("name", "A"), "T").unwrap();
    let mut where_set = WhereSet::new();
    where_set.add("id", Comparison::Equal, 1).unwrap();
    let values = Record::new().with("name", "B");
    assert_eq!(persistor.update(&values, "T", &[where_set]).unwrap(), 1);

    let mut nobody = WhereSet::new();
    nobody.add("id", Comparison::Equal, 2).unwrap();
    let err = persistor.update(&values, "T", &[nobody]).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn sql_errors_propagate() {
    let persistor = setup();
    let err = persistor.execute("insert into Nowhere values (1)", &[]).unwrap_err();
    assert!(matches!(err, RecordKeeperError::Persistence(_)));
}

#[test]
fn rollback_discards_uncommitted_work() {
    let persistor = setup();
    assert!(persistor.is_auto_commit());
    persistor.set_auto_commit(false).expect("begin");
    // already off, nothing to do
    persistor.set_auto_commit(false).expect("no-op");
    persistor.insert(&Record::new().with("id", 1), "T").unwrap();
    persistor.rollback().expect("rollback");
    assert_eq!(persistor.count("T", &[]).unwrap(), 0);

    persistor.insert(&Record::new().with("id", 2), "T").unwrap();
    persistor.commit().expect("commit");
    persistor.rollback().expect("rollback");
    assert_eq!(persistor.count("T", &[]).unwrap(), 1);

    persistor.insert(&Record::new().with("id", 3), "T").unwrap();
    persistor.set_auto_commit(true).expect("commit on switch");
    assert!(persistor.is_auto_commit());
    assert_eq!(persistor.count("T", &[]).unwrap(), 2);
}

#[test]
fn schema_shapes_records() {
    let table = table().with_column(Column::new("flag", "Flag").with_default(0));
    let defaults = table.default_record();
    assert_eq!(defaults.names().collect::<Vec<_>>(), vec!["id", "name", "price", "created", "flag"]);
    assert_eq!(defaults.field("flag"), Some(&Value::Integer(0)));

    let row = Record::new().with("name", "A").with("unknown", 1).with("id", 5);
    let shaped = table.to_record(&row);
    assert_eq!(shaped.names().collect::<Vec<_>>(), vec!["id", "name", "price", "created", "flag"]);
    assert!(!shaped.contains("unknown"));
    assert_eq!(table.column("name").map(|c| c.table()), Some("T"));
    assert_eq!(table.column("name").map(|c| c.qualified_name()), Some("T.name".to_string()));

    let too_long = Record::new().with("name", "far too long a name");
    let report = table.check_lengths(&too_long);
    assert_eq!(report.len(), 1);
    assert!(report.message("name").is_some());
}
