use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use recordkeeper::datatype::Value;
use recordkeeper::predicate::{Comparison, WhereSet};
use recordkeeper::record::Record;

fn every_kind() -> WhereSet {
    let noon = NaiveDate::from_ymd_opt(2020, 5, 17).unwrap().and_hms_milli_opt(12, 30, 15, 250).unwrap();
    let mut where_set = WhereSet::new();
    where_set
        .add("a", Comparison::Equal, 1).unwrap()
        .add("b", Comparison::NotEqual, "text").unwrap()
        .add("c", Comparison::Less, 2.5).unwrap()
        .add("d", Comparison::LessEqual, noon).unwrap()
        .add("e", Comparison::Greater, BigDecimal::from_str("12.345").unwrap()).unwrap()
        .add_negate("f", Comparison::GreaterEqual, 0).unwrap()
        .add("g", Comparison::Like, "A%").unwrap()
        .add("h", Comparison::SimilarTo, "(a|b)%").unwrap()
        .add("i", Comparison::Regexp, "^x+$").unwrap()
        .add_between("j", noon, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap())
        .add_in("k", [Value::Integer(1), Value::Text("two".into()), Value::Timestamp(noon)])
        .add_in_negate("l", Vec::<i64>::new())
        .add_is_null("m")
        .add_is_null_negate("n");
    where_set
}

#[test]
fn round_trip_reproduces_clause_and_parameters() {
    let original = every_kind();
    let json = original.to_json().expect("serialize");
    let restored = WhereSet::from_json(&json).expect("deserialize");
    assert_eq!(restored.placeholder_clause(), original.placeholder_clause());
    assert_eq!(restored.parameters(), original.parameters());
    assert_eq!(restored, original);
}

#[test]
fn serialized_entries_carry_type_tags() {
    let mut where_set = WhereSet::new();
    where_set
        .add("born", Comparison::Equal, NaiveDate::from_ymd_opt(1999, 12, 31).unwrap()).unwrap()
        .add_in_negate("id", [1, 2]);
    let tree = serde_json::to_value(&where_set).unwrap();
    assert_eq!(
        tree,
        serde_json::json!([
            {
                "column": "born",
                "comparison": "EQUAL",
                "values": [{"class_name": "NaiveDateTime", "value": "1999-12-31T00:00:00"}],
                "is_negate": false
            },
            {
                "column": "id",
                "comparison": "IN",
                "values": [
                    {"class_name": "i64", "value": 1},
                    {"class_name": "i64", "value": 2}
                ],
                "is_negate": true
            }
        ])
    );
}

#[test]
fn bad_entries_are_rejected() {
    let unknown_tag = r#"[{"column":"a","comparison":"EQUAL","values":[{"class_name":"Widget","value":1}],"is_negate":false}]"#;
    assert!(WhereSet::from_json(unknown_tag).is_err());
    let wrong_count = r#"[{"column":"a","comparison":"BETWEEN","values":[{"class_name":"i64","value":1}],"is_negate":false}]"#;
    assert!(WhereSet::from_json(wrong_count).is_err());
    let bad_date = r#"[{"column":"a","comparison":"EQUAL","values":[{"class_name":"NaiveDateTime","value":"yesterday"}],"is_negate":false}]"#;
    assert!(WhereSet::from_json(bad_date).is_err());
}

#[test]
fn clones_do_not_share_dates() {
    let day = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
    let mut original = WhereSet::new();
    original.add("d", Comparison::Equal, day).unwrap();
    let mut copy = original.clone();
    copy.wheres_mut()[0].values_mut()[0] = Value::from(NaiveDate::from_ymd_opt(2011, 1, 1).unwrap());
    assert_eq!(original.parameters(), vec![Value::from(day)]);
    assert_ne!(copy.parameters(), original.parameters());
}

#[test]
fn records_render_as_tagged_json() {
    let record = Record::new()
        .with("id", 1)
        .with("name", "A")
        .with("price", BigDecimal::from_str("9.99").unwrap())
        .with("gone", Value::Null);
    let json = record.to_json();
    assert_eq!(json["name"]["class_name"], "String");
    let restored = Record::from_json(&json).expect("record");
    assert_eq!(restored, record);
    // column order survives the trip
    assert_eq!(restored.names().collect::<Vec<_>>(), vec!["id", "name", "price", "gone"]);

    let reversed = Record::new().with("zeta", 1).with("alpha", 2);
    let restored = Record::from_json(&reversed.to_json()).expect("record");
    assert_eq!(restored.names().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
}
