//! Statement text for the persistence layer. Every builder returns the SQL
//! together with the parameters its placeholders bind to, in order.
use crate::datatype::Value;
use crate::predicate::{combine, WhereSet};
use crate::record::Record;

fn where_clause(where_sets: &[WhereSet]) -> (String, Vec<Value>) {
    match combine(where_sets) {
        Some((clause, parameters)) => (format!(" WHERE {}", clause), parameters),
        None => (String::new(), Vec::new()),
    }
}

/// `SELECT * FROM <table> WHERE (..) OR (..) <part_after_where>;`
pub fn select(table: &str, where_sets: &[WhereSet], part_after_where: &str) -> (String, Vec<Value>) {
    let (clause, parameters) = where_clause(where_sets);
    let after = part_after_where.trim();
    let sql = if after.is_empty() {
        format!("SELECT * FROM {}{};", table, clause)
    } else {
        format!("SELECT * FROM {}{} {};", table, clause, after)
    };
    (sql, parameters)
}

pub fn count(table: &str, where_sets: &[WhereSet]) -> (String, Vec<Value>) {
    let (clause, parameters) = where_clause(where_sets);
    (format!("SELECT COUNT(*) FROM {}{};", table, clause), parameters)
}

/// Columns are listed in the record's own order.
pub fn insert(table: &str, record: &Record) -> (String, Vec<Value>) {
    let columns: Vec<&str> = record.names().collect();
    let placeholders = vec!["?"; columns.len()];
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({});",
        table,
        columns.join(", "),
        placeholders.join(", ")
    );
    (sql, record.values().cloned().collect())
}

pub fn update(table: &str, values: &Record, where_sets: &[WhereSet]) -> (String, Vec<Value>) {
    let assignments: Vec<String> = values.names().map(|n| format!("{}=?", n)).collect();
    let (clause, where_parameters) = where_clause(where_sets);
    let mut parameters: Vec<Value> = values.values().cloned().collect();
    parameters.extend(where_parameters);
    (
        format!("UPDATE {} SET {}{};", table, assignments.join(", "), clause),
        parameters,
    )
}

pub fn delete(table: &str, where_sets: &[WhereSet]) -> (String, Vec<Value>) {
    let (clause, parameters) = where_clause(where_sets);
    (format!("DELETE FROM {}{};", table, clause), parameters)
}

/// `CASE <column> WHEN <key> THEN '<value>' ... END`. Numeric keys are
/// written as they are, anything else is quoted.
pub fn case_clause(column: &str, mapping: &[(Value, String)]) -> String {
    let mut sql = format!("CASE {}", column);
    for (key, value) in mapping {
        let key = if key.is_numeric() {
            key.to_string()
        } else {
            quote(&key.to_string())
        };
        sql += &format!(" WHEN {} THEN {}", key, quote(value));
    }
    sql += " END";
    sql
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
