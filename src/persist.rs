// used for persistence
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection};
use regex::Regex;
use std::borrow::Cow;
use std::cell::Cell;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use crate::datatype::Value;
use crate::error::{RecordKeeperError, Result};
use crate::predicate::WhereSet;
use crate::record::Record;
use crate::settings::Settings;
use crate::sql;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceMode {
    InMemory,
    File(String),
}

// ------------- Persistence -------------
/// Runs statements over exactly one connection. Not meant to be shared
/// between threads; one operation is in flight at a time.
pub struct Persistor {
    db: Connection,
    auto_commit: Cell<bool>,
}

impl Persistor {
    pub fn new(connection: Connection) -> Result<Persistor> {
        // SQLite parses REGEXP but leaves the function to the application,
        // which receives the pattern first and the text second
        connection.create_scalar_function(
            "regexp",
            2,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                if matches!(ctx.get_raw(0), ValueRef::Null) {
                    return Ok(None);
                }
                // compiled once per statement while the pattern stays constant
                let regex: Arc<Regex> = ctx.get_or_create_aux(0, |pattern| -> std::result::Result<_, BoxError> {
                    Ok(Regex::new(pattern.as_str()?)?)
                })?;
                let text: Cow<str> = match ctx.get_raw(1) {
                    ValueRef::Null => return Ok(None),
                    ValueRef::Integer(i) => Cow::Owned(i.to_string()),
                    ValueRef::Real(f) => Cow::Owned(f.to_string()),
                    ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t),
                };
                Ok(Some(regex.is_match(&text)))
            },
        )?;
        Ok(Persistor {
            db: connection,
            auto_commit: Cell::new(true),
        })
    }
    pub fn open(mode: PersistenceMode) -> Result<Persistor> {
        let connection = match &mode {
            PersistenceMode::InMemory => Connection::open_in_memory()?,
            PersistenceMode::File(path) => Connection::open(path)?,
        };
        debug!(?mode, "opened connection");
        Persistor::new(connection)
    }
    pub fn from_settings(settings: &Settings) -> Result<Persistor> {
        let mode = match &settings.database {
            Some(path) => PersistenceMode::File(path.clone()),
            None => PersistenceMode::InMemory,
        };
        let persistor = Persistor::open(mode)?;
        persistor.set_query_timeout(settings.query_timeout())?;
        persistor.set_auto_commit(settings.auto_commit)?;
        Ok(persistor)
    }
    pub fn connection(&self) -> &Connection {
        &self.db
    }
    pub fn set_query_timeout(&self, timeout: Duration) -> Result<()> {
        self.db.busy_timeout(timeout)?;
        Ok(())
    }

    // ------------- Statements -------------
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
        debug!(sql, params = params.len(), "execute");
        let mut statement = self.db.prepare(sql)?;
        Ok(statement.execute(params_from_iter(params.iter()))?)
    }
    /// Runs several statements without parameters, e.g. a schema script.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        debug!(sql, "execute batch");
        self.db.execute_batch(sql)?;
        Ok(())
    }
    /// Column 1 of row 1, or `None` when there are no rows.
    pub fn query_scalar(&self, sql: &str, params: &[Value]) -> Result<Option<Value>> {
        Ok(self
            .query(sql, params, Some(1))?
            .into_iter()
            .next()
            .and_then(|row| row.values().next().cloned()))
    }
    pub fn fetch_scalar(&self, sql: &str, params: &[Value]) -> Result<Value> {
        self.query_scalar(sql, params)?
            .ok_or_else(|| RecordKeeperError::NotFound(sql.to_owned()))
    }
    pub fn query_row(&self, sql: &str, params: &[Value]) -> Result<Option<Record>> {
        Ok(self.query(sql, params, Some(1))?.into_iter().next())
    }
    pub fn fetch_row(&self, sql: &str, params: &[Value]) -> Result<Record> {
        self.query_row(sql, params)?
            .ok_or_else(|| RecordKeeperError::NotFound(sql.to_owned()))
    }
    pub fn fetch_rows(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>> {
        self.query(sql, params, None)
    }
    // Names and declared types come from the statement, so no schema is
    // needed to read a row.
    fn query(&self, sql: &str, params: &[Value], limit: Option<usize>) -> Result<Vec<Record>> {
        debug!(sql, params = params.len(), "query");
        let mut statement = self.db.prepare(sql)?;
        let columns: Vec<(String, Option<String>)> = statement
            .columns()
            .iter()
            .map(|c| (c.name().to_owned(), c.decl_type().map(str::to_owned)))
            .collect();
        let mut rows = statement.query(params_from_iter(params.iter()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Record::new();
            for (i, (name, declared_type)) in columns.iter().enumerate() {
                let value = Value::from_sql_result(row.get_ref(i)?, declared_type.as_deref());
                record.set_field(name, value);
            }
            records.push(record);
            if limit.is_some_and(|l| records.len() >= l) {
                break;
            }
        }
        trace!(rows = records.len(), "fetched");
        Ok(records)
    }

    // ------------- Table operations -------------
    pub fn search(&self, table: &str, where_sets: &[WhereSet], part_after_where: &str) -> Result<Vec<Record>> {
        let (sql, params) = sql::select(table, where_sets, part_after_where);
        self.fetch_rows(&sql, &params)
    }
    pub fn count(&self, table: &str, where_sets: &[WhereSet]) -> Result<i64> {
        let (sql, params) = sql::count(table, where_sets);
        match self.fetch_scalar(&sql, &params) {
            Ok(value) => Ok(value.as_i64().unwrap_or(0)),
            Err(RecordKeeperError::NotFound(_)) => Ok(0),
            Err(err) => Err(err),
        }
    }
    pub fn insert(&self, record: &Record, table: &str) -> Result<usize> {
        if record.is_empty() {
            return Err(RecordKeeperError::Invariant(format!(
                "cannot insert an empty record into {}",
                table
            )));
        }
        let (sql, params) = sql::insert(table, record);
        self.execute(&sql, &params)
    }
    /// Fails with `NotFound` when no row matched.
    pub fn update(&self, values: &Record, table: &str, where_sets: &[WhereSet]) -> Result<usize> {
        if values.is_empty() {
            return Err(RecordKeeperError::Invariant(format!(
                "nothing to set when updating {}",
                table
            )));
        }
        let (sql, params) = sql::update(table, values, where_sets);
        match self.execute(&sql, &params)? {
            0 => Err(RecordKeeperError::NotFound(sql)),
            affected => Ok(affected),
        }
    }
    pub fn delete(&self, table: &str, where_sets: &[WhereSet]) -> Result<usize> {
        let (sql, params) = sql::delete(table, where_sets);
        self.execute(&sql, &params)
    }

    // ------------- Transactions -------------
    // With auto-commit off there is always an open transaction; commit and
    // rollback close it and open the next one.
    pub fn is_auto_commit(&self) -> bool {
        self.auto_commit.get()
    }
    /// Switching auto-commit back on commits pending work.
    pub fn set_auto_commit(&self, auto_commit: bool) -> Result<()> {
        if self.auto_commit.get() == auto_commit {
            return Ok(());
        }
        if auto_commit {
            self.execute_batch("COMMIT;")?;
        } else {
            self.execute_batch("BEGIN;")?;
        }
        self.auto_commit.set(auto_commit);
        Ok(())
    }
    pub fn commit(&self) -> Result<()> {
        if !self.auto_commit.get() {
            self.execute_batch("COMMIT; BEGIN;")?;
        }
        Ok(())
    }
    pub fn rollback(&self) -> Result<()> {
        if !self.auto_commit.get() {
            self.execute_batch("ROLLBACK; BEGIN;")?;
        }
        Ok(())
    }
}
