//! The edit, mutate, commit lifecycle for the records of one table.
//!
//! [`RecordMapper::edit`] fetches rows and keeps them verbatim as the
//! pre-edit snapshot. The caller then changes the records it holds, and
//! [`RecordMapper::commit`] fetches the rows once more, compares them to the
//! snapshot and only writes when nobody else interfered in between.
use chrono::Utc;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::conflict::{classify, IdentifierHasher, RecordConflict};
use crate::datatype::Value;
use crate::error::{RecordKeeperError, Result, ValidationReport};
use crate::persist::Persistor;
use crate::predicate::WhereSet;
use crate::record::Record;
use crate::schema::Table;

// ------------- Mapping -------------
/// What a mapper needs to know about the rows it handles.
pub trait Mapping {
    fn table(&self) -> &Table;
    /// Identifies a row across fetches. Equal strings mean the same row.
    fn identifier(&self, record: &Record) -> String;
    /// Column holding the last-modification time, if rows have one.
    fn timestamp_column(&self) -> Option<&str> {
        None
    }
    /// Fetches the rows to edit. Implementations may lock them, e.g. with a
    /// `FOR UPDATE` suffix where the database supports it.
    fn fetch_for_edit(&self, persistor: &Persistor, where_sets: &[WhereSet]) -> Result<Vec<Record>> {
        persistor.search(self.table().name(), where_sets, "")
    }
    fn validate(&self, record: &Record) -> ValidationReport {
        self.table().check_lengths(record)
    }
    fn normalize(&self, _record: &mut Record) {}
    /// Called on every row about to be written.
    fn touch(&self, record: &mut Record) {
        if let Some(column) = self.timestamp_column() {
            record.set_field(column, Utc::now().naive_utc());
        }
    }
}

/// A mapping identifying rows by the values of their key columns.
#[derive(Debug, Clone)]
pub struct KeyedMapping {
    table: Table,
    keys: Vec<String>,
    timestamp_column: Option<String>,
    part_after_where: String,
}

impl KeyedMapping {
    pub fn new(table: Table, keys: &[&str]) -> Self {
        Self {
            table,
            keys: keys.iter().map(|k| k.to_string()).collect(),
            timestamp_column: None,
            part_after_where: String::new(),
        }
    }
    pub fn with_timestamp(mut self, column: &str) -> Self {
        self.timestamp_column = Some(column.to_owned());
        self
    }
    /// Appended after the WHERE clause of the edit fetch, e.g. `ORDER BY id`.
    pub fn with_part_after_where(mut self, part: &str) -> Self {
        self.part_after_where = part.to_owned();
        self
    }
}

impl Mapping for KeyedMapping {
    fn table(&self) -> &Table {
        &self.table
    }
    fn identifier(&self, record: &Record) -> String {
        let mut parts = Vec::with_capacity(self.keys.len());
        for key in &self.keys {
            parts.push(record.field(key).map(Value::to_string).unwrap_or_default());
        }
        parts.join("|")
    }
    fn timestamp_column(&self) -> Option<&str> {
        self.timestamp_column.as_deref()
    }
    fn fetch_for_edit(&self, persistor: &Persistor, where_sets: &[WhereSet]) -> Result<Vec<Record>> {
        persistor.search(self.table.name(), where_sets, &self.part_after_where)
    }
}

// ------------- Mapper -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStrategy {
    /// Delete what the where sets match, then insert every held record. An
    /// empty set of where sets only clears the whole table when allowed.
    Replace { allow_whole_table: bool },
    /// A single `UPDATE` of the one held record.
    Targeted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapperState {
    Unbound,
    Editing,
    Committed,
    Conflicted,
}

pub struct RecordMapper<'db, M: Mapping> {
    persistor: &'db Persistor,
    mapping: M,
    strategy: CommitStrategy,
    where_sets: Vec<WhereSet>,
    records: Vec<Record>,
    snapshot: Option<Vec<Record>>,
    conflict_ignored: bool,
    state: MapperState,
}

impl<'db, M: Mapping> RecordMapper<'db, M> {
    pub fn new(persistor: &'db Persistor, mapping: M, strategy: CommitStrategy) -> Self {
        Self {
            persistor,
            mapping,
            strategy,
            where_sets: Vec::new(),
            records: Vec::new(),
            snapshot: None,
            conflict_ignored: false,
            state: MapperState::Unbound,
        }
    }
    /// A mapper committing by replacement, limited to its where sets.
    pub fn multi(persistor: &'db Persistor, mapping: M, where_sets: Vec<WhereSet>) -> Self {
        let mut mapper = Self::new(persistor, mapping, CommitStrategy::Replace { allow_whole_table: false });
        mapper.where_sets = where_sets;
        mapper
    }
    /// A mapper for the one row picked out by `where_set`.
    pub fn single(persistor: &'db Persistor, mapping: M, where_set: WhereSet) -> Self {
        let mut mapper = Self::new(persistor, mapping, CommitStrategy::Targeted);
        mapper.where_sets = vec![where_set];
        mapper
    }

    pub fn mapping(&self) -> &M {
        &self.mapping
    }
    pub fn table(&self) -> &Table {
        self.mapping.table()
    }
    pub fn state(&self) -> MapperState {
        self.state
    }
    pub fn strategy(&self) -> CommitStrategy {
        self.strategy
    }
    pub fn records(&self) -> &[Record] {
        &self.records
    }
    pub fn records_mut(&mut self) -> &mut Vec<Record> {
        &mut self.records
    }
    pub fn set_records(&mut self, records: Vec<Record>) {
        self.records = records;
    }
    pub fn where_sets(&self) -> &[WhereSet] {
        &self.where_sets
    }
    pub fn set_where_sets(&mut self, where_sets: Vec<WhereSet>) {
        self.where_sets = where_sets;
    }
    pub fn is_conflict_ignored(&self) -> bool {
        self.conflict_ignored
    }
    /// Lets the next commit write without checking for conflicts, e.g. after
    /// the user chose to overwrite someone else's change.
    pub fn set_conflict_ignored(&mut self, ignored: bool) {
        self.conflict_ignored = ignored;
    }
    pub fn pre_edit_snapshot(&self) -> Option<&[Record]> {
        self.snapshot.as_deref()
    }

    /// Loads the rows to edit and keeps them as the pre-edit snapshot.
    pub fn edit(&mut self) -> Result<&mut Vec<Record>> {
        let rows = self.mapping.fetch_for_edit(self.persistor, &self.where_sets)?;
        let table = self.mapping.table();
        self.records = rows.iter().map(|row| table.to_record(row)).collect();
        debug!(table = table.name(), rows = rows.len(), "editing");
        self.snapshot = Some(rows);
        self.state = MapperState::Editing;
        Ok(&mut self.records)
    }

    fn snapshot(&self) -> Result<&[Record]> {
        self.snapshot.as_deref().ok_or_else(|| {
            RecordKeeperError::Invariant(format!(
                "no pre-edit snapshot of {}, edit() must come first",
                self.mapping.table().name()
            ))
        })
    }

    /// Whether `record` still renders exactly like its snapshot row. A
    /// record without a snapshot row is never the same.
    pub fn is_same_as_pre_edit_record(&self, record: &Record) -> Result<bool> {
        let snapshot = self.snapshot()?;
        let id = self.mapping.identifier(record);
        let Some(previous) = snapshot.iter().find(|row| self.mapping.identifier(row) == id) else {
            return Ok(false);
        };
        Ok(record.to_strings().iter().all(|(name, value)| {
            let before = previous.field(name).map(Value::to_string).unwrap_or_default();
            &before == value
        }))
    }

    /// Fetches the rows again and fails when someone else changed, inserted
    /// or deleted rows since [`RecordMapper::edit`].
    ///
    /// A deleted row only counts while this mapper still holds a record with
    /// its identifier. Rows the caller has let go of may vanish silently.
    pub fn detect_conflict(&self) -> Result<()> {
        let snapshot = self.snapshot()?;
        let current = self.mapping.fetch_for_edit(self.persistor, &self.where_sets)?;
        let result = classify(
            snapshot,
            &current,
            |row| self.mapping.identifier(row),
            self.mapping.timestamp_column(),
        );
        let table = self.mapping.table();
        if !result.conflicting.is_empty() {
            warn!(table = table.name(), rows = result.conflicting.len(), "rows changed since edit");
            let rows = result.conflicting.iter().map(|row| table.to_record(row)).collect();
            return Err(RecordConflict::Changed(rows).into());
        }
        if !result.deleted.is_empty() {
            let held: HashSet<String, IdentifierHasher> =
                self.records.iter().map(|r| self.mapping.identifier(r)).collect();
            if result.deleted.iter().any(|row| held.contains(&self.mapping.identifier(row))) {
                warn!(table = table.name(), rows = result.deleted.len(), "rows deleted since edit");
                let rows = result.deleted.iter().map(|row| table.to_record(row)).collect();
                return Err(RecordConflict::Deleted(rows).into());
            }
            debug!(table = table.name(), rows = result.deleted.len(), "accepting deletion of rows no longer held");
        }
        Ok(())
    }

    /// Writes the held records, returning the number of rows written.
    pub fn commit(&mut self) -> Result<usize> {
        if !matches!(self.state, MapperState::Editing | MapperState::Conflicted) {
            return Err(RecordKeeperError::Invariant(format!(
                "commit on {} while {:?}, edit() must come first",
                self.mapping.table().name(),
                self.state
            )));
        }
        if !self.conflict_ignored {
            if let Err(err) = self.detect_conflict() {
                if err.conflict().is_some() {
                    self.state = MapperState::Conflicted;
                }
                return Err(err);
            }
        }
        let written = match self.strategy {
            CommitStrategy::Replace { allow_whole_table } => self.replace(allow_whole_table)?,
            CommitStrategy::Targeted => self.update_one()?,
        };
        info!(table = self.mapping.table().name(), rows = written, "committed");
        self.snapshot = None;
        self.state = MapperState::Committed;
        Ok(written)
    }
    /// Same as [`RecordMapper::commit`].
    pub fn update(&mut self) -> Result<usize> {
        self.commit()
    }

    fn replace(&mut self, allow_whole_table: bool) -> Result<usize> {
        self.delete_guarded(allow_whole_table)?;
        let table = self.mapping.table().name().to_owned();
        let mut written = 0;
        for record in self.records.iter_mut() {
            self.mapping.touch(record);
            written += self.persistor.insert(record, &table)?;
        }
        Ok(written)
    }

    fn update_one(&mut self) -> Result<usize> {
        if self.records.len() != 1 {
            return Err(RecordKeeperError::Invariant(format!(
                "a targeted commit needs exactly one record, {} held",
                self.records.len()
            )));
        }
        if self.is_same_as_pre_edit_record(&self.records[0])? {
            debug!(table = self.mapping.table().name(), "unchanged, nothing to write");
            return Ok(0);
        }
        self.require_where_sets()?;
        let table = self.mapping.table().name().to_owned();
        let record = &mut self.records[0];
        self.mapping.touch(record);
        self.persistor.update(record, &table, &self.where_sets)
    }

    fn require_where_sets(&self) -> Result<()> {
        if self.where_sets.iter().all(WhereSet::is_empty) {
            return Err(RecordKeeperError::Invariant(format!(
                "refusing to touch every row of {} without a where clause",
                self.mapping.table().name()
            )));
        }
        Ok(())
    }

    fn delete_guarded(&self, allow_whole_table: bool) -> Result<usize> {
        if !allow_whole_table {
            self.require_where_sets()?;
        }
        self.persistor.delete(self.mapping.table().name(), &self.where_sets)
    }

    /// Deletes the rows the where sets match.
    pub fn delete(&mut self) -> Result<usize> {
        let allow_whole_table = matches!(self.strategy, CommitStrategy::Replace { allow_whole_table: true });
        self.delete_guarded(allow_whole_table)
    }

    /// Inserts every held record as a new row.
    pub fn insert(&mut self) -> Result<usize> {
        let table = self.mapping.table().name().to_owned();
        let mut written = 0;
        for record in self.records.iter_mut() {
            self.mapping.touch(record);
            written += self.persistor.insert(record, &table)?;
        }
        Ok(written)
    }

    pub fn count(&self) -> Result<i64> {
        self.persistor.count(self.mapping.table().name(), &self.where_sets)
    }
    /// Whether any row matches the where sets, e.g. before inserting a
    /// record that must be unique.
    pub fn exists(&self) -> Result<bool> {
        Ok(self.count()? > 0)
    }

    /// Fails with the first held record that does not pass validation.
    pub fn validate(&self) -> Result<()> {
        for record in &self.records {
            let report = self.mapping.validate(record);
            if !report.is_empty() {
                return Err(RecordKeeperError::Validation {
                    record: record.clone(),
                    report,
                });
            }
        }
        Ok(())
    }
    pub fn normalize(&mut self) {
        for record in self.records.iter_mut() {
            self.mapping.normalize(record);
        }
    }
}
