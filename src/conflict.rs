// used to index rows by identifier, where keys are not Things
use core::hash::BuildHasherDefault;
use seahash::SeaHasher;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::record::Record;

pub type IdentifierHasher = BuildHasherDefault<SeaHasher>;

// ------------- Conflict classification -------------
/// How the rows fetched again at commit time differ from the rows captured
/// when editing started. The two vectors never share a row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConflictResult {
    /// Current rows changed since the snapshot, or inserted by someone else.
    pub conflicting: Vec<Record>,
    /// Snapshot rows that are gone from the database.
    pub deleted: Vec<Record>,
}

impl ConflictResult {
    pub fn is_clean(&self) -> bool {
        self.conflicting.is_empty() && self.deleted.is_empty()
    }
}

/// Diffs `current` against `snapshot`. Rows are matched only through
/// `identifier`; a matched row conflicts when both sides carry a value in
/// `timestamp_column` and the current one is strictly newer.
pub fn classify<F>(
    snapshot: &[Record],
    current: &[Record],
    identifier: F,
    timestamp_column: Option<&str>,
) -> ConflictResult
where
    F: Fn(&Record) -> String,
{
    let mut by_identifier: HashMap<String, &Record, IdentifierHasher> = HashMap::default();
    for row in snapshot {
        by_identifier.insert(identifier(row), row);
    }
    let mut result = ConflictResult::default();
    let mut found: HashSet<String, IdentifierHasher> = HashSet::default();
    for row in current {
        let id = identifier(row);
        match by_identifier.get(&id) {
            None => result.conflicting.push(row.clone()),
            Some(previous) => {
                if let Some(column) = timestamp_column {
                    if let (Some(now), Some(then)) = (row.field(column), previous.field(column)) {
                        if now.is_newer_than(then) {
                            result.conflicting.push(row.clone());
                        }
                    }
                }
                found.insert(id);
            }
        }
    }
    for row in snapshot {
        if !found.contains(&identifier(row)) {
            result.deleted.push(row.clone());
        }
    }
    result
}

// ------------- Conflict error payload -------------
/// Carried by [`crate::error::RecordKeeperError::Conflict`]: either rows
/// someone else changed, or rows someone else deleted, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordConflict {
    Changed(Vec<Record>),
    Deleted(Vec<Record>),
}

impl RecordConflict {
    pub fn rows(&self) -> &[Record] {
        match self {
            RecordConflict::Changed(rows) | RecordConflict::Deleted(rows) => rows,
        }
    }
    pub fn is_deleted(&self) -> bool {
        matches!(self, RecordConflict::Deleted(_))
    }
}

impl fmt::Display for RecordConflict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordConflict::Changed(rows) => {
                write!(f, "{} row(s) were changed by someone else", rows.len())
            }
            RecordConflict::Deleted(rows) => {
                write!(f, "{} row(s) were deleted by someone else", rows.len())
            }
        }
    }
}
