use std::fmt;

use thiserror::Error;

use crate::conflict::RecordConflict;
use crate::record::Record;

#[derive(Error, Debug)]
pub enum RecordKeeperError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Record conflict: {0}")]
    Conflict(RecordConflict),
    #[error("Validation failed:\n{report}")]
    Validation { record: Record, report: ValidationReport },
    #[error("Predicate error: {0}")]
    Predicate(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, RecordKeeperError>;

impl RecordKeeperError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
    pub fn conflict(&self) -> Option<&RecordConflict> {
        match self {
            Self::Conflict(conflict) => Some(conflict),
            _ => None,
        }
    }
}

// Helper conversions
impl From<rusqlite::Error> for RecordKeeperError {
    fn from(e: rusqlite::Error) -> Self { Self::Persistence(e.to_string()) }
}
impl From<serde_json::Error> for RecordKeeperError {
    fn from(e: serde_json::Error) -> Self { Self::Serialization(e.to_string()) }
}
impl From<config::ConfigError> for RecordKeeperError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<RecordConflict> for RecordKeeperError {
    fn from(c: RecordConflict) -> Self { Self::Conflict(c) }
}

// ------------- Validation -------------

/// Per-column validation messages, kept in the order they were reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    messages: Vec<(String, String)>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self { messages: Vec::new() }
    }
    /// Adds a message for a column. A second message for the same column
    /// is appended to the first rather than listed separately.
    pub fn add(&mut self, column: &str, message: impl Into<String>) {
        let message = message.into();
        match self.messages.iter_mut().find(|(c, _)| c == column) {
            Some((_, existing)) => {
                existing.push_str("; ");
                existing.push_str(&message);
            }
            None => self.messages.push((column.to_owned(), message)),
        }
    }
    pub fn message(&self, column: &str) -> Option<&str> {
        self.messages
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, m)| m.as_str())
    }
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
    pub fn len(&self) -> usize {
        self.messages.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.messages.iter().map(|(c, m)| (c.as_str(), m.as_str()))
    }
}

// rendered as a bulleted list, one line per column
impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut lines = Vec::new();
        for (column, message) in &self.messages {
            lines.push(format!("- {}: {}", column, message));
        }
        write!(f, "{}", lines.join("\n"))
    }
}
