use std::fmt;

use crate::datatype::Value;
use crate::error::ValidationReport;
use crate::record::Record;

// ------------- Column -------------
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,         // physical name, unique within the table
    logical_name: String, // what a user gets to see
    default: Value,
    max_length: Option<usize>,
    table: String,
}

impl Column {
    pub fn new(name: &str, logical_name: &str) -> Self {
        Self {
            name: name.to_owned(),
            logical_name: logical_name.to_owned(),
            default: Value::Null,
            max_length: None,
            table: String::new(),
        }
    }
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = default.into();
        self
    }
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }
    // Columns are only changed while being built, after that they are
    // reached through getters.
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }
    pub fn default(&self) -> &Value {
        &self.default
    }
    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }
    pub fn table(&self) -> &str {
        &self.table
    }
    /// `table.column`, for predicates over joins.
    pub fn qualified_name(&self) -> String {
        if self.table.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.table, self.name)
        }
    }
}
impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.logical_name)
    }
}

// ------------- Table -------------
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
}

impl Table {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            columns: Vec::new(),
        }
    }
    /// Adds a column, claiming it for this table. A column with the same
    /// physical name replaces the earlier one.
    pub fn with_column(mut self, mut column: Column) -> Self {
        column.table = self.name.clone();
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        self
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
    /// A record holding every column's default value.
    pub fn default_record(&self) -> Record {
        let mut record = Record::new();
        for column in &self.columns {
            record.set(column, column.default.clone());
        }
        record
    }
    /// Shapes a string-keyed row into a record of this table: columns in
    /// table order, defaults for missing columns, unknown names dropped.
    pub fn to_record(&self, row: &Record) -> Record {
        let mut record = Record::new();
        for column in &self.columns {
            let value = row.field(&column.name).unwrap_or(&column.default);
            record.set(column, value.clone());
        }
        record
    }
    /// Reports every text value longer than its column allows.
    pub fn check_lengths(&self, record: &Record) -> ValidationReport {
        let mut report = ValidationReport::new();
        for column in &self.columns {
            let (Some(max_length), Some(Value::Text(text))) = (column.max_length, record.get(column)) else {
                continue;
            };
            let length = text.chars().count();
            if length > max_length {
                report.add(
                    &column.name,
                    format!("{} is {} characters long, at most {} allowed", column.logical_name, length, max_length),
                );
            }
        }
        report
    }
}
