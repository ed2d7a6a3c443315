//! Composable WHERE clauses.
//!
//! A [`Where`] is one typed comparison on one column. A [`WhereSet`] ANDs its
//! wheres together, and a slice of where sets handed to a search, update or
//! delete is ORed (see [`combine`]). Every where set yields a clause with `?`
//! placeholders and a parameter list that lines up with it one to one.
//!
//! ```
//! use recordkeeper::predicate::{Comparison, WhereSet};
//! let mut where_set = WhereSet::new();
//! where_set
//!     .add("name", Comparison::Like, "A%").unwrap()
//!     .add_between("age", 20, 30)
//!     .add_is_null_negate("email");
//! assert_eq!(
//!     where_set.placeholder_clause(),
//!     "name LIKE ? AND age BETWEEN ? AND ? AND NOT email IS NULL"
//! );
//! assert_eq!(where_set.parameters().len(), 3);
//! ```
use serde::{Deserialize, Serialize};

use crate::datatype::Value;
use crate::error::{RecordKeeperError, Result};

// ------------- Comparison -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = "EQUAL")]
    Equal,
    #[serde(rename = "NOT_EQUAL")]
    NotEqual,
    #[serde(rename = "LESS")]
    Less,
    #[serde(rename = "LESS_EQUAL")]
    LessEqual,
    #[serde(rename = "GREATER")]
    Greater,
    #[serde(rename = "GREATER_EQUAL")]
    GreaterEqual,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "BETWEEN")]
    Between,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "IS_NULL")]
    IsNull,
    #[serde(rename = "SIMILARTO")]
    SimilarTo,
    #[serde(rename = "REGEXP")]
    Regexp,
}

impl Comparison {
    /// The SQL operator of a comparison taking exactly one value.
    pub fn operator(&self) -> Option<&'static str> {
        match self {
            Comparison::Equal => Some("="),
            Comparison::NotEqual => Some("<>"),
            Comparison::Less => Some("<"),
            Comparison::LessEqual => Some("<="),
            Comparison::Greater => Some(">"),
            Comparison::GreaterEqual => Some(">="),
            Comparison::Like => Some("LIKE"),
            Comparison::SimilarTo => Some("SIMILAR TO"),
            Comparison::Regexp => Some("REGEXP"),
            Comparison::Between | Comparison::In | Comparison::IsNull => None,
        }
    }
    pub fn is_simple(&self) -> bool {
        self.operator().is_some()
    }
    /// Whether `count` values fit this comparison.
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Comparison::Between => count == 2,
            Comparison::In => true,
            Comparison::IsNull => count == 0,
            _ => count == 1,
        }
    }
}

// ------------- Where -------------
#[derive(Debug, Clone, PartialEq)]
pub struct Where {
    column: String,
    comparison: Comparison,
    values: Vec<Value>,
    negate: bool,
}

impl Where {
    /// Fails when the number of values does not fit the comparison.
    pub fn new(column: &str, comparison: Comparison, values: Vec<Value>, negate: bool) -> Result<Self> {
        if !comparison.accepts(values.len()) {
            return Err(RecordKeeperError::Predicate(format!(
                "{:?} on '{}' cannot take {} value(s)",
                comparison,
                column,
                values.len()
            )));
        }
        Ok(Self {
            column: column.to_owned(),
            comparison,
            values,
            negate,
        })
    }
    pub fn column(&self) -> &str {
        &self.column
    }
    pub fn comparison(&self) -> Comparison {
        self.comparison
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    /// Values can be swapped out, but never added or removed, so the
    /// placeholder count stays in line with the comparison.
    pub fn values_mut(&mut self) -> &mut [Value] {
        &mut self.values
    }
    pub fn is_negate(&self) -> bool {
        self.negate
    }
    pub fn placeholder_clause(&self) -> String {
        let clause = match self.comparison {
            Comparison::Between => format!("{} BETWEEN ? AND ?", self.column),
            Comparison::In => {
                let placeholders = vec!["?"; self.values.len()];
                format!("{} IN ({})", self.column, placeholders.join(", "))
            }
            Comparison::IsNull => format!("{} IS NULL", self.column),
            simple => {
                // every other comparison carries an operator
                let operator = simple.operator().unwrap_or("=");
                format!("{} {} ?", self.column, operator)
            }
        };
        if self.negate {
            format!("NOT {}", clause)
        } else {
            clause
        }
    }
    pub fn parameters(&self) -> &[Value] {
        match self.comparison {
            Comparison::IsNull => &[],
            _ => &self.values,
        }
    }
}

// ------------- WhereSet -------------
/// Wheres ANDed together. Cloning yields a fully independent copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<WhereEntry>", try_from = "Vec<WhereEntry>")]
pub struct WhereSet {
    wheres: Vec<Where>,
}

impl WhereSet {
    pub fn new() -> Self {
        Self { wheres: Vec::new() }
    }
    fn push(&mut self, column: &str, comparison: Comparison, values: Vec<Value>, negate: bool) -> Result<&mut Self> {
        self.wheres.push(Where::new(column, comparison, values, negate)?);
        Ok(self)
    }
    fn push_single(&mut self, column: &str, comparison: Comparison, value: Value, negate: bool) -> Result<&mut Self> {
        if !comparison.is_simple() {
            return Err(RecordKeeperError::Predicate(format!(
                "{:?} on '{}' has its own adder",
                comparison, column
            )));
        }
        self.push(column, comparison, vec![value], negate)
    }
    /// Fails for BETWEEN, IN and IS_NULL, which have their own adders.
    pub fn add(&mut self, column: &str, comparison: Comparison, value: impl Into<Value>) -> Result<&mut Self> {
        self.push_single(column, comparison, value.into(), false)
    }
    pub fn add_negate(&mut self, column: &str, comparison: Comparison, value: impl Into<Value>) -> Result<&mut Self> {
        self.push_single(column, comparison, value.into(), true)
    }
    pub fn add_between(&mut self, column: &str, from: impl Into<Value>, to: impl Into<Value>) -> &mut Self {
        self.add_range(column, from.into(), to.into(), false)
    }
    pub fn add_between_negate(&mut self, column: &str, from: impl Into<Value>, to: impl Into<Value>) -> &mut Self {
        self.add_range(column, from.into(), to.into(), true)
    }
    fn add_range(&mut self, column: &str, from: Value, to: Value, negate: bool) -> &mut Self {
        self.wheres.push(Where {
            column: column.to_owned(),
            comparison: Comparison::Between,
            values: vec![from, to],
            negate,
        });
        self
    }
    pub fn add_in<V: Into<Value>>(&mut self, column: &str, values: impl IntoIterator<Item = V>) -> &mut Self {
        self.add_list(column, values.into_iter().map(Into::into).collect(), false)
    }
    pub fn add_in_negate<V: Into<Value>>(&mut self, column: &str, values: impl IntoIterator<Item = V>) -> &mut Self {
        self.add_list(column, values.into_iter().map(Into::into).collect(), true)
    }
    fn add_list(&mut self, column: &str, values: Vec<Value>, negate: bool) -> &mut Self {
        self.wheres.push(Where {
            column: column.to_owned(),
            comparison: Comparison::In,
            values,
            negate,
        });
        self
    }
    pub fn add_is_null(&mut self, column: &str) -> &mut Self {
        self.add_null_check(column, false)
    }
    pub fn add_is_null_negate(&mut self, column: &str) -> &mut Self {
        self.add_null_check(column, true)
    }
    fn add_null_check(&mut self, column: &str, negate: bool) -> &mut Self {
        self.wheres.push(Where {
            column: column.to_owned(),
            comparison: Comparison::IsNull,
            values: Vec::new(),
            negate,
        });
        self
    }
    pub fn wheres(&self) -> &[Where] {
        &self.wheres
    }
    pub fn wheres_mut(&mut self) -> &mut [Where] {
        &mut self.wheres
    }
    pub fn len(&self) -> usize {
        self.wheres.len()
    }
    pub fn is_empty(&self) -> bool {
        self.wheres.is_empty()
    }
    pub fn placeholder_clause(&self) -> String {
        self.wheres
            .iter()
            .map(Where::placeholder_clause)
            .collect::<Vec<_>>()
            .join(" AND ")
    }
    pub fn parameters(&self) -> Vec<Value> {
        self.wheres
            .iter()
            .flat_map(|w| w.parameters().iter().cloned())
            .collect()
    }
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
    pub fn from_json(json: &str) -> Result<WhereSet> {
        Ok(serde_json::from_str(json)?)
    }
}

/// ORs where sets into one clause, each set in parentheses. Empty sets are
/// skipped; when nothing remains there is no clause at all.
pub fn combine(where_sets: &[WhereSet]) -> Option<(String, Vec<Value>)> {
    let mut clauses = Vec::new();
    let mut parameters = Vec::new();
    for where_set in where_sets.iter().filter(|w| !w.is_empty()) {
        clauses.push(format!("({})", where_set.placeholder_clause()));
        parameters.extend(where_set.parameters());
    }
    if clauses.is_empty() {
        None
    } else {
        Some((clauses.join(" OR "), parameters))
    }
}

// ------------- Serialized form -------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedValue {
    pub class_name: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereEntry {
    pub column: String,
    pub comparison: Comparison,
    pub values: Vec<TaggedValue>,
    pub is_negate: bool,
}

impl From<&Where> for WhereEntry {
    fn from(w: &Where) -> Self {
        Self {
            column: w.column.clone(),
            comparison: w.comparison,
            values: w
                .values
                .iter()
                .map(|v| TaggedValue {
                    class_name: v.data_type().to_owned(),
                    value: v.to_tagged(),
                })
                .collect(),
            is_negate: w.negate,
        }
    }
}

impl TryFrom<WhereEntry> for Where {
    type Error = RecordKeeperError;
    fn try_from(entry: WhereEntry) -> Result<Self> {
        let mut values = Vec::with_capacity(entry.values.len());
        for tagged in &entry.values {
            values.push(Value::from_tagged(&tagged.class_name, &tagged.value)?);
        }
        Where::new(&entry.column, entry.comparison, values, entry.is_negate)
    }
}

impl From<WhereSet> for Vec<WhereEntry> {
    fn from(where_set: WhereSet) -> Self {
        where_set.wheres.iter().map(WhereEntry::from).collect()
    }
}

impl TryFrom<Vec<WhereEntry>> for WhereSet {
    type Error = RecordKeeperError;
    fn try_from(entries: Vec<WhereEntry>) -> Result<Self> {
        let mut wheres = Vec::with_capacity(entries.len());
        for entry in entries {
            wheres.push(Where::try_from(entry)?);
        }
        Ok(Self { wheres })
    }
}
