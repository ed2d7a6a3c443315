use std::fmt;

use crate::datatype::Value;
use crate::error::{RecordKeeperError, Result};
use crate::schema::Column;

// ------------- Record -------------
/// One row: physical column names mapped to values.
///
/// Names are unique and keep the order they were first set in, which is the
/// order used for column lists in generated SQL. Equality ignores order.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }
    /// Builder form of [`Record::set_field`].
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set_field(name, value);
        self
    }
    pub fn set(&mut self, column: &Column, value: impl Into<Value>) {
        self.set_field(column.name(), value);
    }
    /// Replaces the value in place when the name already exists.
    pub fn set_field(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name.to_owned(), value)),
        }
    }
    pub fn get(&self, column: &Column) -> Option<&Value> {
        self.field(column.name())
    }
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let position = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(position).1)
    }
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }
    pub fn len(&self) -> usize {
        self.fields.len()
    }
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }
    /// The string-keyed string rendering of every field.
    pub fn to_strings(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|(n, v)| (n.clone(), v.to_string()))
            .collect()
    }
    /// Renders the record as a JSON object with tagged values.
    pub fn to_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        for (name, value) in &self.fields {
            object.insert(
                name.clone(),
                serde_json::json!({
                    "class_name": value.data_type(),
                    "value": value.to_tagged(),
                }),
            );
        }
        serde_json::Value::Object(object)
    }
    pub fn from_json(json: &serde_json::Value) -> Result<Record> {
        let object = json.as_object().ok_or_else(|| {
            RecordKeeperError::Serialization(format!("expected a JSON object, got {}", json))
        })?;
        let mut record = Record::new();
        for (name, tagged) in object {
            let data_type = tagged
                .get("class_name")
                .and_then(|c| c.as_str())
                .ok_or_else(|| {
                    RecordKeeperError::Serialization(format!("field '{}' has no class_name", name))
                })?;
            let value = tagged.get("value").unwrap_or(&serde_json::Value::Null);
            record.set_field(name, Value::from_tagged(data_type, value)?);
        }
        Ok(record)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.iter().all(|(n, v)| other.field(n) == Some(v))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut s = String::new();
        for (name, value) in &self.fields {
            s += &format!("{}={},", name, value);
        }
        s.pop();
        write!(f, "{{{}}}", s)
    }
}

impl<S: Into<String>, V: Into<Value>> FromIterator<(S, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            let name: String = name.into();
            record.set_field(&name, value);
        }
        record
    }
}
