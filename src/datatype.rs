// used for persistence
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};

// used for timestamps in the database
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
// used for decimal numbers
use bigdecimal::{BigDecimal, ToPrimitive};

// used when parsing a string to a decimal
use std::str::FromStr;
// used to print out readable forms of a value
use std::fmt;
use std::cmp::Ordering;

use crate::error::{RecordKeeperError, Result};

/// How timestamps are bound to and read back from SQLite.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
/// How timestamps are rendered in serialized predicates.
pub const ISO_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A value crossing the boundary between the host and SQL, either as a bind
/// parameter or as a column of a fetched row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Decimal(BigDecimal),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    // type tags, used when a value is serialized alongside its type
    pub const NULL: &'static str = "Null";
    pub const INTEGER: &'static str = "i64";
    pub const REAL: &'static str = "f64";
    pub const DECIMAL: &'static str = "Decimal";
    pub const TEXT: &'static str = "String";
    pub const TIMESTAMP: &'static str = "NaiveDateTime";

    pub fn data_type(&self) -> &'static str {
        match self {
            Value::Null => Self::NULL,
            Value::Integer(_) => Self::INTEGER,
            Value::Real(_) => Self::REAL,
            Value::Decimal(_) => Self::DECIMAL,
            Value::Text(_) => Self::TEXT,
            Value::Timestamp(_) => Self::TIMESTAMP,
        }
    }
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Real(_) | Value::Decimal(_))
    }
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Real(r) if r.fract() == 0.0 => Some(*r as i64),
            Value::Decimal(d) => d.to_i64(),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
    /// Timestamps are often stored as text, so text is parsed leniently.
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(t) => Some(*t),
            Value::Text(s) => parse_timestamp(s),
            _ => None,
        }
    }

    /// True when both values are last-modification markers and `self` is
    /// strictly newer. Values that cannot be compared are never newer.
    pub fn is_newer_than(&self, other: &Value) -> bool {
        match (self.as_timestamp(), other.as_timestamp()) {
            (Some(current), Some(previous)) => return current > previous,
            (None, None) => {}
            _ => return false,
        }
        match (self, other) {
            (Value::Integer(_) | Value::Real(_) | Value::Decimal(_),
             Value::Integer(_) | Value::Real(_) | Value::Decimal(_)) => {
                self.as_f64().partial_cmp(&other.as_f64()) == Some(Ordering::Greater)
            }
            _ => false,
        }
    }
    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Result normalization: the declared column type decides whether text
    /// holds a timestamp, and decimal columns are read as floating point.
    pub fn from_sql_result(value: ValueRef<'_>, declared_type: Option<&str>) -> Value {
        let declared = declared_type.map(str::to_uppercase).unwrap_or_default();
        let temporal = declared.contains("DATE") || declared.contains("TIME");
        let decimal = declared.contains("DEC") || declared.contains("NUMERIC");
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => {
                if decimal { Value::Real(i as f64) } else { Value::Integer(i) }
            }
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(bytes) => {
                let text = String::from_utf8_lossy(bytes).into_owned();
                if temporal {
                    if let Some(t) = parse_timestamp(&text) {
                        return Value::Timestamp(t);
                    }
                }
                if decimal {
                    if let Some(r) = BigDecimal::from_str(text.trim()).ok().and_then(|d| d.to_f64()) {
                        return Value::Real(r);
                    }
                }
                Value::Text(text)
            }
            ValueRef::Blob(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    /// Rebuilds a typed value from its type tag and a JSON scalar.
    pub fn from_tagged(data_type: &str, value: &serde_json::Value) -> Result<Value> {
        let mismatch = || {
            RecordKeeperError::Predicate(format!("cannot read {} as {}", value, data_type))
        };
        match data_type {
            Self::NULL => Ok(Value::Null),
            Self::INTEGER => value.as_i64().map(Value::Integer).ok_or_else(mismatch),
            Self::REAL => value.as_f64().map(Value::Real).ok_or_else(mismatch),
            Self::DECIMAL => value
                .as_str()
                .and_then(|s| BigDecimal::from_str(s).ok())
                .map(Value::Decimal)
                .ok_or_else(mismatch),
            Self::TEXT => value
                .as_str()
                .map(|s| Value::Text(s.to_owned()))
                .ok_or_else(mismatch),
            Self::TIMESTAMP => value
                .as_str()
                .and_then(parse_timestamp)
                .map(Value::Timestamp)
                .ok_or_else(mismatch),
            other => Err(RecordKeeperError::Predicate(format!("unknown value type '{}'", other))),
        }
    }
    /// The JSON scalar written next to the type tag.
    pub fn to_tagged(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Real(r) => serde_json::Value::from(*r),
            Value::Decimal(d) => serde_json::Value::from(d.to_string()),
            Value::Text(s) => serde_json::Value::from(s.clone()),
            Value::Timestamp(t) => {
                serde_json::Value::from(t.format(ISO_TIMESTAMP_FORMAT).to_string())
            }
        }
    }
}

/// Accepts `YYYY-MM-DD HH:MM:SS[.f]`, the same with a `T` separator, and
/// plain dates (taken as midnight).
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, ISO_TIMESTAMP_FORMAT))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

// ------------- Bind normalization --------------
// Every host value becomes a Value before it is stored in a predicate or a
// record. Dates and zoned date-times collapse into naive UTC timestamps.
impl From<i64> for Value {
    fn from(i: i64) -> Self { Value::Integer(i) }
}
impl From<i32> for Value {
    fn from(i: i32) -> Self { Value::Integer(i as i64) }
}
impl From<u32> for Value {
    fn from(i: u32) -> Self { Value::Integer(i as i64) }
}
impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Integer(b as i64) }
}
impl From<f64> for Value {
    fn from(r: f64) -> Self { Value::Real(r) }
}
impl From<BigDecimal> for Value {
    fn from(d: BigDecimal) -> Self { Value::Decimal(d) }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::Text(s.to_owned()) }
}
impl From<String> for Value {
    fn from(s: String) -> Self { Value::Text(s) }
}
impl From<NaiveDateTime> for Value {
    fn from(t: NaiveDateTime) -> Self { Value::Timestamp(t) }
}
impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self { Value::Timestamp(d.and_time(NaiveTime::MIN)) }
}
impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self { Value::Timestamp(t.naive_utc()) }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(o: Option<T>) -> Self {
        match o {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::from(rusqlite::types::Null),
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Real(r) => ToSqlOutput::from(*r),
            Value::Decimal(d) => ToSqlOutput::from(d.to_string()),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Timestamp(t) => ToSqlOutput::from(t.format(TIMESTAMP_FORMAT).to_string()),
        })
    }
}

// Null renders as the empty string, so a string rendering of a record
// compares equal for "no value" regardless of how it was produced.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Text(s) => write!(f, "{}", s),
            Value::Timestamp(t) => write!(f, "{}", t.format(TIMESTAMP_FORMAT)),
        }
    }
}
