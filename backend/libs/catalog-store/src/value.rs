//! Scalar values flowing between records, statements and result rows.
//!
//! [`Value`] is the only currency the engine knows about. Records hand their
//! fields out as values, the statement builder decides per value whether it is
//! inlined as a literal or bound as a parameter, and result rows arrive as
//! values that the row mapper converts back into the field's [`FieldKind`].

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};

use crate::dialect::Dialect;
use crate::error::{StoreError, StoreResult};
use crate::schema::Column;

/// Timestamp layout used by the full-text index and by filter ranges.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Int(i64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    TextList(Vec<String>),
    Json(serde_json::Value),
}

/// Declared kind of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Int,
    Bool,
    Timestamp,
    TextList,
    Json,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Int => "integer",
            FieldKind::Bool => "boolean",
            FieldKind::Timestamp => "timestamp",
            FieldKind::TextList => "list<text>",
            FieldKind::Json => "json",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Short description used in conversion errors.
    pub fn describe(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Text(s) => format!("text {:?}", s),
            Value::Int(i) => format!("integer {}", i),
            Value::Bool(b) => format!("boolean {}", b),
            Value::Timestamp(ts) => format!("timestamp {}", ts),
            Value::TextList(items) => format!("list of {} strings", items.len()),
            Value::Json(_) => "json".to_string(),
        }
    }

    /// Coerce a raw driver value into `kind`.
    ///
    /// Null passes through untouched; the record setter turns it into the
    /// field's zero value.
    pub fn convert(self, kind: FieldKind, column: &str) -> StoreResult<Value> {
        let expected = kind.as_str();
        match (kind, self) {
            (_, Value::Null) => Ok(Value::Null),
            (FieldKind::Text, Value::Text(s)) => Ok(Value::Text(s)),
            (FieldKind::Int, Value::Int(i)) => Ok(Value::Int(i)),
            (FieldKind::Int, Value::Text(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| StoreError::conversion(column, expected, format!("text {:?}", s))),
            (FieldKind::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),
            (FieldKind::Bool, Value::Int(i)) if i == 0 || i == 1 => Ok(Value::Bool(i == 1)),
            (FieldKind::Bool, Value::Text(s)) => match s.as_str() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(StoreError::conversion(column, expected, format!("text {:?}", s))),
            },
            (FieldKind::Timestamp, Value::Timestamp(ts)) => Ok(Value::Timestamp(ts)),
            (FieldKind::Timestamp, Value::Text(s)) => parse_timestamp(&s)
                .map(Value::Timestamp)
                .ok_or_else(|| StoreError::conversion(column, expected, format!("text {:?}", s))),
            (FieldKind::TextList, Value::TextList(items)) => Ok(Value::TextList(items)),
            (FieldKind::Json, Value::Json(json)) => Ok(Value::Json(json)),
            (FieldKind::Json, Value::Text(s)) => serde_json::from_str(&s)
                .map(Value::Json)
                .map_err(|_| StoreError::conversion(column, expected, "malformed json text")),
            (_, other) => Err(StoreError::conversion(column, expected, other.describe())),
        }
    }
}

/// Filter documents carry values in their natural JSON form; timestamps use
/// [`TIMESTAMP_FORMAT`].
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Timestamp(ts) => serializer.serialize_str(&format_timestamp(ts)),
            Value::TextList(items) => items.serialize(serializer),
            Value::Json(json) => json.serialize(serializer),
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Format a timestamp the way the full-text index expects it.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Render `value` as an inline literal, or `None` when it must be bound.
///
/// Only values that never need escaping are inlined: the empty string,
/// integers, explicit nulls and (where the dialect allows it) booleans.
pub fn render_literal<D: Dialect + ?Sized>(dialect: &D, column: &Column, value: &Value) -> Option<String> {
    match value {
        Value::Null => Some("null".to_string()),
        Value::Text(s) if s.is_empty() => Some("''".to_string()),
        Value::Int(i) => Some(i.to_string()),
        Value::Bool(b) if dialect.inline_bools() => Some(column.bool_literal(*b)),
        _ => None,
    }
}

/// Conversion between a Rust field type and [`Value`].
pub trait FieldValue: Sized {
    const KIND: FieldKind;

    fn to_value(&self) -> Value;

    /// `value` has already been converted to [`Self::KIND`]; `Null` yields
    /// the zero value. `None` signals a kind mismatch.
    fn from_value(value: Value) -> Option<Self>;
}

impl FieldValue for String {
    const KIND: FieldKind = FieldKind::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(String::new()),
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl FieldValue for i64 {
    const KIND: FieldKind = FieldKind::Int;

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(0),
            Value::Int(i) => Some(i),
            _ => None,
        }
    }
}

impl FieldValue for i32 {
    const KIND: FieldKind = FieldKind::Int;

    fn to_value(&self) -> Value {
        Value::Int(i64::from(*self))
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(0),
            Value::Int(i) => i32::try_from(i).ok(),
            _ => None,
        }
    }
}

impl FieldValue for bool {
    const KIND: FieldKind = FieldKind::Bool;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(false),
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl FieldValue for DateTime<Utc> {
    const KIND: FieldKind = FieldKind::Timestamp;

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(DateTime::<Utc>::default()),
            Value::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    const KIND: FieldKind = T::KIND;

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Element types that can be stored in a list column.
pub trait ListElement: Sized {
    const LIST_KIND: FieldKind;

    fn list_to_value(items: &[Self]) -> Value;

    fn list_from_value(value: Value) -> Option<Vec<Self>>;
}

impl ListElement for String {
    const LIST_KIND: FieldKind = FieldKind::TextList;

    fn list_to_value(items: &[Self]) -> Value {
        Value::TextList(items.to_vec())
    }

    fn list_from_value(value: Value) -> Option<Vec<Self>> {
        match value {
            Value::TextList(items) => Some(items),
            _ => None,
        }
    }
}

impl<T: ListElement> FieldValue for Vec<T> {
    const KIND: FieldKind = T::LIST_KIND;

    fn to_value(&self) -> Value {
        T::list_to_value(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(Vec::new()),
            other => T::list_from_value(other),
        }
    }
}

/// Encode a list of structured elements as a JSON column value.
pub fn json_list_to_value<T: Serialize>(items: &[T]) -> Value {
    serde_json::to_value(items)
        .map(Value::Json)
        .unwrap_or(Value::Null)
}

/// Decode a JSON column value into a list of structured elements.
pub fn json_list_from_value<T: DeserializeOwned>(value: Value) -> Option<Vec<T>> {
    match value {
        Value::Json(serde_json::Value::Null) => Some(Vec::new()),
        Value::Json(json) => serde_json::from_value(json).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_integer_from_text() {
        let value = Value::Text(" 42 ".to_string())
            .convert(FieldKind::Int, "count")
            .unwrap();
        assert_eq!(value, Value::Int(42));
    }

    #[test]
    fn test_convert_reports_column() {
        let err = Value::Text("abc".to_string())
            .convert(FieldKind::Int, "duration")
            .unwrap_err();
        match err {
            StoreError::Conversion { column, expected, .. } => {
                assert_eq!(column, "duration");
                assert_eq!(expected, "integer");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_convert_timestamp_layouts() {
        let expected = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap();
        let rfc = Value::Text("2021-03-04T05:06:07Z".to_string())
            .convert(FieldKind::Timestamp, "publishedat")
            .unwrap();
        let index = Value::Text("2021-03-04 05:06:07".to_string())
            .convert(FieldKind::Timestamp, "publishedat")
            .unwrap();
        assert_eq!(rfc, Value::Timestamp(expected));
        assert_eq!(index, Value::Timestamp(expected));
        assert_eq!(format_timestamp(&expected), "2021-03-04 05:06:07");
    }

    #[test]
    fn test_convert_list_rejects_scalar() {
        let err = Value::Int(3).convert(FieldKind::TextList, "tags").unwrap_err();
        assert!(matches!(err, StoreError::Conversion { .. }));
    }

    #[test]
    fn test_null_becomes_zero_value() {
        assert_eq!(String::from_value(Value::Null), Some(String::new()));
        assert_eq!(i64::from_value(Value::Null), Some(0));
        assert_eq!(Option::<bool>::from_value(Value::Null), Some(None));
        assert_eq!(Vec::<String>::from_value(Value::Null), Some(Vec::new()));
    }

    #[test]
    fn test_serialize_natural_json() {
        let ts = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(serde_json::to_string(&Value::Timestamp(ts)).unwrap(), "\"2021-03-04 05:06:07\"");
        assert_eq!(serde_json::to_string(&Value::Int(240)).unwrap(), "240");
        assert_eq!(serde_json::to_string(&Value::Null).unwrap(), "null");
    }

    #[test]
    fn test_option_kind_follows_inner() {
        assert_eq!(<Option<i32> as FieldValue>::KIND, FieldKind::Int);
        assert_eq!(<Vec<String> as FieldValue>::KIND, FieldKind::TextList);
        assert_eq!(Some(7i32).to_value(), Value::Int(7));
        assert_eq!(Option::<i32>::None.to_value(), Value::Null);
    }
}
