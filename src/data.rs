use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::constants::aggregate::NULL_LABEL;
pub use crate::types::{DocumentId, FieldName, GroupLabel};

/// Scalar value held by one record field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Number(f64),
    Timestamp(DateTime<Utc>),
    Bool(bool),
    /// Null/unknown marker used for defaults and unmatched join fields.
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(number) if number.is_finite() => Some(*number),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Render the value as a ready-to-display group label.
    ///
    /// Whole numbers render without a fractional part (`3`, not `3.0`).
    pub fn label(&self) -> GroupLabel {
        match self {
            Value::Text(text) => text.clone(),
            Value::Number(number) if number.fract() == 0.0 && number.abs() < 1e15 => {
                format!("{}", *number as i64)
            }
            Value::Number(number) => number.to_string(),
            Value::Timestamp(ts) => ts.to_rfc3339_opts(SecondsFormat::Secs, true),
            Value::Bool(flag) => flag.to_string(),
            Value::Null => NULL_LABEL.to_string(),
        }
    }

    /// Hashable identity of the literal value.
    ///
    /// Two values share a key only when they have the same variant and value,
    /// so `Text("3")` and `Number(3.0)` stay apart even though their labels match.
    pub(crate) fn key(&self) -> ValueKey {
        match self {
            Value::Text(text) => ValueKey::Text(text.clone()),
            Value::Number(number) if number.is_nan() => ValueKey::Number(f64::NAN.to_bits()),
            // Normalize -0.0 so it matches 0.0.
            Value::Number(number) => ValueKey::Number((*number + 0.0).to_bits()),
            Value::Timestamp(ts) => ValueKey::Timestamp(ts.timestamp(), ts.timestamp_subsec_nanos()),
            Value::Bool(flag) => ValueKey::Bool(*flag),
            Value::Null => ValueKey::Null,
        }
    }
}

/// Typed grouping and join identity of a `Value`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum ValueKey {
    Text(String),
    Number(u64),
    Timestamp(i64, u32),
    Bool(bool),
    Null,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

static NULL_VALUE: Value = Value::Null;

/// Raw document as returned by a document store: an id plus opaque key/value fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub id: DocumentId,
    pub fields: Map<String, JsonValue>,
}

impl RawDocument {
    pub fn new(id: impl Into<DocumentId>, fields: Map<String, JsonValue>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Build a document from a JSON object; non-object payloads yield an empty field map.
    pub fn from_json(id: impl Into<DocumentId>, value: JsonValue) -> Self {
        let fields = match value {
            JsonValue::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(id, fields)
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.fields.get(key)
    }
}

/// Typed flat record produced by normalizing one raw document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: IndexMap<FieldName, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy of this record with `name` set to `value`.
    pub fn with(mut self, name: impl Into<FieldName>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Field value, or `None` when the record does not declare the field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Field value with absent fields read as the null marker.
    pub fn value(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&NULL_VALUE)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&FieldName, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn insert(&mut self, name: FieldName, value: Value) {
        self.fields.insert(name, value);
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<FieldName>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Ordered sequence of records sharing one declared field list.
///
/// Every record exposes every declared field; `RecordSet::new` fills any
/// missing declared field with the null marker.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    fields: Vec<FieldName>,
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new(fields: Vec<FieldName>, records: Vec<Record>) -> Self {
        let records = records
            .into_iter()
            .map(|record| conform(&fields, record))
            .collect();
        Self { fields, records }
    }

    /// Empty set that still declares its schema fields ("no data" state).
    pub fn empty(fields: Vec<FieldName>) -> Self {
        Self {
            fields,
            records: Vec::new(),
        }
    }

    pub fn fields(&self) -> &[FieldName] {
        &self.fields
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field == name)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Values of `field` in record order.
    pub fn column<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.records.iter().map(move |record| record.value(field))
    }

    /// Finite numeric values of `field` in record order; other values are skipped.
    pub fn numbers(&self, field: &str) -> Vec<f64> {
        self.column(field).filter_map(Value::as_number).collect()
    }

    /// New set holding the records that satisfy `predicate`, schema unchanged.
    pub fn filter(&self, predicate: impl Fn(&Record) -> bool) -> RecordSet {
        Self {
            fields: self.fields.clone(),
            records: self
                .records
                .iter()
                .filter(|record| predicate(record))
                .cloned()
                .collect(),
        }
    }

    /// New set ordered by the numeric value of `field`, descending.
    ///
    /// The sort is stable; records without a numeric value sort last.
    pub fn sorted_desc_by(&self, field: &str) -> RecordSet {
        let mut records = self.records.clone();
        records.sort_by(|a, b| {
            match (a.value(field).as_number(), b.value(field).as_number()) {
                (Some(left), Some(right)) => right.total_cmp(&left),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });
        Self {
            fields: self.fields.clone(),
            records,
        }
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn conform(fields: &[FieldName], record: Record) -> Record {
    if fields.len() == record.len() && fields.iter().all(|field| record.get(field).is_some()) {
        return record;
    }
    let mut conformed = record;
    for field in fields {
        if conformed.get(field).is_none() {
            conformed.insert(field.clone(), Value::Null);
        }
    }
    conformed
}
