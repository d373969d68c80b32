//! Record normalization: raw documents to typed flat records.
//!
//! A `RecordSchema` is built once per pipeline and evaluated against every
//! document of a collection. Normalization never fails: an absent, null, or
//! non-coercible source field is replaced by the field's declared default.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::constants::normalize::{DOCUMENT_ID_KEY, TIMESTAMP_NANOS_KEYS, TIMESTAMP_SECONDS_KEYS};
use crate::data::{RawDocument, Record, RecordSet, Value};
use crate::types::{FieldName, SourceKey};

/// Target type a source field is coerced into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Timestamp,
    Bool,
}

/// Value substituted when a source field is missing or unusable.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldDefault {
    /// A fixed value.
    Value(Value),
    /// The normalization call time.
    Now,
    /// The null/unknown marker.
    Null,
}

impl FieldDefault {
    fn resolve(&self, now: DateTime<Utc>) -> Value {
        match self {
            FieldDefault::Value(value) => value.clone(),
            FieldDefault::Now => Value::Timestamp(now),
            FieldDefault::Null => Value::Null,
        }
    }
}

/// Declaration of one record field: name, source key, type, and default.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSpec {
    pub name: FieldName,
    pub source_key: SourceKey,
    pub kind: FieldKind,
    pub default: FieldDefault,
}

impl FieldSpec {
    fn new(name: impl Into<FieldName>, source_key: impl Into<SourceKey>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            source_key: source_key.into(),
            kind,
            default: FieldDefault::Null,
        }
    }

    pub fn text(name: impl Into<FieldName>, source_key: impl Into<SourceKey>) -> Self {
        Self::new(name, source_key, FieldKind::Text)
    }

    pub fn number(name: impl Into<FieldName>, source_key: impl Into<SourceKey>) -> Self {
        Self::new(name, source_key, FieldKind::Number)
    }

    pub fn timestamp(name: impl Into<FieldName>, source_key: impl Into<SourceKey>) -> Self {
        Self::new(name, source_key, FieldKind::Timestamp)
    }

    pub fn boolean(name: impl Into<FieldName>, source_key: impl Into<SourceKey>) -> Self {
        Self::new(name, source_key, FieldKind::Bool)
    }

    /// Field that carries the document id rather than a document field.
    pub fn document_id(name: impl Into<FieldName>) -> Self {
        Self::new(name, DOCUMENT_ID_KEY, FieldKind::Text)
    }

    /// Override the default with a fixed value.
    pub fn or(mut self, value: impl Into<Value>) -> Self {
        self.default = FieldDefault::Value(value.into());
        self
    }

    /// Default missing values to the normalization call time.
    pub fn or_now(mut self) -> Self {
        self.default = FieldDefault::Now;
        self
    }

    fn extract(&self, document: &RawDocument, now: DateTime<Utc>) -> Value {
        let coerced = if self.source_key == DOCUMENT_ID_KEY {
            coerce(&JsonValue::String(document.id.clone()), self.kind)
        } else {
            document
                .get(&self.source_key)
                .and_then(|raw| coerce(raw, self.kind))
        };
        match coerced {
            Some(value) => value,
            None => {
                if let Some(raw) = document.get(&self.source_key).filter(|raw| !raw.is_null()) {
                    debug!(
                        document_id = %document.id,
                        field = %self.name,
                        raw = %raw,
                        "source field not coercible; using default"
                    );
                }
                self.default.resolve(now)
            }
        }
    }
}

/// Ordered field specification evaluated against every document of a pipeline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordSchema {
    specs: Vec<FieldSpec>,
}

impl RecordSchema {
    pub fn new(specs: Vec<FieldSpec>) -> Self {
        Self { specs }
    }

    /// Append a field declaration.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn specs(&self) -> &[FieldSpec] {
        &self.specs
    }

    /// Declared field names in schema order.
    pub fn field_names(&self) -> Vec<FieldName> {
        self.specs.iter().map(|spec| spec.name.clone()).collect()
    }

    /// Empty record set declaring this schema's fields.
    pub fn empty_set(&self) -> RecordSet {
        RecordSet::empty(self.field_names())
    }
}

/// Normalize one document into a record exposing every declared field.
///
/// `now` resolves `FieldDefault::Now`; pass the call time (`Utc::now()`).
pub fn normalize(document: &RawDocument, schema: &RecordSchema, now: DateTime<Utc>) -> Record {
    let mut record = Record::new();
    for spec in schema.specs() {
        record.insert(spec.name.clone(), spec.extract(document, now));
    }
    record
}

/// Normalize a batch of documents with one shared call time.
pub fn normalize_all<'a, I>(documents: I, schema: &RecordSchema, now: DateTime<Utc>) -> RecordSet
where
    I: IntoIterator<Item = &'a RawDocument>,
{
    let records = documents
        .into_iter()
        .map(|document| normalize(document, schema, now))
        .collect();
    RecordSet::new(schema.field_names(), records)
}

/// Coerce a raw JSON value into `kind`; `None` when null or not coercible.
pub fn coerce(raw: &JsonValue, kind: FieldKind) -> Option<Value> {
    match kind {
        FieldKind::Text => coerce_text(raw).map(Value::Text),
        FieldKind::Number => coerce_number(raw).map(Value::Number),
        FieldKind::Timestamp => coerce_timestamp(raw).map(Value::Timestamp),
        FieldKind::Bool => coerce_bool(raw).map(Value::Bool),
    }
}

fn coerce_text(raw: &JsonValue) -> Option<String> {
    match raw {
        JsonValue::String(text) => Some(text.clone()),
        JsonValue::Number(number) => Some(number.to_string()),
        JsonValue::Bool(flag) => Some(flag.to_string()),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

fn coerce_number(raw: &JsonValue) -> Option<f64> {
    let number = match raw {
        JsonValue::Number(number) => number.as_f64()?,
        JsonValue::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn coerce_bool(raw: &JsonValue) -> Option<bool> {
    match raw {
        JsonValue::Bool(flag) => Some(*flag),
        JsonValue::String(text) if text.eq_ignore_ascii_case("true") => Some(true),
        JsonValue::String(text) if text.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// Accepts RFC 3339 strings, integer epoch milliseconds, and exported
/// document-store timestamp objects (`{"_seconds": .., "_nanoseconds": ..}`).
fn coerce_timestamp(raw: &JsonValue) -> Option<DateTime<Utc>> {
    match raw {
        JsonValue::String(text) => DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        JsonValue::Number(number) => {
            let millis = number
                .as_i64()
                .or_else(|| number.as_f64().map(|value| value as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        JsonValue::Object(map) => {
            let seconds = TIMESTAMP_SECONDS_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(JsonValue::as_i64))?;
            let nanos = TIMESTAMP_NANOS_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(JsonValue::as_u64))
                .unwrap_or(0);
            Utc.timestamp_opt(seconds, u32::try_from(nanos).ok()?).single()
        }
        _ => None,
    }
}
