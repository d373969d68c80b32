//! Extraction stage: store fetches normalized into record sets.
//!
//! Store failures stop here. They are logged and replaced by an empty set
//! that still declares the schema's fields, so every later stage sees a
//! valid "no data" input instead of an error.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::constants::fields;
use crate::constants::source_keys;
use crate::data::RecordSet;
use crate::normalize::{FieldSpec, RecordSchema, normalize_all};
use crate::store::DocumentStore;

/// Fetch and normalize a whole collection.
///
/// A store error is logged with `warn!` and yields `schema.empty_set()`.
pub fn extract<S>(store: &S, path: &str, schema: &RecordSchema, now: DateTime<Utc>) -> RecordSet
where
    S: DocumentStore + ?Sized,
{
    match store.fetch_collection(path) {
        Ok(documents) => {
            let set = normalize_all(&documents, schema, now);
            debug!(collection = path, records = set.len(), "collection extracted");
            set
        }
        Err(err) => {
            warn!(collection = path, error = %err, "collection fetch failed; continuing without data");
            schema.empty_set()
        }
    }
}

/// Fetch documents one by one for each distinct id, in first-seen order.
///
/// Missing documents are skipped. A failed lookup is logged and skipped
/// without aborting the remaining lookups.
pub fn extract_by_ids<'a, S, I>(
    store: &S,
    path: &str,
    ids: I,
    schema: &RecordSchema,
    now: DateTime<Utc>,
) -> RecordSet
where
    S: DocumentStore + ?Sized,
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashSet<&str> = HashSet::new();
    let mut documents = Vec::new();
    for id in ids {
        if !seen.insert(id) {
            continue;
        }
        match store.fetch_document(path, id) {
            Ok(Some(document)) => documents.push(document),
            Ok(None) => debug!(collection = path, id, "document not found"),
            Err(err) => warn!(collection = path, id, error = %err, "document fetch failed"),
        }
    }
    normalize_all(&documents, schema, now)
}

/// QR render-time events.
pub fn render_time_schema() -> RecordSchema {
    RecordSchema::default()
        .field(FieldSpec::text(fields::USER_ID, source_keys::USER_ID).or("unknown"))
        .field(FieldSpec::number(fields::RENDER_TIME, source_keys::QR_RENDER_TIME).or(0.0))
        .field(FieldSpec::timestamp(fields::TIMESTAMP, source_keys::TIMESTAMP).or_now())
}

/// Language-change events.
pub fn language_change_schema() -> RecordSchema {
    RecordSchema::default()
        .field(FieldSpec::text(fields::USER_ID, source_keys::USER_ID))
        .field(FieldSpec::text(fields::LANGUAGE, source_keys::LANGUAGE))
        .field(FieldSpec::timestamp(fields::TIMESTAMP, source_keys::TIMESTAMP).or_now())
}

pub fn user_schema() -> RecordSchema {
    RecordSchema::default().field(FieldSpec::document_id(fields::USER_ID))
}

pub fn store_schema() -> RecordSchema {
    RecordSchema::default()
        .field(FieldSpec::document_id(fields::STORE_ID))
        .field(FieldSpec::text(fields::STORE_NAME, source_keys::STORE_NAME))
}

/// Loyalty cards; a card without `isCurrent` counts as inactive.
pub fn loyalty_card_schema() -> RecordSchema {
    RecordSchema::default()
        .field(FieldSpec::document_id(fields::CARD_ID))
        .field(FieldSpec::text(fields::STORE_ID, source_keys::CARD_STORE_ID))
        .field(FieldSpec::text(fields::USER_ID, source_keys::CARD_USER_ID))
        .field(FieldSpec::boolean(fields::IS_CURRENT, source_keys::CARD_IS_CURRENT).or(false))
}

pub fn purchase_schema() -> RecordSchema {
    RecordSchema::default()
        .field(FieldSpec::document_id(fields::PURCHASE_ID))
        .field(FieldSpec::text(fields::CARD_ID, source_keys::PURCHASE_CARD_ID))
        .field(FieldSpec::timestamp(fields::PURCHASE_DATE, source_keys::PURCHASE_DATE).or_now())
        .field(FieldSpec::number(fields::PURCHASE_TOTAL, source_keys::PURCHASE_TOTAL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RawDocument, Value};
    use crate::errors::PipelineError;
    use crate::store::InMemoryStore;
    use chrono::TimeZone;
    use serde_json::json;

    struct FailingStore;

    impl DocumentStore for FailingStore {
        fn fetch_collection(&self, path: &str) -> Result<Vec<RawDocument>, PipelineError> {
            Err(PipelineError::SourceUnavailable {
                collection: path.to_string(),
                reason: "offline".to_string(),
            })
        }

        fn fetch_document(
            &self,
            path: &str,
            _id: &str,
        ) -> Result<Option<RawDocument>, PipelineError> {
            self.fetch_collection(path).map(|_| None)
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 4, 12, 0, 0).unwrap()
    }

    #[test]
    fn extract_defaults_missing_render_time_fields() {
        let store = InMemoryStore::new().with_collection(
            "qr",
            vec![
                RawDocument::from_json(
                    "e1",
                    json!({ "userId": "u1", "qr_rtime": 80, "timestamp": "2024-11-01T09:00:00Z" }),
                ),
                RawDocument::from_json("e2", json!({ "qr_rtime": null })),
            ],
        );
        let set = extract(&store, "qr", &render_time_schema(), now());
        assert_eq!(set.len(), 2);
        let missing = &set.records()[1];
        assert_eq!(missing.value(fields::USER_ID), &Value::from("unknown"));
        assert_eq!(missing.value(fields::RENDER_TIME), &Value::Number(0.0));
        assert_eq!(missing.value(fields::TIMESTAMP), &Value::Timestamp(now()));
    }

    #[test]
    fn extract_failure_yields_empty_set_with_schema_fields() {
        let set = extract(&FailingStore, "users", &user_schema(), now());
        assert!(set.is_empty());
        assert_eq!(set.fields(), &[fields::USER_ID.to_string()]);
    }

    #[test]
    fn extract_by_ids_skips_duplicates_and_missing_documents() {
        let store = InMemoryStore::new().with_collection(
            "stores",
            vec![
                RawDocument::from_json("s1", json!({ "name": "Bakery" })),
                RawDocument::from_json("s2", json!({ "name": "Books" })),
            ],
        );
        let set = extract_by_ids(
            &store,
            "stores",
            ["s2", "s1", "s2", "s9"],
            &store_schema(),
            now(),
        );
        let ids: Vec<String> = set.column(fields::STORE_ID).map(Value::label).collect();
        assert_eq!(ids, vec!["s2", "s1"]);

        let failed = extract_by_ids(&FailingStore, "stores", ["s1"], &store_schema(), now());
        assert!(failed.is_empty());
    }

    #[test]
    fn loyalty_cards_default_to_inactive() {
        let store = InMemoryStore::new().with_collection(
            "loyaltyCards",
            vec![RawDocument::from_json("c1", json!({ "storeId": "s1", "user_id": "u1" }))],
        );
        let set = extract(&store, "loyaltyCards", &loyalty_card_schema(), now());
        assert_eq!(set.records()[0].value(fields::IS_CURRENT), &Value::Bool(false));
        assert_eq!(set.records()[0].value(fields::CARD_ID), &Value::from("c1"));
    }
}
