//! Left-outer hash join over record sets.
//!
//! Tie-break policy: when several right records share a key, the first one in
//! the right set's iteration order is used and the rest are ignored. Left
//! records whose key is null, absent, or unmatched keep their row and get
//! every requested right field set to the null marker.

use std::collections::HashMap;

use crate::constants::aggregate::JOIN_COLLISION_SUFFIX;
use crate::data::{Record, RecordSet, Value, ValueKey};
use crate::types::FieldName;

/// Field pair compared for equality when joining two record sets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinKey {
    pub left: FieldName,
    pub right: FieldName,
}

impl JoinKey {
    /// Join on a field that carries the same name on both sides.
    pub fn on(field: impl Into<FieldName>) -> Self {
        let field = field.into();
        Self {
            left: field.clone(),
            right: field,
        }
    }

    /// Join on differently named fields.
    pub fn between(left: impl Into<FieldName>, right: impl Into<FieldName>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

/// Join identity of a key value; null and non-finite keys never match.
fn join_key(value: &Value) -> Option<ValueKey> {
    match value {
        Value::Null => None,
        Value::Number(number) if !number.is_finite() => None,
        other => Some(other.key()),
    }
}

/// Left-outer join of `left` and `right` on `key`, copying `right_fields`.
///
/// The output has exactly `left.len()` records in left order. Its fields are
/// left's fields followed by `right_fields`; a right field whose name already
/// exists on the left is emitted as `<name>_right`.
pub fn left_join(
    left: &RecordSet,
    right: &RecordSet,
    key: &JoinKey,
    right_fields: &[FieldName],
) -> RecordSet {
    let mut index: HashMap<ValueKey, usize> = HashMap::with_capacity(right.len());
    for (position, record) in right.iter().enumerate() {
        if let Some(key_value) = join_key(record.value(&key.right)) {
            index.entry(key_value).or_insert(position);
        }
    }

    let output_names: Vec<(FieldName, FieldName)> = right_fields
        .iter()
        .map(|field| {
            let output = if left.has_field(field) {
                format!("{field}{JOIN_COLLISION_SUFFIX}")
            } else {
                field.clone()
            };
            (field.clone(), output)
        })
        .collect();

    let records = left
        .iter()
        .map(|record| {
            let matched = join_key(record.value(&key.left))
                .and_then(|key_value| index.get(&key_value))
                .map(|position| &right.records()[*position]);
            let mut joined: Record = record.clone();
            for (source, output) in &output_names {
                let value = matched
                    .map(|right_record| right_record.value(source).clone())
                    .unwrap_or(Value::Null);
                joined.insert(output.clone(), value);
            }
            joined
        })
        .collect();

    let mut fields = left.fields().to_vec();
    fields.extend(output_names.into_iter().map(|(_, output)| output));
    RecordSet::new(fields, records)
}

impl RecordSet {
    /// Method form of [`left_join`], convenient for chaining three-way joins.
    pub fn left_join(&self, right: &RecordSet, key: &JoinKey, right_fields: &[FieldName]) -> Self {
        left_join(self, right, key, right_fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards() -> RecordSet {
        RecordSet::new(
            vec!["card_id".into(), "store_id".into()],
            vec![
                Record::new().with("card_id", "c1").with("store_id", "s1"),
                Record::new().with("card_id", "c2").with("store_id", "s2"),
                Record::new().with("card_id", "c3").with("store_id", Value::Null),
                Record::new().with("card_id", "c4").with("store_id", "s9"),
            ],
        )
    }

    fn stores() -> RecordSet {
        RecordSet::new(
            vec!["store_id".into(), "name".into()],
            vec![
                Record::new().with("store_id", "s1").with("name", "Bakery"),
                Record::new().with("store_id", "s2").with("name", "Books"),
                Record::new().with("store_id", "s1").with("name", "Bakery (dup)"),
            ],
        )
    }

    #[test]
    fn left_join_preserves_left_rows_and_order() {
        let joined = left_join(&cards(), &stores(), &JoinKey::on("store_id"), &["name".into()]);
        assert_eq!(joined.len(), 4);
        let ids: Vec<String> = joined.column("card_id").map(Value::label).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3", "c4"]);
        assert_eq!(joined.fields(), ["card_id", "store_id", "name"]);
    }

    #[test]
    fn first_right_duplicate_wins() {
        let joined = left_join(&cards(), &stores(), &JoinKey::on("store_id"), &["name".into()]);
        assert_eq!(joined.records()[0].value("name"), &Value::from("Bakery"));
        assert_eq!(joined.records()[1].value("name"), &Value::from("Books"));
    }

    #[test]
    fn null_and_unmatched_keys_get_null_right_fields() {
        let joined = left_join(&cards(), &stores(), &JoinKey::on("store_id"), &["name".into()]);
        assert!(joined.records()[2].value("name").is_null());
        assert!(joined.records()[3].value("name").is_null());
    }

    #[test]
    fn absent_left_key_field_is_a_non_match() {
        let left = RecordSet::new(vec!["card_id".into()], vec![Record::new().with("card_id", "c1")]);
        let joined = left_join(&left, &stores(), &JoinKey::on("store_id"), &["name".into()]);
        assert_eq!(joined.len(), 1);
        assert!(joined.records()[0].value("name").is_null());
    }

    #[test]
    fn colliding_right_fields_are_suffixed() {
        let joined = left_join(
            &stores(),
            &stores(),
            &JoinKey::on("store_id"),
            &["name".into()],
        );
        assert_eq!(joined.fields(), ["store_id", "name", "name_right"]);
        assert_eq!(joined.records()[2].value("name"), &Value::from("Bakery (dup)"));
        assert_eq!(joined.records()[2].value("name_right"), &Value::from("Bakery"));
    }

    #[test]
    fn numeric_keys_match_across_signed_zero() {
        let left = RecordSet::new(vec!["k".into()], vec![Record::new().with("k", -0.0)]);
        let right = RecordSet::new(
            vec!["k".into(), "v".into()],
            vec![Record::new().with("k", 0.0).with("v", "zero")],
        );
        let joined = left_join(&left, &right, &JoinKey::on("k"), &["v".into()]);
        assert_eq!(joined.records()[0].value("v"), &Value::from("zero"));
    }

    #[test]
    fn three_way_join_is_two_sequential_joins() {
        let purchases = RecordSet::new(
            vec!["purchase_id".into(), "card_id".into()],
            vec![
                Record::new().with("purchase_id", "p1").with("card_id", "c2"),
                Record::new().with("purchase_id", "p2").with("card_id", "c7"),
            ],
        );
        let joined = purchases
            .left_join(&cards(), &JoinKey::on("card_id"), &["store_id".into()])
            .left_join(&stores(), &JoinKey::on("store_id"), &["name".into()]);
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.records()[0].value("name"), &Value::from("Books"));
        assert!(joined.records()[1].value("name").is_null());
    }
}
