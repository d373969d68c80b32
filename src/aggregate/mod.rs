//! Pure aggregations over record sets.
//!
//! Every function here is referentially transparent: identical inputs give
//! identical outputs, so callers may memoize results freely.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Utc, Weekday};
use indexmap::IndexMap;
use serde::Serialize;

use crate::constants::aggregate::WEEKDAY_ORDER;
use crate::data::{Record, RecordSet, Value, ValueKey};
use crate::types::{GroupLabel, UserId};

/// Bucketization of numeric fields into labeled half-open intervals.
pub mod buckets;
/// Descriptive statistics (count, mean, spread, quartiles).
pub mod stats;

pub use buckets::{Buckets, bucket_counts, bucketize};
pub use stats::{Statistics, describe, percentile};

/// How the entries of an `AggregationResult` are ordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum GroupOrder {
    /// Order in which each group was first encountered in the input.
    FirstSeen,
    /// A fixed display order independent of the data (e.g. weekdays, bucket labels).
    Fixed,
    /// Count descending, ties in first-encountered order.
    CountDescending,
}

/// Labeled groups with one metric each, plus the ordering used for display.
///
/// Groups are distinct literal values, so two groups may render the same
/// label (`Text("3")` and `Number(3.0)` both show as `3`).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregationResult<M = usize> {
    entries: Vec<(GroupLabel, M)>,
    order: GroupOrder,
}

impl<M> AggregationResult<M> {
    pub(crate) fn from_entries(
        entries: impl IntoIterator<Item = (GroupLabel, M)>,
        order: GroupOrder,
    ) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            order,
        }
    }

    /// Metric of the first group rendered as `label`.
    pub fn get(&self, label: &str) -> Option<&M> {
        self.entries
            .iter()
            .find(|(group, _)| group == label)
            .map(|(_, metric)| metric)
    }

    pub fn order(&self) -> GroupOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &GroupLabel> {
        self.entries.iter().map(|(label, _)| label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupLabel, &M)> {
        self.entries.iter().map(|(label, metric)| (label, metric))
    }
}

impl AggregationResult<usize> {
    /// Sum of all group counts.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    /// Largest group count, if any group exists.
    pub fn max(&self) -> Option<usize> {
        self.entries.iter().map(|(_, count)| *count).max()
    }

    /// Mean group count; `None` when there are no groups.
    pub fn mean(&self) -> Option<f64> {
        if self.entries.is_empty() {
            return None;
        }
        Some(self.total() as f64 / self.entries.len() as f64)
    }

    /// Entries reordered by count descending (stable: ties keep current order).
    pub fn sorted_by_count(&self) -> Self {
        let mut entries = self.entries.clone();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        Self {
            entries,
            order: GroupOrder::CountDescending,
        }
    }
}

/// Count records per distinct literal value of `field`, in first-seen order.
///
/// Groups are keyed by the typed value and labeled on output, so `Text("3")`
/// and `Number(3.0)` stay separate groups. Null values form their own group
/// under the null label; nothing is filtered, so the counts always sum to
/// `set.len()`.
pub fn group_count(set: &RecordSet, field: &str) -> AggregationResult<usize> {
    let mut groups: IndexMap<ValueKey, (&Value, usize)> = IndexMap::new();
    for value in set.column(field) {
        groups.entry(value.key()).or_insert((value, 0)).1 += 1;
    }
    AggregationResult::from_entries(
        groups
            .into_values()
            .map(|(value, count)| (value.label(), count)),
        GroupOrder::FirstSeen,
    )
}

/// The `n` groups with the highest counts; ties keep first-encountered order.
pub fn top_n(counts: &AggregationResult<usize>, n: usize) -> Vec<(GroupLabel, usize)> {
    counts
        .sorted_by_count()
        .entries
        .into_iter()
        .take(n)
        .collect()
}

/// English weekday name for `weekday`.
pub fn weekday_name(weekday: Weekday) -> &'static str {
    WEEKDAY_ORDER[weekday.num_days_from_monday() as usize]
}

/// Count records per weekday (UTC) of `field`, always keyed Monday..Sunday.
///
/// Days absent from the data are present with count 0. Records whose field
/// is not a timestamp are not counted.
pub fn weekday_distribution(set: &RecordSet, field: &str) -> AggregationResult<usize> {
    let mut entries: IndexMap<GroupLabel, usize> = WEEKDAY_ORDER
        .iter()
        .map(|day| (day.to_string(), 0))
        .collect();
    for ts in set.column(field).filter_map(Value::as_timestamp) {
        if let Some(count) = entries.get_mut(weekday_name(ts.weekday())) {
            *count += 1;
        }
    }
    AggregationResult::from_entries(entries, GroupOrder::Fixed)
}

/// Number of distinct non-null values of `field` among records passing `filter`.
pub fn distinct_count(set: &RecordSet, field: &str, filter: impl Fn(&Record) -> bool) -> usize {
    set.iter()
        .filter(|record| filter(record))
        .map(|record| record.value(field))
        .filter(|value| !value.is_null())
        .map(Value::key)
        .collect::<HashSet<_>>()
        .len()
}

/// Per-user event count plus first and last event timestamps.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserChangeSummary {
    pub user: UserId,
    pub count: usize,
    /// Earliest timestamp; `None` when none of the user's records carry one.
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
}

/// Summarize records per user (first-seen order): count, min and max timestamp.
///
/// Records without a user are skipped; they cannot be attributed to anyone.
pub fn user_change_summary(
    set: &RecordSet,
    user_field: &str,
    timestamp_field: &str,
) -> Vec<UserChangeSummary> {
    let mut per_user: IndexMap<ValueKey, UserChangeSummary> = IndexMap::new();
    for record in set {
        let user = record.value(user_field);
        if user.is_null() {
            continue;
        }
        let ts = record.value(timestamp_field).as_timestamp();
        let entry = per_user
            .entry(user.key())
            .or_insert_with(|| UserChangeSummary {
                user: user.label(),
                count: 0,
                first: None,
                last: None,
            });
        entry.count += 1;
        if let Some(ts) = ts {
            entry.first = Some(entry.first.map_or(ts, |first| first.min(ts)));
            entry.last = Some(entry.last.map_or(ts, |last| last.max(ts)));
        }
    }
    per_user.into_values().collect()
}

/// Users that recorded more than one change.
pub fn users_with_multiple_changes(summaries: &[UserChangeSummary]) -> Vec<&UserChangeSummary> {
    summaries.iter().filter(|summary| summary.count > 1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn languages() -> RecordSet {
        let ts = |day: u32, hour: u32| Utc.with_ymd_and_hms(2024, 10, day, hour, 0, 0).unwrap();
        RecordSet::new(
            vec!["user_id".into(), "language".into(), "timestamp".into()],
            vec![
                // 2024-10-14 is a Monday.
                Record::new()
                    .with("user_id", "u1")
                    .with("language", "es")
                    .with("timestamp", ts(14, 9)),
                Record::new()
                    .with("user_id", "u2")
                    .with("language", "en")
                    .with("timestamp", ts(16, 9)),
                Record::new()
                    .with("user_id", "u1")
                    .with("language", "en")
                    .with("timestamp", ts(15, 9)),
                Record::new()
                    .with("user_id", "u1")
                    .with("language", "es")
                    .with("timestamp", ts(14, 7)),
                Record::new()
                    .with("user_id", "u3")
                    .with("language", Value::Null)
                    .with("timestamp", Value::Null),
            ],
        )
    }

    #[test]
    fn group_count_counts_literal_values_including_null() {
        let counts = group_count(&languages(), "language");
        let labels: Vec<&GroupLabel> = counts.labels().collect();
        assert_eq!(labels, vec!["es", "en", "unknown"]);
        assert_eq!(counts.get("es"), Some(&2));
        assert_eq!(counts.get("unknown"), Some(&1));
        assert_eq!(counts.total(), 5);
        assert_eq!(counts.order(), GroupOrder::FirstSeen);
    }

    #[test]
    fn weekday_distribution_is_zero_filled_in_fixed_order() {
        let days = weekday_distribution(&languages(), "timestamp");
        let labels: Vec<&str> = days.labels().map(String::as_str).collect();
        assert_eq!(labels, WEEKDAY_ORDER);
        assert_eq!(days.get("Monday"), Some(&2));
        assert_eq!(days.get("Tuesday"), Some(&1));
        assert_eq!(days.get("Wednesday"), Some(&1));
        assert_eq!(days.get("Sunday"), Some(&0));
        assert_eq!(days.order(), GroupOrder::Fixed);
    }

    #[test]
    fn weekday_distribution_of_empty_set_has_seven_zero_days() {
        let days = weekday_distribution(&RecordSet::empty(vec!["timestamp".into()]), "timestamp");
        assert_eq!(days.len(), 7);
        assert_eq!(days.total(), 0);
    }

    #[test]
    fn top_n_breaks_ties_by_first_encounter() {
        let set = RecordSet::new(
            vec!["store".into()],
            ["a", "b", "c", "b", "d", "e", "f", "a"]
                .into_iter()
                .map(|store| Record::new().with("store", store))
                .collect(),
        );
        let counts = group_count(&set, "store");
        let top = top_n(&counts, 3);
        assert_eq!(
            top,
            vec![("a".to_string(), 2), ("b".to_string(), 2), ("c".to_string(), 1)]
        );
        assert_eq!(top_n(&counts, 0), Vec::new());
        assert_eq!(top_n(&counts, 10).len(), 6);
    }

    #[test]
    fn count_summaries_over_groups() {
        let counts = group_count(&languages(), "language");
        assert_eq!(counts.max(), Some(2));
        let mean = counts.mean().unwrap();
        assert!((mean - 5.0 / 3.0).abs() < 1e-9);
        let empty = group_count(&RecordSet::default(), "language");
        assert_eq!(empty.mean(), None);
        assert_eq!(empty.max(), None);
    }

    #[test]
    fn user_change_summary_tracks_counts_and_bounds() {
        let summaries = user_change_summary(&languages(), "user_id", "timestamp");
        assert_eq!(summaries.len(), 3);
        let u1 = &summaries[0];
        assert_eq!(u1.user, "u1");
        assert_eq!(u1.count, 3);
        assert_eq!(u1.first, Some(Utc.with_ymd_and_hms(2024, 10, 14, 7, 0, 0).unwrap()));
        assert_eq!(u1.last, Some(Utc.with_ymd_and_hms(2024, 10, 15, 9, 0, 0).unwrap()));
        assert_eq!(summaries[2].first, None);

        let switchers = users_with_multiple_changes(&summaries);
        assert_eq!(switchers.len(), 1);
        assert_eq!(switchers[0].user, "u1");
    }

    #[test]
    fn group_count_keeps_literals_with_equal_labels_apart() {
        let set = RecordSet::new(
            vec!["language".into()],
            vec![
                Record::new().with("language", "unknown"),
                Record::new().with("language", Value::Null),
                Record::new().with("language", "3"),
                Record::new().with("language", 3.0),
                Record::new().with("language", "3"),
            ],
        );
        let counts = group_count(&set, "language");
        let entries: Vec<(&GroupLabel, &usize)> = counts.iter().collect();
        assert_eq!(
            entries,
            vec![
                (&"unknown".to_string(), &1),
                (&"unknown".to_string(), &1),
                (&"3".to_string(), &2),
                (&"3".to_string(), &1),
            ]
        );
        assert_eq!(counts.total(), 5);
        assert_eq!(distinct_count(&set, "language", |_| true), 3);
    }

    #[test]
    fn user_change_summary_skips_records_without_a_user() {
        let set = RecordSet::new(
            vec!["user_id".into(), "timestamp".into()],
            vec![
                Record::new().with("user_id", "u1"),
                Record::new(),
                Record::new().with("user_id", Value::Null),
            ],
        );
        let summaries = user_change_summary(&set, "user_id", "timestamp");
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].user, "u1");
        assert_eq!(summaries[0].count, 1);
        assert!(users_with_multiple_changes(&summaries).is_empty());
    }

    #[test]
    fn distinct_count_skips_nulls_and_respects_filter() {
        let set = languages();
        assert_eq!(distinct_count(&set, "language", |_| true), 2);
        assert_eq!(
            distinct_count(&set, "user_id", |record| record.value("language")
                == &Value::from("es")),
            1
        );
    }
}
