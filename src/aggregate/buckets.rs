use indexmap::IndexMap;

use super::{AggregationResult, GroupOrder};
use crate::constants::performance::{CATEGORY_LABELS, EXCELLENT_MAX_MS, GOOD_MAX_MS};
use crate::data::RecordSet;
use crate::errors::PipelineError;
use crate::types::GroupLabel;

/// Ordered boundaries and one label per half-open interval `(b[i], b[i+1]]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Buckets {
    boundaries: Vec<f64>,
    labels: Vec<GroupLabel>,
}

impl Buckets {
    /// Validate and build buckets.
    ///
    /// Requires `labels.len() == boundaries.len() - 1`, strictly increasing
    /// boundaries, and no NaN boundary. `f64::INFINITY` is a valid upper bound.
    pub fn new<L>(boundaries: Vec<f64>, labels: Vec<L>) -> Result<Self, PipelineError>
    where
        L: Into<GroupLabel>,
    {
        if boundaries.len() < 2 {
            return Err(PipelineError::Configuration(format!(
                "buckets need at least 2 boundaries, got {}",
                boundaries.len()
            )));
        }
        if labels.len() != boundaries.len() - 1 {
            return Err(PipelineError::Configuration(format!(
                "expected {} bucket labels for {} boundaries, got {}",
                boundaries.len() - 1,
                boundaries.len(),
                labels.len()
            )));
        }
        if boundaries.iter().any(|bound| bound.is_nan()) {
            return Err(PipelineError::Configuration(
                "bucket boundaries must not be NaN".to_string(),
            ));
        }
        if let Some(pair) = boundaries.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(PipelineError::Configuration(format!(
                "bucket boundaries must increase strictly, found {} then {}",
                pair[0], pair[1]
            )));
        }
        Ok(Self {
            boundaries,
            labels: labels.into_iter().map(Into::into).collect(),
        })
    }

    /// Render-time performance categories for a target time in milliseconds.
    ///
    /// Boundaries `0, 50, 75, target, inf` with labels Excellent, Good,
    /// Acceptable, Unsatisfactory. Fails when `target <= 75`.
    pub fn performance(target_ms: f64) -> Result<Self, PipelineError> {
        Self::new(
            vec![0.0, EXCELLENT_MAX_MS, GOOD_MAX_MS, target_ms, f64::INFINITY],
            CATEGORY_LABELS.to_vec(),
        )
    }

    pub fn labels(&self) -> &[GroupLabel] {
        &self.labels
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    /// Label of the interval containing `value`, or `None` when outside every interval.
    pub fn label_for(&self, value: f64) -> Option<&GroupLabel> {
        if value.is_nan() {
            return None;
        }
        // First boundary that is >= value closes the interval holding it.
        let upper = self.boundaries.partition_point(|bound| *bound < value);
        if upper == 0 || upper >= self.boundaries.len() {
            return None;
        }
        self.labels.get(upper - 1)
    }
}

/// Label of every record's `field` value, aligned with the record order.
///
/// Values at or below the first boundary, above the last, or non-numeric are `None`.
pub fn bucketize(set: &RecordSet, field: &str, buckets: &Buckets) -> Vec<Option<GroupLabel>> {
    set.column(field)
        .map(|value| {
            value
                .as_number()
                .and_then(|number| buckets.label_for(number))
                .cloned()
        })
        .collect()
}

/// Count labeled values per bucket in label order, zero-filled; unlabeled values are excluded.
pub fn bucket_counts(set: &RecordSet, field: &str, buckets: &Buckets) -> AggregationResult<usize> {
    let mut entries: IndexMap<GroupLabel, usize> = buckets
        .labels()
        .iter()
        .map(|label| (label.clone(), 0))
        .collect();
    for label in bucketize(set, field, buckets).into_iter().flatten() {
        if let Some(count) = entries.get_mut(&label) {
            *count += 1;
        }
    }
    AggregationResult::from_entries(entries, GroupOrder::Fixed)
}
