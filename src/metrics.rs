use std::fmt;

use serde::Serialize;

use crate::aggregate::{UserChangeSummary, user_change_summary};
use crate::constants::aggregate::UNDEFINED_RATIO_TEXT;
use crate::data::RecordSet;

/// Result of a ratio metric. A zero denominator yields `Undefined`, never NaN or 0.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum Ratio {
    /// Fraction in `0.0..=1.0` for well-formed inputs.
    Defined(f64),
    Undefined,
}

impl Ratio {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Ratio::Undefined)
    }

    pub fn fraction(&self) -> Option<f64> {
        match self {
            Ratio::Defined(value) => Some(*value),
            Ratio::Undefined => None,
        }
    }

    pub fn percent(&self) -> Option<f64> {
        self.fraction().map(|value| value * 100.0)
    }
}

/// Renders as a percentage with one decimal (`30.0%`) or `N/A`.
impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.percent() {
            Some(percent) => write!(f, "{percent:.1}%"),
            None => f.write_str(UNDEFINED_RATIO_TEXT),
        }
    }
}

/// `numerator / denominator`, or `Ratio::Undefined` when the denominator is 0.
pub fn ratio(numerator: usize, denominator: usize) -> Ratio {
    if denominator == 0 {
        return Ratio::Undefined;
    }
    Ratio::Defined(numerator as f64 / denominator as f64)
}

/// Share of numeric `field` values strictly greater than `threshold`.
///
/// Only numeric values count towards the denominator; an empty or fully
/// non-numeric column is `Undefined`.
pub fn share_over(set: &RecordSet, field: &str, threshold: f64) -> Ratio {
    let values = set.numbers(field);
    let over = values.iter().filter(|value| **value > threshold).count();
    ratio(over, values.len())
}

/// Language-change metrics. Two notions of "changed language" are kept apart:
/// users with any recorded change, and switchers with more than one change.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LanguageChangeMetrics {
    pub total_users: usize,
    /// Distinct users with at least one recorded change.
    pub users_with_any_change: usize,
    /// Distinct users minus users with exactly one recorded change.
    pub switchers: usize,
    pub any_change_rate: Ratio,
    pub switcher_rate: Ratio,
}

impl LanguageChangeMetrics {
    /// Derive both metrics from per-user summaries and the registered user count.
    pub fn from_summaries(summaries: &[UserChangeSummary], total_users: usize) -> Self {
        let users_with_any_change = summaries.len();
        let single_change = summaries
            .iter()
            .filter(|summary| summary.count == 1)
            .count();
        let switchers = users_with_any_change - single_change;
        Self {
            total_users,
            users_with_any_change,
            switchers,
            any_change_rate: ratio(users_with_any_change, total_users),
            switcher_rate: ratio(switchers, total_users),
        }
    }

    /// Convenience over a raw event set.
    pub fn from_events(
        events: &RecordSet,
        user_field: &str,
        timestamp_field: &str,
        total_users: usize,
    ) -> Self {
        let summaries = user_change_summary(events, user_field, timestamp_field);
        Self::from_summaries(&summaries, total_users)
    }
}
