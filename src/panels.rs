//! Dashboard panels: each one a pure function of a store, a config, and a call time.
//!
//! Numeric outputs are pre-rounded to the display precision so a
//! presentation layer can print them directly.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{
    AggregationResult, Buckets, Statistics, UserChangeSummary, bucket_counts, describe,
    distinct_count, group_count, top_n, user_change_summary, users_with_multiple_changes,
    weekday_distribution,
};
use crate::config::DashboardConfig;
use crate::constants::aggregate::{DISPLAY_DECIMALS, JOIN_COLLISION_SUFFIX};
use crate::constants::fields;
use crate::data::{RecordSet, Value};
use crate::display::round2;
use crate::join::JoinKey;
use crate::metrics::{LanguageChangeMetrics, Ratio, ratio, share_over};
use crate::pipeline::{
    extract, extract_by_ids, language_change_schema, loyalty_card_schema, purchase_schema,
    render_time_schema, store_schema, user_schema,
};
use crate::store::DocumentStore;
use crate::types::GroupLabel;

/// QR render-time analysis against the configured target.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderTimePanel {
    pub target_ms: f64,
    pub total_measurements: usize,
    pub average_ms: f64,
    pub max_ms: f64,
    /// Average minus target; positive means slower than target.
    pub delta_vs_target_ms: f64,
    pub over_target: Ratio,
    pub statistics: Statistics,
    /// Performance categories; `None` when the target cannot form valid buckets.
    pub distribution: Option<AggregationResult<usize>>,
    /// Measurements ordered slowest first.
    pub slowest: RecordSet,
}

/// Loyalty-program popularity: cards per store name.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoyaltyPanel {
    /// Card counts per store, highest first.
    pub popularity: AggregationResult<usize>,
    pub top_stores: Vec<(GroupLabel, usize)>,
    pub total_programs: usize,
    pub total_cards: usize,
    pub average_cards_per_store: Option<f64>,
    pub max_cards_in_store: Option<usize>,
    /// Cards whose store document is missing or has no name.
    pub unmatched_cards: usize,
}

/// Share of registered users holding a current loyalty card.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActivationPanel {
    pub total_users: usize,
    pub current_cards: usize,
    /// Distinct registered users with at least one current card.
    pub activated_users: usize,
    pub activation_rate: Ratio,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LanguagePanel {
    pub total_events: usize,
    /// Events per language, most frequent first.
    pub languages: AggregationResult<usize>,
    pub weekdays: AggregationResult<usize>,
    pub per_user: Vec<UserChangeSummary>,
    /// Users with more than one recorded change.
    pub switchers: Vec<UserChangeSummary>,
    pub metrics: LanguageChangeMetrics,
}

/// Purchase activity over purchases, their cards, and the cards' stores.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PurchasePanel {
    pub total_purchases: usize,
    pub weekdays: AggregationResult<usize>,
    pub purchases_per_store: AggregationResult<usize>,
    pub top_stores: Vec<(GroupLabel, usize)>,
    pub totals: Option<Statistics>,
    pub revenue: f64,
}

/// Every panel computed in one refresh.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Dashboard {
    pub generated_at: DateTime<Utc>,
    pub render_times: Option<RenderTimePanel>,
    pub loyalty: Option<LoyaltyPanel>,
    pub activation: ActivationPanel,
    pub language: Option<LanguagePanel>,
    pub purchases: Option<PurchasePanel>,
}

impl Dashboard {
    /// Run every panel against `store`. Panels without data are `None`.
    pub fn build<S>(store: &S, config: &DashboardConfig, now: DateTime<Utc>) -> Self
    where
        S: DocumentStore + ?Sized,
    {
        let dashboard = Self {
            generated_at: now,
            render_times: render_time_panel(store, config, now),
            loyalty: loyalty_panel(store, config, now),
            activation: activation_panel(store, config, now),
            language: language_panel(store, config, now),
            purchases: purchase_panel(store, config, now),
        };
        info!(
            render_times = dashboard.render_times.is_some(),
            loyalty = dashboard.loyalty.is_some(),
            language = dashboard.language.is_some(),
            purchases = dashboard.purchases.is_some(),
            "dashboard refreshed"
        );
        dashboard
    }
}

/// Render-time analysis; `None` when there are no measurements.
pub fn render_time_panel<S>(
    store: &S,
    config: &DashboardConfig,
    now: DateTime<Utc>,
) -> Option<RenderTimePanel>
where
    S: DocumentStore + ?Sized,
{
    let events = extract(
        store,
        &config.collections.render_times,
        &render_time_schema(),
        now,
    );
    let statistics = describe(&events, fields::RENDER_TIME)?;
    let target_ms = config.target_time_ms;
    let distribution = match Buckets::performance(target_ms) {
        Ok(buckets) => Some(bucket_counts(&events, fields::RENDER_TIME, &buckets)),
        Err(err) => {
            warn!(target_ms, error = %err, "performance distribution skipped");
            None
        }
    };
    Some(RenderTimePanel {
        target_ms,
        total_measurements: events.len(),
        average_ms: round2(statistics.mean),
        max_ms: round2(statistics.max),
        delta_vs_target_ms: round2(statistics.mean - target_ms),
        over_target: share_over(&events, fields::RENDER_TIME, target_ms),
        statistics: statistics.rounded(DISPLAY_DECIMALS),
        distribution,
        slowest: events.sorted_desc_by(fields::RENDER_TIME),
    })
}

/// Loyalty-program popularity; `None` when no cards exist.
///
/// Store names are looked up one document per distinct `storeId`.
pub fn loyalty_panel<S>(
    store: &S,
    config: &DashboardConfig,
    now: DateTime<Utc>,
) -> Option<LoyaltyPanel>
where
    S: DocumentStore + ?Sized,
{
    let cards = extract(
        store,
        &config.collections.loyalty_cards,
        &loyalty_card_schema(),
        now,
    );
    if cards.is_empty() {
        return None;
    }
    let stores = extract_by_ids(
        store,
        &config.collections.stores,
        cards.column(fields::STORE_ID).filter_map(Value::as_text),
        &store_schema(),
        now,
    );
    let joined = cards.left_join(
        &stores,
        &JoinKey::on(fields::STORE_ID),
        &[fields::STORE_NAME.to_string()],
    );
    let named = joined.filter(|record| !record.value(fields::STORE_NAME).is_null());
    let popularity = group_count(&named, fields::STORE_NAME).sorted_by_count();
    Some(LoyaltyPanel {
        top_stores: top_n(&popularity, config.top_n),
        total_programs: popularity.len(),
        total_cards: popularity.total(),
        average_cards_per_store: popularity.mean().map(round2),
        max_cards_in_store: popularity.max(),
        unmatched_cards: joined.len() - named.len(),
        popularity,
    })
}

/// Loyalty-card activation rate. Always computed; with no users the rate is undefined.
pub fn activation_panel<S>(
    store: &S,
    config: &DashboardConfig,
    now: DateTime<Utc>,
) -> ActivationPanel
where
    S: DocumentStore + ?Sized,
{
    let users = extract(store, &config.collections.users, &user_schema(), now);
    let cards = extract(
        store,
        &config.collections.loyalty_cards,
        &loyalty_card_schema(),
        now,
    );
    let current = cards.filter(|record| record.value(fields::IS_CURRENT).as_bool() == Some(true));
    // Joining the user id onto itself marks holders that are registered users.
    let registered_key = format!("{}{JOIN_COLLISION_SUFFIX}", fields::USER_ID);
    let holders = current.left_join(
        &users,
        &JoinKey::on(fields::USER_ID),
        &[fields::USER_ID.to_string()],
    );
    let activated_users = distinct_count(&holders, fields::USER_ID, |record| {
        !record.value(&registered_key).is_null()
    });
    ActivationPanel {
        total_users: users.len(),
        current_cards: current.len(),
        activated_users,
        activation_rate: ratio(activated_users, users.len()),
    }
}

/// Language-change analysis; `None` when no change events exist.
pub fn language_panel<S>(
    store: &S,
    config: &DashboardConfig,
    now: DateTime<Utc>,
) -> Option<LanguagePanel>
where
    S: DocumentStore + ?Sized,
{
    let events = extract(
        store,
        &config.collections.language_changes,
        &language_change_schema(),
        now,
    );
    if events.is_empty() {
        return None;
    }
    let users = extract(store, &config.collections.users, &user_schema(), now);
    let per_user = user_change_summary(&events, fields::USER_ID, fields::TIMESTAMP);
    let switchers = users_with_multiple_changes(&per_user)
        .into_iter()
        .cloned()
        .collect();
    let metrics = LanguageChangeMetrics::from_summaries(&per_user, users.len());
    Some(LanguagePanel {
        total_events: events.len(),
        languages: group_count(&events, fields::LANGUAGE).sorted_by_count(),
        weekdays: weekday_distribution(&events, fields::TIMESTAMP),
        per_user,
        switchers,
        metrics,
    })
}

/// Purchase activity; `None` when no purchases exist.
pub fn purchase_panel<S>(
    store: &S,
    config: &DashboardConfig,
    now: DateTime<Utc>,
) -> Option<PurchasePanel>
where
    S: DocumentStore + ?Sized,
{
    let purchases = extract(
        store,
        &config.collections.purchases,
        &purchase_schema(),
        now,
    );
    if purchases.is_empty() {
        return None;
    }
    let cards = extract(
        store,
        &config.collections.loyalty_cards,
        &loyalty_card_schema(),
        now,
    );
    let stores = extract(store, &config.collections.stores, &store_schema(), now);
    let joined = purchases
        .left_join(
            &cards,
            &JoinKey::on(fields::CARD_ID),
            &[fields::STORE_ID.to_string()],
        )
        .left_join(
            &stores,
            &JoinKey::on(fields::STORE_ID),
            &[fields::STORE_NAME.to_string()],
        );
    let purchases_per_store = group_count(&joined, fields::STORE_NAME).sorted_by_count();
    let revenue: f64 = joined.numbers(fields::PURCHASE_TOTAL).iter().sum();
    Some(PurchasePanel {
        total_purchases: joined.len(),
        weekdays: weekday_distribution(&joined, fields::PURCHASE_DATE),
        top_stores: top_n(&purchases_per_store, config.top_n),
        purchases_per_store,
        totals: describe(&joined, fields::PURCHASE_TOTAL)
            .map(|stats| stats.rounded(DISPLAY_DECIMALS)),
        revenue: round2(revenue),
    })
}
