use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::collections::{
    LANGUAGE_CHANGES, LOYALTY_CARDS, PURCHASES, QR_RENDER_TIMES, STORES, USERS,
};
use crate::constants::config::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_TARGET_TIME_MS, DEFAULT_TOP_N, MAX_TARGET_TIME_MS,
    MIN_TARGET_TIME_MS,
};
use crate::errors::PipelineError;
use crate::types::CollectionPath;

/// Collection paths each panel reads from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionPaths {
    /// QR render-time events (`userId`, `qr_rtime`, `timestamp`).
    pub render_times: CollectionPath,
    /// Language change events (`userId`, `language`, `timestamp`).
    pub language_changes: CollectionPath,
    pub users: CollectionPath,
    pub stores: CollectionPath,
    pub loyalty_cards: CollectionPath,
    pub purchases: CollectionPath,
}

impl Default for CollectionPaths {
    fn default() -> Self {
        Self {
            render_times: QR_RENDER_TIMES.to_string(),
            language_changes: LANGUAGE_CHANGES.to_string(),
            users: USERS.to_string(),
            stores: STORES.to_string(),
            loyalty_cards: LOYALTY_CARDS.to_string(),
            purchases: PURCHASES.to_string(),
        }
    }
}

/// Top-level dashboard configuration.
///
/// Every field has a default, so a JSON file only needs to name the values it
/// overrides:
///
/// ```
/// use panel_pipeline::DashboardConfig;
///
/// let config: DashboardConfig = serde_json::from_str(r#"{ "target_time_ms": 120 }"#).unwrap();
/// assert_eq!(config.target_time_ms, 120.0);
/// assert_eq!(config.top_n, 5);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Render-time target in milliseconds (valid range 50..=200).
    pub target_time_ms: f64,
    /// Number of entries in top-N tables.
    pub top_n: usize,
    /// Lifetime of cached store fetches, in seconds.
    pub cache_ttl_secs: u64,
    pub collections: CollectionPaths,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            target_time_ms: DEFAULT_TARGET_TIME_MS,
            top_n: DEFAULT_TOP_N,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            collections: CollectionPaths::default(),
        }
    }
}

impl DashboardConfig {
    /// Load a config from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let raw = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_target_time(mut self, target_time_ms: f64) -> Self {
        self.target_time_ms = target_time_ms;
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_cache_ttl_secs(mut self, cache_ttl_secs: u64) -> Self {
        self.cache_ttl_secs = cache_ttl_secs;
        self
    }

    /// Reject a target time outside 50..=200 ms or a zero top-N size.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(MIN_TARGET_TIME_MS..=MAX_TARGET_TIME_MS).contains(&self.target_time_ms) {
            return Err(PipelineError::Configuration(format!(
                "target_time_ms must be within {MIN_TARGET_TIME_MS}..={MAX_TARGET_TIME_MS}, got {}",
                self.target_time_ms
            )));
        }
        if self.top_n == 0 {
            return Err(PipelineError::Configuration(
                "top_n must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
