#![doc = include_str!("../README.md")]

/// Pure aggregations: group counts, describe, buckets, weekdays, top-N, per-user summaries.
pub mod aggregate;
/// TTL memoization of store fetches.
pub mod cache;
/// Dashboard configuration types.
pub mod config;
/// Centralized constants used across stores, schemas, and aggregations.
pub mod constants;
/// Values, raw documents, records, and record sets.
pub mod data;
/// Presentation-ready number formatting.
pub mod display;
/// Left-outer joins between record sets.
pub mod join;
/// Ratio metrics and language-change metrics.
pub mod metrics;
/// Raw document to typed record normalization.
pub mod normalize;
/// Dashboard panels built on the extraction stage.
pub mod panels;
/// Extraction stage and per-collection record schemas.
pub mod pipeline;
/// Reusable report runner shared by the demo binary.
pub mod report;
/// Document store trait and in-memory store.
pub mod store;
/// Store transports (filesystem export today).
pub mod transport;
/// Shared type aliases.
pub mod types;

mod errors;

pub use aggregate::{
    AggregationResult, Buckets, GroupOrder, Statistics, UserChangeSummary, bucket_counts,
    bucketize, describe, distinct_count, group_count, top_n, user_change_summary,
    users_with_multiple_changes, weekday_distribution,
};
pub use cache::{CacheStats, CachedStore, TtlCache};
pub use config::{CollectionPaths, DashboardConfig};
pub use data::{RawDocument, Record, RecordSet, Value};
pub use errors::PipelineError;
pub use join::{JoinKey, left_join};
pub use metrics::{LanguageChangeMetrics, Ratio, ratio, share_over};
pub use normalize::{FieldDefault, FieldKind, FieldSpec, RecordSchema, normalize, normalize_all};
pub use panels::{
    ActivationPanel, Dashboard, LanguagePanel, LoyaltyPanel, PurchasePanel, RenderTimePanel,
};
pub use store::{DocumentStore, InMemoryStore};
pub use transport::FsDocumentStore;
pub use types::{CollectionPath, DocumentId, FieldName, GroupLabel, SourceKey, UserId};
