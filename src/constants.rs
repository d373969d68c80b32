/// Constants used by document-store collection layout.
pub mod collections {
    /// Root under which per-sprint business-question event collections live.
    pub const BUSINESS_QUESTIONS_ROOT: &str = "AnalyticsBusinessQuestions";
    /// Event collection holding QR render-time measurements.
    pub const QR_RENDER_TIMES: &str = "AnalyticsBusinessQuestions/sprint2/businessQuestionQR";
    /// Event collection holding language-change events.
    pub const LANGUAGE_CHANGES: &str = "AnalyticsBusinessQuestions/sprint3/languageChanges";
    /// Entity collection of registered users.
    pub const USERS: &str = "users";
    /// Entity collection of partner stores.
    pub const STORES: &str = "stores";
    /// Entity collection of issued loyalty cards.
    pub const LOYALTY_CARDS: &str = "loyaltyCards";
    /// Entity collection of purchases made with loyalty cards.
    pub const PURCHASES: &str = "purchases";
    /// File extension of documents in a filesystem-backed store.
    pub const DOCUMENT_EXTENSION: &str = "json";
}

/// Constants used by the record normalizer.
pub mod normalize {
    /// Pseudo source key that resolves to the document id instead of a field.
    pub const DOCUMENT_ID_KEY: &str = "__id__";
    /// Seconds component of an exported document-store timestamp object.
    pub const TIMESTAMP_SECONDS_KEYS: [&str; 2] = ["_seconds", "seconds"];
    /// Nanoseconds component of an exported document-store timestamp object.
    pub const TIMESTAMP_NANOS_KEYS: [&str; 3] = ["_nanoseconds", "nanoseconds", "nanos"];
}

/// Constants used by joins and aggregations.
pub mod aggregate {
    /// Label rendered for the null/unknown marker.
    pub const NULL_LABEL: &str = "unknown";
    /// Suffix applied to right-side join fields that collide with a left field.
    pub const JOIN_COLLISION_SUFFIX: &str = "_right";
    /// Canonical weekday display order.
    pub const WEEKDAY_ORDER: [&str; 7] = [
        "Monday",
        "Tuesday",
        "Wednesday",
        "Thursday",
        "Friday",
        "Saturday",
        "Sunday",
    ];
    /// Decimal places used for presentation-ready metrics.
    pub const DISPLAY_DECIMALS: u32 = 2;
    /// Text rendered for an undefined ratio.
    pub const UNDEFINED_RATIO_TEXT: &str = "N/A";
}

/// Constants used by render-time performance categories.
pub mod performance {
    /// Upper bound (inclusive) of the `Excellent` band in milliseconds.
    pub const EXCELLENT_MAX_MS: f64 = 50.0;
    /// Upper bound (inclusive) of the `Good` band in milliseconds.
    pub const GOOD_MAX_MS: f64 = 75.0;
    /// Category labels in ascending render-time order.
    pub const CATEGORY_LABELS: [&str; 4] = ["Excellent", "Good", "Acceptable", "Unsatisfactory"];
    /// Slowest measurements listed in the text report.
    pub const REPORT_SLOWEST_ROWS: usize = 5;
}

/// Constants used by dashboard configuration defaults and bounds.
pub mod config {
    /// Default render-time target in milliseconds.
    pub const DEFAULT_TARGET_TIME_MS: f64 = 100.0;
    /// Smallest accepted render-time target in milliseconds.
    pub const MIN_TARGET_TIME_MS: f64 = 50.0;
    /// Largest accepted render-time target in milliseconds.
    pub const MAX_TARGET_TIME_MS: f64 = 200.0;
    /// Default number of groups shown in top-N tables.
    pub const DEFAULT_TOP_N: usize = 5;
    /// Default fetch cache lifetime in seconds.
    pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
}

/// Record field names produced by the panel schemas.
pub mod fields {
    pub const USER_ID: &str = "user_id";
    pub const RENDER_TIME: &str = "render_time";
    pub const TIMESTAMP: &str = "timestamp";
    pub const LANGUAGE: &str = "language";
    pub const STORE_ID: &str = "store_id";
    pub const STORE_NAME: &str = "name";
    pub const CARD_ID: &str = "card_id";
    pub const IS_CURRENT: &str = "is_current";
    pub const PURCHASE_ID: &str = "purchase_id";
    pub const PURCHASE_DATE: &str = "date";
    pub const PURCHASE_TOTAL: &str = "total";
}

/// Source keys read from raw documents.
pub mod source_keys {
    pub const USER_ID: &str = "userId";
    pub const QR_RENDER_TIME: &str = "qr_rtime";
    pub const TIMESTAMP: &str = "timestamp";
    pub const LANGUAGE: &str = "language";
    pub const STORE_NAME: &str = "name";
    pub const CARD_STORE_ID: &str = "storeId";
    pub const CARD_USER_ID: &str = "user_id";
    pub const CARD_IS_CURRENT: &str = "isCurrent";
    pub const PURCHASE_CARD_ID: &str = "cardId";
    pub const PURCHASE_DATE: &str = "date";
    pub const PURCHASE_TOTAL: &str = "total";
}
