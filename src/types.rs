/// Document-store collection path.
/// Examples: `users`, `AnalyticsBusinessQuestions/sprint2/businessQuestionQR`
pub type CollectionPath = String;
/// Identifier of a single document inside a collection.
/// Examples: `store_17`, `h3Jd9aPq2x`
pub type DocumentId = String;
/// Name of a field declared on a record schema.
/// Examples: `user_id`, `render_time`, `timestamp`
pub type FieldName = String;
/// Key of a field inside a raw document.
/// Examples: `userId`, `qr_rtime`, `storeId`
pub type SourceKey = String;
/// Ready-to-render group label produced by aggregations.
/// Examples: `Monday`, `es`, `Excellent`, `Corner Bakery`
pub type GroupLabel = String;
/// Identifier of a dashboard user inside event collections.
/// Example: `u_0042`
pub type UserId = String;
