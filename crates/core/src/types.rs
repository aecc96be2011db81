/// Document identifiers are opaque strings (UUID v4 for generated ids).
pub type DocId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A stored document: a JSON object keyed by field name.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Field holding the document identifier.
pub const ID_FIELD: &str = "_id";

/// Internal versioning field, bumped on every write and hidden by default.
pub const VERSION_FIELD: &str = "__v";

/// Creation timestamp written on insert.
pub const CREATED_AT_FIELD: &str = "createdAt";
