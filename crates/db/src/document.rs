//! Document bookkeeping shared by both store adapters.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tourbook_core::types::{Document, CREATED_AT_FIELD, ID_FIELD, VERSION_FIELD};

/// Current time in the RFC 3339 form stored in documents.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Fill in `_id`, `__v` and `createdAt` when the caller did not supply them.
pub fn prepare_insert(mut doc: Document) -> Document {
    if !doc.get(ID_FIELD).is_some_and(Value::is_string) {
        doc.insert(
            ID_FIELD.to_string(),
            Value::String(uuid::Uuid::new_v4().simple().to_string()),
        );
    }
    doc.entry(VERSION_FIELD).or_insert(Value::from(0));
    doc.entry(CREATED_AT_FIELD)
        .or_insert_with(|| Value::String(now_rfc3339()));
    doc
}

/// Merge `patch` into `doc`. `null` values remove the field; `_id` is immutable.
/// Bumps `__v` on every write.
pub fn merge_patch(doc: &mut Document, patch: Document) {
    for (key, value) in patch {
        if key == ID_FIELD || key == VERSION_FIELD {
            continue;
        }
        if value.is_null() {
            doc.remove(&key);
        } else {
            doc.insert(key, value);
        }
    }
    let version = doc.get(VERSION_FIELD).and_then(Value::as_u64).unwrap_or(0);
    doc.insert(VERSION_FIELD.to_string(), Value::from(version + 1));
}

pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}
