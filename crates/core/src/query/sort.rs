//! Sort keys from `sort=-ratingsAverage,price`.

use std::cmp::Ordering;

use serde_json::Value;

use crate::types::{Document, ID_FIELD};
use crate::value::{compare_values, lookup};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Parse one token; a leading `-` means descending. Empty tokens yield `None`.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        match token.strip_prefix('-') {
            Some("") => None,
            Some(field) => Some(Self::desc(field)),
            None if token.is_empty() => None,
            None => Some(Self::asc(token)),
        }
    }
}

/// Split a comma-separated sort parameter, falling back to `default_key`
/// descending when the parameter is absent or holds no usable token.
pub fn build_sort(raw: Option<&str>, default_key: &str) -> Vec<SortKey> {
    let keys: Vec<SortKey> = raw
        .map(|raw| raw.split(',').filter_map(SortKey::parse).collect())
        .unwrap_or_default();
    if keys.is_empty() {
        vec![SortKey::desc(default_key)]
    } else {
        keys
    }
}

/// Stable sort by `keys`, breaking remaining ties on `_id` ascending so that
/// equal keys never produce run-to-run differences.
pub fn sort_documents(docs: &mut [Document], keys: &[SortKey]) {
    docs.sort_by(|a, b| {
        for key in keys {
            let ord = compare_field(a, b, &key.field);
            let ord = match key.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        compare_field(a, b, ID_FIELD)
    });
}

fn compare_field(a: &Document, b: &Document, field: &str) -> Ordering {
    let left = lookup(a, field).unwrap_or(&Value::Null);
    let right = lookup(b, field).unwrap_or(&Value::Null);
    compare_values(left, right)
}
