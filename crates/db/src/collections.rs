//! Collection names and the unique indexes enforced on them.

use serde_json::Value;
use tourbook_core::types::Document;
use tourbook_core::value::lookup;

pub const USERS: &str = "users";
pub const TOURS: &str = "tours";
pub const ROOMS: &str = "rooms";
pub const PRODUCTS: &str = "products";
pub const REVIEWS: &str = "reviews";
pub const BOOKINGS: &str = "bookings";

/// Unique constraint over one or more fields of a collection.
///
/// Sparse: documents missing any of the fields are not indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniqueIndex {
    pub collection: &'static str,
    pub fields: &'static [&'static str],
}

impl UniqueIndex {
    /// Index key of `doc`, or `None` when a field is absent or null.
    pub fn key(&self, doc: &Document) -> Option<Vec<Value>> {
        self.fields
            .iter()
            .map(|field| lookup(doc, field).filter(|v| !v.is_null()).cloned())
            .collect()
    }

    pub fn describe(&self) -> String {
        format!("{} ({})", self.collection, self.fields.join(", "))
    }
}

pub const UNIQUE_INDEXES: &[UniqueIndex] = &[
    UniqueIndex { collection: USERS, fields: &["email"] },
    UniqueIndex { collection: TOURS, fields: &["name"] },
    UniqueIndex { collection: ROOMS, fields: &["name"] },
    UniqueIndex { collection: PRODUCTS, fields: &["name"] },
    UniqueIndex { collection: REVIEWS, fields: &["tour", "user"] },
    UniqueIndex { collection: REVIEWS, fields: &["room", "user"] },
];
