//! Resource catalogue for the generic CRUD handlers.
//!
//! Each collection is described once as a [`Resource`] value: who may list,
//! read, create and modify it, which documents are hidden from every query,
//! and the list defaults. Handlers are generic over a [`ResourceKind`]
//! marker, so routing picks the definition by type.

use tourbook_core::query::{FilterSpec, QueryDefaults};
use tourbook_core::roles::Role;
use tourbook_core::types::{CREATED_AT_FIELD, VERSION_FIELD};
use tourbook_db::collections::{BOOKINGS, PRODUCTS, REVIEWS, ROOMS, TOURS, USERS};
use tourbook_db::repositories::user_repo::active_users;

use crate::middleware::rbac::Access;

const STAFF: &[Role] = &[Role::Admin, Role::Guide];
const ADMIN: &[Role] = &[Role::Admin];
const REVIEWER: &[Role] = &[Role::User];
const REVIEW_EDITORS: &[Role] = &[Role::Admin, Role::User];

const LIST_DEFAULTS: QueryDefaults = QueryDefaults {
    sort_key: CREATED_AT_FIELD,
    exclusion: VERSION_FIELD,
};

/// Static description of one document collection exposed over HTTP.
#[derive(Debug, Clone, Copy)]
pub struct Resource {
    pub collection: &'static str,
    /// Singular name, used as the response key and in not-found messages.
    pub entity: &'static str,
    pub list: Access,
    pub read: Access,
    pub create: Access,
    pub modify: Access,
    /// Conditions every query on this collection must satisfy.
    pub visibility: fn() -> FilterSpec,
    pub defaults: QueryDefaults,
    /// Derive `slug` from `name` whenever `name` is written.
    pub slug_from_name: bool,
}

impl Resource {
    pub fn visible(&self) -> FilterSpec {
        (self.visibility)()
    }
}

/// Type-level handle on a [`Resource`], so handlers can be generic over it.
pub trait ResourceKind: Send + Sync + 'static {
    const DEF: Resource;
}

fn everything() -> FilterSpec {
    FilterSpec::new()
}

/// Secret tours never show up in lists or lookups.
pub fn public_tours() -> FilterSpec {
    FilterSpec::new().op("secretTour", "$ne", true)
}

pub struct Tours;
pub struct Rooms;
pub struct Products;
pub struct Reviews;
pub struct Bookings;
pub struct Users;

impl ResourceKind for Tours {
    const DEF: Resource = Resource {
        collection: TOURS,
        entity: "tour",
        list: Access::Authenticated,
        read: Access::Public,
        create: Access::Roles(STAFF),
        modify: Access::Roles(STAFF),
        visibility: public_tours,
        defaults: LIST_DEFAULTS,
        slug_from_name: true,
    };
}

impl ResourceKind for Rooms {
    const DEF: Resource = Resource {
        collection: ROOMS,
        entity: "room",
        list: Access::Authenticated,
        read: Access::Public,
        create: Access::Roles(STAFF),
        modify: Access::Roles(STAFF),
        visibility: everything,
        defaults: LIST_DEFAULTS,
        slug_from_name: false,
    };
}

impl ResourceKind for Products {
    const DEF: Resource = Resource {
        collection: PRODUCTS,
        entity: "product",
        list: Access::Authenticated,
        read: Access::Authenticated,
        create: Access::Roles(ADMIN),
        modify: Access::Roles(ADMIN),
        visibility: everything,
        defaults: LIST_DEFAULTS,
        slug_from_name: true,
    };
}

impl ResourceKind for Reviews {
    const DEF: Resource = Resource {
        collection: REVIEWS,
        entity: "review",
        list: Access::Authenticated,
        read: Access::Authenticated,
        create: Access::Roles(REVIEWER),
        modify: Access::Roles(REVIEW_EDITORS),
        visibility: everything,
        defaults: LIST_DEFAULTS,
        slug_from_name: false,
    };
}

impl ResourceKind for Bookings {
    const DEF: Resource = Resource {
        collection: BOOKINGS,
        entity: "booking",
        list: Access::Roles(ADMIN),
        read: Access::Roles(ADMIN),
        create: Access::Roles(ADMIN),
        modify: Access::Roles(ADMIN),
        visibility: everything,
        defaults: LIST_DEFAULTS,
        slug_from_name: false,
    };
}

/// Admin view of accounts. Deactivated users stay hidden. Accounts are
/// created by signup only.
impl ResourceKind for Users {
    const DEF: Resource = Resource {
        collection: USERS,
        entity: "user",
        list: Access::Roles(ADMIN),
        read: Access::Roles(ADMIN),
        create: Access::Closed,
        modify: Access::Roles(ADMIN),
        visibility: active_users,
        defaults: LIST_DEFAULTS,
        slug_from_name: false,
    };
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tourbook_core::types::Document;

    use super::*;

    fn doc(value: serde_json::Value) -> Document {
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn secret_tours_are_invisible() {
        let visible = Tours::DEF.visible();
        assert!(visible.matches(&doc(json!({ "name": "Sea Explorer" }))).unwrap());
        assert!(!visible
            .matches(&doc(json!({ "name": "Hidden", "secretTour": true })))
            .unwrap());
    }

    #[test]
    fn only_staff_write_tours() {
        assert_eq!(Tours::DEF.create, Access::Roles(&[Role::Admin, Role::Guide]));
        assert_eq!(Bookings::DEF.read, Access::Roles(&[Role::Admin]));
    }
}
