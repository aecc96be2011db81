//! Query builder for list endpoints.
//!
//! Translates raw request parameters into a [`QuerySpec`] (filter, sort,
//! projection, pagination) and executes it against a [`DocumentStore`].
//!
//! [`DocumentStore`]: crate::store::DocumentStore

pub mod execute;
pub mod filter;
pub mod pagination;
pub mod projection;
pub mod sort;

use crate::error::CoreResult;
use crate::params::RawParams;
use crate::types::{CREATED_AT_FIELD, VERSION_FIELD};

pub use execute::{execute, QueryTrace};
pub use filter::{build_filter, Condition, FilterSpec};
pub use pagination::{build_pagination, Pagination};
pub use projection::{build_projection, Projection};
pub use sort::{build_sort, SortDirection, SortKey};

/// Per-collection fallbacks for omitted `sort` / `fields`.
#[derive(Debug, Clone, Copy)]
pub struct QueryDefaults {
    /// Field sorted descending when no `sort` is given.
    pub sort_key: &'static str,
    /// Field hidden when no `fields` is given.
    pub exclusion: &'static str,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            sort_key: CREATED_AT_FIELD,
            exclusion: VERSION_FIELD,
        }
    }
}

/// A fully parsed list query. Built per request and consumed once.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub filter: FilterSpec,
    pub sort: Vec<SortKey>,
    pub projection: Projection,
    pub pagination: Pagination,
}

impl QuerySpec {
    pub fn from_params(raw: &RawParams, defaults: &QueryDefaults) -> CoreResult<Self> {
        Ok(Self {
            filter: build_filter(raw),
            sort: build_sort(raw.text("sort"), defaults.sort_key),
            projection: build_projection(raw.text("fields"), defaults.exclusion)?,
            pagination: build_pagination(raw.text("page"), raw.text("limit")),
        })
    }

    /// Add conditions that always apply (visibility, parent scoping); they
    /// override caller-supplied conditions on the same field.
    pub fn restrict(mut self, base: &FilterSpec) -> Self {
        self.filter = self.filter.and(base);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_params_splits_control_keys() {
        let raw = RawParams::from_pairs([
            ("difficulty", "easy"),
            ("sort", "price"),
            ("fields", "name,price"),
            ("page", "2"),
            ("limit", "5"),
        ]);
        let spec = QuerySpec::from_params(&raw, &QueryDefaults::default()).unwrap();
        assert_eq!(spec.filter.len(), 1);
        assert_eq!(spec.sort, vec![SortKey::asc("price")]);
        assert_eq!(
            spec.projection,
            Projection::Include(vec!["name".into(), "price".into()])
        );
        assert_eq!(spec.pagination.skip, 5);
    }

    #[test]
    fn defaults_apply_when_control_keys_are_absent() {
        let spec = QuerySpec::from_params(&RawParams::new(), &QueryDefaults::default()).unwrap();
        assert_eq!(spec.sort, vec![SortKey::desc("createdAt")]);
        assert_eq!(spec.projection, Projection::Exclude(vec!["__v".into()]));
        assert!(!spec.pagination.explicit_page);
    }
}
