//! Filter construction from raw parameters and predicate evaluation.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::Value;

use crate::geo::{central_angle, GeoPoint};
use crate::params::{RawParam, RawParams};
use crate::store::StoreError;
use crate::types::Document;
use crate::value::{compare_with_literal, lookup, loosely_equal};

/// Control keys consumed by sort, projection and pagination.
pub const RESERVED_KEYS: [&str; 4] = ["page", "sort", "limit", "fields"];

/// Bare comparison keywords accepted in bracket syntax.
pub const COMPARISON_TOKENS: [&str; 4] = ["gte", "gt", "lte", "lt"];

/// Prefix that marks a store operator (`$gte`).
pub const OPERATOR_MARKER: char = '$';

/// Predicate on a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the literal (any element, for array fields).
    Equals(Value),
    /// Operator token to literal. Tokens are kept verbatim; the store rejects
    /// the ones it does not know.
    Operators(BTreeMap<String, Value>),
    /// GeoJSON point within `radius` radians of `center`.
    WithinSphere { center: GeoPoint, radius: f64 },
}

/// Normalized predicate over documents: every condition must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    conditions: BTreeMap<String, Condition>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions
            .insert(field.into(), Condition::Equals(value.into()));
        self
    }

    /// Add an operator condition, merging with operators already on `field`.
    pub fn op(
        mut self,
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        let entry = self
            .conditions
            .entry(field.into())
            .or_insert_with(|| Condition::Operators(BTreeMap::new()));
        if !matches!(entry, Condition::Operators(_)) {
            *entry = Condition::Operators(BTreeMap::new());
        }
        if let Condition::Operators(ops) = entry {
            ops.insert(operator.into(), value.into());
        }
        self
    }

    pub fn within_sphere(mut self, field: impl Into<String>, center: GeoPoint, radius: f64) -> Self {
        self.conditions
            .insert(field.into(), Condition::WithinSphere { center, radius });
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, condition: Condition) {
        self.conditions.insert(field.into(), condition);
    }

    /// Overlay `other` on top of this filter; its conditions win per field.
    pub fn and(mut self, other: &FilterSpec) -> Self {
        for (field, condition) in &other.conditions {
            self.conditions.insert(field.clone(), condition.clone());
        }
        self
    }

    pub fn get(&self, field: &str) -> Option<&Condition> {
        self.conditions.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.conditions.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Condition)> {
        self.conditions.iter()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Reject unknown operators and malformed `$in`/`$nin` literals without
    /// needing a document to evaluate against.
    pub fn validate(&self) -> Result<(), StoreError> {
        for (field, condition) in &self.conditions {
            if let Condition::Operators(ops) = condition {
                for (op, literal) in ops {
                    operator_holds(field, &Value::Null, op, literal)?;
                }
            }
        }
        Ok(())
    }

    /// Evaluate the filter against one document.
    ///
    /// Unknown operator tokens surface here as [`StoreError::InvalidQuery`].
    pub fn matches(&self, doc: &Document) -> Result<bool, StoreError> {
        for (field, condition) in &self.conditions {
            let stored = lookup(doc, field).unwrap_or(&Value::Null);
            if !condition_holds(field, stored, condition)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Strip control keys and rewrite bare comparison tokens into store operators.
///
/// `{price: {gte: "100"}, difficulty: "easy", sort: "price"}` becomes
/// `{price: {$gte: "100"}, difficulty: "easy"}`. Tokens other than the four
/// comparison keywords are passed through untouched.
pub fn build_filter(raw: &RawParams) -> FilterSpec {
    let mut filter = FilterSpec::new();
    for (key, value) in raw.iter() {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        let condition = match value {
            RawParam::Text(text) => Condition::Equals(Value::String(text.clone())),
            RawParam::Nested(tokens) => Condition::Operators(
                tokens
                    .iter()
                    .map(|(token, literal)| (rewrite_token(token), Value::String(literal.clone())))
                    .collect(),
            ),
        };
        filter.insert(key.clone(), condition);
    }
    filter
}

fn rewrite_token(token: &str) -> String {
    if COMPARISON_TOKENS.contains(&token) {
        format!("{OPERATOR_MARKER}{token}")
    } else {
        token.to_string()
    }
}

fn condition_holds(field: &str, stored: &Value, condition: &Condition) -> Result<bool, StoreError> {
    match condition {
        Condition::Equals(literal) => Ok(equals(stored, literal)),
        Condition::Operators(ops) => {
            for (op, literal) in ops {
                if !operator_holds(field, stored, op, literal)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Condition::WithinSphere { center, radius } => Ok(GeoPoint::from_geojson(stored)
            .is_some_and(|point| central_angle(*center, point) <= *radius)),
    }
}

fn equals(stored: &Value, literal: &Value) -> bool {
    if loosely_equal(stored, literal) {
        return true;
    }
    match stored {
        Value::Array(items) => items.iter().any(|item| loosely_equal(item, literal)),
        _ => false,
    }
}

fn range(stored: &Value, literal: &Value, accept: fn(Ordering) -> bool) -> bool {
    let test = |value: &Value| compare_with_literal(value, literal).is_some_and(accept);
    match stored {
        Value::Null => false,
        Value::Array(items) => items.iter().any(test),
        other => test(other),
    }
}

fn operator_holds(field: &str, stored: &Value, op: &str, literal: &Value) -> Result<bool, StoreError> {
    let holds = match op {
        "$eq" => equals(stored, literal),
        "$ne" => !equals(stored, literal),
        "$gt" => range(stored, literal, Ordering::is_gt),
        "$gte" => range(stored, literal, Ordering::is_ge),
        "$lt" => range(stored, literal, Ordering::is_lt),
        "$lte" => range(stored, literal, Ordering::is_le),
        "$in" | "$nin" => {
            let Value::Array(options) = literal else {
                return Err(StoreError::InvalidQuery(format!(
                    "'{op}' on field '{field}' needs an array"
                )));
            };
            let found = options.iter().any(|option| equals(stored, option));
            if op == "$in" {
                found
            } else {
                !found
            }
        }
        other => {
            return Err(StoreError::InvalidQuery(format!(
                "Unknown operator '{other}' on field '{field}'"
            )))
        }
    };
    Ok(holds)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    fn raw(pairs: &[(&str, &str)]) -> RawParams {
        RawParams::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn reserved_keys_never_reach_the_filter() {
        let filter = build_filter(&raw(&[
            ("page", "2"),
            ("sort", "-price"),
            ("limit", "10"),
            ("fields", "name"),
            ("difficulty", "easy"),
        ]));
        for key in RESERVED_KEYS {
            assert!(!filter.contains(key), "{key} leaked into filter");
        }
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn comparison_tokens_are_rewritten() {
        let filter = build_filter(&raw(&[("price[gte]", "100")]));
        let expected: BTreeMap<String, Value> = [("$gte".to_string(), json!("100"))].into();
        assert_eq!(filter.get("price"), Some(&Condition::Operators(expected)));

        assert!(filter.matches(&doc(json!({ "price": 150 }))).unwrap());
        assert!(filter.matches(&doc(json!({ "price": 100 }))).unwrap());
        assert!(!filter.matches(&doc(json!({ "price": 50 }))).unwrap());
    }

    #[test]
    fn unknown_tokens_pass_through_and_fail_at_evaluation() {
        let filter = build_filter(&raw(&[("price[between]", "1")]));
        let Some(Condition::Operators(ops)) = filter.get("price") else {
            panic!("expected operators");
        };
        assert!(ops.contains_key("between"));
        assert_matches!(
            filter.matches(&doc(json!({ "price": 1 }))),
            Err(StoreError::InvalidQuery(_))
        );
    }

    #[test]
    fn validate_flags_bad_operators_up_front() {
        assert!(build_filter(&raw(&[("price[gte]", "1"), ("type", "king")]))
            .validate()
            .is_ok());
        assert_matches!(
            build_filter(&raw(&[("price[between]", "1")])).validate(),
            Err(StoreError::InvalidQuery(_))
        );
        assert_matches!(
            FilterSpec::new().op("type", "$in", "king").validate(),
            Err(StoreError::InvalidQuery(_))
        );
    }

    #[test]
    fn building_twice_yields_identical_filters() {
        let input = raw(&[("price[lt]", "500"), ("type", "king"), ("page", "3")]);
        assert_eq!(build_filter(&input), build_filter(&input));
    }

    #[test]
    fn equality_matches_array_elements() {
        let filter = FilterSpec::new().eq("guides", "u1");
        assert!(filter.matches(&doc(json!({ "guides": ["u0", "u1"] }))).unwrap());
        assert!(!filter.matches(&doc(json!({ "guides": ["u2"] }))).unwrap());
    }

    #[test]
    fn not_equal_matches_missing_fields() {
        let filter = FilterSpec::new().op("secretTour", "$ne", true);
        assert!(filter.matches(&doc(json!({ "name": "a" }))).unwrap());
        assert!(filter.matches(&doc(json!({ "secretTour": false }))).unwrap());
        assert!(!filter.matches(&doc(json!({ "secretTour": true }))).unwrap());
    }

    #[test]
    fn within_sphere_uses_central_angle() {
        let center = GeoPoint::new(34.0, -118.0);
        let filter = FilterSpec::new().within_sphere("startLocation", center, 100.0 / 3963.2);
        let near = doc(json!({ "startLocation": GeoPoint::new(34.5, -118.2).to_geojson() }));
        let far = doc(json!({ "startLocation": GeoPoint::new(40.7, -74.0).to_geojson() }));
        assert!(filter.matches(&near).unwrap());
        assert!(!filter.matches(&far).unwrap());
    }

    #[test]
    fn overlay_wins_per_field() {
        let user = FilterSpec::new().eq("secretTour", "true");
        let combined = user.and(&FilterSpec::new().op("secretTour", "$ne", true));
        assert!(!combined.matches(&doc(json!({ "secretTour": true }))).unwrap());
    }
}
